//! Resume ingestion: PDF text extraction, chunking, embedding into the
//! store, and raw-text persistence on disk so chunks can be rebuilt on
//! startup. Resume chunks never expire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::store::freshness::FreshnessStore;
use crate::store::splitter::TextSplitter;
use crate::store::{Filter, StoreError};

pub mod handlers;

const RESUME_TYPE: &str = "resume";

/// Raw resume as persisted at `store/<user_id>/<resume_id>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResume {
    pub resume_id: Uuid,
    pub user_id: String,
    pub filename: String,
    pub text: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResumeSummary {
    pub resume_id: Uuid,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub chunk_count: usize,
}

pub struct ResumeStore {
    store: Arc<FreshnessStore>,
    dir: PathBuf,
    splitter: TextSplitter,
}

impl ResumeStore {
    pub fn new(store: Arc<FreshnessStore>, dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            dir: dir.into(),
            splitter: TextSplitter::default(),
        }
    }

    /// Chunks, embeds, and persists one resume. The raw text lands on disk;
    /// the chunks land in the store under the user's id.
    pub async fn save(
        &self,
        user_id: &str,
        filename: &str,
        text: &str,
    ) -> Result<ResumeSummary, StoreError> {
        let resume = StoredResume {
            resume_id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            filename: filename.to_string(),
            text: text.to_string(),
            uploaded_at: Utc::now(),
        };

        let chunk_count = self.index(&resume).await?;

        let user_dir = self.dir.join(user_id);
        tokio::fs::create_dir_all(&user_dir).await?;
        let path = user_dir.join(format!("{}.json", resume.resume_id));
        tokio::fs::write(&path, serde_json::to_vec_pretty(&resume)?).await?;

        info!(
            user_id,
            resume_id = %resume.resume_id,
            chunk_count,
            "resume stored"
        );
        Ok(ResumeSummary {
            resume_id: resume.resume_id,
            filename: resume.filename,
            uploaded_at: resume.uploaded_at,
            chunk_count,
        })
    }

    async fn index(&self, resume: &StoredResume) -> Result<usize, StoreError> {
        let chunks = self.splitter.split(&resume.text);
        for chunk in &chunks {
            let mut metadata = Map::new();
            metadata.insert("type".to_string(), json!(RESUME_TYPE));
            metadata.insert("user_id".to_string(), json!(resume.user_id));
            metadata.insert("resume_id".to_string(), json!(resume.resume_id.to_string()));
            self.store.add_permanent(chunk.clone(), metadata).await?;
        }
        Ok(chunks.len())
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<ResumeSummary>, StoreError> {
        let user_dir = self.dir.join(user_id);
        let mut summaries = Vec::new();

        let mut entries = match tokio::fs::read_dir(&user_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(summaries),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            match read_resume(&entry.path()).await {
                Ok(resume) => summaries.push(ResumeSummary {
                    resume_id: resume.resume_id,
                    filename: resume.filename,
                    chunk_count: self.splitter.split(&resume.text).len(),
                    uploaded_at: resume.uploaded_at,
                }),
                Err(e) => warn!("skipping unreadable resume file {:?}: {e}", entry.path()),
            }
        }
        summaries.sort_by_key(|s| s.uploaded_at);
        Ok(summaries)
    }

    /// Removes the chunks and the raw file. Returns false when the resume
    /// does not exist.
    pub async fn delete(&self, user_id: &str, resume_id: Uuid) -> Result<bool, StoreError> {
        let path = self.dir.join(user_id).join(format!("{resume_id}.json"));
        if !path.exists() {
            return Ok(false);
        }

        self.store
            .delete_where(
                &Filter::Eq("resume_id".into(), json!(resume_id.to_string()))
                    .and(Filter::Eq("user_id".into(), json!(user_id))),
            )
            .await;
        tokio::fs::remove_file(&path).await?;
        Ok(true)
    }

    /// Rebuilds store chunks for every resume on disk. Called once at
    /// startup; unreadable files are skipped, not fatal.
    pub async fn load_from_disk(&self) -> Result<usize, StoreError> {
        let mut loaded = 0usize;

        let mut users = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        while let Some(user_entry) = users.next_entry().await? {
            if !user_entry.path().is_dir() {
                continue;
            }
            let mut files = tokio::fs::read_dir(user_entry.path()).await?;
            while let Some(file) = files.next_entry().await? {
                match read_resume(&file.path()).await {
                    Ok(resume) => {
                        self.index(&resume).await?;
                        loaded += 1;
                    }
                    Err(e) => warn!("skipping unreadable resume file {:?}: {e}", file.path()),
                }
            }
        }

        info!("reloaded {loaded} resumes from disk");
        Ok(loaded)
    }
}

async fn read_resume(path: &Path) -> Result<StoredResume, StoreError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::freshness::FreshnessStore;
    use crate::store::{SearchRequest, VectorStore};
    use crate::testutil::{ManualClock, TestEmbedder};

    fn fixture(dir: &Path) -> (Arc<TestEmbedder>, Arc<FreshnessStore>, ResumeStore) {
        let embedder = Arc::new(TestEmbedder::new());
        embedder.set_default(vec![1.0, 0.0]);
        let store = Arc::new(FreshnessStore::new(
            Arc::new(VectorStore::new(embedder.clone())),
            Arc::new(ManualClock::new(1_000_000)),
        ));
        let resumes = ResumeStore::new(store.clone(), dir);
        (embedder, store, resumes)
    }

    #[tokio::test]
    async fn test_save_list_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (_embedder, store, resumes) = fixture(dir.path());

        let summary = resumes
            .save("u1", "resume.pdf", "Мой стек технологий: Java, Python, Git")
            .await
            .unwrap();
        assert_eq!(summary.chunk_count, 1);
        assert_eq!(store.len().await, 1);

        let listed = resumes.list("u1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].filename, "resume.pdf");

        let deleted = resumes.delete("u1", summary.resume_id).await.unwrap();
        assert!(deleted);
        assert_eq!(store.len().await, 0);
        assert!(resumes.list("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_resume_returns_false() {
        let dir = tempfile::tempdir().unwrap();
        let (_embedder, _store, resumes) = fixture(dir.path());
        let deleted = resumes.delete("u1", Uuid::new_v4()).await.unwrap();
        assert!(!deleted);
    }

    #[tokio::test]
    async fn test_load_from_disk_rebuilds_chunks() {
        let dir = tempfile::tempdir().unwrap();
        {
            let (_embedder, _store, resumes) = fixture(dir.path());
            resumes
                .save("u1", "resume.pdf", "Стек: Rust, Tokio, Axum")
                .await
                .unwrap();
        }

        // Fresh store, same directory.
        let (_embedder, store, resumes) = fixture(dir.path());
        assert_eq!(store.len().await, 0);
        let loaded = resumes.load_from_disk().await.unwrap();
        assert_eq!(loaded, 1);
        assert_eq!(store.len().await, 1);

        let hits = store
            .search(SearchRequest::new("Стек: Rust, Tokio, Axum"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.metadata["user_id"], json!("u1"));
    }
}

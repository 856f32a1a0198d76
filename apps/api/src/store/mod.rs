//! In-process similarity-search store.
//!
//! Records are free text plus a scalar metadata map; writes embed the text
//! through the configured [`Embedder`] and reads rank by cosine similarity.
//! Metadata filters are evaluated at query time, so callers can layer
//! policies (e.g. freshness, see [`freshness`]) without touching ranking.

use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::llm::{Embedder, LlmError};

pub mod freshness;
pub mod splitter;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] LlmError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A stored unit of text plus metadata.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub metadata: Map<String, Value>,
}

impl Document {
    pub fn new(text: impl Into<String>, metadata: Map<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            metadata,
        }
    }
}

/// A search hit with its similarity score in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}

/// Metadata predicate evaluated against each record at query time.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Numeric metadata value strictly greater than the operand.
    Gt(String, i64),
    /// Numeric metadata value less than or equal to the operand.
    Lte(String, i64),
    /// Metadata value equal to the operand.
    Eq(String, Value),
    /// The key is not present on the record.
    Absent(String),
    Or(Box<Filter>, Box<Filter>),
    And(Box<Filter>, Box<Filter>),
}

impl Filter {
    pub fn or(self, other: Filter) -> Filter {
        Filter::Or(Box::new(self), Box::new(other))
    }

    pub fn and(self, other: Filter) -> Filter {
        Filter::And(Box::new(self), Box::new(other))
    }

    pub fn matches(&self, metadata: &Map<String, Value>) -> bool {
        match self {
            Filter::Gt(key, operand) => {
                metadata.get(key).and_then(Value::as_i64).map(|v| v > *operand) == Some(true)
            }
            Filter::Lte(key, operand) => {
                metadata.get(key).and_then(Value::as_i64).map(|v| v <= *operand) == Some(true)
            }
            Filter::Eq(key, operand) => metadata.get(key) == Some(operand),
            Filter::Absent(key) => !metadata.contains_key(key),
            Filter::Or(a, b) => a.matches(metadata) || b.matches(metadata),
            Filter::And(a, b) => a.matches(metadata) && b.matches(metadata),
        }
    }
}

/// Parameters of one similarity search.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: usize,
    pub similarity_threshold: Option<f32>,
    pub filter: Option<Filter>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: 10,
            similarity_threshold: None,
            filter: None,
        }
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }
}

struct StoredDocument {
    id: String,
    text: String,
    metadata: Map<String, Value>,
    embedding: Vec<f32>,
}

/// Similarity-search store over embedded documents. Duplicates are allowed;
/// records are never mutated in place, only added or deleted.
pub struct VectorStore {
    embedder: Arc<dyn Embedder>,
    documents: RwLock<Vec<StoredDocument>>,
}

impl VectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            documents: RwLock::new(Vec::new()),
        }
    }

    /// Embeds and stores the given documents, returning their ids.
    pub async fn add(&self, documents: Vec<Document>) -> Result<Vec<String>, StoreError> {
        let mut stored = Vec::with_capacity(documents.len());
        for doc in documents {
            let embedding = self.embedder.embed(&doc.text).await?;
            stored.push(StoredDocument {
                id: doc.id,
                text: doc.text,
                metadata: doc.metadata,
                embedding,
            });
        }

        let ids: Vec<String> = stored.iter().map(|d| d.id.clone()).collect();
        self.documents.write().await.extend(stored);
        Ok(ids)
    }

    /// Similarity search ordered by descending cosine score. Returns an empty
    /// vector (never an error) when nothing matches.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<ScoredDocument>, StoreError> {
        let query_embedding = self.embedder.embed(&request.query).await?;

        let documents = self.documents.read().await;
        let mut hits: Vec<ScoredDocument> = documents
            .iter()
            .filter(|doc| match &request.filter {
                Some(filter) => filter.matches(&doc.metadata),
                None => true,
            })
            .map(|doc| ScoredDocument {
                score: cosine_similarity(&query_embedding, &doc.embedding),
                document: Document {
                    id: doc.id.clone(),
                    text: doc.text.clone(),
                    metadata: doc.metadata.clone(),
                },
            })
            .filter(|hit| match request.similarity_threshold {
                Some(threshold) => hit.score >= threshold,
                None => true,
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(request.top_k);
        Ok(hits)
    }

    pub async fn delete_ids(&self, ids: &[String]) -> usize {
        let mut documents = self.documents.write().await;
        let before = documents.len();
        documents.retain(|doc| !ids.contains(&doc.id));
        before - documents.len()
    }

    /// Deletes every record whose metadata matches the filter. Returns the
    /// number of deleted records.
    pub async fn delete_where(&self, filter: &Filter) -> usize {
        let mut documents = self.documents.write().await;
        let before = documents.len();
        documents.retain(|doc| !filter.matches(&doc.metadata));
        before - documents.len()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

//! Ordered request/response interceptors around the model call.
//!
//! The engine applies `before` in ascending order and `after` in descending
//! order. `before` rewrites the outgoing request (typically appending
//! retrieved context to the system text); `after` sees the aggregated reply
//! once streaming has finished.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::store::freshness::FreshnessStore;
use crate::store::{Filter, SearchRequest};

/// Outgoing chat request as the advisors see it.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub chat_id: String,
    pub system_text: String,
    pub user_text: String,
}

#[async_trait]
pub trait Advisor: Send + Sync {
    fn name(&self) -> &'static str;
    fn order(&self) -> i32;

    async fn before(&self, request: ChatRequest) -> ChatRequest {
        request
    }

    fn after(&self, response: String) -> String {
        response
    }
}

const RESUME_TOP_K: usize = 10;
const VACANCY_TOP_K: usize = 10;
const VACANCY_THRESHOLD: f32 = 0.4;

/// Appends the caller's resume chunks relevant to the message.
pub struct ResumeAdvisor {
    store: Arc<FreshnessStore>,
}

impl ResumeAdvisor {
    pub fn new(store: Arc<FreshnessStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Advisor for ResumeAdvisor {
    fn name(&self) -> &'static str {
        "ResumeAdvisor"
    }

    fn order(&self) -> i32 {
        0
    }

    async fn before(&self, mut request: ChatRequest) -> ChatRequest {
        let filter = Filter::Eq("type".into(), json!("resume"))
            .and(Filter::Eq("user_id".into(), json!(request.chat_id.clone())));
        let search = SearchRequest::new(&request.user_text)
            .top_k(RESUME_TOP_K)
            .filter(filter);

        match self.store.search(search).await {
            Ok(hits) if !hits.is_empty() => {
                let context: Vec<&str> = hits.iter().map(|h| h.document.text.as_str()).collect();
                request.system_text.push_str(&format!(
                    "\n\n----- ДАННЫЕ ИЗ РЕЗЮМЕ -----\n{}\n----- КОНЕЦ ДАННЫХ -----",
                    context.join("\n")
                ));
            }
            Ok(_) => {}
            Err(e) => warn!("resume context retrieval failed: {e}"),
        }
        request
    }
}

/// Appends stored vacancy/event context relevant to the message.
pub struct VacancyAdvisor {
    store: Arc<FreshnessStore>,
}

impl VacancyAdvisor {
    pub fn new(store: Arc<FreshnessStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Advisor for VacancyAdvisor {
    fn name(&self) -> &'static str {
        "VacancyAdvisor"
    }

    fn order(&self) -> i32 {
        1
    }

    async fn before(&self, mut request: ChatRequest) -> ChatRequest {
        // Vacancy and event records carry no "type" key, unlike resume
        // chunks and family facts.
        let search = SearchRequest::new(&request.user_text)
            .top_k(VACANCY_TOP_K)
            .similarity_threshold(VACANCY_THRESHOLD)
            .filter(Filter::Absent("type".into()));

        match self.store.search(search).await {
            Ok(hits) if !hits.is_empty() => {
                let context: Vec<&str> = hits.iter().map(|h| h.document.text.as_str()).collect();
                request.system_text.push_str(&format!(
                    "\n\n----- ДАННЫЕ О ВАКАНСИЯХ -----\n{}\n----- КОНЕЦ ДАННЫХ -----",
                    context.join("\n\n")
                ));
            }
            Ok(_) => {}
            Err(e) => warn!("vacancy context retrieval failed: {e}"),
        }
        request
    }
}

/// Logs the outgoing request and the aggregated reply. Last in, first out.
pub struct LoggerAdvisor;

#[async_trait]
impl Advisor for LoggerAdvisor {
    fn name(&self) -> &'static str {
        "LoggerAdvisor"
    }

    fn order(&self) -> i32 {
        2
    }

    async fn before(&self, request: ChatRequest) -> ChatRequest {
        debug!(
            chat_id = %request.chat_id,
            system_len = request.system_text.len(),
            "before call: {}",
            request.user_text
        );
        request
    }

    fn after(&self, response: String) -> String {
        debug!("after call: {} chars", response.len());
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::freshness::FreshnessStore;
    use crate::store::VectorStore;
    use crate::testutil::{ManualClock, TestEmbedder};
    use serde_json::Map;

    fn store_with(embedder: Arc<TestEmbedder>) -> Arc<FreshnessStore> {
        Arc::new(FreshnessStore::new(
            Arc::new(VectorStore::new(embedder)),
            Arc::new(ManualClock::new(1_000_000)),
        ))
    }

    fn request(user_text: &str) -> ChatRequest {
        ChatRequest {
            chat_id: "u1".to_string(),
            system_text: "система".to_string(),
            user_text: user_text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_resume_advisor_appends_only_own_user_chunks() {
        let embedder = Arc::new(TestEmbedder::new());
        embedder.set_default(vec![1.0, 0.0]);
        let store = store_with(embedder);

        let mut mine = Map::new();
        mine.insert("type".into(), json!("resume"));
        mine.insert("user_id".into(), json!("u1"));
        store.add_permanent("Стек: Java, Python", mine).await.unwrap();

        let mut other = Map::new();
        other.insert("type".into(), json!("resume"));
        other.insert("user_id".into(), json!("u2"));
        store.add_permanent("Стек: C++", other).await.unwrap();

        let advisor = ResumeAdvisor::new(store);
        let out = advisor.before(request("мои навыки")).await;
        assert!(out.system_text.contains("ДАННЫЕ ИЗ РЕЗЮМЕ"));
        assert!(out.system_text.contains("Java, Python"));
        assert!(!out.system_text.contains("C++"));
    }

    #[tokio::test]
    async fn test_vacancy_advisor_skips_typed_records() {
        let embedder = Arc::new(TestEmbedder::new());
        embedder.set_default(vec![1.0, 0.0]);
        let store = store_with(embedder);

        store
            .add_with_ttl("Должность: Rust разработчик", 2_000_000)
            .await
            .unwrap();
        let mut resume = Map::new();
        resume.insert("type".into(), json!("resume"));
        store.add_permanent("Стек: Java", resume).await.unwrap();

        let advisor = VacancyAdvisor::new(store);
        let out = advisor.before(request("вакансии")).await;
        assert!(out.system_text.contains("ДАННЫЕ О ВАКАНСИЯХ"));
        assert!(out.system_text.contains("Rust разработчик"));
        assert!(!out.system_text.contains("Стек: Java"));
    }

    #[tokio::test]
    async fn test_advisor_leaves_request_untouched_without_context() {
        let embedder = Arc::new(TestEmbedder::new());
        embedder.set_default(vec![1.0, 0.0]);
        let advisor = ResumeAdvisor::new(store_with(embedder));

        let out = advisor.before(request("привет")).await;
        assert_eq!(out.system_text, "система");
    }
}

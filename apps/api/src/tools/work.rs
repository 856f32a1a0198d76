//! Vacancy search tool: the orchestrator composing query generation, deep
//! search, and the freshness-filtered store.
//!
//! Degradation order: store-backed answer → raw-fetch answer → empty string.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm::{prompts, ChatModel, ToolDescriptor};
use crate::search::DeepSearch;
use crate::store::freshness::FreshnessStore;
use crate::store::SearchRequest;
use crate::tools::{string_arg, Tool};

/// How long a fetched vacancy stays searchable (two days, in millis).
pub const VACANCY_TTL_MILLIS: i64 = 2 * 24 * 60 * 60 * 1000;

const STORE_TOP_K: usize = 20;
const STORE_THRESHOLD: f32 = 0.4;

/// Instruction appended so the downstream model presents results correctly.
const RESULT_INSTRUCTION: &str =
    "Покажи пользователю не больше 10 вакансий. Для каждой вакансии обязательно укажи ссылку на источник.";

pub struct WorkTools {
    model: Arc<dyn ChatModel>,
    deep_search: Arc<DeepSearch>,
    store: Arc<FreshnessStore>,
}

impl WorkTools {
    pub fn new(
        model: Arc<dyn ChatModel>,
        deep_search: Arc<DeepSearch>,
        store: Arc<FreshnessStore>,
    ) -> Self {
        Self {
            model,
            deep_search,
            store,
        }
    }

    /// Fetches new vacancies for a user profile. Worst case is an empty
    /// string; internal errors never reach the chat loop.
    pub async fn fetch_vacancies(&self, stack: &str) -> String {
        match self.run(stack).await {
            Ok(text) => text,
            Err(e) => {
                warn!("fetch_vacancies degraded to empty result: {e}");
                String::new()
            }
        }
    }

    async fn run(&self, stack: &str) -> Result<String, AppError> {
        info!("fetch_vacancies called: {stack}");

        // Step 1: one model call turns the profile into a search query.
        // Empty output is fatal; there is no fallback query.
        let query = self
            .model
            .call(
                prompts::QUERY_GENERATOR_SYSTEM,
                &format!("Сделай поисковый запрос для поиска вакансий для пользователя со стеком: {stack}"),
            )
            .await
            .map_err(|e| AppError::Llm(format!("query generation failed: {e}")))?;
        if query.trim().is_empty() {
            return Err(AppError::Llm("query generation returned nothing".into()));
        }

        // Step 2: fan-out retrieval.
        let vacancies = self
            .deep_search
            .deep_search(&query)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        info!("deep search result: {} vacancies", vacancies.len());

        // Step 3: persist with TTL. A fully failed persistence step falls
        // back to the raw texts instead of failing the operation.
        let expires_at = self.store.now_millis() + VACANCY_TTL_MILLIS;
        let mut stored = 0usize;
        for vacancy in &vacancies {
            match self.store.add_with_ttl(vacancy.to_string(), expires_at).await {
                Ok(_) => stored += 1,
                Err(e) => warn!("failed to persist vacancy: {e}"),
            }
        }

        if stored == 0 && !vacancies.is_empty() {
            warn!("persistence failed entirely, returning raw results");
            let raw = vacancies
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n\n");
            return Ok(format!("{RESULT_INSTRUCTION}\n\n{raw}"));
        }

        // Step 4: re-query the store with the original profile text.
        let hits = self
            .store
            .search(
                SearchRequest::new(stack)
                    .top_k(STORE_TOP_K)
                    .similarity_threshold(STORE_THRESHOLD),
            )
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;

        if hits.is_empty() {
            return Ok(String::new());
        }

        let joined = hits
            .iter()
            .map(|hit| hit.document.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(format!("{RESULT_INSTRUCTION}\n\n{joined}"))
    }
}

#[async_trait]
impl Tool for WorkTools {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::function(
            "fetch_vacancies",
            "Функция для получения новых вакансий",
            json!({
                "type": "object",
                "properties": {
                    "stack": {
                        "type": "string",
                        "description": "Стек пользователя"
                    }
                },
                "required": ["stack"]
            }),
        )
    }

    async fn invoke(&self, arguments: &Value) -> String {
        self.fetch_vacancies(&string_arg(arguments, "stack")).await
    }
}

mod chat;
mod config;
mod errors;
mod kudago;
mod llm;
mod models;
mod resume;
mod routes;
mod search;
mod state;
mod store;
#[cfg(test)]
mod testutil;
mod tools;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::chat::advisors::{Advisor, LoggerAdvisor, ResumeAdvisor, VacancyAdvisor};
use crate::chat::ChatEngine;
use crate::config::Config;
use crate::kudago::KudaGoClient;
use crate::llm::{prompts, OllamaClient};
use crate::resume::ResumeStore;
use crate::routes::build_router;
use crate::search::{DeepSearch, DuckDuckGoSearch};
use crate::state::AppState;
use crate::store::freshness::{FreshnessStore, SystemClock};
use crate::store::VectorStore;
use crate::tools::family::FamilyTools;
use crate::tools::work::WorkTools;
use crate::tools::ToolRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Rekrut API v{}", env!("CARGO_PKG_VERSION"));

    // Ollama handles both chat and embeddings
    let ollama = Arc::new(OllamaClient::new(
        config.ollama_base_url.clone(),
        config.ollama_model.clone(),
        config.embedding_model.clone(),
    ));
    info!(
        "Ollama client initialized (model: {}, embeddings: {})",
        config.ollama_model, config.embedding_model
    );

    // In-process vector store with freshness filtering
    let store = Arc::new(FreshnessStore::new(
        Arc::new(VectorStore::new(ollama.clone())),
        Arc::new(SystemClock),
    ));
    let _sweeper = store.spawn_sweeper();

    // Resume chunks are rebuilt from disk on every startup
    let resumes = Arc::new(ResumeStore::new(store.clone(), config.store_dir.clone()));
    resumes.load_from_disk().await?;

    // Deep search over the web search backend
    let search = Arc::new(DuckDuckGoSearch::new(config.search_base_url.clone()));
    let deep_search = Arc::new(DeepSearch::new(ollama.clone(), search));

    let kudago = Arc::new(KudaGoClient::new(config.kudago_base_url.clone()));

    let tools = ToolRegistry::new()
        .register(Arc::new(WorkTools::new(
            ollama.clone(),
            deep_search,
            store.clone(),
        )))
        .register(Arc::new(FamilyTools::new(
            ollama.clone(),
            kudago,
            store.clone(),
        )));

    let advisors: Vec<Arc<dyn Advisor>> = vec![
        Arc::new(ResumeAdvisor::new(store.clone())),
        Arc::new(VacancyAdvisor::new(store.clone())),
        Arc::new(LoggerAdvisor),
    ];

    let engine = Arc::new(ChatEngine::new(
        ollama,
        tools,
        advisors,
        prompts::ASSISTANT_SYSTEM.to_string(),
    ));

    let state = AppState {
        config: config.clone(),
        engine,
        resumes,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

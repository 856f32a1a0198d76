use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub embedding_model: String,
    pub search_base_url: String,
    pub kudago_base_url: String,
    pub store_dir: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let ollama_model = require_env("OLLAMA_MODEL")?;

        Ok(Config {
            ollama_base_url: require_env("OLLAMA_BASE_URL")?,
            embedding_model: std::env::var("OLLAMA_EMBEDDING_MODEL")
                .unwrap_or_else(|_| ollama_model.clone()),
            ollama_model,
            search_base_url: std::env::var("SEARCH_BASE_URL")
                .unwrap_or_else(|_| "https://html.duckduckgo.com".to_string()),
            kudago_base_url: std::env::var("KUDAGO_BASE_URL")
                .unwrap_or_else(|_| "https://kudago.com/public-api/v1.4".to_string()),
            store_dir: std::env::var("STORE_DIR").unwrap_or_else(|_| "store".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

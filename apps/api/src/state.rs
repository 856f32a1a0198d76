use std::sync::Arc;

use crate::chat::ChatEngine;
use crate::config::Config;
use crate::resume::ResumeStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub engine: Arc<ChatEngine>,
    pub resumes: Arc<ResumeStore>,
}

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use axum::Json;
use futures_util::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::StreamExt;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub chat_id: String,
    pub message: String,
}

/// POST /api/v1/chat
/// Streams the assistant reply as SSE data events, one per model chunk.
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if body.message.trim().is_empty() {
        return Err(AppError::Validation("Message must not be empty".to_string()));
    }

    let chunks = state.engine.respond(body.chat_id, body.message);
    let events = chunks.map(|chunk| Ok(Event::default().data(chunk)));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

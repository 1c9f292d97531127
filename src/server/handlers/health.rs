use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::rag::RagStore;
use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let indexed_chunks = state.store.count().await?;
    let sessions = state.chat.sessions().len().await;
    Ok(Json(json!({
        "status": "ok",
        "indexed_chunks": indexed_chunks,
        "sessions": sessions,
        "chat_model": state.config.openai.chat_model,
        "embedding_model": state.config.openai.embedding_model,
    })))
}

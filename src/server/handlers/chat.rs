use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let turn = state
        .chat
        .send(body.session_id.as_deref(), &body.message)
        .await?;
    Ok(Json(turn))
}

pub async fn get_session_messages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state.chat.sessions().messages(&session_id).await?;
    Ok(Json(json!({
        "session_id": session_id,
        "messages": messages,
    })))
}

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::core::errors::ApiError;
use crate::state::AppState;

/// Re-indexes the documents directory. Concurrent requests queue behind the running one.
pub async fn run_ingest(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let _guard = state.ingest_lock.lock().await;
    let report = state.ingestor.run().await?;
    Ok(Json(report))
}

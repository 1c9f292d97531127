use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::rag::{build_context, is_answer_found, NO_MATCH_DISTANCE};
use crate::state::AppState;

const MAX_K: usize = 50;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub k: Option<usize>,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Query parameter 'q' is required".to_string()));
    }
    let k = params
        .k
        .unwrap_or(state.config.retrieval.top_k)
        .clamp(1, MAX_K);

    let hits = state.retriever.retrieve(query, k).await?;
    let threshold = state.retriever.threshold();
    let best_distance = hits.first().map(|h| h.distance).unwrap_or(NO_MATCH_DISTANCE);

    Ok(Json(json!({
        "query": query,
        "best_distance": best_distance,
        "not_found_threshold": threshold,
        "found": is_answer_found(&hits, threshold),
        "hits": hits
            .iter()
            .map(|hit| json!({
                "source": hit.chunk.source,
                "page": hit.chunk.page,
                "distance": hit.distance,
                "text": hit.chunk.content,
            }))
            .collect::<Vec<_>>(),
        "context": build_context(&hits),
    })))
}

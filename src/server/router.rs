use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{chat, config, health, ingest, search};
use crate::server::page;
use crate::state::AppState;

/// Chat page, JSON API, CORS and request tracing.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state);
    Router::new()
        .route("/", get(page::index))
        .route("/health", get(health::health))
        .route("/api/chat", post(chat::send_message))
        .route(
            "/api/sessions/:session_id/messages",
            get(chat::get_session_messages),
        )
        .route("/api/ingest", post(ingest::run_ingest))
        .route("/api/search", get(search::search))
        .route("/api/config", get(config::get_config))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(state: &AppState) -> CorsLayer {
    let configured = &state.config.server.cors_allowed_origins;
    let origins = if configured.is_empty() {
        default_local_origins(state.config.server.port)
    } else {
        configured.clone()
    };

    let allow_origin = AllowOrigin::list(
        origins
            .iter()
            .map(|origin| origin.trim())
            .filter(|origin| !origin.is_empty())
            .filter_map(|origin| HeaderValue::from_str(origin).ok())
            .collect::<Vec<_>>(),
    );

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn default_local_origins(port: u16) -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        format!("http://localhost:{}", port),
        "http://127.0.0.1".to_string(),
        format!("http://127.0.0.1:{}", port),
    ]
}

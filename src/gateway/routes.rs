use axum::{
    extract::State,
    http::{header, Method},
    routing::{get, post, MethodRouter},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use super::relay::{exchange_token, method_not_allowed, preflight, RelayState};
use crate::shared::time::now_unix_seconds;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    app: &'static str,
    version: &'static str,
    ts: u64,
    secret_configured: bool,
}

async fn health(State(state): State<RelayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        app: "anilist-token-relay",
        version: env!("CARGO_PKG_VERSION"),
        ts: now_unix_seconds(),
        secret_configured: state.secret_configured(),
    })
}

async fn root() -> &'static str {
    "AniList token relay is running"
}

fn token_route() -> MethodRouter<RelayState> {
    post(exchange_token)
        .options(preflight)
        .fallback(method_not_allowed)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

pub fn build_router(state: RelayState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/token", token_route())
        // Serverless deployments mount the same handler under /api.
        .route("/api/token", token_route())
        .layer(cors_layer())
        .with_state(state)
}

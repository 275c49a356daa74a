use crate::AppState;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

pub mod api;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// The full router. `/health` is open; everything under `/api` needs the API key.
pub fn create_router<S: AppState>(state: &S) -> Router<S> {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api::create_api_router(state))
}

use axum::{
    Router,
    extract::{Json, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::errors::ApiError;
use crate::repositories::NewsletterRepository;
use crate::validation::validate_email;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct SubscribeRequest {
    email: String,
}

#[derive(Debug, Serialize)]
struct SubscribeResponse {
    email: String,
}

#[instrument(skip_all)]
async fn subscribe<S: AppState>(
    State(state): State<S>,
    Json(payload): Json<SubscribeRequest>,
) -> Result<(StatusCode, ResponseJson<SubscribeResponse>), ApiError> {
    let email = validate_email(&payload.email)?;
    state.newsletter_repo().subscribe(&email).await?;

    info!("New newsletter subscriber");
    Ok((StatusCode::CREATED, ResponseJson(SubscribeResponse { email })))
}

pub(super) fn routes<S: AppState>() -> Router<S> {
    Router::new().route("/newsletter", post(subscribe::<S>))
}

use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use tracing::{info, instrument};

use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::models::PostAnalytics;
use crate::repositories::PostRepository;
use crate::AppState;

/// Views, likes and comment counts for every post the caller wrote.
#[instrument(skip_all, fields(user_id = %user.id()))]
async fn post_analytics<S: AppState>(
    State(state): State<S>,
    user: CurrentUser,
) -> Result<ResponseJson<Vec<PostAnalytics>>, ApiError> {
    let analytics = state.post_repo().analytics(user.id()).await?;
    info!(post_count = analytics.len(), "Loaded post analytics");
    Ok(ResponseJson(analytics))
}

pub(super) fn routes<S: AppState>() -> Router<S> {
    Router::new().route("/dashboard/analytics", get(post_analytics::<S>))
}

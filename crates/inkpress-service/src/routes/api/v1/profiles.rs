use axum::{
    Router,
    extract::{Json, Path, State},
    response::Json as ResponseJson,
    routing::{get, put},
};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::models::{ProfileUpdate, UserProfile};
use crate::repositories::ProfileRepository;
use crate::validation::require;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct ProfileRequest {
    display_name: String,
    bio: Option<String>,
    avatar_url: Option<String>,
}

#[instrument(skip_all, fields(user_id = %user_id))]
async fn get_profile<S: AppState>(
    State(state): State<S>,
    Path(user_id): Path<String>,
) -> Result<ResponseJson<UserProfile>, ApiError> {
    let profile = state
        .profile_repo()
        .find(&user_id)
        .await?
        .ok_or_else(|| {
            debug!("Profile not found");
            ApiError::NotFound
        })?;
    Ok(ResponseJson(profile))
}

/// Replaces the caller's whole profile.
#[instrument(skip_all, fields(user_id = %user.id()))]
async fn save_profile<S: AppState>(
    State(state): State<S>,
    user: CurrentUser,
    Json(payload): Json<ProfileRequest>,
) -> Result<ResponseJson<UserProfile>, ApiError> {
    let update = ProfileUpdate {
        user_id: user.user.id.clone(),
        display_name: require("display_name", payload.display_name)?,
        bio: payload.bio,
        avatar_url: payload.avatar_url,
    };

    let profile = state.profile_repo().upsert(&update).await?;
    info!("Saved profile");
    Ok(ResponseJson(profile))
}

pub(super) fn routes<S: AppState>() -> Router<S> {
    Router::new()
        .route("/profiles/{user_id}", get(get_profile::<S>))
        .route("/profile", put(save_profile::<S>))
}

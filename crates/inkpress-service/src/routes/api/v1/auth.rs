use axum::{
    Router,
    extract::{Json, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::models::{Session, User};
use crate::validation::validate_email;
use crate::{AppState, repositories::AuthRepository};

#[derive(Debug, Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct SignUpResponse {
    user: User,
    session: Session,
}

#[instrument(skip_all)]
async fn sign_up<S: AppState>(
    State(state): State<S>,
    Json(payload): Json<Credentials>,
) -> Result<(StatusCode, ResponseJson<SignUpResponse>), ApiError> {
    let email = validate_email(&payload.email)?;
    let auth = state.auth_repo();

    let user = auth.sign_up(&email, &payload.password).await?;
    let session = auth.sign_in(&email, &payload.password).await?;

    info!(user_id = %user.id, "Registered new user");
    Ok((StatusCode::CREATED, ResponseJson(SignUpResponse { user, session })))
}

#[instrument(skip_all)]
async fn sign_in<S: AppState>(
    State(state): State<S>,
    Json(payload): Json<Credentials>,
) -> Result<ResponseJson<Session>, ApiError> {
    let email = validate_email(&payload.email)?;
    let session = state.auth_repo().sign_in(&email, &payload.password).await?;

    info!(user_id = %session.user.id, "User signed in");
    Ok(ResponseJson(session))
}

#[instrument(skip_all, fields(user_id = %user.id()))]
async fn sign_out<S: AppState>(
    State(state): State<S>,
    user: CurrentUser,
) -> Result<StatusCode, ApiError> {
    state.auth_repo().sign_out(&user.token).await?;
    info!("User signed out");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all, fields(user_id = %user.id()))]
async fn current_user(user: CurrentUser) -> ResponseJson<User> {
    debug!("Returning current user");
    ResponseJson(user.user)
}

pub(super) fn routes<S: AppState>() -> Router<S> {
    Router::new()
        .route("/auth/signup", post(sign_up::<S>))
        .route("/auth/signin", post(sign_in::<S>))
        .route("/auth/signout", post(sign_out::<S>))
        .route("/auth/user", get(current_user))
}

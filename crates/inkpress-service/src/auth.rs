use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::AppState;
use crate::errors::ApiError;
use crate::models::User;
use crate::repositories::AuthRepository;

pub const API_KEY_HEADER: &str = "apikey";

/// Every API request must present the public key in the `apikey` header.
pub async fn require_api_key<S: AppState>(
    State(state): State<S>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if presented != Some(state.api_key()) {
        warn!(
            path = %request.uri().path(),
            has_key = presented.is_some(),
            "Rejected request with missing or wrong API key"
        );
        return Err(ApiError::InvalidApiKey);
    }

    Ok(next.run(request).await)
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// The signed-in caller. Rejects with 401 when there is no live session.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }
}

impl<S: AppState> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;

        let user = state
            .auth_repo()
            .user_for_token(&token)
            .await?
            .ok_or_else(|| {
                debug!("Session token unknown or expired");
                ApiError::Unauthorized
            })?;

        Ok(CurrentUser { user, token })
    }
}

/// Like `CurrentUser`, but anonymous callers get `None` instead of a rejection.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl<S: AppState> FromRequestParts<S> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(ApiError::Unauthorized) => Ok(MaybeUser(None)),
            Err(err) => Err(err),
        }
    }
}

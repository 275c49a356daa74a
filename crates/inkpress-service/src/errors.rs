use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    ValidationError(#[from] crate::validation::ValidationError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DieselError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("You must be logged in")]
    Unauthorized,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("You do not have permission to modify this resource")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    /// The post row was written but its tag rows were not; the post is left in place.
    #[error("Post {post_id} was created but its tags could not be attached")]
    TagAssociationFailed {
        post_id: i32,
        #[source]
        source: DieselError,
    },

    #[error("Internal server error")]
    InternalError,
}

impl ApiError {
    /// Maps a unique-constraint violation to a conflict with the given message.
    pub fn conflict_on_unique(err: DieselError, message: &str) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                ApiError::Conflict(message.to_string())
            }
            other => ApiError::DatabaseError(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::ValidationError(ref err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized | ApiError::InvalidApiKey | ApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            ApiError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Conflict(ref msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::DatabaseError(DieselError::NotFound) => {
                (StatusCode::NOT_FOUND, "Not found".to_string())
            }
            ApiError::DatabaseError(ref err) => {
                // Log the detailed error but don't expose it to the client
                error!(error = %err, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::TagAssociationFailed {
                post_id,
                ref source,
            } => {
                error!(post_id, error = %source, "Tag association failed after post insert");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": self.to_string(),
                        "post_id": post_id,
                    })),
                )
                    .into_response();
            }
            ApiError::InternalError => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

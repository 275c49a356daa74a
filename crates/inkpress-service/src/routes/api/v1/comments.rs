use std::convert::Infallible;

use axum::{
    Router,
    extract::{Json, Path, State},
    http::StatusCode,
    response::{
        Json as ResponseJson,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, put},
};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::models::{Comment, CommentVote, NewComment, VoteDirection};
use crate::realtime::CommentEvent;
use crate::repositories::{CommentRepository, PostRepository, ProfileRepository};
use crate::validation::require;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct CommentRequest {
    content: String,
}

#[derive(Debug, Deserialize)]
struct VoteRequest {
    direction: VoteDirection,
}

#[derive(Debug, Serialize)]
struct VoteResponse {
    #[serde(flatten)]
    vote: CommentVote,
    votes: i32,
}

async fn ensure_post_exists<S: AppState>(state: &S, post_id: i32) -> Result<(), ApiError> {
    match state.post_repo().find_by_id(post_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::NotFound),
    }
}

async fn load_comment<S: AppState>(state: &S, id: i32) -> Result<Comment, ApiError> {
    state
        .comment_repo()
        .find_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)
}

/// Profile display name, or the account email for users without a profile.
async fn author_name<S: AppState>(state: &S, user: &CurrentUser) -> Result<String, ApiError> {
    let display_name = state
        .profile_repo()
        .find(user.id())
        .await?
        .map(|profile| profile.display_name)
        .filter(|name| !name.trim().is_empty());
    Ok(display_name.unwrap_or_else(|| user.user.email.clone()))
}

async fn insert_and_publish<S: AppState>(
    state: &S,
    new_comment: NewComment,
) -> Result<Comment, ApiError> {
    let comment = state.comment_repo().create(&new_comment).await?;
    state
        .realtime()
        .publish(CommentEvent::Inserted(comment.clone()));
    Ok(comment)
}

#[instrument(skip_all, fields(post_id = %post_id))]
async fn list_comments<S: AppState>(
    State(state): State<S>,
    Path(post_id): Path<i32>,
) -> Result<ResponseJson<Vec<Comment>>, ApiError> {
    ensure_post_exists(&state, post_id).await?;
    let comments = state.comment_repo().for_post(post_id).await?;
    debug!(returned_count = comments.len(), "Listed comments");
    Ok(ResponseJson(comments))
}

#[instrument(skip_all, fields(post_id = %post_id, user_id = %user.id()))]
async fn create_comment<S: AppState>(
    State(state): State<S>,
    Path(post_id): Path<i32>,
    user: CurrentUser,
    Json(payload): Json<CommentRequest>,
) -> Result<(StatusCode, ResponseJson<Comment>), ApiError> {
    let content = require("content", payload.content)?;
    ensure_post_exists(&state, post_id).await?;

    let new_comment = NewComment {
        post_id,
        parent_id: None,
        user_id: Some(user.user.id.clone()),
        author: author_name(&state, &user).await?,
        content,
    };
    let comment = insert_and_publish(&state, new_comment).await?;

    info!(comment_id = comment.id, "Created comment");
    Ok((StatusCode::CREATED, ResponseJson(comment)))
}

/// Live comment inserts for one post as server-sent events. The stream ends when
/// the server starts shutting down.
#[instrument(skip_all, fields(post_id = %post_id))]
async fn stream_comments<S: AppState>(
    State(state): State<S>,
    Path(post_id): Path<i32>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    ensure_post_exists(&state, post_id).await?;

    let stream = state
        .realtime()
        .comments_for_post(post_id)
        .filter_map(|comment| async move {
            match Event::default().event("comment").json_data(&comment) {
                Ok(event) => Some(Ok(event)),
                Err(err) => {
                    warn!(comment_id = comment.id, error = %err, "Failed to encode comment event");
                    None
                }
            }
        })
        .take_until(state.shutdown().wait_for_shutdown());

    info!(
        subscribers = state.realtime().subscriber_count(),
        "Opened comment stream"
    );
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[instrument(skip_all, fields(comment_id = %comment_id))]
async fn list_replies<S: AppState>(
    State(state): State<S>,
    Path(comment_id): Path<i32>,
) -> Result<ResponseJson<Vec<Comment>>, ApiError> {
    load_comment(&state, comment_id).await?;
    let replies = state.comment_repo().replies(comment_id).await?;
    debug!(returned_count = replies.len(), "Listed replies");
    Ok(ResponseJson(replies))
}

#[instrument(skip_all, fields(comment_id = %comment_id, user_id = %user.id()))]
async fn create_reply<S: AppState>(
    State(state): State<S>,
    Path(comment_id): Path<i32>,
    user: CurrentUser,
    Json(payload): Json<CommentRequest>,
) -> Result<(StatusCode, ResponseJson<Comment>), ApiError> {
    let content = require("content", payload.content)?;
    let parent = load_comment(&state, comment_id).await?;

    let new_comment = NewComment {
        post_id: parent.post_id,
        parent_id: Some(parent.id),
        user_id: Some(user.user.id.clone()),
        author: author_name(&state, &user).await?,
        content,
    };
    let reply = insert_and_publish(&state, new_comment).await?;

    info!(reply_id = reply.id, "Created reply");
    Ok((StatusCode::CREATED, ResponseJson(reply)))
}

#[instrument(skip_all, fields(comment_id = %comment_id, user_id = %user.id(), direction = ?payload.direction))]
async fn vote_comment<S: AppState>(
    State(state): State<S>,
    Path(comment_id): Path<i32>,
    user: CurrentUser,
    Json(payload): Json<VoteRequest>,
) -> Result<ResponseJson<VoteResponse>, ApiError> {
    let vote = state
        .comment_repo()
        .vote(comment_id, user.id(), payload.direction)
        .await?;
    let votes = load_comment(&state, comment_id).await?.votes;

    info!(votes, "Recorded comment vote");
    Ok(ResponseJson(VoteResponse { vote, votes }))
}

pub(super) fn routes<S: AppState>() -> Router<S> {
    Router::new()
        .route(
            "/posts/{id}/comments",
            get(list_comments::<S>).post(create_comment::<S>),
        )
        .route("/posts/{id}/comments/stream", get(stream_comments::<S>))
        .route(
            "/comments/{id}/replies",
            get(list_replies::<S>).post(create_reply::<S>),
        )
        .route("/comments/{id}/vote", put(vote_comment::<S>))
}

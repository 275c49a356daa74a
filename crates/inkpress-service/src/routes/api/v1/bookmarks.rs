use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::{PageQuery, PageResponse};
use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::models::PostSummary;
use crate::repositories::BookmarkRepository;
use crate::AppState;

#[derive(Debug, Serialize)]
struct BookmarkStatus {
    post_id: i32,
    bookmarked: bool,
}

#[instrument(skip_all, fields(post_id = %post_id, user_id = %user.id()))]
async fn bookmark_status<S: AppState>(
    State(state): State<S>,
    Path(post_id): Path<i32>,
    user: CurrentUser,
) -> Result<ResponseJson<BookmarkStatus>, ApiError> {
    let bookmarked = state
        .bookmark_repo()
        .is_bookmarked(post_id, user.id())
        .await?;
    debug!(bookmarked, "Checked bookmark");
    Ok(ResponseJson(BookmarkStatus {
        post_id,
        bookmarked,
    }))
}

#[instrument(skip_all, fields(post_id = %post_id, user_id = %user.id()))]
async fn bookmark_post<S: AppState>(
    State(state): State<S>,
    Path(post_id): Path<i32>,
    user: CurrentUser,
) -> Result<ResponseJson<BookmarkStatus>, ApiError> {
    state.bookmark_repo().bookmark(post_id, user.id()).await?;
    info!("Bookmarked post");
    Ok(ResponseJson(BookmarkStatus {
        post_id,
        bookmarked: true,
    }))
}

#[instrument(skip_all, fields(post_id = %post_id, user_id = %user.id()))]
async fn unbookmark_post<S: AppState>(
    State(state): State<S>,
    Path(post_id): Path<i32>,
    user: CurrentUser,
) -> Result<ResponseJson<BookmarkStatus>, ApiError> {
    state.bookmark_repo().unbookmark(post_id, user.id()).await?;
    info!("Removed bookmark");
    Ok(ResponseJson(BookmarkStatus {
        post_id,
        bookmarked: false,
    }))
}

#[instrument(skip_all, fields(user_id = %user.id(), page = query.page, limit = query.limit))]
async fn list_bookmarks<S: AppState>(
    State(state): State<S>,
    user: CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<ResponseJson<PageResponse<PostSummary>>, ApiError> {
    let pagination = query.pagination()?;
    let result = state
        .bookmark_repo()
        .bookmarked_posts(user.id(), pagination)
        .await?;

    debug!(
        returned_count = result.items.len(),
        total = result.total,
        "Listed bookmarked posts"
    );
    Ok(ResponseJson(PageResponse::new(result, pagination)))
}

pub(super) fn routes<S: AppState>() -> Router<S> {
    Router::new()
        .route(
            "/posts/{id}/bookmark",
            get(bookmark_status::<S>)
                .put(bookmark_post::<S>)
                .delete(unbookmark_post::<S>),
        )
        .route("/bookmarks", get(list_bookmarks::<S>))
}

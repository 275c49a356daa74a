use axum::{
    Router,
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::PageResponse;
use crate::auth::{CurrentUser, MaybeUser};
use crate::errors::ApiError;
use crate::models::{
    Category, LikeToggle, NewPost, Post, PostSummary, RelatedPost, Tag, format_reading_time,
};
use crate::repositories::{
    ListPostsParams, PostRepository, RELATED_POSTS_LIMIT, TaxonomyRepository,
};
use crate::validation::{Pagination, require, search_term};
use crate::AppState;

#[derive(Debug, Deserialize)]
struct ListPostsQuery {
    page: Option<u32>,
    limit: Option<u32>,
    search: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatePostRequest {
    title: String,
    content: String,
    author: Option<String>,
    category_id: Option<i32>,
    #[serde(default)]
    tag_ids: Vec<i32>,
    image_url: Option<String>,
    excerpt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdatePostRequest {
    title: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct PostDetail {
    #[serde(flatten)]
    post: Post,
    category: Option<Category>,
    tags: Vec<Tag>,
    reading_time: String,
    description: String,
}

#[derive(Debug, Serialize)]
struct ViewsResponse {
    views: i32,
}

#[derive(Debug, Deserialize)]
struct RelatedQuery {
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ShareQuery {
    platform: String,
    url: String,
}

#[derive(Debug, Serialize)]
struct ShareResponse {
    platform: String,
    share_url: String,
}

async fn load_post<S: AppState>(state: &S, id: i32) -> Result<Post, ApiError> {
    state.post_repo().find_by_id(id).await?.ok_or_else(|| {
        debug!(id, "Post not found");
        ApiError::NotFound
    })
}

/// Loads the post and checks the caller wrote it.
async fn owned_post<S: AppState>(state: &S, id: i32, user: &CurrentUser) -> Result<Post, ApiError> {
    let post = load_post(state, id).await?;
    if !post.is_owned_by(user.id()) {
        warn!(id, user_id = %user.id(), "Rejected change to a post owned by someone else");
        return Err(ApiError::Forbidden);
    }
    Ok(post)
}

#[instrument(skip_all, fields(page = query.page, limit = query.limit, has_search = query.search.is_some()))]
async fn list_posts<S: AppState>(
    State(state): State<S>,
    Query(query): Query<ListPostsQuery>,
) -> Result<ResponseJson<PageResponse<PostSummary>>, ApiError> {
    let params = ListPostsParams {
        pagination: Pagination::new(query.page, query.limit)?,
        search: search_term(query.search.as_deref()),
    };

    let result = state.post_repo().list(&params).await?;
    info!(
        returned_count = result.items.len(),
        total = result.total,
        "Listed posts"
    );

    Ok(ResponseJson(PageResponse::new(result, params.pagination)))
}

#[instrument(skip_all, fields(tag_count = payload.tag_ids.len(), has_category = payload.category_id.is_some()))]
async fn create_post<S: AppState>(
    State(state): State<S>,
    MaybeUser(user): MaybeUser,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, ResponseJson<Post>), ApiError> {
    let author = payload
        .author
        .filter(|a| !a.trim().is_empty())
        .or_else(|| user.as_ref().map(|u| u.user.email.clone()))
        .unwrap_or_default();

    let mut new_post = NewPost::new(
        payload.title,
        payload.content,
        author,
        user.map(|u| u.user.id),
        payload.category_id,
    )?;
    new_post.image_url = payload.image_url.filter(|s| !s.trim().is_empty());
    new_post.excerpt = payload.excerpt.filter(|s| !s.trim().is_empty());

    if let Some(category_id) = new_post.category_id {
        if state.taxonomy_repo().find_category(category_id).await?.is_none() {
            return Err(ApiError::BadRequest(format!(
                "Category {category_id} does not exist"
            )));
        }
    }

    let post = state.post_repo().create(&new_post, &payload.tag_ids).await?;
    info!(id = post.id, "Created post");

    Ok((StatusCode::CREATED, ResponseJson(post)))
}

#[instrument(skip_all, fields(id = %id))]
async fn get_post<S: AppState>(
    State(state): State<S>,
    Path(id): Path<i32>,
) -> Result<ResponseJson<PostDetail>, ApiError> {
    let post = load_post(&state, id).await?;

    let category = match post.category_id {
        Some(category_id) => state.taxonomy_repo().find_category(category_id).await?,
        None => None,
    };
    let tags = state.post_repo().tags_for(id).await?;

    debug!(tag_count = tags.len(), "Loaded post");
    Ok(ResponseJson(PostDetail {
        reading_time: format_reading_time(post.reading_time_minutes()),
        description: post.description(),
        category,
        tags,
        post,
    }))
}

#[instrument(skip_all, fields(id = %id, user_id = %user.id()))]
async fn update_post<S: AppState>(
    State(state): State<S>,
    Path(id): Path<i32>,
    user: CurrentUser,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<ResponseJson<Post>, ApiError> {
    let title = require("title", payload.title)?;
    let content = require("content", payload.content)?;
    owned_post(&state, id, &user).await?;

    let post = state.post_repo().update(id, &title, &content).await?;
    info!("Updated post");
    Ok(ResponseJson(post))
}

#[instrument(skip_all, fields(id = %id, user_id = %user.id()))]
async fn delete_post<S: AppState>(
    State(state): State<S>,
    Path(id): Path<i32>,
    user: CurrentUser,
) -> Result<StatusCode, ApiError> {
    owned_post(&state, id, &user).await?;
    state.post_repo().delete(id).await?;
    info!("Deleted post");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all, fields(id = %id))]
async fn increment_views<S: AppState>(
    State(state): State<S>,
    Path(id): Path<i32>,
) -> Result<ResponseJson<ViewsResponse>, ApiError> {
    let views = state.post_repo().increment_views(id).await?;
    debug!(views, "Incremented post views");
    Ok(ResponseJson(ViewsResponse { views }))
}

#[instrument(skip_all, fields(id = %id, user_id = %user.id()))]
async fn toggle_like<S: AppState>(
    State(state): State<S>,
    Path(id): Path<i32>,
    user: CurrentUser,
) -> Result<ResponseJson<LikeToggle>, ApiError> {
    let toggle = state.post_repo().toggle_like(id, user.id()).await?;
    info!(liked = toggle.liked, likes = toggle.likes, "Toggled post like");
    Ok(ResponseJson(toggle))
}

#[instrument(skip_all, fields(id = %id, limit = query.limit))]
async fn related_posts<S: AppState>(
    State(state): State<S>,
    Path(id): Path<i32>,
    Query(query): Query<RelatedQuery>,
) -> Result<ResponseJson<Vec<RelatedPost>>, ApiError> {
    let limit = match query.limit {
        None => RELATED_POSTS_LIMIT,
        Some(limit) => Pagination::new(None, Some(limit))?.limit(),
    };

    let post = load_post(&state, id).await?;
    let Some(category_id) = post.category_id else {
        debug!("Post has no category, no related posts");
        return Ok(ResponseJson(Vec::new()));
    };

    let related = state.post_repo().related(category_id, id, limit).await?;
    debug!(returned_count = related.len(), "Loaded related posts");
    Ok(ResponseJson(related))
}

/// Share intent URL for a supported platform, or `None` for anything else.
fn share_link(platform: &str, page_url: &str, title: &str) -> Option<String> {
    let link = match platform {
        "facebook" => Url::parse_with_params(
            "https://www.facebook.com/sharer/sharer.php",
            &[("u", page_url)],
        ),
        "twitter" => Url::parse_with_params(
            "https://twitter.com/intent/tweet",
            &[("url", page_url), ("text", title)],
        ),
        "linkedin" => Url::parse_with_params(
            "https://www.linkedin.com/sharing/share-offsite/",
            &[("url", page_url)],
        ),
        _ => return None,
    };
    link.ok().map(String::from)
}

#[instrument(skip_all, fields(id = %id, platform = %query.platform))]
async fn share_post<S: AppState>(
    State(state): State<S>,
    Path(id): Path<i32>,
    Query(query): Query<ShareQuery>,
) -> Result<ResponseJson<ShareResponse>, ApiError> {
    let post = load_post(&state, id).await?;
    let platform = query.platform.trim().to_lowercase();

    let share_url = share_link(&platform, &query.url, &post.title).ok_or_else(|| {
        ApiError::BadRequest(format!("Unsupported share platform: {}", query.platform))
    })?;

    info!("Built share link");
    Ok(ResponseJson(ShareResponse {
        platform,
        share_url,
    }))
}

pub(super) fn routes<S: AppState>() -> Router<S> {
    Router::new()
        .route("/posts", get(list_posts::<S>).post(create_post::<S>))
        .route(
            "/posts/{id}",
            get(get_post::<S>)
                .put(update_post::<S>)
                .delete(delete_post::<S>),
        )
        .route("/posts/{id}/views", post(increment_views::<S>))
        .route("/posts/{id}/like", post(toggle_like::<S>))
        .route("/posts/{id}/related", get(related_posts::<S>))
        .route("/posts/{id}/share", get(share_post::<S>))
}

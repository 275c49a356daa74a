use axum::{
    Router,
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::{PageQuery, PageResponse};
use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::models::{Category, PostSummary, Tag};
use crate::repositories::{PostRepository, TaxonomyRepository};
use crate::AppState;

#[derive(Debug, Deserialize)]
struct NameRequest {
    name: String,
}

#[instrument(skip_all)]
async fn list_tags<S: AppState>(
    State(state): State<S>,
) -> Result<ResponseJson<Vec<Tag>>, ApiError> {
    let tags = state.taxonomy_repo().tags().await?;
    debug!(returned_count = tags.len(), "Listed tags");
    Ok(ResponseJson(tags))
}

#[instrument(skip_all, fields(user_id = %user.id()))]
async fn create_tag<S: AppState>(
    State(state): State<S>,
    user: CurrentUser,
    Json(payload): Json<NameRequest>,
) -> Result<(StatusCode, ResponseJson<Tag>), ApiError> {
    let tag = state.taxonomy_repo().create_tag(&payload.name).await?;
    info!(tag_id = tag.id, slug = %tag.slug, "Created tag");
    Ok((StatusCode::CREATED, ResponseJson(tag)))
}

#[instrument(skip_all, fields(tag_id = %tag_id, page = query.page, limit = query.limit))]
async fn posts_by_tag<S: AppState>(
    State(state): State<S>,
    Path(tag_id): Path<i32>,
    Query(query): Query<PageQuery>,
) -> Result<ResponseJson<PageResponse<PostSummary>>, ApiError> {
    let pagination = query.pagination()?;
    state
        .taxonomy_repo()
        .find_tag(tag_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let result = state.post_repo().by_tag(tag_id, pagination).await?;
    debug!(
        returned_count = result.items.len(),
        total = result.total,
        "Listed posts for tag"
    );
    Ok(ResponseJson(PageResponse::new(result, pagination)))
}

#[instrument(skip_all)]
async fn list_categories<S: AppState>(
    State(state): State<S>,
) -> Result<ResponseJson<Vec<Category>>, ApiError> {
    let categories = state.taxonomy_repo().categories().await?;
    debug!(returned_count = categories.len(), "Listed categories");
    Ok(ResponseJson(categories))
}

#[instrument(skip_all, fields(user_id = %user.id()))]
async fn create_category<S: AppState>(
    State(state): State<S>,
    user: CurrentUser,
    Json(payload): Json<NameRequest>,
) -> Result<(StatusCode, ResponseJson<Category>), ApiError> {
    let category = state
        .taxonomy_repo()
        .create_category(&payload.name)
        .await?;
    info!(category_id = category.id, slug = %category.slug, "Created category");
    Ok((StatusCode::CREATED, ResponseJson(category)))
}

pub(super) fn routes<S: AppState>() -> Router<S> {
    Router::new()
        .route("/tags", get(list_tags::<S>).post(create_tag::<S>))
        .route("/tags/{id}/posts", get(posts_by_tag::<S>))
        .route(
            "/categories",
            get(list_categories::<S>).post(create_category::<S>),
        )
}

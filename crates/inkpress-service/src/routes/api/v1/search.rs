use axum::{
    Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use serde::Deserialize;
use tracing::{info, instrument};

use super::PageResponse;
use crate::errors::ApiError;
use crate::models::{Post, SearchFilters};
use crate::repositories::{PostRepository, SearchPostsParams};
use crate::validation::{Pagination, search_term};
use crate::AppState;

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: Option<String>,
    category: Option<i32>,
    tag: Option<i32>,
    author: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

#[instrument(skip_all, fields(
    has_query = query.q.is_some(),
    category = query.category,
    tag = query.tag,
    has_author = query.author.is_some(),
    page = query.page,
    limit = query.limit,
))]
async fn search_posts<S: AppState>(
    State(state): State<S>,
    Query(query): Query<SearchQuery>,
) -> Result<ResponseJson<PageResponse<Post>>, ApiError> {
    let params = SearchPostsParams {
        query: search_term(query.q.as_deref()),
        filters: SearchFilters {
            category: query.category,
            tag: query.tag,
            author: search_term(query.author.as_deref()),
        },
        pagination: Pagination::new(query.page, query.limit)?,
    };

    let result = state.post_repo().search(&params).await?;
    info!(
        returned_count = result.items.len(),
        total = result.total,
        "Searched posts"
    );

    Ok(ResponseJson(PageResponse::new(result, params.pagination)))
}

pub(super) fn routes<S: AppState>() -> Router<S> {
    Router::new().route("/search", get(search_posts::<S>))
}

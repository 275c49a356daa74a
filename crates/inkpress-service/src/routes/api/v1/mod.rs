use axum::Router;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::models::Page;
use crate::validation::{Pagination, ValidationError};

mod auth;
mod bookmarks;
mod comments;
mod dashboard;
mod newsletter;
mod posts;
mod profiles;
mod search;
mod taxonomy;

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

impl PageQuery {
    fn pagination(&self) -> Result<Pagination, ValidationError> {
        Pagination::new(self.page, self.limit)
    }
}

#[derive(Debug, Serialize)]
struct PageResponse<T> {
    items: Vec<T>,
    total: u64,
    page: u32,
    limit: u32,
}

impl<T> PageResponse<T> {
    fn new(page: Page<T>, pagination: Pagination) -> Self {
        PageResponse {
            items: page.items,
            total: page.total,
            page: pagination.page,
            limit: pagination.limit,
        }
    }
}

pub fn create_api_v1_router<S: AppState>() -> Router<S> {
    Router::new()
        .merge(auth::routes())
        .merge(posts::routes())
        .merge(comments::routes())
        .merge(bookmarks::routes())
        .merge(search::routes())
        .merge(taxonomy::routes())
        .merge(profiles::routes())
        .merge(dashboard::routes())
        .merge(newsletter::routes())
}

use crate::AppState;
use crate::auth::require_api_key;
use axum::{Router, middleware};

pub mod v1;

pub fn create_api_router<S: AppState>(state: &S) -> Router<S> {
    Router::new()
        .nest("/v1", v1::create_api_v1_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key::<S>,
        ))
}

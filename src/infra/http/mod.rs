mod error;
pub mod handlers;
mod middleware;
pub mod models;

pub use error::{ApiError, ApiErrorBody, ApiErrorMessage, codes};
pub use middleware::{KeyLabel, REQUEST_ID_HEADER, RequestContext};

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::application::cache::CacheService;

use middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub cache: Arc<CacheService>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/cache", post(handlers::write_entry))
        .route(
            "/cache/{key}",
            get(handlers::read_entry).delete(handlers::delete_entry),
        )
        .route("/health-check", get(handlers::health_check))
        .route("/health/db", get(handlers::db_health))
        .route("/ping", get(handlers::ping))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

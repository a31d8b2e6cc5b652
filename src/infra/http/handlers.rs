//! Handlers for the cache endpoints and health checks.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::error::ErrorReport;

use super::HttpState;
use super::error::ApiError;
use super::middleware::label_key;
use super::models::WriteCacheRequest;

const SOURCE: &str = "infra::http::handlers";

pub async fn write_entry(
    State(state): State<HttpState>,
    payload: Result<Json<WriteCacheRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        ApiError::bad_request("Invalid JSON body", Some(rejection.body_text()))
    })?;

    let key = state.cache.write(payload.key, payload.value).await?;
    let mut response = (StatusCode::CREATED, "Created").into_response();
    label_key(&mut response, key.into_inner());
    Ok(response)
}

/// Stored values that look like JSON numbers are returned as numbers.
pub async fn read_entry(
    State(state): State<HttpState>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let mut response = match state.cache.read(&key).await? {
        Some(entry) => Json(entry).into_response(),
        None => {
            let mut response = (StatusCode::NOT_FOUND, "Not found").into_response();
            ErrorReport::from_message(SOURCE, StatusCode::NOT_FOUND, "no active entry for key")
                .attach(&mut response);
            response
        }
    };
    label_key(&mut response, key);
    Ok(response)
}

pub async fn delete_entry(
    State(state): State<HttpState>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    state.cache.delete(&key).await?;
    let mut response = (StatusCode::OK, "Deleted").into_response();
    label_key(&mut response, key);
    Ok(response)
}

pub async fn health_check() -> &'static str {
    "All good"
}

pub async fn ping() -> &'static str {
    "pong\n"
}

pub async fn db_health(State(state): State<HttpState>) -> Response {
    match state.cache.check_connection().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

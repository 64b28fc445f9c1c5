//! API route definitions.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use procura_shared::AppError;

use crate::AppState;

pub mod budgets;
pub mod health;
pub mod procurement;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(budgets::routes())
        .merge(procurement::routes())
}

/// Builds a `{ "error", "message" }` JSON response.
pub(crate) fn error_response(status: u16, code: &str, message: impl Into<String>) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        return internal_error();
    }
    (
        status,
        Json(json!({
            "error": code.to_lowercase(),
            "message": message.into()
        })),
    )
        .into_response()
}

/// Generic 500 response; details stay in the log.
pub(crate) fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "internal_error",
            "message": "An error occurred"
        })),
    )
        .into_response()
}

/// Maps an application error to its HTTP response.
pub(crate) fn app_error_response(e: &AppError) -> Response {
    error_response(e.status_code(), e.error_code(), e.to_string())
}

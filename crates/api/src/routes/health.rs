//! Liveness plus a summary of what the service is holding.

use std::collections::BTreeMap;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use procura_core::budget::AlertLevel;
use procura_core::procurement::RequestStatus;

use crate::AppState;

/// Budgets held, grouped by alert level.
#[derive(Debug, Serialize)]
pub struct BudgetSummary {
    pub total: usize,
    pub by_alert_level: BTreeMap<AlertLevel, usize>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Requests grouped by lifecycle status.
    pub requests: BTreeMap<RequestStatus, usize>,
    pub budgets: BudgetSummary,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        requests: state.procurement.count_by_status(),
        budgets: BudgetSummary {
            total: state.budgets.len(),
            by_alert_level: state.budgets.count_by_alert_level(),
        },
    })
}

/// GET `/health`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

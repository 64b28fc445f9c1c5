//! Budget envelope routes, alerts, and the stateless budget check.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use procura_core::budget::{BudgetEnvelope, BudgetError};
use procura_db::{BudgetRepoError, CreateBudgetInput, TracingBudgetListener, UpdateBudgetInput};
use procura_shared::{AppError, types::BudgetId};

use super::{app_error_response, error_response};
use crate::AppState;

/// Creates the budget routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/budgets", get(list_budgets).post(create_budget))
        .route("/budgets/alerts", get(budget_alerts))
        .route("/budgets/utilization", get(utilization_report))
        .route("/budgets/{budget_id}", get(get_budget).put(update_budget))
        .route("/budget-check", post(check_budget))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for the utilization report.
#[derive(Debug, Default, Deserialize)]
pub struct UtilizationQuery {
    /// Department whose budgets are included.
    pub department: Option<String>,
    /// Project whose budgets are included.
    pub project: Option<String>,
}

/// Request body for an ad-hoc budget check.
///
/// Each envelope can be given inline or by the ID of a stored budget; a
/// stored budget takes precedence.
#[derive(Debug, Deserialize)]
pub struct BudgetCheckRequest {
    /// Amount to fund.
    pub request_amount: Decimal,
    /// Inline department envelope.
    #[serde(default)]
    pub department_budget: Option<BudgetEnvelope>,
    /// Inline project envelope.
    #[serde(default)]
    pub project_budget: Option<BudgetEnvelope>,
    /// Stored department budget.
    #[serde(default)]
    pub department_budget_id: Option<BudgetId>,
    /// Stored project budget.
    #[serde(default)]
    pub project_budget_id: Option<BudgetId>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/budgets` - List budgets ordered by name.
async fn list_budgets(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "budgets": state.budgets.list() }))
}

/// POST `/budgets` - Register a budget envelope.
async fn create_budget(
    State(state): State<AppState>,
    Json(payload): Json<CreateBudgetInput>,
) -> Response {
    match state.budgets.create(payload) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => map_budget_error(&e),
    }
}

/// GET `/budgets/{budget_id}` - Envelope snapshot.
async fn get_budget(State(state): State<AppState>, Path(budget_id): Path<BudgetId>) -> Response {
    match state.budgets.get(budget_id) {
        Ok(record) => Json(record).into_response(),
        Err(e) => map_budget_error(&e),
    }
}

/// PUT `/budgets/{budget_id}` - Rename or re-amount a budget.
async fn update_budget(
    State(state): State<AppState>,
    Path(budget_id): Path<BudgetId>,
    Json(payload): Json<UpdateBudgetInput>,
) -> Response {
    match state.budgets.update(budget_id, payload) {
        Ok(record) => Json(record).into_response(),
        Err(e) => map_budget_error(&e),
    }
}

/// GET `/budgets/alerts` - Budgets past their warning threshold, most utilized first.
async fn budget_alerts(State(state): State<AppState>) -> Response {
    match state.budgets.alerts() {
        Ok(alerts) => Json(json!({ "alerts": alerts })).into_response(),
        Err(e) => map_budget_error(&e),
    }
}

/// GET `/budgets/utilization` - Combined utilization of a department's and/or project's budgets.
async fn utilization_report(
    State(state): State<AppState>,
    Query(query): Query<UtilizationQuery>,
) -> Response {
    match state
        .budgets
        .utilization_report(query.department.as_deref(), query.project.as_deref())
    {
        Ok(report) => Json(report).into_response(),
        Err(e) => map_budget_error(&e),
    }
}

/// POST `/budget-check` - Evaluate an amount against the given envelopes.
async fn check_budget(
    State(state): State<AppState>,
    Json(payload): Json<BudgetCheckRequest>,
) -> Response {
    if let Err(e) = state
        .budgets
        .check_links(payload.department_budget_id, payload.project_budget_id)
    {
        return map_budget_error(&e);
    }
    let department = match resolve(
        &state,
        payload.department_budget_id,
        payload.department_budget,
    ) {
        Ok(envelope) => envelope,
        Err(response) => return response,
    };
    let project = match resolve(&state, payload.project_budget_id, payload.project_budget) {
        Ok(envelope) => envelope,
        Err(response) => return response,
    };

    match state.evaluator().check_and_notify(
        payload.request_amount,
        department.as_ref(),
        project.as_ref(),
        &TracingBudgetListener,
    ) {
        Ok(result) => {
            info!(
                amount = %payload.request_amount,
                is_available = result.is_available,
                "Ad-hoc budget check"
            );
            Json(result).into_response()
        }
        Err(e) => map_envelope_error(&e),
    }
}

fn resolve(
    state: &AppState,
    id: Option<BudgetId>,
    inline: Option<BudgetEnvelope>,
) -> Result<Option<BudgetEnvelope>, Response> {
    match id {
        Some(id) => state
            .budgets
            .envelope(id)
            .map(Some)
            .map_err(|e| map_budget_error(&e)),
        None => Ok(inline),
    }
}

// ============================================================================
// Error Mapping
// ============================================================================

/// Maps budget repository errors to HTTP responses.
pub(crate) fn map_budget_error(e: &BudgetRepoError) -> Response {
    match e {
        BudgetRepoError::NotFound(_) => app_error_response(&AppError::NotFound(e.to_string())),
        BudgetRepoError::NameRequired => error_response(400, "name_required", e.to_string()),
        BudgetRepoError::KindMismatch { .. } => {
            error_response(400, "budget_kind_mismatch", e.to_string())
        }
        BudgetRepoError::LinkedTwice(_) => {
            error_response(400, "budget_linked_twice", e.to_string())
        }
        BudgetRepoError::Budget(inner) => map_envelope_error(inner),
    }
}

fn map_envelope_error(e: &BudgetError) -> Response {
    error_response(e.status_code(), e.error_code(), e.to_string())
}

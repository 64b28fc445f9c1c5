//! Procurement request routes.
//!
//! Lifecycle endpoints for requests plus the approval actions. Actions are
//! gated through [`ApprovalPanel`] so a button the approver would not see
//! enabled never reaches the repository.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use procura_core::approval::{
    ApprovalError, ApprovalPanel, EvaluationContext, StepActions, Urgency,
};
use procura_core::procurement::{CreateRequestInput, ProcurementError, RequestStatus};
use procura_db::{ProcurementRepoError, RequestActionHandler};
use procura_shared::{
    AppError,
    types::{BudgetId, PageRequest, RequestId},
};

use super::budgets::map_budget_error;
use super::{app_error_response, error_response, internal_error};
use crate::AppState;
use crate::middleware::{Actor, Viewer};

/// Creates the procurement routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/procurement/requests",
            get(list_requests).post(create_request),
        )
        .route("/procurement/requests/{request_id}", get(get_request))
        .route(
            "/procurement/requests/{request_id}/submit",
            post(submit_request),
        )
        .route(
            "/procurement/requests/{request_id}/budget-check",
            get(check_request_budget),
        )
        .route(
            "/procurement/requests/{request_id}/approval-view",
            get(approval_view),
        )
        .route(
            "/procurement/requests/{request_id}/workflow-status",
            get(workflow_status),
        )
        .route(
            "/procurement/requests/{request_id}/approve",
            post(approve_request),
        )
        .route(
            "/procurement/requests/{request_id}/reject",
            post(reject_request),
        )
        .route(
            "/procurement/requests/{request_id}/delegate",
            post(delegate_request),
        )
        .route(
            "/procurement/requests/{request_id}/release",
            post(release_budget),
        )
}

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters for listing requests.
#[derive(Debug, Default, Deserialize)]
pub struct ListRequestsQuery {
    /// Status filter.
    pub status: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Items per page.
    pub per_page: Option<u32>,
}

/// Request body for creating a draft. The requester is the acting user.
#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    /// Short title.
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Requesting department.
    pub department: String,
    /// Project the spend is booked against.
    #[serde(default)]
    pub project: Option<String>,
    /// Declared urgency.
    #[serde(default)]
    pub urgency: Urgency,
    /// Requested amount.
    pub total_amount: Decimal,
    /// Department envelope funding the request.
    #[serde(default)]
    pub department_budget_id: Option<BudgetId>,
    /// Project envelope funding the request.
    #[serde(default)]
    pub project_budget_id: Option<BudgetId>,
}

/// Request body for approving a step.
#[derive(Debug, Deserialize)]
pub struct ApproveBody {
    /// Step being decided.
    pub step_index: usize,
    /// Optional comments.
    #[serde(default)]
    pub comments: String,
}

/// Request body for rejecting a step.
#[derive(Debug, Deserialize)]
pub struct RejectBody {
    /// Step being decided.
    pub step_index: usize,
    /// Why the request is refused.
    #[serde(default)]
    pub reason: String,
}

/// Request body for delegating a step.
#[derive(Debug, Deserialize)]
pub struct DelegateBody {
    /// Step being handed over.
    pub step_index: usize,
    /// New approver.
    pub delegate_id: String,
    /// Why the step is handed over.
    #[serde(default)]
    pub reason: String,
}

enum Decision {
    Approve(ApproveBody),
    Reject(RejectBody),
    Delegate(DelegateBody),
}

impl Decision {
    fn step_index(&self) -> usize {
        match self {
            Self::Approve(b) => b.step_index,
            Self::Reject(b) => b.step_index,
            Self::Delegate(b) => b.step_index,
        }
    }

    // Status the request would move towards; used in transition errors.
    fn target(&self) -> RequestStatus {
        match self {
            Self::Approve(_) => RequestStatus::Approved,
            Self::Reject(_) => RequestStatus::Rejected,
            Self::Delegate(_) => RequestStatus::PendingApproval,
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/procurement/requests` - Paginated list, newest first.
async fn list_requests(
    State(state): State<AppState>,
    Query(query): Query<ListRequestsQuery>,
) -> Response {
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(raw) => match RequestStatus::parse(raw) {
            Some(status) => Some(status),
            None => {
                return app_error_response(&AppError::Validation(format!(
                    "Invalid status '{raw}'. Must be one of: draft, pending_approval, approved, rejected"
                )));
            }
        },
    };

    let defaults = PageRequest::default();
    let page = PageRequest {
        page: query.page.unwrap_or(defaults.page),
        per_page: query.per_page.unwrap_or(defaults.per_page),
    };
    Json(state.procurement.list(status, page)).into_response()
}

/// POST `/procurement/requests` - Create a draft with a planned chain.
async fn create_request(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateRequestBody>,
) -> Response {
    let input = CreateRequestInput {
        title: payload.title,
        description: payload.description,
        department: payload.department,
        project: payload.project,
        urgency: payload.urgency,
        total_amount: payload.total_amount,
        requested_by: actor.0,
        department_budget_id: payload.department_budget_id,
        project_budget_id: payload.project_budget_id,
    };

    match state.procurement.create(input) {
        Ok(request) => (StatusCode::CREATED, Json(request)).into_response(),
        Err(e) => map_procurement_error(&e),
    }
}

/// GET `/procurement/requests/{request_id}`
async fn get_request(
    State(state): State<AppState>,
    Path(request_id): Path<RequestId>,
) -> Response {
    match state.procurement.get(request_id) {
        Ok(request) => Json(request).into_response(),
        Err(e) => map_procurement_error(&e),
    }
}

/// POST `/procurement/requests/{request_id}/submit` - Budget-gated submission.
async fn submit_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(request_id): Path<RequestId>,
) -> Response {
    match state.procurement.submit(request_id) {
        Ok((request, budget_check)) => {
            info!(request_id = %request_id, actor = %actor.id(), "Request submitted via API");
            Json(json!({
                "request": request,
                "budget_check": budget_check
            }))
            .into_response()
        }
        Err(e) => map_procurement_error(&e),
    }
}

/// GET `/procurement/requests/{request_id}/budget-check`
async fn check_request_budget(
    State(state): State<AppState>,
    Path(request_id): Path<RequestId>,
) -> Response {
    match state.procurement.budget_check(request_id) {
        Ok(result) => Json(result).into_response(),
        Err(e) => map_procurement_error(&e),
    }
}

/// GET `/procurement/requests/{request_id}/approval-view` - The chain as the caller sees it.
///
/// Anonymous viewers get every action disabled.
async fn approval_view(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(request_id): Path<RequestId>,
) -> Response {
    match state.procurement.approval_view(request_id, viewer.id()) {
        Ok(mut view) => {
            if !viewer.is_known() {
                for step in &mut view.steps {
                    step.actions = StepActions::default();
                }
            }
            Json(view).into_response()
        }
        Err(e) => map_procurement_error(&e),
    }
}

/// GET `/procurement/requests/{request_id}/workflow-status`
async fn workflow_status(
    State(state): State<AppState>,
    Path(request_id): Path<RequestId>,
) -> Response {
    match state.procurement.workflow_status(request_id) {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => map_procurement_error(&e),
    }
}

/// POST `/procurement/requests/{request_id}/approve`
async fn approve_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(request_id): Path<RequestId>,
    Json(body): Json<ApproveBody>,
) -> Response {
    decide(&state, request_id, actor.id(), &Decision::Approve(body))
}

/// POST `/procurement/requests/{request_id}/reject`
async fn reject_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(request_id): Path<RequestId>,
    Json(body): Json<RejectBody>,
) -> Response {
    decide(&state, request_id, actor.id(), &Decision::Reject(body))
}

/// POST `/procurement/requests/{request_id}/delegate`
async fn delegate_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(request_id): Path<RequestId>,
    Json(body): Json<DelegateBody>,
) -> Response {
    decide(&state, request_id, actor.id(), &Decision::Delegate(body))
}

/// POST `/procurement/requests/{request_id}/release` - Return committed funds.
///
/// Open to the requester and the department's finance manager.
async fn release_budget(
    State(state): State<AppState>,
    actor: Actor,
    Path(request_id): Path<RequestId>,
) -> Response {
    match state.procurement.release(request_id, actor.id()) {
        Ok(request) => {
            info!(request_id = %request_id, actor = %actor.id(), "Budget released via API");
            Json(request).into_response()
        }
        Err(e) => map_procurement_error(&e),
    }
}

/// Runs one decision through the approval panel.
///
/// Synchronous so the handler's interior state never crosses an await.
fn decide(state: &AppState, request_id: RequestId, actor: &str, decision: &Decision) -> Response {
    let request = match state.procurement.get(request_id) {
        Ok(request) => request,
        Err(e) => return map_procurement_error(&e),
    };
    if request.status != RequestStatus::PendingApproval {
        return map_core_error(&ProcurementError::InvalidTransition {
            from: request.status,
            to: decision.target(),
        });
    }

    let steps = &request.approval_chain.steps;
    let step_index = decision.step_index();
    if step_index >= steps.len() {
        return map_core_error(&ProcurementError::from(ApprovalError::StepOutOfRange {
            step_index,
            len: steps.len(),
        }));
    }

    let handler = RequestActionHandler::new(&state.procurement, request_id, actor);
    let ctx = EvaluationContext {
        actor,
        can_take_action: true,
        now: Utc::now(),
    };
    let panel = ApprovalPanel::new(steps, request.approval_chain.current_step, ctx, &handler);
    let gate = match decision {
        Decision::Approve(b) => panel.approve(step_index, &b.comments),
        Decision::Reject(b) => panel.reject(step_index, &b.reason),
        Decision::Delegate(b) => panel.delegate(step_index, &b.delegate_id, &b.reason),
    };

    match (gate, handler.into_result()) {
        (_, Some(Ok(result))) => Json(result).into_response(),
        (_, Some(Err(e))) => map_procurement_error(&e),
        (Err(e), None) => map_core_error(&ProcurementError::from(e)),
        (Ok(()), None) => {
            error!(request_id = %request_id, "Approval panel accepted an action without dispatching it");
            internal_error()
        }
    }
}

// ============================================================================
// Error Mapping
// ============================================================================

/// Maps procurement repository errors to HTTP responses.
fn map_procurement_error(e: &ProcurementRepoError) -> Response {
    match e {
        ProcurementRepoError::NotFound(_) => {
            app_error_response(&AppError::NotFound(e.to_string()))
        }
        ProcurementRepoError::ReleaseNotPermitted { .. } => {
            app_error_response(&AppError::Forbidden(e.to_string()))
        }
        ProcurementRepoError::Budget(inner) => map_budget_error(inner),
        ProcurementRepoError::Procurement(inner) => map_core_error(inner),
    }
}

fn map_core_error(e: &ProcurementError) -> Response {
    match e {
        ProcurementError::InsufficientBudget(check) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": e.error_code().to_lowercase(),
                "message": e.to_string(),
                "budget_check": check
            })),
        )
            .into_response(),
        _ => {
            if e.status_code() >= 500 {
                error!(error = %e, "Procurement operation failed");
            }
            error_response(e.status_code(), e.error_code(), e.to_string())
        }
    }
}

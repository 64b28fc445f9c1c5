//! Procurement request repository.
//!
//! Stores requests in memory and runs every lifecycle transition through
//! `ProcurementService`, persisting budget commitments on final approval.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::{info, warn};

use procura_core::approval::{
    ApprovalOutcome, ApprovalPlanner, ApproverDirectory, ApproverRole, ChainStatus, ChainView,
    WorkflowSummary,
};
use procura_core::budget::{
    AlertLevel, BudgetCheckListener, BudgetCheckResult, BudgetEnvelope, BudgetEvaluator,
};
use procura_core::procurement::{
    CreateRequestInput, LinkedEnvelopes, ProcurementError, ProcurementRequest,
    ProcurementService, RequestStatus,
};
use procura_shared::types::{BudgetId, PageRequest, PageResponse, RequestId};

use super::approver::ApproverRegistry;
use super::budget::{BudgetRepoError, BudgetRepository};

/// Error types for procurement repository operations.
#[derive(Debug, thiserror::Error)]
pub enum ProcurementRepoError {
    /// Request not found.
    #[error("Procurement request not found: {0}")]
    NotFound(RequestId),

    /// Only the requester or the finance manager may release a commitment.
    #[error("{actor} may not release the budget of request {request_id}")]
    ReleaseNotPermitted {
        /// The request.
        request_id: RequestId,
        /// Who asked.
        actor: String,
    },

    /// A linked budget is missing or invalid.
    #[error(transparent)]
    Budget(#[from] BudgetRepoError),

    /// The transition was refused.
    #[error(transparent)]
    Procurement(#[from] ProcurementError),
}

/// Request state after a decision, with what the decision did.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    /// The updated request.
    pub request: ProcurementRequest,
    /// What happened to the chain.
    pub outcome: ApprovalOutcome,
    /// Chain status after the decision.
    pub chain_status: ChainStatus,
}

/// Logs every budget check through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingBudgetListener;

impl BudgetCheckListener for TracingBudgetListener {
    fn on_budget_check(&self, result: &BudgetCheckResult) {
        if result.is_available {
            info!(
                warnings = result.warnings.len(),
                recommendations = result.recommendations.len(),
                total_available = %result.totals.total_available,
                "Budget check passed"
            );
        } else {
            warn!(
                errors = ?result.errors,
                total_available = %result.totals.total_available,
                "Budget check failed"
            );
        }
    }
}

/// Procurement requests keyed by ID.
#[derive(Clone)]
pub struct ProcurementRepository {
    requests: Arc<DashMap<RequestId, ProcurementRequest>>,
    budgets: BudgetRepository,
    approvers: ApproverRegistry,
    planner: ApprovalPlanner,
    evaluator: BudgetEvaluator,
    listener: Arc<dyn BudgetCheckListener + Send + Sync>,
}

impl ProcurementRepository {
    /// Creates a repository over the given budgets and approvers.
    #[must_use]
    pub fn new(
        budgets: BudgetRepository,
        approvers: ApproverRegistry,
        planner: ApprovalPlanner,
        evaluator: BudgetEvaluator,
    ) -> Self {
        Self {
            requests: Arc::new(DashMap::new()),
            budgets,
            approvers,
            planner,
            evaluator,
            listener: Arc::new(TracingBudgetListener),
        }
    }

    /// Replaces the budget check listener.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn BudgetCheckListener + Send + Sync>) -> Self {
        self.listener = listener;
        self
    }

    /// The budget evaluator in use.
    #[must_use]
    pub fn evaluator(&self) -> &BudgetEvaluator {
        &self.evaluator
    }

    /// Creates a draft request with a planned approval chain.
    ///
    /// # Errors
    ///
    /// Returns `Budget` for an unknown, misplaced or doubly linked budget, or
    /// `Procurement` when the input is invalid or no approver resolves.
    pub fn create(
        &self,
        input: CreateRequestInput,
    ) -> Result<ProcurementRequest, ProcurementRepoError> {
        self.budgets
            .check_links(input.department_budget_id, input.project_budget_id)?;

        let request =
            ProcurementService::create(input, &self.planner, &self.approvers, Utc::now())?;
        self.requests.insert(request.id, request.clone());

        info!(
            request_id = %request.id,
            level = %request.approval_level,
            steps = request.approval_chain.len(),
            amount = %request.total_amount,
            "Procurement request created"
        );
        Ok(request)
    }

    /// Finds a request by ID.
    #[must_use]
    pub fn find_by_id(&self, id: RequestId) -> Option<ProcurementRequest> {
        self.requests.get(&id).map(|r| r.value().clone())
    }

    /// Gets a request by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the request does not exist.
    pub fn get(&self, id: RequestId) -> Result<ProcurementRequest, ProcurementRepoError> {
        self.find_by_id(id).ok_or(ProcurementRepoError::NotFound(id))
    }

    /// Lists requests, newest first, optionally filtered by status.
    #[must_use]
    pub fn list(
        &self,
        status: Option<RequestStatus>,
        page: PageRequest,
    ) -> PageResponse<ProcurementRequest> {
        let mut items: Vec<ProcurementRequest> = self
            .requests
            .iter()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .map(|r| r.value().clone())
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.0.cmp(&a.id.0)));
        PageResponse::from_items(items, page)
    }

    /// Runs the budget check for a stored request without changing it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Budget` when the request or a linked budget is missing.
    pub fn budget_check(&self, id: RequestId) -> Result<BudgetCheckResult, ProcurementRepoError> {
        let request = self.get(id)?;
        let linked = self.linked_envelopes(&request)?;
        Ok(ProcurementService::budget_check(
            &request,
            &self.evaluator,
            &linked,
            &*self.listener,
        )?)
    }

    /// Submits a draft for approval.
    ///
    /// A failed budget check is still stored on the request.
    ///
    /// # Errors
    ///
    /// Returns `Procurement(InsufficientBudget)` when the envelopes cannot
    /// fund the request, or `Procurement(InvalidTransition)` unless it is a draft.
    pub fn submit(
        &self,
        id: RequestId,
    ) -> Result<(ProcurementRequest, BudgetCheckResult), ProcurementRepoError> {
        let mut entry = self
            .requests
            .get_mut(&id)
            .ok_or(ProcurementRepoError::NotFound(id))?;
        let linked = self.linked_envelopes(&entry)?;

        let mut updated = entry.clone();
        let result = ProcurementService::submit(
            &mut updated,
            &self.evaluator,
            &linked,
            &*self.listener,
            Utc::now(),
        );
        match result {
            Ok(check) => {
                *entry = updated.clone();
                info!(request_id = %id, "Procurement request submitted");
                Ok((updated, check))
            }
            Err(ProcurementError::InsufficientBudget(check)) => {
                *entry = updated;
                warn!(request_id = %id, "Submission blocked by budget check");
                Err(ProcurementError::InsufficientBudget(check).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Approves the current step; the final approval commits the budget.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, or `Procurement` when the decision is refused.
    pub fn approve(
        &self,
        id: RequestId,
        step_index: usize,
        actor: &str,
        comments: Option<String>,
    ) -> Result<ActionResult, ProcurementRepoError> {
        self.decide(id, |request, now| {
            ProcurementService::approve(request, step_index, actor, comments, now)
        })
    }

    /// Rejects the current step.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, or `Procurement` when the decision is refused.
    pub fn reject(
        &self,
        id: RequestId,
        step_index: usize,
        actor: &str,
        reason: String,
    ) -> Result<ActionResult, ProcurementRepoError> {
        self.decide(id, |request, now| {
            ProcurementService::reject(request, step_index, actor, reason, now)
        })
    }

    /// Delegates the current step.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, or `Procurement` when the delegation is refused.
    pub fn delegate(
        &self,
        id: RequestId,
        step_index: usize,
        actor: &str,
        delegate_id: String,
        reason: String,
    ) -> Result<ActionResult, ProcurementRepoError> {
        self.decide(id, |request, now| {
            ProcurementService::delegate(request, step_index, actor, delegate_id, reason, now)
        })
    }

    /// Returns the committed amount of an approved request to its envelopes.
    ///
    /// Only the requester or the finance manager of the request's department
    /// may release.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `ReleaseNotPermitted`, `Budget`, or
    /// `Procurement(BudgetNotCommitted)`.
    pub fn release(
        &self,
        id: RequestId,
        actor: &str,
    ) -> Result<ProcurementRequest, ProcurementRepoError> {
        let mut entry = self
            .requests
            .get_mut(&id)
            .ok_or(ProcurementRepoError::NotFound(id))?;

        let finance_manager = self.approvers.find_approver(
            ApproverRole::FinanceManager,
            &entry.department,
            entry.project.as_deref(),
        );
        if entry.requested_by != actor && finance_manager.as_deref() != Some(actor) {
            return Err(ProcurementRepoError::ReleaseNotPermitted {
                request_id: id,
                actor: actor.to_string(),
            });
        }

        let _ledger = self.budgets.lock_ledger();
        let mut updated = entry.clone();
        let linked = self.linked_envelopes(&updated)?;
        let released = ProcurementService::release_budget(&mut updated, &linked)?;
        self.store_envelopes(&updated, &released)?;
        updated.updated_at = Utc::now();
        *entry = updated.clone();

        info!(
            request_id = %id,
            actor,
            amount = %updated.total_amount,
            "Budget commitment released"
        );
        Ok(updated)
    }

    /// Number of requests in each status.
    #[must_use]
    pub fn count_by_status(&self) -> BTreeMap<RequestStatus, usize> {
        let mut counts = BTreeMap::new();
        for request in self.requests.iter() {
            *counts.entry(request.status).or_insert(0) += 1;
        }
        counts
    }

    /// The chain as `actor` sees it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, or `Procurement(Approval)` for a corrupt chain pointer.
    pub fn approval_view(
        &self,
        id: RequestId,
        actor: &str,
    ) -> Result<ChainView, ProcurementRepoError> {
        let request = self.get(id)?;
        ProcurementService::approval_view(&request, actor, Utc::now())
            .map_err(|e| ProcurementError::from(e).into())
    }

    /// Step counts and progress for a request.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the request does not exist.
    pub fn workflow_status(&self, id: RequestId) -> Result<WorkflowSummary, ProcurementRepoError> {
        Ok(ProcurementService::workflow_status(&self.get(id)?))
    }

    fn decide(
        &self,
        id: RequestId,
        apply: impl FnOnce(
            &mut ProcurementRequest,
            DateTime<Utc>,
        ) -> Result<ApprovalOutcome, ProcurementError>,
    ) -> Result<ActionResult, ProcurementRepoError> {
        let mut entry = self
            .requests
            .get_mut(&id)
            .ok_or(ProcurementRepoError::NotFound(id))?;

        let mut updated = entry.clone();
        let outcome = apply(&mut updated, Utc::now())?;
        if matches!(outcome, ApprovalOutcome::Completed { .. }) {
            self.commit(&mut updated)?;
        }
        *entry = updated.clone();

        info!(
            request_id = %id,
            outcome = ?outcome,
            status = %updated.status,
            "Approval decision recorded"
        );
        let chain_status = outcome.chain_status();
        Ok(ActionResult {
            request: updated,
            outcome,
            chain_status,
        })
    }

    fn commit(&self, request: &mut ProcurementRequest) -> Result<(), ProcurementRepoError> {
        let _ledger = self.budgets.lock_ledger();
        let linked = self.linked_envelopes(request)?;
        let committed = ProcurementService::commit_budget(request, &linked)?;
        self.store_envelopes(request, &committed)?;

        info!(request_id = %request.id, amount = %request.total_amount, "Budget committed");
        for (id, envelope) in [
            (request.department_budget_id, committed.department),
            (request.project_budget_id, committed.project),
        ] {
            if let (Some(id), Some(envelope)) = (id, envelope) {
                warn_on_alert(request.id, id, &envelope);
            }
        }
        Ok(())
    }

    fn linked_envelopes(
        &self,
        request: &ProcurementRequest,
    ) -> Result<LinkedEnvelopes, BudgetRepoError> {
        Ok(LinkedEnvelopes {
            department: request
                .department_budget_id
                .map(|id| self.budgets.envelope(id))
                .transpose()?,
            project: request
                .project_budget_id
                .map(|id| self.budgets.envelope(id))
                .transpose()?,
        })
    }

    fn store_envelopes(
        &self,
        request: &ProcurementRequest,
        linked: &LinkedEnvelopes,
    ) -> Result<(), BudgetRepoError> {
        if let (Some(id), Some(envelope)) = (request.department_budget_id, linked.department) {
            self.budgets.update_envelope(id, envelope)?;
        }
        if let (Some(id), Some(envelope)) = (request.project_budget_id, linked.project) {
            self.budgets.update_envelope(id, envelope)?;
        }
        Ok(())
    }

}

fn warn_on_alert(request_id: RequestId, budget_id: BudgetId, envelope: &BudgetEnvelope) {
    if envelope.alert_level == AlertLevel::Normal {
        return;
    }
    warn!(
        request_id = %request_id,
        budget_id = %budget_id,
        alert_level = %envelope.alert_level,
        available = %envelope.available_amount,
        "Budget past alert threshold after commitment"
    );
}

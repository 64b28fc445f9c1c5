//! Approval action handler backed by the procurement repository.

use std::cell::RefCell;

use procura_core::approval::{ApprovalActions, ApprovalError};
use procura_shared::types::RequestId;

use crate::repositories::procurement::{ActionResult, ProcurementRepoError, ProcurementRepository};

/// Applies approval callbacks for one actor on one request.
///
/// The full repository result of the last dispatched action is kept so the
/// caller can report the updated request or the precise error.
pub struct RequestActionHandler<'r> {
    repo: &'r ProcurementRepository,
    request_id: RequestId,
    actor: &'r str,
    last: RefCell<Option<Result<ActionResult, ProcurementRepoError>>>,
}

impl<'r> RequestActionHandler<'r> {
    /// Creates a handler.
    #[must_use]
    pub fn new(repo: &'r ProcurementRepository, request_id: RequestId, actor: &'r str) -> Self {
        Self {
            repo,
            request_id,
            actor,
            last: RefCell::new(None),
        }
    }

    /// Result of the dispatched action, or `None` if nothing reached the handler.
    #[must_use]
    pub fn into_result(self) -> Option<Result<ActionResult, ProcurementRepoError>> {
        self.last.into_inner()
    }

    fn record(&self, result: Result<ActionResult, ProcurementRepoError>) -> Result<(), ApprovalError> {
        let status = match &result {
            Ok(_) => Ok(()),
            Err(e) => Err(ApprovalError::Handler(e.to_string())),
        };
        self.last.replace(Some(result));
        status
    }
}

impl ApprovalActions for RequestActionHandler<'_> {
    fn on_approve(&self, step_index: usize, comments: &str) -> Result<(), ApprovalError> {
        let comments = (!comments.trim().is_empty()).then(|| comments.to_string());
        self.record(
            self.repo
                .approve(self.request_id, step_index, self.actor, comments),
        )
    }

    fn on_reject(&self, step_index: usize, comments: &str) -> Result<(), ApprovalError> {
        self.record(
            self.repo
                .reject(self.request_id, step_index, self.actor, comments.to_string()),
        )
    }

    fn on_delegate(
        &self,
        step_index: usize,
        delegate_id: &str,
        reason: &str,
    ) -> Result<(), ApprovalError> {
        self.record(self.repo.delegate(
            self.request_id,
            step_index,
            self.actor,
            delegate_id.to_string(),
            reason.to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::approver::{ApproverAssignment, ApproverRegistry};
    use crate::repositories::budget::BudgetRepository;
    use chrono::Utc;
    use procura_core::approval::{
        ApprovalPanel, ApprovalPlanner, ApproverRole, ChainStatus, EvaluationContext, Urgency,
    };
    use procura_core::budget::BudgetEvaluator;
    use procura_core::procurement::{CreateRequestInput, ProcurementError, RequestStatus};
    use rust_decimal_macros::dec;

    fn submitted_request() -> (ProcurementRepository, RequestId) {
        let approvers = ApproverRegistry::new();
        approvers.assign(ApproverAssignment {
            role: ApproverRole::DepartmentManager,
            department: Some("ops".to_string()),
            approver_id: "dm".to_string(),
        });
        let repo = ProcurementRepository::new(
            BudgetRepository::new(),
            approvers,
            ApprovalPlanner::default(),
            BudgetEvaluator::default(),
        );
        let request = repo
            .create(CreateRequestInput {
                title: "Chairs".to_string(),
                description: String::new(),
                department: "ops".to_string(),
                project: None,
                urgency: Urgency::Low,
                total_amount: dec!(900),
                requested_by: "bob".to_string(),
                department_budget_id: None,
                project_budget_id: None,
            })
            .unwrap();
        repo.submit(request.id).unwrap();
        (repo, request.id)
    }

    #[test]
    fn test_panel_dispatches_to_repository() {
        let (repo, id) = submitted_request();
        let request = repo.get(id).unwrap();
        let handler = RequestActionHandler::new(&repo, id, "dm");
        let ctx = EvaluationContext {
            actor: "dm",
            can_take_action: true,
            now: Utc::now(),
        };

        let panel = ApprovalPanel::new(
            &request.approval_chain.steps,
            request.approval_chain.current_step,
            ctx,
            &handler,
        );
        panel.approve(0, "").unwrap();

        let result = handler.into_result().unwrap().unwrap();
        assert_eq!(result.request.status, RequestStatus::Approved);
        assert!(result.request.approval_chain.steps[0].comments.is_empty());
    }

    #[test]
    fn test_view_only_panel_never_reaches_repository() {
        let (repo, id) = submitted_request();
        let request = repo.get(id).unwrap();
        let handler = RequestActionHandler::new(&repo, id, "dm");
        let ctx = EvaluationContext {
            actor: "dm",
            can_take_action: false,
            now: Utc::now(),
        };

        let panel = ApprovalPanel::new(
            &request.approval_chain.steps,
            request.approval_chain.current_step,
            ctx,
            &handler,
        );
        assert!(matches!(
            panel.approve(0, ""),
            Err(ApprovalError::ActionNotPermitted { .. })
        ));
        assert!(handler.into_result().is_none());
    }

    #[test]
    fn test_repository_refuses_non_approver_on_delegatable_step() {
        let (repo, id) = submitted_request();
        let request = repo.get(id).unwrap();
        let handler = RequestActionHandler::new(&repo, id, "intruder");
        let ctx = EvaluationContext {
            actor: "intruder",
            can_take_action: true,
            now: Utc::now(),
        };

        let panel = ApprovalPanel::new(
            &request.approval_chain.steps,
            request.approval_chain.current_step,
            ctx,
            &handler,
        );
        // Delegatable steps pass the gate for anyone.
        assert!(panel.approve(0, "").is_err());
        assert!(matches!(
            handler.into_result(),
            Some(Err(ProcurementRepoError::Procurement(ProcurementError::Approval(
                ApprovalError::NotAuthorized { .. }
            ))))
        ));
        assert_eq!(repo.get(id).unwrap().status, RequestStatus::PendingApproval);
    }

    #[test]
    fn test_rejection_without_comments() {
        let (repo, id) = submitted_request();
        let handler = RequestActionHandler::new(&repo, id, "dm");

        assert!(handler.on_reject(0, "").is_ok());
        let result = handler.into_result().unwrap().unwrap();
        assert_eq!(result.request.status, RequestStatus::Rejected);
        assert_eq!(result.chain_status, ChainStatus::Rejected);
        assert!(result.request.approval_chain.steps[0].comments.is_empty());
    }
}

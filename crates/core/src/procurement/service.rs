//! Procurement request lifecycle.
//!
//! Creates draft requests with a planned approval chain, gates submission
//! on the budget check, and maps chain decisions onto the request status.

use chrono::{DateTime, Utc};
use procura_shared::types::RequestId;
use rust_decimal::Decimal;

use crate::approval::{
    ApprovalChainEvaluator, ApprovalError, ApprovalOutcome, ApprovalPlanner, ApprovalService,
    ApproverDirectory, ChainView, EvaluationContext, PlanInput, WorkflowSummary,
};
use crate::budget::{BudgetCheckListener, BudgetCheckResult, BudgetEvaluator};
use crate::procurement::error::ProcurementError;
use crate::procurement::types::{
    CreateRequestInput, LinkedEnvelopes, ProcurementRequest, RequestStatus,
};

/// Stateless service for procurement request transitions.
pub struct ProcurementService;

impl ProcurementService {
    /// Build a draft request with its approval chain planned.
    ///
    /// # Errors
    ///
    /// Returns `TitleRequired`, `DepartmentRequired` or `InvalidAmount` for
    /// bad input, or `Approval(NoApproversFound)` when no approver resolves.
    pub fn create(
        input: CreateRequestInput,
        planner: &ApprovalPlanner,
        directory: &impl ApproverDirectory,
        now: DateTime<Utc>,
    ) -> Result<ProcurementRequest, ProcurementError> {
        if input.title.trim().is_empty() {
            return Err(ProcurementError::TitleRequired);
        }
        if input.department.trim().is_empty() {
            return Err(ProcurementError::DepartmentRequired);
        }
        if input.total_amount <= Decimal::ZERO {
            return Err(ProcurementError::InvalidAmount);
        }

        let plan = planner.plan(
            &PlanInput {
                total_amount: input.total_amount,
                department: &input.department,
                project: input.project.as_deref(),
                urgency: input.urgency,
            },
            directory,
            now,
        )?;

        Ok(ProcurementRequest {
            id: RequestId::new(),
            title: input.title,
            description: input.description,
            department: input.department,
            project: input.project,
            urgency: input.urgency,
            total_amount: input.total_amount,
            requested_by: input.requested_by,
            status: RequestStatus::Draft,
            approval_level: plan.level,
            approval_chain: plan.chain,
            estimated_approval_hours: plan.estimated_approval_hours,
            requires_budget_check: plan.requires_budget_check,
            requires_legal_review: plan.requires_legal_review,
            requires_board_approval: plan.requires_board_approval,
            department_budget_id: input.department_budget_id,
            project_budget_id: input.project_budget_id,
            budget_check: None,
            budget_committed: false,
            created_at: now,
            updated_at: now,
            submitted_at: None,
            completed_at: None,
        })
    }

    /// Check the request amount against its linked envelopes and notify `listener`.
    ///
    /// # Errors
    ///
    /// Propagates `BudgetError` from the evaluator.
    pub fn budget_check(
        request: &ProcurementRequest,
        evaluator: &BudgetEvaluator,
        envelopes: &LinkedEnvelopes,
        listener: &(impl BudgetCheckListener + ?Sized),
    ) -> Result<BudgetCheckResult, ProcurementError> {
        Ok(evaluator.check_and_notify(
            request.total_amount,
            envelopes.department.as_ref(),
            envelopes.project.as_ref(),
            listener,
        )?)
    }

    /// Submit a draft for approval.
    ///
    /// The check result is stored on the request whether or not it passes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the request is a draft and
    /// `InsufficientBudget` when the envelopes cannot fund it.
    pub fn submit(
        request: &mut ProcurementRequest,
        evaluator: &BudgetEvaluator,
        envelopes: &LinkedEnvelopes,
        listener: &(impl BudgetCheckListener + ?Sized),
        now: DateTime<Utc>,
    ) -> Result<BudgetCheckResult, ProcurementError> {
        Self::ensure_status(
            request,
            RequestStatus::Draft,
            RequestStatus::PendingApproval,
        )?;

        let result = Self::budget_check(request, evaluator, envelopes, listener)?;
        request.budget_check = Some(result.clone());
        request.updated_at = now;

        if !result.is_available {
            return Err(ProcurementError::InsufficientBudget(Box::new(result)));
        }

        request.status = RequestStatus::PendingApproval;
        request.submitted_at = Some(now);
        Ok(result)
    }

    /// Approve the current step; completing the chain approves the request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless pending approval, or the
    /// `ApprovalError` from the chain.
    pub fn approve(
        request: &mut ProcurementRequest,
        step_index: usize,
        actor: &str,
        comments: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ApprovalOutcome, ProcurementError> {
        Self::ensure_status(request, RequestStatus::PendingApproval, RequestStatus::Approved)?;

        let outcome =
            ApprovalService::approve(&mut request.approval_chain, step_index, actor, comments, now)?;
        Self::apply(request, &outcome, now);
        Ok(outcome)
    }

    /// Reject the current step, which rejects the request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless pending approval, or the
    /// `ApprovalError` from the chain.
    pub fn reject(
        request: &mut ProcurementRequest,
        step_index: usize,
        actor: &str,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<ApprovalOutcome, ProcurementError> {
        Self::ensure_status(request, RequestStatus::PendingApproval, RequestStatus::Rejected)?;

        let outcome =
            ApprovalService::reject(&mut request.approval_chain, step_index, actor, reason, now)?;
        Self::apply(request, &outcome, now);
        Ok(outcome)
    }

    /// Delegate the current step.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless pending approval, or the
    /// `ApprovalError` from the chain.
    pub fn delegate(
        request: &mut ProcurementRequest,
        step_index: usize,
        actor: &str,
        delegate_id: String,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<ApprovalOutcome, ProcurementError> {
        Self::ensure_status(
            request,
            RequestStatus::PendingApproval,
            RequestStatus::PendingApproval,
        )?;

        let outcome = ApprovalService::delegate(
            &mut request.approval_chain,
            step_index,
            actor,
            delegate_id,
            reason,
        )?;
        request.updated_at = now;
        Ok(outcome)
    }

    /// Commit the request amount against its envelopes.
    ///
    /// Returns the updated envelopes for the caller to persist.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless approved and
    /// `BudgetAlreadyCommitted` on a second commit.
    pub fn commit_budget(
        request: &mut ProcurementRequest,
        envelopes: &LinkedEnvelopes,
    ) -> Result<LinkedEnvelopes, ProcurementError> {
        if request.status != RequestStatus::Approved {
            return Err(ProcurementError::InvalidTransition {
                from: request.status,
                to: RequestStatus::Approved,
            });
        }
        if request.budget_committed {
            return Err(ProcurementError::BudgetAlreadyCommitted);
        }

        let amount = request.total_amount;
        let updated = LinkedEnvelopes {
            department: envelopes.department.map(|e| e.commit(amount)).transpose()?,
            project: envelopes.project.map(|e| e.commit(amount)).transpose()?,
        };
        request.budget_committed = true;
        Ok(updated)
    }

    /// Release a previous commitment.
    ///
    /// # Errors
    ///
    /// Returns `BudgetNotCommitted` if nothing is committed, or
    /// `Budget(ReleaseExceedsCommitment)` if an envelope holds less.
    pub fn release_budget(
        request: &mut ProcurementRequest,
        envelopes: &LinkedEnvelopes,
    ) -> Result<LinkedEnvelopes, ProcurementError> {
        if !request.budget_committed {
            return Err(ProcurementError::BudgetNotCommitted);
        }

        let amount = request.total_amount;
        let updated = LinkedEnvelopes {
            department: envelopes.department.map(|e| e.release(amount)).transpose()?,
            project: envelopes.project.map(|e| e.release(amount)).transpose()?,
        };
        request.budget_committed = false;
        Ok(updated)
    }

    /// The chain as `actor` sees it. Actions are only offered while pending approval.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalError::CurrentStepOutOfRange` for a corrupt pointer.
    pub fn approval_view(
        request: &ProcurementRequest,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<ChainView, ApprovalError> {
        let ctx = EvaluationContext {
            actor,
            can_take_action: request.status == RequestStatus::PendingApproval,
            now,
        };
        ApprovalChainEvaluator::evaluate(
            &request.approval_chain.steps,
            request.approval_chain.current_step,
            &ctx,
        )
    }

    /// Step counts and progress for the request's chain.
    #[must_use]
    pub fn workflow_status(request: &ProcurementRequest) -> WorkflowSummary {
        ApprovalChainEvaluator::summary(
            &request.approval_chain.steps,
            request.approval_chain.current_step,
        )
    }

    fn ensure_status(
        request: &ProcurementRequest,
        expected: RequestStatus,
        to: RequestStatus,
    ) -> Result<(), ProcurementError> {
        if request.status == expected {
            Ok(())
        } else {
            Err(ProcurementError::InvalidTransition {
                from: request.status,
                to,
            })
        }
    }

    fn apply(request: &mut ProcurementRequest, outcome: &ApprovalOutcome, now: DateTime<Utc>) {
        request.updated_at = now;
        match outcome {
            ApprovalOutcome::Completed { .. } => {
                request.status = RequestStatus::Approved;
                request.completed_at = Some(now);
            }
            ApprovalOutcome::Rejected { .. } => {
                request.status = RequestStatus::Rejected;
                request.completed_at = Some(now);
            }
            ApprovalOutcome::Advanced { .. } | ApprovalOutcome::Delegated { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::{ApproverRole, ChainStatus, StepBadge, Urgency};
    use crate::budget::{AlertLevel, BudgetEnvelope, RecommendationKind};
    use rust_decimal_macros::dec;

    fn directory(role: ApproverRole, _department: &str, _project: Option<&str>) -> Option<String> {
        Some(format!("{}-1", role.as_str()))
    }

    fn input(amount: Decimal) -> CreateRequestInput {
        CreateRequestInput {
            title: "Laptops".to_string(),
            description: String::new(),
            department: "engineering".to_string(),
            project: None,
            urgency: Urgency::Medium,
            total_amount: amount,
            requested_by: "requester".to_string(),
            department_budget_id: None,
            project_budget_id: None,
        }
    }

    fn draft(amount: Decimal) -> ProcurementRequest {
        ProcurementService::create(input(amount), &ApprovalPlanner::default(), &directory, Utc::now())
            .unwrap()
    }

    fn ignore(_: &BudgetCheckResult) {}

    fn envelopes(available: Decimal) -> LinkedEnvelopes {
        LinkedEnvelopes {
            department: Some(
                BudgetEnvelope::from_amounts(dec!(100000), dec!(100000) - available, dec!(0))
                    .unwrap(),
            ),
            project: None,
        }
    }

    #[test]
    fn test_create_plans_chain_by_amount() {
        let request = draft(dec!(30000));
        assert_eq!(request.status, RequestStatus::Draft);
        assert_eq!(request.approval_chain.len(), 2);
        assert_eq!(request.approval_chain.steps[0].approver_id, "department_manager-1");
        assert_eq!(request.approval_chain.steps[1].approver_id, "finance_manager-1");
        assert_eq!(request.estimated_approval_hours, 48);
        assert!(request.requires_budget_check);
        assert!(!request.requires_legal_review);
    }

    #[test]
    fn test_create_validates_input() {
        let planner = ApprovalPlanner::default();
        let mut blank = input(dec!(10));
        blank.title = "  ".to_string();
        assert!(matches!(
            ProcurementService::create(blank, &planner, &directory, Utc::now()),
            Err(ProcurementError::TitleRequired)
        ));
        assert!(matches!(
            ProcurementService::create(input(dec!(0)), &planner, &directory, Utc::now()),
            Err(ProcurementError::InvalidAmount)
        ));

        let nobody = |_: ApproverRole, _: &str, _: Option<&str>| -> Option<String> { None };
        assert!(matches!(
            ProcurementService::create(input(dec!(10)), &planner, &nobody, Utc::now()),
            Err(ProcurementError::Approval(ApprovalError::NoApproversFound(_)))
        ));
    }

    #[test]
    fn test_submit_blocked_by_insufficient_budget() {
        let mut request = draft(dec!(60000));
        let err = ProcurementService::submit(
            &mut request,
            &BudgetEvaluator::default(),
            &envelopes(dec!(50000)),
            &ignore,
            Utc::now(),
        )
        .unwrap_err();

        let ProcurementError::InsufficientBudget(result) = err else {
            panic!("expected insufficient budget");
        };
        assert!(result.has_recommendation(RecommendationKind::HighValueRequest));
        assert_eq!(request.status, RequestStatus::Draft);
        assert!(request.budget_check.is_some());
    }

    #[test]
    fn test_full_approval_flow_commits_budget() {
        let now = Utc::now();
        let mut request = draft(dec!(30000));
        let linked = envelopes(dec!(80000));

        ProcurementService::submit(&mut request, &BudgetEvaluator::default(), &linked, &ignore, now)
            .unwrap();
        assert_eq!(request.status, RequestStatus::PendingApproval);

        let first =
            ProcurementService::approve(&mut request, 0, "department_manager-1", None, now)
                .unwrap();
        assert_eq!(first.chain_status(), ChainStatus::InProgress);
        assert_eq!(request.status, RequestStatus::PendingApproval);

        let last = ProcurementService::approve(
            &mut request,
            1,
            "finance_manager-1",
            Some("ok".to_string()),
            now,
        )
        .unwrap();
        assert_eq!(last, ApprovalOutcome::Completed { step_index: 1 });
        assert_eq!(request.status, RequestStatus::Approved);
        assert_eq!(request.completed_at, Some(now));

        let committed = ProcurementService::commit_budget(&mut request, &linked).unwrap();
        let dept = committed.department.unwrap();
        assert_eq!(dept.available_amount, dec!(50000));
        assert_eq!(dept.committed_amount, dec!(50000));
        assert!(matches!(
            ProcurementService::commit_budget(&mut request, &committed),
            Err(ProcurementError::BudgetAlreadyCommitted)
        ));

        let released = ProcurementService::release_budget(&mut request, &committed).unwrap();
        assert_eq!(released, linked);
        assert!(!request.budget_committed);
    }

    #[test]
    fn test_rejection_ends_request() {
        let now = Utc::now();
        let mut request = draft(dec!(5000));
        ProcurementService::submit(
            &mut request,
            &BudgetEvaluator::default(),
            &LinkedEnvelopes::default(),
            &ignore,
            now,
        )
        .unwrap();

        ProcurementService::reject(
            &mut request,
            0,
            "department_manager-1",
            "not needed".to_string(),
            now,
        )
        .unwrap();
        assert_eq!(request.status, RequestStatus::Rejected);

        assert!(matches!(
            ProcurementService::approve(&mut request, 0, "department_manager-1", None, now),
            Err(ProcurementError::InvalidTransition {
                from: RequestStatus::Rejected,
                ..
            })
        ));
    }

    #[test]
    fn test_actions_require_submission() {
        let mut request = draft(dec!(5000));
        assert!(matches!(
            ProcurementService::approve(&mut request, 0, "department_manager-1", None, Utc::now()),
            Err(ProcurementError::InvalidTransition {
                from: RequestStatus::Draft,
                to: RequestStatus::Approved,
            })
        ));
        assert!(matches!(
            ProcurementService::commit_budget(&mut request, &LinkedEnvelopes::default()),
            Err(ProcurementError::InvalidTransition { .. })
        ));
        assert!(matches!(
            ProcurementService::release_budget(&mut request, &LinkedEnvelopes::default()),
            Err(ProcurementError::BudgetNotCommitted)
        ));
    }

    #[test]
    fn test_delegated_step_decided_by_delegate() {
        let now = Utc::now();
        let mut request = draft(dec!(5000));
        ProcurementService::submit(
            &mut request,
            &BudgetEvaluator::default(),
            &LinkedEnvelopes::default(),
            &ignore,
            now,
        )
        .unwrap();

        ProcurementService::delegate(
            &mut request,
            0,
            "department_manager-1",
            "deputy".to_string(),
            "on leave".to_string(),
            now,
        )
        .unwrap();
        ProcurementService::approve(&mut request, 0, "deputy", None, now).unwrap();
        assert_eq!(request.status, RequestStatus::Approved);
    }

    #[test]
    fn test_view_offers_actions_only_while_pending() {
        let now = Utc::now();
        let mut request = draft(dec!(30000));

        let view = ProcurementService::approval_view(&request, "department_manager-1", now).unwrap();
        assert!(!view.steps[0].actions.any());
        assert_eq!(view.steps[0].badge, StepBadge::Pending);

        ProcurementService::submit(
            &mut request,
            &BudgetEvaluator::default(),
            &LinkedEnvelopes::default(),
            &ignore,
            now,
        )
        .unwrap();
        let view = ProcurementService::approval_view(&request, "department_manager-1", now).unwrap();
        assert!(view.steps[0].actions.approve);
        assert_eq!(view.steps[1].badge, StepBadge::Waiting);

        let status = ProcurementService::workflow_status(&request);
        assert_eq!(status.total_steps, 2);
        assert_eq!(status.progress_percentage, 0);
    }

    #[test]
    fn test_critical_envelope_still_submits() {
        let mut request = draft(dec!(1000));
        let linked = LinkedEnvelopes {
            department: Some(BudgetEnvelope {
                total_budget: dec!(100000),
                committed_amount: dec!(96000),
                spent_amount: dec!(0),
                available_amount: dec!(4000),
                alert_level: AlertLevel::Critical,
            }),
            project: None,
        };
        let result = ProcurementService::submit(
            &mut request,
            &BudgetEvaluator::default(),
            &linked,
            &ignore,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(request.status, RequestStatus::PendingApproval);
    }
}

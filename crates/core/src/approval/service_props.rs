//! Property-based tests for ApprovalService.

use chrono::{Duration, Utc};
use proptest::prelude::*;

use crate::approval::error::ApprovalError;
use crate::approval::evaluator::ApprovalChainEvaluator;
use crate::approval::service::{ApprovalOutcome, ApprovalService};
use crate::approval::types::{
    ApprovalChain, ApprovalStep, ChainStatus, StepPriority, StepStatus,
};

fn chain_of(len: usize) -> ApprovalChain {
    let steps = (0..len)
        .map(|i| ApprovalStep {
            step_index: i,
            approver_id: format!("approver-{i}"),
            role: "finance_manager".to_string(),
            role_name: "Finance Manager".to_string(),
            status: StepStatus::Pending,
            is_required: true,
            can_delegate: false,
            max_delegation_level: 0,
            due_date: Utc::now() + Duration::hours(24),
            priority: StepPriority::Medium,
            delegated_to: None,
            delegation_reason: None,
            comments: String::new(),
            decided_at: None,
        })
        .collect();
    ApprovalChain::new(steps)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Approving every step in order by its approver completes the chain.
    #[test]
    fn prop_sequential_approval_completes(len in 1usize..6) {
        let mut chain = chain_of(len);

        for i in 0..len {
            let outcome = ApprovalService::approve(
                &mut chain, i, &format!("approver-{i}"), None, Utc::now(),
            ).unwrap();
            if i + 1 == len {
                prop_assert_eq!(outcome, ApprovalOutcome::Completed { step_index: i });
            } else {
                prop_assert_eq!(outcome.chain_status(), ChainStatus::InProgress);
            }
        }

        prop_assert_eq!(chain.current_step, len);
        prop_assert_eq!(
            ApprovalChainEvaluator::chain_status(&chain.steps, chain.current_step),
            ChainStatus::Approved
        );
    }

    /// A rejection anywhere is terminal: no further decision is accepted.
    #[test]
    fn prop_rejection_is_terminal(len in 1usize..6, reject_at in 0usize..6) {
        let reject_at = reject_at % len;
        let mut chain = chain_of(len);

        for i in 0..reject_at {
            ApprovalService::approve(&mut chain, i, &format!("approver-{i}"), None, Utc::now())
                .unwrap();
        }
        ApprovalService::reject(
            &mut chain, reject_at, &format!("approver-{reject_at}"), "no".to_string(), Utc::now(),
        ).unwrap();

        prop_assert_eq!(
            ApprovalChainEvaluator::chain_status(&chain.steps, chain.current_step),
            ChainStatus::Rejected
        );
        let current_step = chain.current_step;
        let next = ApprovalService::approve(
            &mut chain, current_step, &format!("approver-{reject_at}"), None, Utc::now(),
        );
        prop_assert!(matches!(next, Err(ApprovalError::ChainRejected)));
    }

    /// Nobody but the step's approver can decide it.
    #[test]
    fn prop_only_approver_decides(len in 1usize..6, actor in 0usize..6) {
        let mut chain = chain_of(len);
        let result = ApprovalService::approve(
            &mut chain, 0, &format!("approver-{actor}"), None, Utc::now(),
        );
        if actor == 0 {
            prop_assert!(result.is_ok());
        } else {
            let is_not_authorized = matches!(result, Err(ApprovalError::NotAuthorized { .. }));
            prop_assert!(is_not_authorized);
            prop_assert_eq!(chain.current_step, 0);
        }
    }
}

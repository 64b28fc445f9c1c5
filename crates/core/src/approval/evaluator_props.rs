//! Property-based tests for ApprovalChainEvaluator.

use chrono::{Duration, Utc};
use proptest::prelude::*;

use crate::approval::evaluator::{ApprovalChainEvaluator, EvaluationContext};
use crate::approval::types::{ApprovalStep, StepBadge, StepPriority, StepStatus};

fn arb_status() -> impl Strategy<Value = StepStatus> {
    prop_oneof![
        Just(StepStatus::Pending),
        Just(StepStatus::Approved),
        Just(StepStatus::Rejected),
    ]
}

fn arb_step() -> impl Strategy<Value = ApprovalStep> {
    (arb_status(), any::<bool>(), 0usize..3, -72i64..72).prop_map(
        |(status, can_delegate, approver, due_in_hours)| ApprovalStep {
            step_index: 0,
            approver_id: format!("approver-{approver}"),
            role: "department_manager".to_string(),
            role_name: "Department Manager".to_string(),
            status,
            is_required: true,
            can_delegate,
            max_delegation_level: u8::from(can_delegate),
            due_date: Utc::now() + Duration::hours(due_in_hours),
            priority: StepPriority::Low,
            delegated_to: None,
            delegation_reason: None,
            comments: String::new(),
            decided_at: None,
        },
    )
}

fn arb_chain() -> impl Strategy<Value = (Vec<ApprovalStep>, usize)> {
    prop::collection::vec(arb_step(), 0..6).prop_flat_map(|steps| {
        let len = steps.len();
        (Just(steps), 0..=len)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// An explicitly approved step always shows Approved, wherever the pointer is.
    #[test]
    fn prop_approved_status_always_approved_badge(
        step in arb_step(),
        index in 0usize..10,
        current in 0usize..10,
    ) {
        let mut step = step;
        step.status = StepStatus::Approved;
        prop_assert_eq!(ApprovalChainEvaluator::badge(&step, index, current), StepBadge::Approved);
    }

    /// Pending steps are badged by position alone.
    #[test]
    fn prop_pending_badge_follows_position(
        step in arb_step(),
        index in 0usize..10,
        current in 0usize..10,
    ) {
        let mut step = step;
        step.status = StepStatus::Pending;
        let expected = match index.cmp(&current) {
            std::cmp::Ordering::Less => StepBadge::Approved,
            std::cmp::Ordering::Equal => StepBadge::Pending,
            std::cmp::Ordering::Greater => StepBadge::Waiting,
        };
        prop_assert_eq!(ApprovalChainEvaluator::badge(&step, index, current), expected);
    }

    /// Actions on the current pending step are enabled iff the caller may act
    /// and the actor is the approver or the step is delegatable.
    #[test]
    fn prop_action_gating_on_current_step(
        step in arb_step(),
        actor in 0usize..3,
        can_take_action in any::<bool>(),
    ) {
        let mut step = step;
        step.status = StepStatus::Pending;
        let actor = format!("approver-{actor}");

        let enabled = ApprovalChainEvaluator::actions_enabled(&step, 2, 2, &actor, can_take_action);
        let expected = can_take_action && (step.approver_id == actor || step.can_delegate);
        prop_assert_eq!(enabled, expected);
    }

    /// Only the current step can ever have an enabled action.
    #[test]
    fn prop_at_most_current_step_actionable((steps, current) in arb_chain()) {
        let ctx = EvaluationContext { actor: "approver-0", can_take_action: true, now: Utc::now() };
        let view = ApprovalChainEvaluator::evaluate(&steps, current, &ctx).unwrap();

        for step in &view.steps {
            if step.actions.any() {
                prop_assert_eq!(step.step_index, current);
            }
        }
        prop_assert_eq!(view.steps.len(), steps.len());
        prop_assert!(view.summary.progress_percentage <= 100);
    }

    /// The overdue flag is exactly `due_date < now`.
    #[test]
    fn prop_overdue_matches_due_date((steps, current) in arb_chain()) {
        let now = Utc::now();
        let ctx = EvaluationContext { actor: "approver-1", can_take_action: false, now };
        let view = ApprovalChainEvaluator::evaluate(&steps, current, &ctx).unwrap();

        for (step, derived) in steps.iter().zip(&view.steps) {
            prop_assert_eq!(derived.is_overdue, step.due_date < now);
        }
    }
}

//! Approval chain evaluator.
//!
//! Derives the read-only view of an approval chain: a badge and an overdue
//! flag for every step, which actions the acting user may take, and the
//! chain-level status. Nothing here mutates the chain.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::approval::error::ApprovalError;
use crate::approval::types::{ApprovalStep, ChainStatus, StepBadge, StepStatus};

/// Who is looking at the chain, and when.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// Identity of the acting user, compared against `approver_id`.
    pub actor: &'a str,
    /// Whether the caller allows the actor to act at all.
    pub can_take_action: bool,
    /// Reference time for overdue checks.
    pub now: DateTime<Utc>,
}

/// Enabled/disabled state of the step action buttons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StepActions {
    /// Approve button.
    pub approve: bool,
    /// Reject button.
    pub reject: bool,
    /// Delegate button.
    pub delegate: bool,
}

impl StepActions {
    /// Returns true if any action is enabled.
    #[must_use]
    pub fn any(&self) -> bool {
        self.approve || self.reject || self.delegate
    }
}

/// Derived view of one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    /// Position of the step in the chain.
    pub step_index: usize,
    /// Who decides this step.
    pub approver_id: String,
    /// Role the approver acts in.
    pub role: String,
    /// Badge to display.
    pub badge: StepBadge,
    /// Whether this is the step awaiting a decision.
    pub is_current: bool,
    /// Approved only because the pointer moved past it while its status is still pending.
    pub implied_approval: bool,
    /// Whether the due date has passed.
    pub is_overdue: bool,
    /// Which actions the actor may take.
    pub actions: StepActions,
}

/// Aggregate counters over a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowSummary {
    /// Number of steps.
    pub total_steps: usize,
    /// Steps with status approved.
    pub completed_steps: usize,
    /// Steps with status pending.
    pub pending_steps: usize,
    /// Steps with status rejected.
    pub rejected_steps: usize,
    /// Whether the pointer has moved past the last step.
    pub is_complete: bool,
    /// Whether some step was rejected.
    pub is_rejected: bool,
    /// `current_step / total_steps` as a rounded percentage.
    pub progress_percentage: u8,
}

/// Full derived view of a chain.
#[derive(Debug, Clone, Serialize)]
pub struct ChainView {
    /// Per-step views in chain order.
    pub steps: Vec<StepView>,
    /// The current-step pointer the view was computed for.
    pub current_step: usize,
    /// Chain-level status.
    pub status: ChainStatus,
    /// Aggregate counters.
    pub summary: WorkflowSummary,
}

impl ChainView {
    /// The view of the step awaiting a decision, if any.
    #[must_use]
    pub fn current(&self) -> Option<&StepView> {
        self.steps.get(self.current_step)
    }
}

/// Stateless evaluator for approval chains.
pub struct ApprovalChainEvaluator;

impl ApprovalChainEvaluator {
    /// Derive the badge for the step at `index`.
    ///
    /// First match wins: an explicit approved/rejected status, then the
    /// current position, then positional approval, otherwise waiting.
    #[must_use]
    pub fn badge(step: &ApprovalStep, index: usize, current_step: usize) -> StepBadge {
        match step.status {
            StepStatus::Approved => StepBadge::Approved,
            StepStatus::Rejected => StepBadge::Rejected,
            StepStatus::Pending if index == current_step => StepBadge::Pending,
            StepStatus::Pending if index < current_step => StepBadge::Approved,
            StepStatus::Pending => StepBadge::Waiting,
        }
    }

    /// Whether the approve/reject actions are enabled for the step at `index`.
    #[must_use]
    pub fn actions_enabled(
        step: &ApprovalStep,
        index: usize,
        current_step: usize,
        actor: &str,
        can_take_action: bool,
    ) -> bool {
        can_take_action
            && index == current_step
            && step.status == StepStatus::Pending
            && (step.approver_id == actor || step.can_delegate)
    }

    /// Action buttons for the step at `index`.
    ///
    /// Delegation additionally requires the step to allow it.
    #[must_use]
    pub fn step_actions(
        step: &ApprovalStep,
        index: usize,
        current_step: usize,
        actor: &str,
        can_take_action: bool,
    ) -> StepActions {
        let enabled = Self::actions_enabled(step, index, current_step, actor, can_take_action);
        StepActions {
            approve: enabled,
            reject: enabled,
            delegate: enabled && step.can_delegate,
        }
    }

    /// Whether the step's due date lies before `now`.
    #[must_use]
    pub fn is_overdue(step: &ApprovalStep, now: DateTime<Utc>) -> bool {
        step.due_date < now
    }

    /// Chain-level status.
    ///
    /// Rejected wins over everything; otherwise the chain is approved once
    /// the pointer is past the last step or every step is approved.
    #[must_use]
    pub fn chain_status(steps: &[ApprovalStep], current_step: usize) -> ChainStatus {
        if steps.iter().any(|s| s.status == StepStatus::Rejected) {
            ChainStatus::Rejected
        } else if current_step >= steps.len()
            || steps.iter().all(|s| s.status == StepStatus::Approved)
        {
            ChainStatus::Approved
        } else {
            ChainStatus::InProgress
        }
    }

    /// Aggregate counters over the chain.
    #[must_use]
    pub fn summary(steps: &[ApprovalStep], current_step: usize) -> WorkflowSummary {
        let count = |status: StepStatus| steps.iter().filter(|s| s.status == status).count();
        let total = steps.len();
        let rejected = count(StepStatus::Rejected);

        WorkflowSummary {
            total_steps: total,
            completed_steps: count(StepStatus::Approved),
            pending_steps: count(StepStatus::Pending),
            rejected_steps: rejected,
            is_complete: current_step >= total,
            is_rejected: rejected > 0,
            progress_percentage: progress_percentage(current_step, total),
        }
    }

    /// Evaluate the whole chain for the given actor.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalError::CurrentStepOutOfRange` if `current_step`
    /// exceeds the chain length. A pointer equal to the length denotes a
    /// fully approved chain and is accepted.
    pub fn evaluate(
        steps: &[ApprovalStep],
        current_step: usize,
        ctx: &EvaluationContext<'_>,
    ) -> Result<ChainView, ApprovalError> {
        if current_step > steps.len() {
            return Err(ApprovalError::CurrentStepOutOfRange {
                current_step,
                len: steps.len(),
            });
        }

        let views = steps
            .iter()
            .enumerate()
            .map(|(index, step)| StepView {
                step_index: index,
                approver_id: step.approver_id.clone(),
                role: step.role.clone(),
                badge: Self::badge(step, index, current_step),
                is_current: index == current_step,
                implied_approval: step.status == StepStatus::Pending && index < current_step,
                is_overdue: Self::is_overdue(step, ctx.now),
                actions: Self::step_actions(
                    step,
                    index,
                    current_step,
                    ctx.actor,
                    ctx.can_take_action,
                ),
            })
            .collect();

        Ok(ChainView {
            steps: views,
            current_step,
            status: Self::chain_status(steps, current_step),
            summary: Self::summary(steps, current_step),
        })
    }
}

/// Rounded-half-up percentage of `current` over `total`, capped at 100.
fn progress_percentage(current: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let current = current.min(total);
    let pct = (current * 200 + total) / (total * 2);
    u8::try_from(pct).unwrap_or(100)
}

//! Approval action dispatch.
//!
//! The evaluator decides which buttons are enabled; the actual state change
//! is performed by whoever implements [`ApprovalActions`]. [`ApprovalPanel`]
//! joins the two so a disabled action never reaches the handler.

use crate::approval::error::{ActionKind, ApprovalError};
use crate::approval::evaluator::{ApprovalChainEvaluator, EvaluationContext, StepActions};
use crate::approval::types::ApprovalStep;

/// Handler for approval decisions, usually a backend command handler.
#[cfg_attr(test, mockall::automock)]
pub trait ApprovalActions {
    /// Approve step `step_index`.
    fn on_approve(&self, step_index: usize, comments: &str) -> Result<(), ApprovalError>;

    /// Reject step `step_index`.
    fn on_reject(&self, step_index: usize, comments: &str) -> Result<(), ApprovalError>;

    /// Delegate step `step_index` to `delegate_id`.
    fn on_delegate(
        &self,
        step_index: usize,
        delegate_id: &str,
        reason: &str,
    ) -> Result<(), ApprovalError>;
}

/// A chain as seen by one actor, wired to an action handler.
pub struct ApprovalPanel<'a, A: ApprovalActions> {
    steps: &'a [ApprovalStep],
    current_step: usize,
    ctx: EvaluationContext<'a>,
    actions: &'a A,
}

impl<'a, A: ApprovalActions> ApprovalPanel<'a, A> {
    /// Creates a panel.
    pub fn new(
        steps: &'a [ApprovalStep],
        current_step: usize,
        ctx: EvaluationContext<'a>,
        actions: &'a A,
    ) -> Self {
        Self {
            steps,
            current_step,
            ctx,
            actions,
        }
    }

    /// Enabled actions for the step at `step_index`; all disabled if it does not exist.
    #[must_use]
    pub fn actions_for(&self, step_index: usize) -> StepActions {
        self.steps
            .get(step_index)
            .map(|step| {
                ApprovalChainEvaluator::step_actions(
                    step,
                    step_index,
                    self.current_step,
                    self.ctx.actor,
                    self.ctx.can_take_action,
                )
            })
            .unwrap_or_default()
    }

    /// Approve through the handler if the approve action is enabled.
    pub fn approve(&self, step_index: usize, comments: &str) -> Result<(), ApprovalError> {
        self.ensure(ActionKind::Approve, step_index)?;
        self.actions.on_approve(step_index, comments)
    }

    /// Reject through the handler if the reject action is enabled.
    pub fn reject(&self, step_index: usize, comments: &str) -> Result<(), ApprovalError> {
        self.ensure(ActionKind::Reject, step_index)?;
        self.actions.on_reject(step_index, comments)
    }

    /// Delegate through the handler if the delegate action is enabled.
    pub fn delegate(
        &self,
        step_index: usize,
        delegate_id: &str,
        reason: &str,
    ) -> Result<(), ApprovalError> {
        self.ensure(ActionKind::Delegate, step_index)?;
        self.actions.on_delegate(step_index, delegate_id, reason)
    }

    fn ensure(&self, action: ActionKind, step_index: usize) -> Result<(), ApprovalError> {
        let enabled = self.actions_for(step_index);
        let allowed = match action {
            ActionKind::Approve => enabled.approve,
            ActionKind::Reject => enabled.reject,
            ActionKind::Delegate => enabled.delegate,
        };
        if allowed {
            Ok(())
        } else {
            Err(ApprovalError::ActionNotPermitted { action, step_index })
        }
    }
}

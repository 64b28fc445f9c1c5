//! Approval transitions.
//!
//! Applies approve, reject and delegate decisions to an approval chain.
//! Only the current step can change, and only from pending.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::approval::error::ApprovalError;
use crate::approval::types::{ApprovalChain, ApprovalStep, ChainStatus, StepStatus};

/// Result of applying a decision to a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApprovalOutcome {
    /// The step was approved and the pointer moved to the next step.
    Advanced {
        /// The approved step.
        step_index: usize,
        /// The step now awaiting a decision.
        next_step: usize,
    },
    /// The last step was approved; the chain is complete.
    Completed {
        /// The approved step.
        step_index: usize,
    },
    /// The step was rejected; the chain is terminal.
    Rejected {
        /// The rejected step.
        step_index: usize,
    },
    /// The step was handed to another approver and stays current.
    Delegated {
        /// The delegated step.
        step_index: usize,
        /// The new decider.
        delegate_id: String,
    },
}

impl ApprovalOutcome {
    /// Chain-level status after the decision.
    #[must_use]
    pub fn chain_status(&self) -> ChainStatus {
        match self {
            Self::Advanced { .. } | Self::Delegated { .. } => ChainStatus::InProgress,
            Self::Completed { .. } => ChainStatus::Approved,
            Self::Rejected { .. } => ChainStatus::Rejected,
        }
    }
}

/// Stateless service for approval chain transitions.
pub struct ApprovalService;

impl ApprovalService {
    /// Approve the current step.
    ///
    /// # Errors
    ///
    /// See [`ApprovalService::current_step_for`] for the preconditions.
    pub fn approve(
        chain: &mut ApprovalChain,
        step_index: usize,
        actor: &str,
        comments: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ApprovalOutcome, ApprovalError> {
        let step = Self::current_step_for(chain, step_index, actor)?;
        step.status = StepStatus::Approved;
        step.decided_at = Some(now);
        step.comments = comments.unwrap_or_default();

        chain.current_step = step_index + 1;
        if chain.current_step >= chain.steps.len() {
            Ok(ApprovalOutcome::Completed { step_index })
        } else {
            Ok(ApprovalOutcome::Advanced {
                step_index,
                next_step: chain.current_step,
            })
        }
    }

    /// Reject the current step, ending the chain. The comments may be empty.
    ///
    /// # Errors
    ///
    /// See [`ApprovalService::current_step_for`].
    pub fn reject(
        chain: &mut ApprovalChain,
        step_index: usize,
        actor: &str,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<ApprovalOutcome, ApprovalError> {
        let step = Self::current_step_for(chain, step_index, actor)?;
        step.status = StepStatus::Rejected;
        step.decided_at = Some(now);
        step.comments = reason;

        Ok(ApprovalOutcome::Rejected { step_index })
    }

    /// Hand the current step to another approver.
    ///
    /// Only the original approver may delegate, once per step, and only if
    /// the step allows delegation.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalError::DelegationReasonRequired`,
    /// `ApprovalError::DelegateRequired` or `ApprovalError::DelegationNotAllowed`,
    /// otherwise see [`ApprovalService::current_step_for`].
    pub fn delegate(
        chain: &mut ApprovalChain,
        step_index: usize,
        actor: &str,
        delegate_id: String,
        reason: String,
    ) -> Result<ApprovalOutcome, ApprovalError> {
        if reason.trim().is_empty() {
            return Err(ApprovalError::DelegationReasonRequired);
        }

        let step = Self::current_step_for(chain, step_index, actor)?;
        if delegate_id.trim().is_empty() || delegate_id == step.approver_id {
            return Err(ApprovalError::DelegateRequired);
        }
        if !step.can_delegate || step.max_delegation_level == 0 || step.delegated_to.is_some() {
            return Err(ApprovalError::DelegationNotAllowed { step_index });
        }
        if step.approver_id != actor {
            return Err(ApprovalError::NotAuthorized {
                actor: actor.to_string(),
                step_index,
            });
        }

        step.delegated_to = Some(delegate_id.clone());
        step.delegation_reason = Some(reason);

        Ok(ApprovalOutcome::Delegated {
            step_index,
            delegate_id,
        })
    }

    /// Resolve the step a decision addresses, checking every precondition.
    ///
    /// # Errors
    ///
    /// - `ChainRejected` if any step is already rejected
    /// - `NoPendingApprovals` if the pointer is past the last step
    /// - `StepOutOfRange` if `step_index` does not exist
    /// - `StepNotCurrent` if `step_index` is not the current step
    /// - `StepNotPending` if the step already carries a decision
    /// - `NotAuthorized` if `actor` is neither approver nor delegate
    pub fn current_step_for<'c>(
        chain: &'c mut ApprovalChain,
        step_index: usize,
        actor: &str,
    ) -> Result<&'c mut ApprovalStep, ApprovalError> {
        if chain.steps.iter().any(|s| s.status == StepStatus::Rejected) {
            return Err(ApprovalError::ChainRejected);
        }
        let len = chain.steps.len();
        if chain.current_step >= len {
            return Err(ApprovalError::NoPendingApprovals);
        }
        if step_index >= len {
            return Err(ApprovalError::StepOutOfRange { step_index, len });
        }
        if step_index != chain.current_step {
            return Err(ApprovalError::StepNotCurrent {
                step_index,
                current_step: chain.current_step,
            });
        }

        let step = &mut chain.steps[step_index];
        if step.status != StepStatus::Pending {
            return Err(ApprovalError::StepNotPending {
                step_index,
                status: step.status,
            });
        }
        if !step.is_decided_by(actor) {
            return Err(ApprovalError::NotAuthorized {
                actor: actor.to_string(),
                step_index,
            });
        }

        Ok(step)
    }
}

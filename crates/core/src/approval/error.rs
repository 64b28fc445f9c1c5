//! Approval error types.
//!
//! Errors raised while evaluating an approval chain or applying an
//! approve/reject/delegate action to it.

use thiserror::Error;

use crate::approval::types::StepStatus;

/// Action a user can take on an approval step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Sign off the step.
    Approve,
    /// Refuse the step.
    Reject,
    /// Hand the step to another approver.
    Delegate,
}

impl ActionKind {
    /// Returns the string representation of the action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Delegate => "delegate",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during approval operations.
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// The current-step pointer lies beyond the end of the chain.
    #[error("Current step {current_step} is out of range for a chain of {len} steps")]
    CurrentStepOutOfRange {
        /// The offending pointer.
        current_step: usize,
        /// Number of steps in the chain.
        len: usize,
    },

    /// The addressed step does not exist.
    #[error("Step {step_index} does not exist in a chain of {len} steps")]
    StepOutOfRange {
        /// The addressed step.
        step_index: usize,
        /// Number of steps in the chain.
        len: usize,
    },

    /// Every step has already been approved.
    #[error("No pending approvals")]
    NoPendingApprovals,

    /// A step of the chain was rejected.
    #[error("Approval chain has been rejected")]
    ChainRejected,

    /// The addressed step is not the one awaiting a decision.
    #[error("Step {step_index} is not the current step ({current_step})")]
    StepNotCurrent {
        /// The addressed step.
        step_index: usize,
        /// The step awaiting a decision.
        current_step: usize,
    },

    /// The addressed step already carries a decision.
    #[error("Step {step_index} is already {status}")]
    StepNotPending {
        /// The addressed step.
        step_index: usize,
        /// Its recorded status.
        status: StepStatus,
    },

    /// The actor is neither the approver nor the delegate of the step.
    #[error("User {actor} is not authorized to decide step {step_index}")]
    NotAuthorized {
        /// The acting user.
        actor: String,
        /// The addressed step.
        step_index: usize,
    },

    /// The step cannot be delegated (role forbids it or hops are exhausted).
    #[error("Step {step_index} cannot be delegated")]
    DelegationNotAllowed {
        /// The addressed step.
        step_index: usize,
    },

    /// Delegation needs a delegate other than the current approver.
    #[error("A delegate other than the current approver is required")]
    DelegateRequired,

    /// Delegation needs a reason.
    #[error("Delegation reason is required")]
    DelegationReasonRequired,

    /// The action is disabled for this actor in the current view.
    #[error("Action {action} is not available on step {step_index}")]
    ActionNotPermitted {
        /// The attempted action.
        action: ActionKind,
        /// The addressed step.
        step_index: usize,
    },

    /// No approver could be resolved for any role of the approval level.
    #[error("No approvers found for approval level {0}")]
    NoApproversFound(String),

    /// Configured approval thresholds do not ascend.
    #[error("Approval thresholds for {0} must ascend from low to high")]
    InvalidThresholds(String),

    /// The injected action handler failed.
    #[error("Action handler failed: {0}")]
    Handler(String),
}

impl ApprovalError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::CurrentStepOutOfRange { .. }
            | Self::DelegateRequired
            | Self::DelegationReasonRequired => 400,

            Self::NotAuthorized { .. } | Self::ActionNotPermitted { .. } => 403,

            Self::StepOutOfRange { .. } | Self::NoApproversFound(_) => 404,

            Self::NoPendingApprovals
            | Self::ChainRejected
            | Self::StepNotCurrent { .. }
            | Self::StepNotPending { .. }
            | Self::DelegationNotAllowed { .. } => 409,

            Self::InvalidThresholds(_) | Self::Handler(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CurrentStepOutOfRange { .. } => "CURRENT_STEP_OUT_OF_RANGE",
            Self::StepOutOfRange { .. } => "STEP_NOT_FOUND",
            Self::NoPendingApprovals => "NO_PENDING_APPROVALS",
            Self::ChainRejected => "CHAIN_REJECTED",
            Self::StepNotCurrent { .. } => "STEP_NOT_CURRENT",
            Self::StepNotPending { .. } => "STEP_NOT_PENDING",
            Self::NotAuthorized { .. } => "NOT_AUTHORIZED_TO_APPROVE",
            Self::DelegationNotAllowed { .. } => "DELEGATION_NOT_ALLOWED",
            Self::DelegateRequired => "DELEGATE_REQUIRED",
            Self::DelegationReasonRequired => "DELEGATION_REASON_REQUIRED",
            Self::ActionNotPermitted { .. } => "ACTION_NOT_PERMITTED",
            Self::NoApproversFound(_) => "NO_APPROVERS_FOUND",
            Self::InvalidThresholds(_) => "INVALID_APPROVAL_THRESHOLDS",
            Self::Handler(_) => "ACTION_HANDLER_FAILED",
        }
    }
}

//! Procurement error types.

use thiserror::Error;

use crate::approval::ApprovalError;
use crate::budget::{BudgetCheckResult, BudgetError};
use crate::procurement::types::RequestStatus;

/// Errors raised by procurement request operations.
#[derive(Debug, Error)]
pub enum ProcurementError {
    /// Attempted an invalid status transition.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: RequestStatus,
        /// The attempted target status.
        to: RequestStatus,
    },

    /// Title is blank.
    #[error("Request title is required")]
    TitleRequired,

    /// Department is blank.
    #[error("Request department is required")]
    DepartmentRequired,

    /// Requested amount is zero or negative.
    #[error("Request amount must be greater than zero")]
    InvalidAmount,

    /// The linked envelopes cannot fund the request.
    #[error("Insufficient budget: {}", .0.errors.join("; "))]
    InsufficientBudget(Box<BudgetCheckResult>),

    /// The amount is already committed.
    #[error("Budget is already committed for this request")]
    BudgetAlreadyCommitted,

    /// Nothing is committed to release.
    #[error("No budget is committed for this request")]
    BudgetNotCommitted,

    /// Approval chain error.
    #[error(transparent)]
    Approval(#[from] ApprovalError),

    /// Budget arithmetic error.
    #[error(transparent)]
    Budget(#[from] BudgetError),
}

impl ProcurementError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::TitleRequired | Self::DepartmentRequired | Self::InvalidAmount => 400,
            Self::InvalidTransition { .. }
            | Self::BudgetAlreadyCommitted
            | Self::BudgetNotCommitted => 409,
            Self::InsufficientBudget(_) => 422,
            Self::Approval(e) => e.status_code(),
            Self::Budget(e) => e.status_code(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::TitleRequired => "TITLE_REQUIRED",
            Self::DepartmentRequired => "DEPARTMENT_REQUIRED",
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::InsufficientBudget(_) => "INSUFFICIENT_BUDGET",
            Self::BudgetAlreadyCommitted => "BUDGET_ALREADY_COMMITTED",
            Self::BudgetNotCommitted => "BUDGET_NOT_COMMITTED",
            Self::Approval(e) => e.error_code(),
            Self::Budget(e) => e.error_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_budget_message_lists_errors() {
        let result = BudgetCheckResult {
            errors: vec!["a".to_string(), "b".to_string()],
            ..BudgetCheckResult::default()
        };
        let err = ProcurementError::InsufficientBudget(Box::new(result));
        assert_eq!(err.to_string(), "Insufficient budget: a; b");
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn test_wrapped_errors_keep_their_codes() {
        let err = ProcurementError::from(ApprovalError::NoPendingApprovals);
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "NO_PENDING_APPROVALS");

        let err = ProcurementError::from(BudgetError::NegativeAmount);
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "NEGATIVE_AMOUNT");
    }
}

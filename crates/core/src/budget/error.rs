//! Budget error types.

use rust_decimal::Decimal;
use thiserror::Error;

/// Budget-related errors.
#[derive(Debug, Error)]
pub enum BudgetError {
    /// Amount cannot be negative.
    #[error("Amount cannot be negative")]
    NegativeAmount,

    /// Total budget must be positive when building an envelope.
    #[error("Total budget must be greater than zero")]
    NonPositiveTotal,

    /// Amounts too large to add, subtract or compare as a utilization.
    #[error("Budget amounts are out of range")]
    AmountOverflow,

    /// Releasing more than is committed.
    #[error("Cannot release {requested}: only {committed} is committed")]
    ReleaseExceedsCommitment {
        /// Amount asked to release.
        requested: Decimal,
        /// Amount currently committed.
        committed: Decimal,
    },
}

impl BudgetError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NegativeAmount | Self::NonPositiveTotal => 400,
            Self::AmountOverflow => 422,
            Self::ReleaseExceedsCommitment { .. } => 409,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NegativeAmount => "NEGATIVE_AMOUNT",
            Self::NonPositiveTotal => "NON_POSITIVE_TOTAL",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::ReleaseExceedsCommitment { .. } => "RELEASE_EXCEEDS_COMMITMENT",
        }
    }
}

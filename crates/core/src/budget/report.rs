//! Budget alerts and utilization summaries.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::envelope::AlertThresholds;
use super::error::BudgetError;
use super::types::{AlertLevel, BudgetEnvelope, EnvelopeKind};

/// How urgently an alert needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Past the warning threshold.
    Medium,
    /// At or above 90% utilized.
    High,
    /// Fully utilized or overdrawn.
    Critical,
}

impl AlertSeverity {
    /// Severity for a utilization percentage already past the warning threshold.
    #[must_use]
    pub fn for_utilization(utilization_percent: Decimal) -> Self {
        if utilization_percent >= Decimal::ONE_HUNDRED {
            Self::Critical
        } else if utilization_percent >= Decimal::from(90) {
            Self::High
        } else {
            Self::Medium
        }
    }
}

/// An envelope at or above the warning threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvelopeAlert {
    /// Alert band derived from utilization.
    pub level: AlertLevel,
    /// Attention needed.
    pub severity: AlertSeverity,
    /// `(committed + spent) / total` as a percentage.
    pub utilization_percent: Decimal,
    /// Warning threshold that was crossed.
    pub threshold: Decimal,
    /// Human-readable summary.
    pub message: String,
}

impl EnvelopeAlert {
    /// Alert for `envelope`, or `None` below the warning threshold.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::AmountOverflow` if utilization cannot be computed.
    pub fn for_envelope(
        kind: EnvelopeKind,
        envelope: &BudgetEnvelope,
        thresholds: &AlertThresholds,
    ) -> Result<Option<Self>, BudgetError> {
        let utilization = envelope.utilization_percent()?;
        if utilization < thresholds.warning {
            return Ok(None);
        }
        Ok(Some(Self {
            level: thresholds.level_for(utilization),
            severity: AlertSeverity::for_utilization(utilization),
            utilization_percent: utilization,
            threshold: thresholds.warning,
            message: format!("{} budget is {utilization:.1}% utilized", kind.title()),
        }))
    }
}

/// Combined amounts of a set of envelopes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UtilizationReport {
    /// Number of envelopes summarized.
    pub budget_count: usize,
    /// Sum of allocations.
    pub total_budget: Decimal,
    /// Sum of commitments.
    pub total_committed: Decimal,
    /// Sum of spending.
    pub total_spent: Decimal,
    /// Sum of availability.
    pub total_available: Decimal,
    /// Combined `(committed + spent) / total` as a percentage; zero without any allocation.
    pub utilization_percent: Decimal,
}

impl UtilizationReport {
    /// Sum the given envelopes.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::AmountOverflow` when a sum leaves the decimal range.
    pub fn summarize<'a>(
        envelopes: impl IntoIterator<Item = &'a BudgetEnvelope>,
    ) -> Result<Self, BudgetError> {
        let mut report = Self::default();
        for envelope in envelopes {
            report.budget_count += 1;
            report.total_budget = add(report.total_budget, envelope.total_budget)?;
            report.total_committed = add(report.total_committed, envelope.committed_amount)?;
            report.total_spent = add(report.total_spent, envelope.spent_amount)?;
            report.total_available = add(report.total_available, envelope.available_amount)?;
        }

        if report.total_budget > Decimal::ZERO {
            report.utilization_percent = report
                .total_committed
                .checked_add(report.total_spent)
                .and_then(|used| used.checked_div(report.total_budget))
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .map(|percent| percent.round_dp(2))
                .ok_or(BudgetError::AmountOverflow)?;
        }
        Ok(report)
    }
}

fn add(total: Decimal, amount: Decimal) -> Result<Decimal, BudgetError> {
    total.checked_add(amount).ok_or(BudgetError::AmountOverflow)
}

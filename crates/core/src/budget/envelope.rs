//! Budget envelope arithmetic: utilization, alert levels, commitments.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::BudgetError;
use super::types::{AlertLevel, BudgetEnvelope};

/// Utilization percentages at which an envelope changes alert level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Warning from this percentage.
    pub warning: Decimal,
    /// Critical from this percentage.
    pub critical: Decimal,
    /// Exceeded from this percentage.
    pub exceeded: Decimal,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            warning: Decimal::from(80),
            critical: Decimal::from(95),
            exceeded: Decimal::ONE_HUNDRED,
        }
    }
}

impl AlertThresholds {
    /// Alert level for a utilization percentage.
    #[must_use]
    pub fn level_for(&self, utilization_percent: Decimal) -> AlertLevel {
        if utilization_percent >= self.exceeded {
            AlertLevel::Exceeded
        } else if utilization_percent >= self.critical {
            AlertLevel::Critical
        } else if utilization_percent >= self.warning {
            AlertLevel::Warning
        } else {
            AlertLevel::Normal
        }
    }
}

impl BudgetEnvelope {
    /// Builds a consistent envelope, deriving availability and alert level.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::NonPositiveTotal` if `total_budget <= 0`,
    /// `BudgetError::NegativeAmount` if committed or spent is negative, and
    /// `BudgetError::AmountOverflow` if the utilization cannot be represented.
    pub fn from_amounts(
        total_budget: Decimal,
        committed_amount: Decimal,
        spent_amount: Decimal,
    ) -> Result<Self, BudgetError> {
        if total_budget <= Decimal::ZERO {
            return Err(BudgetError::NonPositiveTotal);
        }
        if committed_amount < Decimal::ZERO || spent_amount < Decimal::ZERO {
            return Err(BudgetError::NegativeAmount);
        }

        let mut envelope = Self {
            total_budget,
            committed_amount,
            spent_amount,
            available_amount: Decimal::ZERO,
            alert_level: AlertLevel::Normal,
        };
        envelope.recompute(&AlertThresholds::default())?;
        Ok(envelope)
    }

    /// `(committed + spent) / total * 100`, rounded to two places; zero for an empty total.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::AmountOverflow` when the ratio exceeds the
    /// decimal range, e.g. a huge commitment against a tiny total.
    pub fn utilization_percent(&self) -> Result<Decimal, BudgetError> {
        if self.total_budget.is_zero() {
            return Ok(Decimal::ZERO);
        }
        self.committed_amount
            .checked_add(self.spent_amount)
            .and_then(|used| used.checked_div(self.total_budget))
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map(|percent| percent.round_dp(2))
            .ok_or(BudgetError::AmountOverflow)
    }

    /// Whether `available = total - committed - spent` holds.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        derived_available(self.total_budget, self.committed_amount, self.spent_amount)
            .is_ok_and(|available| available == self.available_amount)
    }

    /// Reserve `amount` for an approved request.
    ///
    /// Commitments may overdraw the envelope; the alert level reports it.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::NegativeAmount` for a negative amount and
    /// `BudgetError::AmountOverflow` when the new commitment is out of range.
    pub fn commit(&self, amount: Decimal) -> Result<Self, BudgetError> {
        if amount < Decimal::ZERO {
            return Err(BudgetError::NegativeAmount);
        }
        let mut next = *self;
        next.committed_amount = self
            .committed_amount
            .checked_add(amount)
            .ok_or(BudgetError::AmountOverflow)?;
        next.recompute(&AlertThresholds::default())?;
        Ok(next)
    }

    /// Return a previously committed `amount` to the pool.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::NegativeAmount` for a negative amount and
    /// `BudgetError::ReleaseExceedsCommitment` when releasing more than is committed.
    pub fn release(&self, amount: Decimal) -> Result<Self, BudgetError> {
        if amount < Decimal::ZERO {
            return Err(BudgetError::NegativeAmount);
        }
        if amount > self.committed_amount {
            return Err(BudgetError::ReleaseExceedsCommitment {
                requested: amount,
                committed: self.committed_amount,
            });
        }
        let mut next = *self;
        next.committed_amount = self
            .committed_amount
            .checked_sub(amount)
            .ok_or(BudgetError::AmountOverflow)?;
        next.recompute(&AlertThresholds::default())?;
        Ok(next)
    }

    fn recompute(&mut self, thresholds: &AlertThresholds) -> Result<(), BudgetError> {
        self.available_amount =
            derived_available(self.total_budget, self.committed_amount, self.spent_amount)?;
        self.alert_level = thresholds.level_for(self.utilization_percent()?);
        Ok(())
    }
}

fn derived_available(
    total: Decimal,
    committed: Decimal,
    spent: Decimal,
) -> Result<Decimal, BudgetError> {
    total
        .checked_sub(committed)
        .and_then(|rest| rest.checked_sub(spent))
        .ok_or(BudgetError::AmountOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(0), AlertLevel::Normal)]
    #[case(dec!(79.99), AlertLevel::Normal)]
    #[case(dec!(80), AlertLevel::Warning)]
    #[case(dec!(94.99), AlertLevel::Warning)]
    #[case(dec!(95), AlertLevel::Critical)]
    #[case(dec!(100), AlertLevel::Exceeded)]
    #[case(dec!(130), AlertLevel::Exceeded)]
    fn test_alert_level_bands(#[case] utilization: Decimal, #[case] expected: AlertLevel) {
        assert_eq!(AlertThresholds::default().level_for(utilization), expected);
    }

    #[test]
    fn test_from_amounts_derives_fields() {
        let envelope = BudgetEnvelope::from_amounts(dec!(100000), dec!(60000), dec!(36000)).unwrap();
        assert_eq!(envelope.available_amount, dec!(4000));
        assert_eq!(envelope.utilization_percent().unwrap(), dec!(96));
        assert_eq!(envelope.alert_level, AlertLevel::Critical);
        assert!(envelope.is_consistent());
    }

    #[test]
    fn test_from_amounts_rejects_bad_input() {
        assert!(matches!(
            BudgetEnvelope::from_amounts(dec!(0), dec!(0), dec!(0)),
            Err(BudgetError::NonPositiveTotal)
        ));
        assert!(matches!(
            BudgetEnvelope::from_amounts(dec!(100), dec!(-1), dec!(0)),
            Err(BudgetError::NegativeAmount)
        ));
    }

    #[test]
    fn test_commit_and_release() {
        let envelope = BudgetEnvelope::from_amounts(dec!(100000), dec!(0), dec!(10000)).unwrap();
        assert_eq!(envelope.alert_level, AlertLevel::Normal);

        let committed = envelope.commit(dec!(75000)).unwrap();
        assert_eq!(committed.committed_amount, dec!(75000));
        assert_eq!(committed.available_amount, dec!(15000));
        assert_eq!(committed.alert_level, AlertLevel::Warning);

        let released = committed.release(dec!(75000)).unwrap();
        assert_eq!(released, envelope);
    }

    #[test]
    fn test_commit_can_overdraw() {
        let envelope = BudgetEnvelope::from_amounts(dec!(1000), dec!(0), dec!(0)).unwrap();
        let overdrawn = envelope.commit(dec!(1500)).unwrap();
        assert_eq!(overdrawn.available_amount, dec!(-500));
        assert_eq!(overdrawn.alert_level, AlertLevel::Exceeded);
    }

    #[test]
    fn test_release_more_than_committed() {
        let envelope = BudgetEnvelope::from_amounts(dec!(1000), dec!(100), dec!(0)).unwrap();
        assert!(matches!(
            envelope.release(dec!(200)),
            Err(BudgetError::ReleaseExceedsCommitment { .. })
        ));
        assert!(matches!(
            envelope.commit(dec!(-1)),
            Err(BudgetError::NegativeAmount)
        ));
    }

    #[test]
    fn test_out_of_range_amounts_are_refused() {
        assert!(matches!(
            BudgetEnvelope::from_amounts(dec!(0.01), Decimal::MAX / dec!(10), dec!(0)),
            Err(BudgetError::AmountOverflow)
        ));
        assert!(matches!(
            BudgetEnvelope::from_amounts(dec!(1), Decimal::MAX, Decimal::MAX),
            Err(BudgetError::AmountOverflow)
        ));

        let envelope = BudgetEnvelope::from_amounts(Decimal::MAX, Decimal::MAX, dec!(0)).unwrap();
        assert_eq!(envelope.alert_level, AlertLevel::Exceeded);
        assert!(matches!(
            envelope.commit(dec!(1)),
            Err(BudgetError::AmountOverflow)
        ));
    }

    #[test]
    fn test_unrepresentable_snapshot_is_inconsistent() {
        let envelope = BudgetEnvelope {
            total_budget: dec!(0.01),
            committed_amount: Decimal::MAX,
            spent_amount: Decimal::MAX,
            available_amount: dec!(0),
            alert_level: AlertLevel::Exceeded,
        };
        assert!(!envelope.is_consistent());
        assert!(matches!(
            envelope.utilization_percent(),
            Err(BudgetError::AmountOverflow)
        ));
    }

    #[test]
    fn test_inconsistent_snapshot_detected() {
        let envelope = BudgetEnvelope {
            total_budget: dec!(1000),
            committed_amount: dec!(100),
            spent_amount: dec!(100),
            available_amount: dec!(900),
            alert_level: AlertLevel::Normal,
        };
        assert!(!envelope.is_consistent());
    }
}

//! Budget availability checks.

use procura_shared::types::format_amount;
use rust_decimal::Decimal;

use super::error::BudgetError;
use super::types::{
    AlertLevel, BudgetCheckResult, BudgetEnvelope, BudgetPolicy, EnvelopeKind,
    MissingBudgetPolicy, Recommendation, RecommendationKind, RecommendationPriority,
};

/// Receives every budget check result, e.g. to forward it to a parent view.
pub trait BudgetCheckListener {
    /// Called once per completed check.
    fn on_budget_check(&self, result: &BudgetCheckResult);
}

impl<F> BudgetCheckListener for F
where
    F: Fn(&BudgetCheckResult),
{
    fn on_budget_check(&self, result: &BudgetCheckResult) {
        self(result);
    }
}

/// Decides whether the department and project envelopes can fund a request.
#[derive(Debug, Clone, Default)]
pub struct BudgetEvaluator {
    policy: BudgetPolicy,
}

impl BudgetEvaluator {
    /// Creates an evaluator with the given policy.
    #[must_use]
    pub fn new(policy: BudgetPolicy) -> Self {
        Self { policy }
    }

    /// The policy in effect.
    #[must_use]
    pub fn policy(&self) -> &BudgetPolicy {
        &self.policy
    }

    /// Check `request_amount` against whichever envelopes are present.
    ///
    /// Absent envelopes are skipped. With no envelope at all the request is
    /// available unless the policy blocks unbudgeted requests.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::NegativeAmount` for a negative request amount and
    /// `BudgetError::AmountOverflow` when the envelope totals are out of range.
    pub fn check(
        &self,
        request_amount: Decimal,
        department: Option<&BudgetEnvelope>,
        project: Option<&BudgetEnvelope>,
    ) -> Result<BudgetCheckResult, BudgetError> {
        if request_amount < Decimal::ZERO {
            return Err(BudgetError::NegativeAmount);
        }

        let mut result = BudgetCheckResult {
            is_available: true,
            ..BudgetCheckResult::default()
        };

        let present = [
            (EnvelopeKind::Department, department),
            (EnvelopeKind::Project, project),
        ];

        for (kind, envelope) in present.iter().filter_map(|(k, e)| e.map(|e| (*k, e))) {
            if request_amount > envelope.available_amount {
                result.is_available = false;
                result.errors.push(format!(
                    "Insufficient {} budget: {} {currency} available, {} {currency} required",
                    kind.as_str(),
                    format_amount(envelope.available_amount),
                    format_amount(request_amount),
                    currency = self.policy.currency,
                ));
            }

            if envelope.alert_level == AlertLevel::Critical {
                result.warnings.push(format!(
                    "{} budget is critically low: {} {} remaining",
                    kind.title(),
                    format_amount(envelope.available_amount),
                    self.policy.currency,
                ));
            }

            let totals = &mut result.totals;
            totals.total_available =
                checked_sum(totals.total_available, envelope.available_amount)?;
            totals.total_committed =
                checked_sum(totals.total_committed, envelope.committed_amount)?;
            totals.total_spent = checked_sum(totals.total_spent, envelope.spent_amount)?;
        }

        if department.is_none()
            && project.is_none()
            && self.policy.missing_budget == MissingBudgetPolicy::Blocked
        {
            result.is_available = false;
            result
                .errors
                .push("No budget envelope is linked to this request".to_string());
        }

        result.recommendations =
            self.recommendations(&result, request_amount, department, project);

        Ok(result)
    }

    /// Run [`BudgetEvaluator::check`] and hand the result to `listener`.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`BudgetEvaluator::check`]; the listener is not
    /// called in that case.
    pub fn check_and_notify(
        &self,
        request_amount: Decimal,
        department: Option<&BudgetEnvelope>,
        project: Option<&BudgetEnvelope>,
        listener: &(impl BudgetCheckListener + ?Sized),
    ) -> Result<BudgetCheckResult, BudgetError> {
        let result = self.check(request_amount, department, project)?;
        listener.on_budget_check(&result);
        Ok(result)
    }

    fn recommendations(
        &self,
        result: &BudgetCheckResult,
        request_amount: Decimal,
        department: Option<&BudgetEnvelope>,
        project: Option<&BudgetEnvelope>,
    ) -> Vec<Recommendation> {
        let is_critical =
            |e: Option<&BudgetEnvelope>| e.is_some_and(|e| e.alert_level == AlertLevel::Critical);
        let mut recommendations = Vec::new();

        if !result.is_available {
            recommendations.push(Recommendation {
                kind: RecommendationKind::BudgetInsufficient,
                message: "Consider requesting budget increase or reducing request amount"
                    .to_string(),
                priority: RecommendationPriority::High,
            });
        }

        if is_critical(department) {
            recommendations.push(Recommendation {
                kind: RecommendationKind::DepartmentBudgetCritical,
                message: "Department budget is critically low. Consider alternative funding sources."
                    .to_string(),
                priority: RecommendationPriority::High,
            });
        }

        if is_critical(project) {
            recommendations.push(Recommendation {
                kind: RecommendationKind::ProjectBudgetCritical,
                message: "Project budget is critically low. Review project scope or request additional funding."
                    .to_string(),
                priority: RecommendationPriority::High,
            });
        }

        if request_amount > self.policy.high_value_threshold {
            recommendations.push(Recommendation {
                kind: RecommendationKind::HighValueRequest,
                message: "High-value request. Consider breaking into smaller phases or negotiating better terms."
                    .to_string(),
                priority: RecommendationPriority::Medium,
            });
        }

        recommendations
    }
}

fn checked_sum(total: Decimal, amount: Decimal) -> Result<Decimal, BudgetError> {
    total.checked_add(amount).ok_or(BudgetError::AmountOverflow)
}

//! Budget data types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Utilization band of a budget envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    /// Below the warning threshold.
    #[default]
    Normal,
    /// At or above 80% utilized.
    Warning,
    /// At or above 95% utilized.
    Critical,
    /// Fully utilized or overdrawn.
    Exceeded,
}

impl AlertLevel {
    /// Returns the string representation of the level.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
            Self::Exceeded => "EXCEEDED",
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope a budget envelope is held at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeKind {
    /// Department-wide budget.
    Department,
    /// Project budget.
    Project,
}

impl EnvelopeKind {
    /// Lowercase name used in diagnostics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Department => "department",
            Self::Project => "project",
        }
    }

    /// Capitalized name used at the start of a sentence.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::Department => "Department",
            Self::Project => "Project",
        }
    }
}

/// Snapshot of a named pool of funds.
///
/// `available_amount` is expected to equal
/// `total_budget - committed_amount - spent_amount`; snapshots are taken as
/// given and not corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetEnvelope {
    /// Total allocation.
    pub total_budget: Decimal,
    /// Reserved by approved but unpaid requests.
    pub committed_amount: Decimal,
    /// Already paid out.
    pub spent_amount: Decimal,
    /// Still free to commit.
    pub available_amount: Decimal,
    /// Utilization band.
    pub alert_level: AlertLevel,
}

/// Category of a budget recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationKind {
    /// At least one envelope cannot cover the request.
    BudgetInsufficient,
    /// The department envelope is at critical utilization.
    DepartmentBudgetCritical,
    /// The project envelope is at critical utilization.
    ProjectBudgetCritical,
    /// The request exceeds the high-value threshold.
    HighValueRequest,
}

/// Urgency of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationPriority {
    /// Informational.
    Low,
    /// Worth acting on.
    Medium,
    /// Should be acted on before approval.
    High,
}

/// Advice attached to a budget check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Category.
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    /// Text shown to the user.
    pub message: String,
    /// Urgency.
    pub priority: RecommendationPriority,
}

/// Sums across the envelopes that took part in a check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetTotals {
    /// Sum of available amounts.
    pub total_available: Decimal,
    /// Sum of committed amounts.
    pub total_committed: Decimal,
    /// Sum of spent amounts.
    pub total_spent: Decimal,
}

/// Outcome of a budget availability check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetCheckResult {
    /// Whether every present envelope covers the request.
    pub is_available: bool,
    /// Blocking diagnostics.
    pub errors: Vec<String>,
    /// Non-blocking diagnostics.
    pub warnings: Vec<String>,
    /// Suggested follow-ups.
    pub recommendations: Vec<Recommendation>,
    /// Totals across present envelopes.
    pub totals: BudgetTotals,
}

impl BudgetCheckResult {
    /// Returns true if a recommendation of `kind` is present.
    #[must_use]
    pub fn has_recommendation(&self, kind: RecommendationKind) -> bool {
        self.recommendations.iter().any(|r| r.kind == kind)
    }
}

/// How a check with no envelopes at all is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingBudgetPolicy {
    /// No budget means no constraint.
    #[default]
    Unconstrained,
    /// No budget means the request cannot be funded.
    Blocked,
}

/// Tunables for the budget evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetPolicy {
    /// Requests above this amount get a phasing recommendation.
    pub high_value_threshold: Decimal,
    /// Currency label used in diagnostics.
    pub currency: String,
    /// Treatment of checks without any envelope.
    pub missing_budget: MissingBudgetPolicy,
}

impl Default for BudgetPolicy {
    fn default() -> Self {
        Self {
            high_value_threshold: Decimal::from(50_000),
            currency: "EGP".to_string(),
            missing_budget: MissingBudgetPolicy::Unconstrained,
        }
    }
}

impl From<&procura_shared::config::BudgetConfig> for BudgetPolicy {
    fn from(config: &procura_shared::config::BudgetConfig) -> Self {
        Self {
            high_value_threshold: config.high_value_threshold,
            currency: config.currency.clone(),
            missing_budget: if config.block_when_unbudgeted {
                MissingBudgetPolicy::Blocked
            } else {
                MissingBudgetPolicy::Unconstrained
            },
        }
    }
}

//! Budget envelopes and availability checks.

pub mod envelope;
pub mod error;
pub mod evaluator;
pub mod report;
pub mod types;


pub use envelope::AlertThresholds;
pub use error::BudgetError;
pub use evaluator::{BudgetCheckListener, BudgetEvaluator};
pub use report::{AlertSeverity, EnvelopeAlert, UtilizationReport};
pub use types::{
    AlertLevel, BudgetCheckResult, BudgetEnvelope, BudgetPolicy, BudgetTotals, EnvelopeKind,
    MissingBudgetPolicy, Recommendation, RecommendationKind, RecommendationPriority,
};

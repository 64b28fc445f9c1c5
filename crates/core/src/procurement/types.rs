//! Procurement request types.

use chrono::{DateTime, Utc};
use procura_shared::types::{BudgetId, RequestId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::approval::{ApprovalChain, ApprovalLevel, Urgency};
use crate::budget::{BudgetCheckResult, BudgetEnvelope};

/// Lifecycle status of a procurement request.
///
/// Valid transitions:
/// - Draft → PendingApproval (submit, budget permitting)
/// - PendingApproval → Approved (last step approved)
/// - PendingApproval → Rejected (any step rejected)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Being drafted; not yet in the approval flow.
    #[default]
    Draft,
    /// Submitted and waiting on the approval chain.
    PendingApproval,
    /// Every step signed off.
    Approved,
    /// A step refused the request.
    Rejected,
}

impl RequestStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "pending_approval" => Some(Self::PendingApproval),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true once no further decision can change the request.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A purchase request moving through approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcurementRequest {
    /// Request ID.
    pub id: RequestId,
    /// Short title.
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Requesting department.
    pub department: String,
    /// Project the spend is booked against.
    #[serde(default)]
    pub project: Option<String>,
    /// Declared urgency.
    pub urgency: Urgency,
    /// Requested amount.
    pub total_amount: Decimal,
    /// Who raised the request.
    pub requested_by: String,
    /// Lifecycle status.
    pub status: RequestStatus,
    /// Approval level chosen by amount.
    pub approval_level: ApprovalLevel,
    /// Planned sign-offs and the current-step pointer.
    pub approval_chain: ApprovalChain,
    /// Typical turnaround for the level, in hours.
    pub estimated_approval_hours: u32,
    /// Amount requires a budget check.
    pub requires_budget_check: bool,
    /// Amount requires legal review.
    pub requires_legal_review: bool,
    /// Amount requires board approval.
    pub requires_board_approval: bool,
    /// Department envelope funding the request.
    #[serde(default)]
    pub department_budget_id: Option<BudgetId>,
    /// Project envelope funding the request.
    #[serde(default)]
    pub project_budget_id: Option<BudgetId>,
    /// Result of the last budget check.
    #[serde(default)]
    pub budget_check: Option<BudgetCheckResult>,
    /// Whether the amount is currently committed against the envelopes.
    #[serde(default)]
    pub budget_committed: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// When the request entered approval.
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    /// When the request reached a terminal status.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for creating a draft request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequestInput {
    /// Short title.
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Requesting department.
    pub department: String,
    /// Project the spend is booked against.
    #[serde(default)]
    pub project: Option<String>,
    /// Declared urgency.
    #[serde(default)]
    pub urgency: Urgency,
    /// Requested amount.
    pub total_amount: Decimal,
    /// Who raises the request.
    pub requested_by: String,
    /// Department envelope funding the request.
    #[serde(default)]
    pub department_budget_id: Option<BudgetId>,
    /// Project envelope funding the request.
    #[serde(default)]
    pub project_budget_id: Option<BudgetId>,
}

/// Envelope snapshots linked to a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkedEnvelopes {
    /// Department envelope, if linked.
    pub department: Option<BudgetEnvelope>,
    /// Project envelope, if linked.
    pub project: Option<BudgetEnvelope>,
}

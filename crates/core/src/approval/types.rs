//! Approval domain types.
//!
//! This module defines the step, chain and role types used by the
//! evaluator, the planner and the transition service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decision status of a single approval step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// No decision recorded yet.
    #[default]
    Pending,
    /// The approver signed off.
    Approved,
    /// The approver refused; terminal for the whole chain.
    Rejected,
}

impl StepStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Priority attached to an approval step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepPriority {
    /// Routine request.
    #[default]
    Low,
    /// Needs attention within the normal window.
    Medium,
    /// Needs attention first.
    High,
}

/// Urgency declared by the requester.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// Can wait longer than usual.
    Low,
    /// Normal turnaround.
    #[default]
    Medium,
    /// Faster than usual.
    High,
    /// As fast as possible.
    Critical,
}

impl Urgency {
    /// Parses an urgency from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Badge rendered for a step in the approval chain view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepBadge {
    /// Signed off, explicitly or implied by position.
    Approved,
    /// Refused.
    Rejected,
    /// The current step, awaiting a decision.
    Pending,
    /// Not reached yet.
    Waiting,
}

impl StepBadge {
    /// Human-readable label for the badge.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Pending => "Pending",
            Self::Waiting => "Waiting",
        }
    }
}

impl fmt::Display for StepBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Chain-level status derived from the steps and the current-step pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainStatus {
    /// Some step is still awaiting a decision.
    InProgress,
    /// Every step is resolved in favour.
    Approved,
    /// Some step was rejected.
    Rejected,
}

/// Organisational role that signs off a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverRole {
    /// Manager of the requesting department.
    DepartmentManager,
    /// Finance manager.
    FinanceManager,
    /// Chief executive.
    Ceo,
    /// Board of directors.
    Board,
}

impl ApproverRole {
    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DepartmentManager => "department_manager",
            Self::FinanceManager => "finance_manager",
            Self::Ceo => "ceo",
            Self::Board => "board",
        }
    }

    /// Parses a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "department_manager" => Some(Self::DepartmentManager),
            "finance_manager" => Some(Self::FinanceManager),
            "ceo" => Some(Self::Ceo),
            "board" => Some(Self::Board),
            _ => None,
        }
    }

    /// Display name of the role.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::DepartmentManager => "Department Manager",
            Self::FinanceManager => "Finance Manager",
            Self::Ceo => "CEO",
            Self::Board => "Board of Directors",
        }
    }

    /// Whether holders of this role may hand their decision to someone else.
    #[must_use]
    pub fn can_delegate(&self) -> bool {
        matches!(self, Self::DepartmentManager | Self::FinanceManager)
    }

    /// How many delegation hops a step for this role allows.
    #[must_use]
    pub fn max_delegation_level(&self) -> u8 {
        u8::from(self.can_delegate())
    }
}

impl fmt::Display for ApproverRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single sign-off in an approval chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStep {
    /// Position of the step in its chain (0-based).
    pub step_index: usize,
    /// Who decides this step.
    pub approver_id: String,
    /// Role the approver acts in.
    pub role: String,
    /// Display name of the role.
    #[serde(default)]
    pub role_name: String,
    /// Decision status.
    pub status: StepStatus,
    /// Whether the step must be signed off.
    pub is_required: bool,
    /// Whether the approver may delegate this step.
    pub can_delegate: bool,
    /// How many delegation hops the step allows.
    #[serde(default)]
    pub max_delegation_level: u8,
    /// When the decision is due.
    pub due_date: DateTime<Utc>,
    /// Step priority.
    pub priority: StepPriority,
    /// Approver the step was handed to, if any.
    #[serde(default)]
    pub delegated_to: Option<String>,
    /// Why the step was delegated.
    #[serde(default)]
    pub delegation_reason: Option<String>,
    /// Comments recorded with the decision.
    #[serde(default)]
    pub comments: String,
    /// When the decision was recorded.
    #[serde(default)]
    pub decided_at: Option<DateTime<Utc>>,
}

impl ApprovalStep {
    /// Returns true if `actor` may decide this step, either as the approver or as its delegate.
    #[must_use]
    pub fn is_decided_by(&self, actor: &str) -> bool {
        self.approver_id == actor || self.delegated_to.as_deref() == Some(actor)
    }
}

/// An ordered approval chain together with its current-step pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalChain {
    /// Steps in sign-off order.
    pub steps: Vec<ApprovalStep>,
    /// Index of the step awaiting a decision; equals `steps.len()` once every step is approved.
    pub current_step: usize,
}

impl ApprovalChain {
    /// Creates a chain positioned at its first step.
    #[must_use]
    pub fn new(steps: Vec<ApprovalStep>) -> Self {
        Self {
            steps,
            current_step: 0,
        }
    }

    /// Number of steps in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the chain has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The step awaiting a decision, if any.
    #[must_use]
    pub fn current(&self) -> Option<&ApprovalStep> {
        self.steps.get(self.current_step)
    }
}

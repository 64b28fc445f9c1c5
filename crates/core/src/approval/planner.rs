//! Approval planning.
//!
//! Turns a request amount and urgency into an approval level, the ordered
//! list of approver roles, and a concrete chain with due dates and priorities.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use procura_shared::config::{ApprovalConfig, ThresholdConfig};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::approval::error::ApprovalError;
use crate::approval::types::{
    ApprovalChain, ApprovalStep, ApproverRole, StepPriority, StepStatus, Urgency,
};

/// Approval level, chosen by request amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalLevel {
    /// Department manager only.
    Low,
    /// Adds the finance manager.
    Medium,
    /// Adds the CEO.
    High,
    /// Adds the board.
    Critical,
}

impl ApprovalLevel {
    /// Returns the string representation of the level.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// Roles that must sign off, in order.
    #[must_use]
    pub fn approver_roles(&self) -> &'static [ApproverRole] {
        use ApproverRole::{Board, Ceo, DepartmentManager, FinanceManager};
        match self {
            Self::Low => &[DepartmentManager],
            Self::Medium => &[DepartmentManager, FinanceManager],
            Self::High => &[DepartmentManager, FinanceManager, Ceo],
            Self::Critical => &[DepartmentManager, FinanceManager, Ceo, Board],
        }
    }

    /// Typical turnaround in hours.
    #[must_use]
    pub fn estimated_hours(&self) -> u32 {
        match self {
            Self::Low => 24,
            Self::Medium => 48,
            Self::High => 72,
            Self::Critical => 120,
        }
    }
}

impl std::fmt::Display for ApprovalLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive upper bounds of the approval levels; anything above `high_max` is critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalThresholds {
    /// Upper bound of the low level.
    pub low_max: Decimal,
    /// Upper bound of the medium level.
    pub medium_max: Decimal,
    /// Upper bound of the high level.
    pub high_max: Decimal,
}

impl Default for ApprovalThresholds {
    fn default() -> Self {
        Self {
            low_max: Decimal::from(10_000),
            medium_max: Decimal::from(50_000),
            high_max: Decimal::from(200_000),
        }
    }
}

impl ApprovalThresholds {
    /// The first level whose upper bound covers `amount`.
    #[must_use]
    pub fn level_for(&self, amount: Decimal) -> ApprovalLevel {
        if amount <= self.low_max {
            ApprovalLevel::Low
        } else if amount <= self.medium_max {
            ApprovalLevel::Medium
        } else if amount <= self.high_max {
            ApprovalLevel::High
        } else {
            ApprovalLevel::Critical
        }
    }

    /// Bounds are non-negative and ascend from low to high.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        Decimal::ZERO <= self.low_max
            && self.low_max <= self.medium_max
            && self.medium_max <= self.high_max
    }
}

impl From<&ThresholdConfig> for ApprovalThresholds {
    fn from(config: &ThresholdConfig) -> Self {
        Self {
            low_max: config.low_max,
            medium_max: config.medium_max,
            high_max: config.high_max,
        }
    }
}

/// Resolves who holds an approver role for a department/project.
pub trait ApproverDirectory {
    /// Returns the approver id for `role`, or `None` if nobody holds it.
    fn find_approver(
        &self,
        role: ApproverRole,
        department: &str,
        project: Option<&str>,
    ) -> Option<String>;
}

impl<F> ApproverDirectory for F
where
    F: Fn(ApproverRole, &str, Option<&str>) -> Option<String>,
{
    fn find_approver(
        &self,
        role: ApproverRole,
        department: &str,
        project: Option<&str>,
    ) -> Option<String> {
        self(role, department, project)
    }
}

/// What the planner needs to know about a request.
#[derive(Debug, Clone)]
pub struct PlanInput<'a> {
    /// Requested amount.
    pub total_amount: Decimal,
    /// Requesting department.
    pub department: &'a str,
    /// Project the spend is booked against, if any.
    pub project: Option<&'a str>,
    /// Declared urgency.
    pub urgency: Urgency,
}

/// A planned approval workflow.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalPlan {
    /// Level chosen by amount.
    pub level: ApprovalLevel,
    /// The chain, positioned at its first step.
    pub chain: ApprovalChain,
    /// Typical turnaround in hours.
    pub estimated_approval_hours: u32,
    /// Amount is large enough to require a budget check.
    pub requires_budget_check: bool,
    /// Amount is large enough to require legal review.
    pub requires_legal_review: bool,
    /// Amount is large enough to require board approval.
    pub requires_board_approval: bool,
}

/// Stateless planner for approval workflows.
///
/// Departments may carry their own thresholds; everyone else uses the defaults.
#[derive(Debug, Clone, Default)]
pub struct ApprovalPlanner {
    thresholds: ApprovalThresholds,
    departments: HashMap<String, ApprovalThresholds>,
}

impl ApprovalPlanner {
    /// Creates a planner with custom default thresholds.
    #[must_use]
    pub fn new(thresholds: ApprovalThresholds) -> Self {
        Self {
            thresholds,
            departments: HashMap::new(),
        }
    }

    /// Overrides the thresholds of one department. Names match case-insensitively.
    #[must_use]
    pub fn with_department(mut self, department: &str, thresholds: ApprovalThresholds) -> Self {
        self.departments
            .insert(department.to_lowercase(), thresholds);
        self
    }

    /// Thresholds in effect for `department`.
    #[must_use]
    pub fn thresholds_for(&self, department: &str) -> &ApprovalThresholds {
        self.departments
            .get(&department.to_lowercase())
            .unwrap_or(&self.thresholds)
    }

    /// Determine the approval level for an amount requested by `department`.
    #[must_use]
    pub fn level_for(&self, amount: Decimal, department: &str) -> ApprovalLevel {
        self.thresholds_for(department).level_for(amount)
    }

    /// Plan the approval workflow for a request.
    ///
    /// Roles nobody holds are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalError::NoApproversFound` if no role of the level
    /// resolves to an approver.
    pub fn plan(
        &self,
        input: &PlanInput<'_>,
        directory: &impl ApproverDirectory,
        now: DateTime<Utc>,
    ) -> Result<ApprovalPlan, ApprovalError> {
        let level = self.level_for(input.total_amount, input.department);

        let steps: Vec<ApprovalStep> = level
            .approver_roles()
            .iter()
            .filter_map(|role| {
                directory
                    .find_approver(*role, input.department, input.project)
                    .map(|approver_id| (*role, approver_id))
            })
            .enumerate()
            .map(|(index, (role, approver_id))| ApprovalStep {
                step_index: index,
                approver_id,
                role: role.as_str().to_string(),
                role_name: role.display_name().to_string(),
                status: StepStatus::Pending,
                is_required: true,
                can_delegate: role.can_delegate(),
                max_delegation_level: role.max_delegation_level(),
                due_date: due_date(now, index, input.urgency),
                priority: step_priority(input.total_amount, input.urgency),
                delegated_to: None,
                delegation_reason: None,
                comments: String::new(),
                decided_at: None,
            })
            .collect();

        if steps.is_empty() {
            return Err(ApprovalError::NoApproversFound(level.to_string()));
        }

        Ok(ApprovalPlan {
            level,
            chain: ApprovalChain::new(steps),
            estimated_approval_hours: level.estimated_hours(),
            requires_budget_check: input.total_amount > Decimal::from(5_000),
            requires_legal_review: input.total_amount > Decimal::from(100_000),
            requires_board_approval: input.total_amount > Decimal::from(500_000),
        })
    }
}

impl TryFrom<&ApprovalConfig> for ApprovalPlanner {
    type Error = ApprovalError;

    fn try_from(config: &ApprovalConfig) -> Result<Self, Self::Error> {
        let defaults = ApprovalThresholds::from(&config.thresholds);
        if !defaults.is_ordered() {
            return Err(ApprovalError::InvalidThresholds("default".to_string()));
        }
        let mut planner = Self::new(defaults);
        for (department, thresholds) in &config.departments {
            let thresholds = ApprovalThresholds::from(thresholds);
            if !thresholds.is_ordered() {
                return Err(ApprovalError::InvalidThresholds(department.clone()));
            }
            planner = planner.with_department(department, thresholds);
        }
        Ok(planner)
    }
}

/// Fraction of the base turnaround granted at each urgency.
fn urgency_multiplier(urgency: Urgency) -> Decimal {
    match urgency {
        Urgency::Critical => Decimal::new(5, 1),
        Urgency::High => Decimal::new(75, 2),
        Urgency::Medium => Decimal::ONE,
        Urgency::Low => Decimal::new(15, 1),
    }
}

/// Longest turnaround granted to a single step (one year).
const MAX_DUE_MINUTES: i64 = 60 * 24 * 365;

/// Due date of the step at `index`: 24h scaled by urgency, plus 20% per preceding step.
#[must_use]
pub fn due_date(now: DateTime<Utc>, index: usize, urgency: Urgency) -> DateTime<Utc> {
    let step_growth = Decimal::new(12, 1);
    let cap = Decimal::from(MAX_DUE_MINUTES);
    let mut minutes = Decimal::from(24 * 60) * urgency_multiplier(urgency);
    for _ in 0..index {
        minutes *= step_growth;
        if minutes >= cap {
            break;
        }
    }
    let minutes = minutes.min(cap).round().to_i64().unwrap_or(MAX_DUE_MINUTES);
    now + Duration::minutes(minutes)
}

/// Priority shared by every step of a request.
#[must_use]
pub fn step_priority(amount: Decimal, urgency: Urgency) -> StepPriority {
    if urgency == Urgency::Critical || amount > Decimal::from(100_000) {
        StepPriority::High
    } else if urgency == Urgency::High || amount > Decimal::from(25_000) {
        StepPriority::Medium
    } else {
        StepPriority::Low
    }
}

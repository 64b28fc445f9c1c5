//! Procurement approval chains.
//!
//! This module derives what an approver sees and may do on a chain, plans
//! new chains from request amounts, and applies decisions to them.
//!
//! # Modules
//!
//! - `types` - Step, chain and role types
//! - `error` - Approval-specific error types
//! - `evaluator` - Badges, overdue flags and action gating
//! - `planner` - Approval levels, approvers, due dates and priorities
//! - `service` - Approve/reject/delegate transitions
//! - `actions` - Action handler seam and gated dispatch

pub mod actions;
pub mod error;
pub mod evaluator;
pub mod planner;
pub mod service;
pub mod types;

#[cfg(test)]
mod evaluator_props;
#[cfg(test)]
mod service_props;

pub use actions::{ApprovalActions, ApprovalPanel};
pub use error::{ActionKind, ApprovalError};
pub use evaluator::{
    ApprovalChainEvaluator, ChainView, EvaluationContext, StepActions, StepView, WorkflowSummary,
};
pub use planner::{
    ApprovalLevel, ApprovalPlan, ApprovalPlanner, ApprovalThresholds, ApproverDirectory, PlanInput,
};
pub use service::{ApprovalOutcome, ApprovalService};
pub use types::{
    ApprovalChain, ApprovalStep, ApproverRole, ChainStatus, StepBadge, StepPriority, StepStatus,
    Urgency,
};

//! In-memory storage layer.
//!
//! This crate provides:
//! - Repositories for budget envelopes, approvers and procurement requests
//! - An approval action handler that applies decisions through the repositories
//! - JSON seed loading

pub mod actions;
pub mod repositories;
pub mod seed;

pub use actions::RequestActionHandler;
pub use repositories::{
    ActionResult, ApproverAssignment, ApproverRegistry, BudgetAlert, BudgetRecord,
    BudgetRepoError, BudgetRepository, BudgetUtilizationReport, CreateBudgetInput,
    ProcurementRepoError, ProcurementRepository, TracingBudgetListener, UpdateBudgetInput,
};
pub use seed::{SeedData, SeedError, SeedSummary};

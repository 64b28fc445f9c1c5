//! Repository abstractions for data access.
//!
//! Repositories share their storage through `Arc`, so clones are cheap
//! handles onto the same data.

pub mod approver;
pub mod budget;
pub mod procurement;

pub use approver::{ApproverAssignment, ApproverRegistry};
pub use budget::{
    BudgetAlert, BudgetRecord, BudgetRepoError, BudgetRepository, BudgetUtilizationReport,
    CreateBudgetInput, UpdateBudgetInput,
};
pub use procurement::{
    ActionResult, ProcurementRepoError, ProcurementRepository, TracingBudgetListener,
};

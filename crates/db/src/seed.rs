//! JSON seed fixtures for budgets and approvers.
//!
//! ```json
//! {
//!   "budgets": [
//!     { "id": "0191...", "name": "Engineering", "kind": "department",
//!       "owner": "engineering", "total_budget": "500000" }
//!   ],
//!   "approvers": [
//!     { "role": "department_manager", "department": "engineering", "approver_id": "u-1" },
//!     { "role": "ceo", "approver_id": "u-9" }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use procura_shared::types::BudgetId;

use crate::repositories::approver::{ApproverAssignment, ApproverRegistry};
use crate::repositories::budget::{BudgetRepoError, BudgetRepository, CreateBudgetInput};

/// Errors raised while loading a seed file.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    /// The file could not be read.
    #[error("Failed to read seed file {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid seed JSON.
    #[error("Invalid seed data: {0}")]
    Parse(#[from] serde_json::Error),

    /// A budget entry was rejected.
    #[error(transparent)]
    Budget(#[from] BudgetRepoError),
}

/// A budget entry, optionally with a fixed ID.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedBudget {
    /// Fixed ID; generated when absent.
    #[serde(default)]
    pub id: Option<BudgetId>,
    /// Envelope definition.
    #[serde(flatten)]
    pub budget: CreateBudgetInput,
}

/// Parsed seed file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    /// Budget envelopes.
    #[serde(default)]
    pub budgets: Vec<SeedBudget>,
    /// Role assignments.
    #[serde(default)]
    pub approvers: Vec<ApproverAssignment>,
}

/// Counts of what a seed run inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Budgets registered.
    pub budgets: usize,
    /// Approvers assigned.
    pub approvers: usize,
}

impl SeedData {
    /// Parses seed JSON.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Parse` for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a seed file.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Io` if the file cannot be read, or `SeedError::Parse`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Inserts the seed into the repositories.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Budget` on the first invalid budget; earlier
    /// entries stay inserted.
    pub fn apply(
        self,
        budgets: &BudgetRepository,
        approvers: &ApproverRegistry,
    ) -> Result<SeedSummary, SeedError> {
        let mut summary = SeedSummary::default();

        for entry in self.budgets {
            let id = entry.id.unwrap_or_default();
            budgets.create_with_id(id, entry.budget)?;
            summary.budgets += 1;
        }
        for assignment in self.approvers {
            approvers.assign(assignment);
            summary.approvers += 1;
        }

        info!(
            budgets = summary.budgets,
            approvers = summary.approvers,
            "Seed data loaded"
        );
        Ok(summary)
    }
}

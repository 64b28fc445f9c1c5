//! Budget envelope repository.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use procura_core::budget::{
    AlertLevel, AlertThresholds, BudgetEnvelope, BudgetError, EnvelopeAlert, EnvelopeKind,
    UtilizationReport,
};
use procura_shared::types::BudgetId;

/// Error types for budget repository operations.
#[derive(Debug, thiserror::Error)]
pub enum BudgetRepoError {
    /// Budget not found.
    #[error("Budget not found: {0}")]
    NotFound(BudgetId),

    /// Budget name is blank.
    #[error("Budget name is required")]
    NameRequired,

    /// A budget was linked in the wrong slot.
    #[error("Budget {id} is not a {expected} budget")]
    KindMismatch {
        /// The linked budget.
        id: BudgetId,
        /// Kind the slot requires.
        expected: &'static str,
    },

    /// The same budget was linked as both department and project envelope.
    #[error("Budget {0} cannot be linked as both department and project budget")]
    LinkedTwice(BudgetId),

    /// Budget arithmetic rejected the amounts.
    #[error(transparent)]
    Budget(#[from] BudgetError),
}

/// Input for registering a budget envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBudgetInput {
    /// Display name.
    pub name: String,
    /// Department or project envelope.
    pub kind: EnvelopeKind,
    /// Department or project the envelope belongs to.
    pub owner: String,
    /// Total allocation.
    pub total_budget: Decimal,
    /// Already committed.
    #[serde(default)]
    pub committed_amount: Decimal,
    /// Already spent.
    #[serde(default)]
    pub spent_amount: Decimal,
}

/// Changes to a stored budget; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBudgetInput {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New total allocation.
    #[serde(default)]
    pub total_budget: Option<Decimal>,
    /// New committed amount.
    #[serde(default)]
    pub committed_amount: Option<Decimal>,
    /// New spent amount.
    #[serde(default)]
    pub spent_amount: Option<Decimal>,
}

/// A stored budget envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetRecord {
    /// Budget ID.
    pub id: BudgetId,
    /// Display name.
    pub name: String,
    /// Department or project envelope.
    pub kind: EnvelopeKind,
    /// Department or project the envelope belongs to.
    pub owner: String,
    /// Current amounts and alert level.
    pub envelope: BudgetEnvelope,
    /// `(committed + spent) / total` as a percentage.
    pub utilization_percent: Decimal,
    /// Created at timestamp.
    pub created_at: DateTime<Utc>,
    /// Updated at timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A stored budget past its warning threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetAlert {
    /// Budget ID.
    pub budget_id: BudgetId,
    /// Display name.
    pub budget_name: String,
    /// Department or project envelope.
    pub kind: EnvelopeKind,
    /// Department or project the envelope belongs to.
    pub owner: String,
    /// Level, severity and message.
    #[serde(flatten)]
    pub alert: EnvelopeAlert,
}

/// Combined utilization of the budgets owned by a department and/or project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetUtilizationReport {
    /// Department filter.
    pub department: Option<String>,
    /// Project filter.
    pub project: Option<String>,
    /// Summed amounts.
    #[serde(flatten)]
    pub summary: UtilizationReport,
    /// Matching budgets past their warning threshold.
    pub alerts: Vec<BudgetAlert>,
}

/// Budget envelopes keyed by ID.
#[derive(Debug, Clone, Default)]
pub struct BudgetRepository {
    budgets: Arc<DashMap<BudgetId, BudgetRecord>>,
    // Serializes read-modify-write cycles on envelopes.
    ledger: Arc<Mutex<()>>,
}

impl BudgetRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an envelope, deriving availability and alert level.
    ///
    /// # Errors
    ///
    /// Returns `NameRequired` for a blank name, or `Budget` when the
    /// amounts do not form a valid envelope.
    pub fn create(&self, input: CreateBudgetInput) -> Result<BudgetRecord, BudgetRepoError> {
        self.create_with_id(BudgetId::new(), input)
    }

    /// Registers an envelope under a caller-chosen ID, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Same as [`BudgetRepository::create`].
    pub fn create_with_id(
        &self,
        id: BudgetId,
        input: CreateBudgetInput,
    ) -> Result<BudgetRecord, BudgetRepoError> {
        if input.name.trim().is_empty() {
            return Err(BudgetRepoError::NameRequired);
        }
        let envelope = BudgetEnvelope::from_amounts(
            input.total_budget,
            input.committed_amount,
            input.spent_amount,
        )?;

        let now = Utc::now();
        let record = BudgetRecord {
            id,
            name: input.name,
            kind: input.kind,
            owner: input.owner,
            utilization_percent: envelope.utilization_percent()?,
            envelope,
            created_at: now,
            updated_at: now,
        };
        self.budgets.insert(id, record.clone());

        info!(
            budget_id = %id,
            kind = record.kind.as_str(),
            alert_level = %record.envelope.alert_level,
            "Budget registered"
        );
        Ok(record)
    }

    /// Finds a budget by ID.
    #[must_use]
    pub fn find_by_id(&self, id: BudgetId) -> Option<BudgetRecord> {
        self.budgets.get(&id).map(|r| r.value().clone())
    }

    /// Gets a budget by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the budget does not exist.
    pub fn get(&self, id: BudgetId) -> Result<BudgetRecord, BudgetRepoError> {
        self.find_by_id(id).ok_or(BudgetRepoError::NotFound(id))
    }

    /// Current envelope of a budget.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the budget does not exist.
    pub fn envelope(&self, id: BudgetId) -> Result<BudgetEnvelope, BudgetRepoError> {
        self.budgets
            .get(&id)
            .map(|r| r.envelope)
            .ok_or(BudgetRepoError::NotFound(id))
    }

    /// Checks that linked budgets exist, are distinct, and sit in the slot of their kind.
    ///
    /// # Errors
    ///
    /// Returns `LinkedTwice` when both slots name the same budget, `NotFound`
    /// for an unknown budget, and `KindMismatch` for a budget in the wrong slot.
    pub fn check_links(
        &self,
        department: Option<BudgetId>,
        project: Option<BudgetId>,
    ) -> Result<(), BudgetRepoError> {
        if let Some(id) = department.filter(|_| department == project) {
            return Err(BudgetRepoError::LinkedTwice(id));
        }
        for (id, expected) in [
            (department, EnvelopeKind::Department),
            (project, EnvelopeKind::Project),
        ] {
            let Some(id) = id else { continue };
            if self.get(id)?.kind != expected {
                return Err(BudgetRepoError::KindMismatch {
                    id,
                    expected: expected.as_str(),
                });
            }
        }
        Ok(())
    }

    /// Stores a new envelope snapshot for an existing budget.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the budget does not exist, or `Budget` if the
    /// envelope's utilization is out of range.
    pub fn update_envelope(
        &self,
        id: BudgetId,
        envelope: BudgetEnvelope,
    ) -> Result<BudgetRecord, BudgetRepoError> {
        let utilization_percent = envelope.utilization_percent()?;
        let mut record = self
            .budgets
            .get_mut(&id)
            .ok_or(BudgetRepoError::NotFound(id))?;
        record.envelope = envelope;
        record.utilization_percent = utilization_percent;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    /// Renames a budget or replaces its amounts, re-deriving availability and alert level.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `NameRequired` for a blank name, or `Budget` when
    /// the resulting amounts do not form a valid envelope.
    pub fn update(
        &self,
        id: BudgetId,
        input: UpdateBudgetInput,
    ) -> Result<BudgetRecord, BudgetRepoError> {
        if input.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(BudgetRepoError::NameRequired);
        }

        let _ledger = self.lock_ledger();
        let mut record = self
            .budgets
            .get_mut(&id)
            .ok_or(BudgetRepoError::NotFound(id))?;
        let current = record.envelope;
        let envelope = BudgetEnvelope::from_amounts(
            input.total_budget.unwrap_or(current.total_budget),
            input.committed_amount.unwrap_or(current.committed_amount),
            input.spent_amount.unwrap_or(current.spent_amount),
        )?;

        record.utilization_percent = envelope.utilization_percent()?;
        record.envelope = envelope;
        if let Some(name) = input.name {
            record.name = name;
        }
        record.updated_at = Utc::now();
        let record = record.clone();

        info!(
            budget_id = %id,
            alert_level = %record.envelope.alert_level,
            "Budget updated"
        );
        Ok(record)
    }

    /// All budgets, ordered by name.
    #[must_use]
    pub fn list(&self) -> Vec<BudgetRecord> {
        let mut records: Vec<BudgetRecord> =
            self.budgets.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    /// Every budget at or above its warning threshold, most utilized first.
    ///
    /// # Errors
    ///
    /// Returns `Budget` if a stored utilization cannot be computed.
    pub fn alerts(&self) -> Result<Vec<BudgetAlert>, BudgetRepoError> {
        alerts_for(self.list())
    }

    /// Combined utilization of the budgets owned by `department` and `project`.
    ///
    /// Owners match case-insensitively; with neither filter every budget is included.
    ///
    /// # Errors
    ///
    /// Returns `Budget` if a sum leaves the decimal range.
    pub fn utilization_report(
        &self,
        department: Option<&str>,
        project: Option<&str>,
    ) -> Result<BudgetUtilizationReport, BudgetRepoError> {
        let owned_by = |record: &BudgetRecord| {
            let owner = match record.kind {
                EnvelopeKind::Department => department,
                EnvelopeKind::Project => project,
            };
            owner.is_some_and(|o| o.eq_ignore_ascii_case(&record.owner))
        };
        let records: Vec<BudgetRecord> = self
            .list()
            .into_iter()
            .filter(|r| (department.is_none() && project.is_none()) || owned_by(r))
            .collect();

        Ok(BudgetUtilizationReport {
            department: department.map(str::to_string),
            project: project.map(str::to_string),
            summary: UtilizationReport::summarize(records.iter().map(|r| &r.envelope))?,
            alerts: alerts_for(records)?,
        })
    }

    /// Number of budgets in each alert band.
    #[must_use]
    pub fn count_by_alert_level(&self) -> BTreeMap<AlertLevel, usize> {
        let mut counts = BTreeMap::new();
        for record in self.budgets.iter() {
            *counts.entry(record.envelope.alert_level).or_insert(0) += 1;
        }
        counts
    }

    /// Number of registered budgets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.budgets.len()
    }

    /// Returns true if no budget is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.budgets.is_empty()
    }

    /// Holds the envelope ledger for a read-modify-write cycle.
    pub fn lock_ledger(&self) -> MutexGuard<'_, ()> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn alerts_for(records: Vec<BudgetRecord>) -> Result<Vec<BudgetAlert>, BudgetRepoError> {
    let thresholds = AlertThresholds::default();
    let mut alerts = Vec::new();
    for record in records {
        if let Some(alert) = EnvelopeAlert::for_envelope(record.kind, &record.envelope, &thresholds)?
        {
            alerts.push(BudgetAlert {
                budget_id: record.id,
                budget_name: record.name,
                kind: record.kind,
                owner: record.owner,
                alert,
            });
        }
    }
    alerts.sort_by(|a, b| b.alert.utilization_percent.cmp(&a.alert.utilization_percent));
    Ok(alerts)
}

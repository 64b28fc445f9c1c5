//! Approver registry.
//!
//! Maps approver roles to user IDs. A role can be held per department
//! (e.g. department managers) or organisation-wide (e.g. the CEO); the
//! department-specific holder wins when both exist.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use procura_core::approval::{ApproverDirectory, ApproverRole};

/// One role assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverAssignment {
    /// Role held.
    pub role: ApproverRole,
    /// Department the role is scoped to; `None` for organisation-wide.
    #[serde(default)]
    pub department: Option<String>,
    /// User holding the role.
    pub approver_id: String,
}

/// Role holders keyed by role and department scope.
#[derive(Debug, Clone, Default)]
pub struct ApproverRegistry {
    holders: Arc<DashMap<(ApproverRole, Option<String>), String>>,
}

impl ApproverRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a role, replacing the previous holder in the same scope.
    pub fn assign(&self, assignment: ApproverAssignment) {
        debug!(
            role = assignment.role.as_str(),
            department = ?assignment.department,
            approver_id = %assignment.approver_id,
            "Approver assigned"
        );
        self.holders.insert(
            (assignment.role, assignment.department),
            assignment.approver_id,
        );
    }

    /// All assignments.
    #[must_use]
    pub fn assignments(&self) -> Vec<ApproverAssignment> {
        self.holders
            .iter()
            .map(|entry| {
                let (role, department) = entry.key().clone();
                ApproverAssignment {
                    role,
                    department,
                    approver_id: entry.value().clone(),
                }
            })
            .collect()
    }
}

impl ApproverDirectory for ApproverRegistry {
    fn find_approver(
        &self,
        role: ApproverRole,
        department: &str,
        _project: Option<&str>,
    ) -> Option<String> {
        self.holders
            .get(&(role, Some(department.to_string())))
            .or_else(|| self.holders.get(&(role, None)))
            .map(|holder| holder.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assign(registry: &ApproverRegistry, role: ApproverRole, dept: Option<&str>, id: &str) {
        registry.assign(ApproverAssignment {
            role,
            department: dept.map(str::to_string),
            approver_id: id.to_string(),
        });
    }

    #[test]
    fn test_department_holder_wins_over_global() {
        let registry = ApproverRegistry::new();
        assign(&registry, ApproverRole::DepartmentManager, None, "fallback");
        assign(
            &registry,
            ApproverRole::DepartmentManager,
            Some("engineering"),
            "eng-lead",
        );

        assert_eq!(
            registry.find_approver(ApproverRole::DepartmentManager, "engineering", None),
            Some("eng-lead".to_string())
        );
        assert_eq!(
            registry.find_approver(ApproverRole::DepartmentManager, "sales", None),
            Some("fallback".to_string())
        );
    }

    #[test]
    fn test_unassigned_role_is_none() {
        let registry = ApproverRegistry::new();
        assign(&registry, ApproverRole::Ceo, None, "ceo");
        assert_eq!(registry.find_approver(ApproverRole::Board, "x", None), None);
        assert_eq!(registry.assignments().len(), 1);
    }

    #[test]
    fn test_reassign_replaces_holder() {
        let registry = ApproverRegistry::new();
        assign(&registry, ApproverRole::FinanceManager, None, "old");
        assign(&registry, ApproverRole::FinanceManager, None, "new");
        assert_eq!(
            registry.find_approver(ApproverRole::FinanceManager, "any", Some("p")),
            Some("new".to_string())
        );
    }
}

//! HTTP API layer with Axum routes and extractors.
//!
//! This crate provides:
//! - REST API routes for budgets and procurement requests
//! - The acting-user extractor
//! - JSON error responses

pub mod middleware;
pub mod routes;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use procura_core::approval::{ApprovalError, ApprovalPlanner};
use procura_core::budget::{BudgetEvaluator, BudgetPolicy};
use procura_db::{ApproverRegistry, BudgetRepository, ProcurementRepository};
use procura_shared::AppConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Budget envelopes.
    pub budgets: BudgetRepository,
    /// Approver role holders.
    pub approvers: ApproverRegistry,
    /// Procurement requests.
    pub procurement: ProcurementRepository,
}

impl AppState {
    /// Creates empty repositories evaluated under `policy` with the default approval thresholds.
    #[must_use]
    pub fn new(policy: BudgetPolicy) -> Self {
        Self::with_planner(policy, ApprovalPlanner::default())
    }

    /// Creates empty repositories evaluated under `policy` and planned by `planner`.
    #[must_use]
    pub fn with_planner(policy: BudgetPolicy, planner: ApprovalPlanner) -> Self {
        let budgets = BudgetRepository::new();
        let approvers = ApproverRegistry::new();
        let procurement = ProcurementRepository::new(
            budgets.clone(),
            approvers.clone(),
            planner,
            BudgetEvaluator::new(policy),
        );
        Self {
            budgets,
            approvers,
            procurement,
        }
    }

    /// Creates state from application configuration.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalError::InvalidThresholds` when configured thresholds do not ascend.
    pub fn from_config(config: &AppConfig) -> Result<Self, ApprovalError> {
        Ok(Self::with_planner(
            BudgetPolicy::from(&config.budget),
            ApprovalPlanner::try_from(&config.approval)?,
        ))
    }

    /// The budget evaluator shared by all checks.
    #[must_use]
    pub fn evaluator(&self) -> &BudgetEvaluator {
        self.procurement.evaluator()
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

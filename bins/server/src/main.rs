//! Procura API Server
//!
//! Main entry point for the procurement approval service.

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use procura_api::{AppState, create_router};
use procura_db::SeedData;
use procura_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "procura=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;
    info!(
        currency = %config.budget.currency,
        high_value_threshold = %config.budget.high_value_threshold,
        block_when_unbudgeted = config.budget.block_when_unbudgeted,
        "Budget policy configured"
    );

    // Create application state
    let state = AppState::from_config(&config).context("Invalid approval configuration")?;
    info!(
        departments = config.approval.departments.len(),
        "Approval thresholds configured"
    );

    if let Some(path) = &config.seed.path {
        let summary = SeedData::load(path)
            .and_then(|seed| seed.apply(&state.budgets, &state.approvers))
            .with_context(|| format!("Failed to seed from {path}"))?;
        info!(
            path = %path,
            budgets = summary.budgets,
            approvers = summary.approvers,
            "Seed applied"
        );
    }

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

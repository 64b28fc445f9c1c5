//! Application configuration management.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Budget check configuration.
    #[serde(default)]
    pub budget: BudgetConfig,
    /// Approval level thresholds.
    #[serde(default)]
    pub approval: ApprovalConfig,
    /// Fixture loading configuration.
    #[serde(default)]
    pub seed: SeedConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Budget check configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BudgetConfig {
    /// Requests above this amount get a phasing recommendation.
    #[serde(default = "default_high_value_threshold")]
    pub high_value_threshold: Decimal,
    /// Currency label used in budget diagnostics.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// When true, a check with no budget envelopes at all is reported as unavailable.
    #[serde(default)]
    pub block_when_unbudgeted: bool,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            high_value_threshold: default_high_value_threshold(),
            currency: default_currency(),
            block_when_unbudgeted: false,
        }
    }
}

fn default_high_value_threshold() -> Decimal {
    Decimal::from(50_000)
}

fn default_currency() -> String {
    "EGP".to_string()
}

/// Approval level thresholds, with optional per-department overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApprovalConfig {
    /// Thresholds for departments without an override.
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    /// Overrides keyed by department name.
    #[serde(default)]
    pub departments: HashMap<String, ThresholdConfig>,
}

/// Inclusive upper bounds of the low, medium and high approval levels.
#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdConfig {
    /// Upper bound of the low level.
    #[serde(default = "default_low_max")]
    pub low_max: Decimal,
    /// Upper bound of the medium level.
    #[serde(default = "default_medium_max")]
    pub medium_max: Decimal,
    /// Upper bound of the high level.
    #[serde(default = "default_high_max")]
    pub high_max: Decimal,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            low_max: default_low_max(),
            medium_max: default_medium_max(),
            high_max: default_high_max(),
        }
    }
}

fn default_low_max() -> Decimal {
    Decimal::from(10_000)
}

fn default_medium_max() -> Decimal {
    Decimal::from(50_000)
}

fn default_high_max() -> Decimal {
    Decimal::from(200_000)
}

/// Fixture loading configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedConfig {
    /// Optional path to a JSON file with budget envelopes to load at startup.
    pub path: Option<String>,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("PROCURA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, Result};

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "HELPDESK_DISPATCH";

/// Dispatch engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Routing behaviour
    pub routing: RoutingConfig,

    /// Last-resort group mapping used when no rule or category applies
    pub defaults: DefaultRoutingConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Maximum number of categories visited by the fallback walk
    pub max_category_depth: usize,

    /// Which calendar day "today" refers to when counting assignments
    pub day_boundary: DayBoundary,

    /// Spawn the rule usage increment instead of awaiting it
    pub record_usage_in_background: bool,
}

/// Time zone used to find the start of the current day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DayBoundary {
    /// Midnight UTC
    Utc,
    /// Midnight on the host clock
    Local,
    /// Midnight in a fixed business time zone
    FixedOffset { offset_minutes: i32 },
}

/// Hardcoded default routing, resolved from group names at start-up
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultRoutingConfig {
    /// Group receiving software issues
    pub software_group: String,

    /// Group receiving everything else (hardware, endpoints, unknown)
    pub endpoint_group: String,

    /// Keywords selecting the software bucket when found in the issue type
    pub software_issue_types: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL
    pub database_url: String,

    /// Maximum pooled connections
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is not set
    pub level: String,

    /// Emit JSON lines
    pub json: bool,

    /// Include file and line information
    pub file_info: bool,
}

impl DispatchConfig {
    /// Load configuration from defaults, an optional TOML file and the environment
    ///
    /// Environment variables use the `HELPDESK_DISPATCH_` prefix and `__` between
    /// nested keys, e.g. `HELPDESK_DISPATCH_ROUTING__MAX_CATEGORY_DEPTH=3`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&DispatchConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        let config: DispatchConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text layered over the defaults
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: DispatchConfig = config::Config::builder()
            .add_source(config::Config::try_from(&DispatchConfig::default())?)
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<()> {
        if self.routing.max_category_depth == 0 {
            return Err(DispatchError::config("max_category_depth must be greater than 0"));
        }

        if self.routing.max_category_depth > 32 {
            return Err(DispatchError::config("max_category_depth cannot exceed 32"));
        }

        if let DayBoundary::FixedOffset { offset_minutes } = self.routing.day_boundary {
            if offset_minutes.abs() >= 24 * 60 {
                return Err(DispatchError::config(format!(
                    "day_boundary offset out of range: {} minutes",
                    offset_minutes
                )));
            }
        }

        if self.defaults.software_group.trim().is_empty() {
            return Err(DispatchError::config("software_group cannot be empty"));
        }

        if self.defaults.endpoint_group.trim().is_empty() {
            return Err(DispatchError::config("endpoint_group cannot be empty"));
        }

        if self.database.database_url.is_empty() {
            return Err(DispatchError::config("database_url cannot be empty"));
        }

        if self.database.max_connections == 0 {
            return Err(DispatchError::config("max_connections must be greater than 0"));
        }

        Ok(())
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_category_depth: 5,
            day_boundary: DayBoundary::Utc,
            record_usage_in_background: true,
        }
    }
}

impl Default for DefaultRoutingConfig {
    fn default() -> Self {
        Self {
            software_group: "Software Support".to_string(),
            endpoint_group: "Endpoint Support".to_string(),
            software_issue_types: vec!["software".to_string(), "application".to_string()],
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://helpdesk.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_info: false,
        }
    }
}

//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings.
//! Configuration is loaded from a TOML file; the database URL may be
//! overridden with `DASHMETRICS_DATABASE_URL`.
//!
//! # Example
//!
//! ```no_run
//! use dashmetrics::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("dashmetrics.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

use super::logging::LoggingConfig;
use crate::application::range::RangeResolver;
use crate::domain::{Rounding, RoundingMode};
use crate::error::{ConfigError, Result};
use crate::port::outbound::clock::Clock;

/// Environment variable that replaces `database.url`.
pub const DATABASE_URL_ENV: &str = "DASHMETRICS_DATABASE_URL";

/// Largest accepted `metrics.precision`.
const MAX_PRECISION: u32 = 10;

/// Parse an IANA timezone name.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` for names outside the IANA database.
#[allow(clippy::result_large_err)]
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>().map_err(|e| {
        ConfigError::InvalidValue {
            field: "timezone",
            reason: e.to_string(),
        }
        .into()
    })
}

/// Defaults applied to every metric built from the CLI.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// IANA timezone name used for range boundaries and bucket keys.
    pub timezone: String,
    /// Render hour and minute labels on a 12-hour clock.
    pub twelve_hour_time: bool,
    /// Decimal places kept on reported values.
    pub precision: u32,
    pub rounding: RoundingMode,
    /// Cache results for this many seconds. Unset disables caching.
    pub cache_ttl_secs: Option<u64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".into(),
            twelve_hour_time: true,
            precision: 0,
            rounding: RoundingMode::default(),
            cache_ttl_secs: None,
        }
    }
}

/// SQLite connection and column conventions.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub key_column: String,
    pub created_at_column: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "dashmetrics.db".into(),
            pool_size: 4,
            key_column: "id".into(),
            created_at_column: "created_at".into(),
        }
    }
}

/// Extra range names registered on the resolver.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RangesConfig {
    /// Alias name to the token it stands for, e.g. `fortnight = "P2W"`.
    pub aliases: BTreeMap<String, String>,
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub ranges: RangesConfig,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;

        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            config.database.url = url;
        }

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Load from `path` when it exists, otherwise use defaults with the
    /// environment override applied.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`] for an existing file.
    #[allow(clippy::result_large_err)]
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Self::parse_toml("")
        }
    }

    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        self.timezone()?;

        if self.metrics.precision > MAX_PRECISION {
            return Err(ConfigError::InvalidValue {
                field: "precision",
                reason: format!("must be {MAX_PRECISION} or less"),
            }
            .into());
        }
        if self.metrics.cache_ttl_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "cache_ttl_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "url" }.into());
        }
        if self.database.pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pool_size",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if let Some((name, _)) = self.ranges.aliases.iter().find(|(name, _)| name.is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "aliases",
                reason: format!("alias name must not be empty (got '{name}')"),
            }
            .into());
        }

        Ok(())
    }

    /// The configured metric timezone.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for names outside the IANA database.
    #[allow(clippy::result_large_err)]
    pub fn timezone(&self) -> Result<Tz> {
        parse_timezone(&self.metrics.timezone)
    }

    /// Default rounding for metric values.
    #[must_use]
    pub fn rounding(&self) -> Rounding {
        Rounding::new(self.metrics.precision, self.metrics.rounding)
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.metrics.cache_ttl_secs.map(Duration::from_secs)
    }

    /// A resolver with the built-in ranges plus the configured aliases.
    #[must_use]
    pub fn resolver(&self, clock: Arc<dyn Clock>) -> RangeResolver {
        let mut resolver = RangeResolver::new(clock);
        for (name, token) in &self.ranges.aliases {
            resolver.alias(name.clone(), token.clone());
        }
        resolver
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

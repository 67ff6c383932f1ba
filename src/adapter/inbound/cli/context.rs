//! Wiring shared by command handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use super::command::{SourceArgs, TimeArgs};
use crate::adapter::outbound::clock::{FixedClock, SystemClock};
use crate::adapter::outbound::memory::MemoryCache;
use crate::adapter::outbound::sqlite::connection::create_pool;
use crate::adapter::outbound::sqlite::source::SqliteSource;
use crate::application::range::RangeResolver;
use crate::application::resolve::MetricContext;
use crate::domain::Rounding;
use crate::error::Result;
use crate::infrastructure::config::settings::{parse_timezone, Config};
use crate::port::outbound::clock::Clock;

/// Configuration plus the per-invocation clock and timezone.
pub struct CommandContext {
    pub config: Config,
    clock: Arc<dyn Clock>,
    timezone: Tz,
}

impl CommandContext {
    /// Apply `--now` and `--timezone` on top of `config`.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for an unknown timezone.
    pub fn new(config: Config, time: &TimeArgs) -> Result<Self> {
        let timezone = match &time.timezone {
            Some(name) => parse_timezone(name)?,
            None => config.timezone()?,
        };
        Ok(Self {
            config,
            clock: clock(time.now),
            timezone,
        })
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn now(&self) -> DateTime<Tz> {
        self.clock.now_in(self.timezone)
    }

    pub fn resolver(&self) -> RangeResolver {
        self.config.resolver(self.clock.clone())
    }

    /// Configured rounding with CLI overrides applied.
    pub fn rounding(&self, args: &SourceArgs) -> Rounding {
        let defaults = self.config.rounding();
        Rounding::new(
            args.precision.unwrap_or(defaults.precision),
            args.rounding.unwrap_or(defaults.mode),
        )
    }

    /// Open the SQLite table named by `args` and build a metric context over it.
    ///
    /// # Errors
    /// Returns an error if the connection pool cannot be created.
    pub fn metric_context(&self, args: &SourceArgs) -> Result<MetricContext> {
        let database = &self.config.database;
        let url = args.db.as_deref().unwrap_or(&database.url);
        let pool = create_pool(url, database.pool_size)?;
        let source = SqliteSource::new(pool, args.table.clone())
            .with_key_column(database.key_column.clone())
            .with_created_at_column(database.created_at_column.clone());

        let context = MetricContext::new(Arc::new(source), Arc::new(self.resolver()));
        Ok(match self.config.cache_ttl() {
            Some(_) => context.with_cache(Arc::new(MemoryCache::new())),
            None => context,
        })
    }
}

fn clock(now: Option<DateTime<Utc>>) -> Arc<dyn Clock> {
    match now {
        Some(now) => Arc::new(FixedClock::new(now)),
        None => Arc::new(SystemClock),
    }
}

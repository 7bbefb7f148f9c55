//! Cache settings.
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional `evocache.toml` (or an explicit file), then `EVOCACHE_*`
//! environment variables.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SettingsError};

const DEFAULT_TTL_MS: u64 = 300_000;
const DEFAULT_SWEEP_INTERVAL_MS: u64 = 60_000;
const ENV_PREFIX: &str = "EVOCACHE";
const DEFAULT_FILE: &str = "evocache";

/// Tunables shared by the cache and its background sweeper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// TTL applied when `set` is called without one (default: 5 minutos).
    #[serde(default = "default_ttl_ms")]
    pub default_ttl_ms: u64,

    /// Interval between expiry sweeps (default: 1 minuto).
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

fn default_ttl_ms() -> u64 {
    DEFAULT_TTL_MS
}

fn default_sweep_interval_ms() -> u64 {
    DEFAULT_SWEEP_INTERVAL_MS
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_ms: DEFAULT_TTL_MS,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
        }
    }
}

impl CacheSettings {
    /// Loads settings from `evocache.toml` (if present) and the environment.
    pub fn load() -> Result<Self> {
        Self::build(config::File::with_name(DEFAULT_FILE).required(false))
    }

    /// Loads settings from the given file (which must exist) and the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::build(config::File::from(path.as_ref()).required(true))
    }

    fn build<S>(file: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings: Self = config::Config::builder()
            .set_default("default_ttl_ms", DEFAULT_TTL_MS)?
            .set_default("sweep_interval_ms", DEFAULT_SWEEP_INTERVAL_MS)?
            .add_source(file)
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        debug!(
            default_ttl_ms = settings.default_ttl_ms,
            sweep_interval_ms = settings.sweep_interval_ms,
            "Cache settings loaded"
        );
        Ok(settings)
    }

    /// Rejects values the sweeper cannot run with.
    ///
    /// A zero default TTL is accepted: entries then expire on the next check.
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval_ms == 0 {
            return Err(SettingsError::invalid(
                "sweep_interval_ms",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

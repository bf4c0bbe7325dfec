//! Scheduler configuration.
//!
//! ```toml
//! strategy = "interval"
//! interval_ms = 5
//! halt_policy = "latch"
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable read by [`SchedulerConfig::from_env`].
pub const TICK_ENV: &str = "SLUICE_TICK";

const DEFAULT_INTERVAL_MS: u64 = 1;

/// How a scheduled tick is deferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickStrategy {
    /// Yield to the executor once, then run.
    #[default]
    Yield,
    /// Sleep for `interval_ms`, then run.
    Interval,
}

/// What a loop does when it stops itself (predicate falsy or a step
/// returning `false`) without an explicit break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltPolicy {
    /// Return to idle: `run` may be called again, `break` reports not running.
    #[default]
    Reset,
    /// Stop ticking but stay "looping" until `break` is called.
    Latch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub strategy: TickStrategy,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub halt_policy: HaltPolicy,
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            strategy: TickStrategy::default(),
            interval_ms: DEFAULT_INTERVAL_MS,
            halt_policy: HaltPolicy::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Defaults, overridden by `SLUICE_TICK` when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(TICK_ENV) {
            config.apply_tick(&raw)?;
        }
        Ok(config)
    }

    /// Parse `yield`, `interval` or `interval:<ms>`.
    pub fn apply_tick(&mut self, raw: &str) -> Result<(), ConfigError> {
        let raw = raw.trim();
        match raw.split_once(':') {
            None if raw.eq_ignore_ascii_case("yield") => self.strategy = TickStrategy::Yield,
            None if raw.eq_ignore_ascii_case("interval") => self.strategy = TickStrategy::Interval,
            Some((name, ms)) if name.eq_ignore_ascii_case("interval") => {
                self.interval_ms = ms
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidTick(raw.to_string()))?;
                self.strategy = TickStrategy::Interval;
            }
            _ => return Err(ConfigError::InvalidTick(raw.to_string())),
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

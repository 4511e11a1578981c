/*!
 * Mutex Configuration
 *
 * Immutable acquisition and backoff parameters fixed at construction
 */

use crate::core::errors::{LockError, LockResult};
use crate::core::limits::{
    DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_CEILING, DEFAULT_LOCK_TIMEOUT, ENV_BACKOFF_BASE_MS,
    ENV_BACKOFF_CEILING, ENV_LOCK_TIMEOUT_MS, MAX_BACKOFF_CEILING,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::env::VarError;
use std::str::FromStr;
use std::time::Duration;

/// Mutex configuration
///
/// Durations serialize as integer milliseconds.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutexConfig {
    /// Maximum total wait per `run` call, measured from call entry
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub timeout: Duration,
    /// Backoff unit
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub base: Duration,
    /// Maximum backoff exponent
    pub ceiling: u32,
}

impl Default for MutexConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_LOCK_TIMEOUT,
            base: DEFAULT_BACKOFF_BASE,
            ceiling: DEFAULT_BACKOFF_CEILING,
        }
    }
}

impl MutexConfig {
    /// Create and validate a configuration
    pub fn new(timeout: Duration, base: Duration, ceiling: u32) -> LockResult<Self> {
        let config = Self {
            timeout,
            base,
            ceiling,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the environment, falling back to defaults
    ///
    /// Environment variables:
    /// - LOCK_TIMEOUT_MS: acquisition timeout (default: 3000)
    /// - LOCK_BACKOFF_BASE_MS: backoff unit (default: 1)
    /// - LOCK_BACKOFF_CEILING: maximum backoff exponent (default: 10)
    pub fn from_env() -> LockResult<Self> {
        let defaults = Self::default();

        let timeout = env_value::<u64>(ENV_LOCK_TIMEOUT_MS)?
            .map(Duration::from_millis)
            .unwrap_or(defaults.timeout);
        let base = env_value::<u64>(ENV_BACKOFF_BASE_MS)?
            .map(Duration::from_millis)
            .unwrap_or(defaults.base);
        let ceiling = env_value::<u32>(ENV_BACKOFF_CEILING)?.unwrap_or(defaults.ceiling);

        Self::new(timeout, base, ceiling)
    }

    /// Check the invariants the backoff algorithm relies on
    pub fn validate(&self) -> LockResult<()> {
        if self.ceiling > MAX_BACKOFF_CEILING {
            return Err(LockError::InvalidConfig(format!(
                "backoff ceiling {} exceeds maximum {}",
                self.ceiling, MAX_BACKOFF_CEILING
            )));
        }

        if self.base.is_zero() && self.ceiling > 0 {
            return Err(LockError::InvalidConfig(
                "backoff base must be non-zero when ceiling > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Theoretical maximum single backoff, ignoring the time left
    ///
    /// `(2^ceiling - 1) * base`
    pub fn max_backoff(&self) -> Duration {
        let window = (1u64 << self.ceiling.min(MAX_BACKOFF_CEILING)) - 1;
        self.base.saturating_mul(window as u32)
    }
}

fn env_value<T: FromStr>(key: &str) -> LockResult<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| LockError::InvalidConfig(format!("{key}={raw:?} is not a valid value"))),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(raw)) => Err(LockError::InvalidConfig(format!(
            "{key}={raw:?} is not valid unicode"
        ))),
    }
}

/*!
 * Lock Limits and Constants
 *
 * Centralized location for the mutex defaults, bounds and environment keys.
 *
 * ## Conventions
 * - Durations are expressed in milliseconds at the configuration boundary
 */

use std::time::Duration;

// =============================================================================
// ACQUISITION
// =============================================================================

/// Maximum total wait per acquisition attempt (3s)
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(3_000);

// =============================================================================
// BACKOFF
// =============================================================================

/// Backoff unit (1ms)
/// Every randomized wait is an integer multiple of this
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(1);

/// Maximum backoff exponent
/// With the default base the widest window is (2^10 - 1) * 1ms = 1023ms
pub const DEFAULT_BACKOFF_CEILING: u32 = 10;

/// Upper bound accepted for the backoff exponent
/// Keeps the jitter window representable as a u32 multiplier of the base
pub const MAX_BACKOFF_CEILING: u32 = 31;

// =============================================================================
// MONITORING
// =============================================================================

/// Events kept by an in-memory recording sink before the oldest is evicted
pub const DEFAULT_RECORDING_CAPACITY: usize = 1024;

// =============================================================================
// ENVIRONMENT
// =============================================================================

pub const ENV_LOCK_TIMEOUT_MS: &str = "LOCK_TIMEOUT_MS";
pub const ENV_BACKOFF_BASE_MS: &str = "LOCK_BACKOFF_BASE_MS";
pub const ENV_BACKOFF_CEILING: &str = "LOCK_BACKOFF_CEILING";
pub const ENV_TRACE_JSON: &str = "LOCK_TRACE_JSON";

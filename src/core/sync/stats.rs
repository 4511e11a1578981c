/*!
 * Contention Statistics
 *
 * Monotonic high-water marks updated with `fetch_max`; never reset.
 */

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Running maxima for one mutex instance
#[derive(Debug, Default)]
pub(crate) struct LockStats {
    max_waiters: AtomicUsize,
    max_lock_wait_nanos: AtomicU64,
    max_lock_attempts: AtomicU32,
}

impl LockStats {
    pub(crate) const fn new() -> Self {
        Self {
            max_waiters: AtomicUsize::new(0),
            max_lock_wait_nanos: AtomicU64::new(0),
            max_lock_attempts: AtomicU32::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_waiters(&self, waiters: usize) {
        self.max_waiters.fetch_max(waiters, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_wait(&self, waited: Duration, attempts: u32) {
        let nanos = u64::try_from(waited.as_nanos()).unwrap_or(u64::MAX);
        self.max_lock_wait_nanos.fetch_max(nanos, Ordering::Relaxed);
        self.max_lock_attempts.fetch_max(attempts, Ordering::Relaxed);
    }

    pub(crate) fn max_waiters(&self) -> usize {
        self.max_waiters.load(Ordering::Relaxed)
    }

    pub(crate) fn max_lock_wait_time(&self) -> Duration {
        Duration::from_nanos(self.max_lock_wait_nanos.load(Ordering::Relaxed))
    }

    pub(crate) fn max_lock_attempts(&self) -> u32 {
        self.max_lock_attempts.load(Ordering::Relaxed)
    }
}

/// Point-in-time view of a mutex
///
/// Fields are read independently; under contention the snapshot is not a
/// single atomic cut across all of them.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutexStatus {
    /// A work unit is currently executing
    pub locked: bool,
    /// Callers currently backing off
    pub waiters: usize,
    pub max_waiters: usize,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub max_lock_wait_time: Duration,
    pub max_lock_attempts: u32,
}

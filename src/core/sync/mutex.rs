/*!
 * Async Mutex with Randomized Backoff
 *
 * Serializes asynchronous critical sections across tasks sharing one
 * resource. There is no wait queue: a caller that finds the lock held
 * registers as a waiter and polls it again after a full-jitter exponential
 * backoff, until it acquires or its deadline passes.
 *
 * # Ordering
 *
 * Acquisition among waiters is NOT first-come-first-served. Each waiter
 * re-tests independently, so a later caller with a shorter backoff may win
 * over an earlier one. Callers must not rely on fairness.
 *
 * # Reentrancy
 *
 * The lock is not reentrant. A work unit that calls `run` on the same mutex
 * waits on itself until it times out.
 */

use super::backoff::Backoff;
use super::config::MutexConfig;
use super::guard::{HoldGuard, WaiterGuard};
use super::stats::{LockStats, MutexStatus};
use crate::core::errors::{LockError, LockResult};
use crate::monitoring::{LockEvent, TraceSink, TracingSink};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Asynchronous mutual-exclusion lock
///
/// # Example
///
/// ```
/// use lock_async::{AsyncMutex, MutexConfig};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), lock_async::LockError> {
/// let config = MutexConfig::new(Duration::from_millis(200), Duration::from_millis(1), 10)?;
/// let mutex = AsyncMutex::new(config)?;
///
/// let answer = mutex.run(|| async { 42 }).await?;
/// assert_eq!(answer, 42);
/// assert!(!mutex.status().locked);
/// # Ok(())
/// # }
/// ```
pub struct AsyncMutex {
    locked: AtomicBool,
    waiters: AtomicUsize,
    stats: LockStats,
    config: MutexConfig,
    backoff: Backoff,
    sink: Arc<dyn TraceSink>,
}

impl AsyncMutex {
    /// Create a mutex reporting to `tracing`
    pub fn new(config: MutexConfig) -> LockResult<Self> {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    /// Create a mutex reporting to a custom sink
    pub fn with_sink(config: MutexConfig, sink: Arc<dyn TraceSink>) -> LockResult<Self> {
        config.validate()?;
        Ok(Self::build(config, sink))
    }

    /// Create with default configuration (3s timeout, 1ms base, ceiling 10)
    pub fn with_defaults() -> Self {
        Self::build(MutexConfig::default(), Arc::new(TracingSink))
    }

    fn build(config: MutexConfig, sink: Arc<dyn TraceSink>) -> Self {
        sink.trace(&LockEvent::Created {
            timeout: config.timeout,
            base: config.base,
            ceiling: config.ceiling,
            max_backoff: config.max_backoff(),
        });

        Self {
            locked: AtomicBool::new(false),
            waiters: AtomicUsize::new(0),
            stats: LockStats::new(),
            backoff: Backoff::new(config.base, config.ceiling),
            config,
            sink,
        }
    }

    /// Run `work` while holding the lock
    ///
    /// `work` is invoked at most once, and only after the lock is acquired.
    /// Its output is returned as-is; a fallible work unit therefore yields
    /// `Ok(Err(e))` with its own error untouched.
    ///
    /// The lock is released however the work unit ends, including a panic
    /// or this future being dropped.
    ///
    /// # Errors
    ///
    /// [`LockError::Timeout`] if the lock stays held for the configured
    /// timeout, measured from this call. `work` never runs in that case.
    pub async fn run<F, Fut, T>(&self, work: F) -> LockResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _hold = self.acquire().await?;
        Ok(work().await)
    }

    /// Like [`run`](Self::run) for fallible work units, flattening the
    /// lock's error into the work unit's error type
    pub async fn try_run<F, Fut, T, E>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<LockError>,
    {
        self.run(work).await?
    }

    async fn acquire(&self) -> LockResult<HoldGuard<'_>> {
        let started = Instant::now();
        let mut attempt = 1u32;

        if let Some(hold) = self.try_hold() {
            self.on_acquired(attempt, Duration::ZERO, true);
            return Ok(hold);
        }

        let deadline = started + self.config.timeout;
        let (waiter, count) = WaiterGuard::register(&self.waiters);
        self.stats.record_waiters(count);

        loop {
            let now = Instant::now();
            let time_left = deadline.saturating_duration_since(now);

            if time_left.is_zero() {
                drop(waiter);
                let waited = now.duration_since(started);
                self.stats.record_wait(waited, attempt);
                self.sink.trace(&LockEvent::TimedOut {
                    attempts: attempt,
                    waited,
                    timeout: self.config.timeout,
                });
                return Err(LockError::Timeout(self.config.timeout));
            }

            let wait = self.backoff.wait_time(attempt, time_left);
            self.sink.trace(&LockEvent::Backoff {
                attempt,
                time_left,
                wait,
            });

            if wait.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(wait).await;
            }

            attempt = attempt.saturating_add(1);

            if let Some(hold) = self.try_hold() {
                drop(waiter);
                self.on_acquired(attempt, started.elapsed(), false);
                return Ok(hold);
            }
        }
    }

    #[inline]
    fn try_hold(&self) -> Option<HoldGuard<'_>> {
        HoldGuard::try_acquire(&self.locked, self.sink.as_ref())
    }

    fn on_acquired(&self, attempt: u32, waited: Duration, fast_path: bool) {
        self.stats.record_wait(waited, attempt);
        self.sink.trace(&LockEvent::Acquired {
            attempt,
            waited,
            fast_path,
        });
    }

    /// Snapshot of the current state and running maxima
    pub fn status(&self) -> MutexStatus {
        MutexStatus {
            locked: self.is_locked(),
            waiters: self.waiters(),
            max_waiters: self.stats.max_waiters(),
            max_lock_wait_time: self.stats.max_lock_wait_time(),
            max_lock_attempts: self.stats.max_lock_attempts(),
        }
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    #[inline]
    pub fn waiters(&self) -> usize {
        self.waiters.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &MutexConfig {
        &self.config
    }
}

impl Default for AsyncMutex {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for AsyncMutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncMutex")
            .field("config", &self.config)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::RecordingSink;
    use tokio::time::sleep;

    fn recording_mutex(timeout_ms: u64) -> (AsyncMutex, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let config =
            MutexConfig::new(Duration::from_millis(timeout_ms), Duration::from_millis(1), 10).unwrap();
        let mutex = AsyncMutex::with_sink(config, sink.clone()).unwrap();
        (mutex, sink)
    }

    #[test]
    fn test_new_is_unlocked() {
        let mutex = AsyncMutex::with_defaults();
        let status = mutex.status();

        assert!(!status.locked);
        assert_eq!(status.waiters, 0);
        assert_eq!(status.max_waiters, 0);
        assert_eq!(status.max_lock_wait_time, Duration::ZERO);
        assert_eq!(status.max_lock_attempts, 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = MutexConfig {
            ceiling: 40,
            ..Default::default()
        };
        assert!(matches!(AsyncMutex::new(config), Err(LockError::InvalidConfig(_))));
    }

    #[test]
    fn test_creation_is_traced() {
        let (_mutex, sink) = recording_mutex(200);
        assert_eq!(
            sink.events(),
            vec![LockEvent::Created {
                timeout: Duration::from_millis(200),
                base: Duration::from_millis(1),
                ceiling: 10,
                max_backoff: Duration::from_millis(1_023),
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_path_trace() {
        let (mutex, sink) = recording_mutex(200);

        mutex.run(|| async {}).await.unwrap();

        let events = sink.events();
        assert!(matches!(
            events[1],
            LockEvent::Acquired {
                attempt: 1,
                fast_path: true,
                ..
            }
        ));
        assert!(matches!(events[2], LockEvent::Released { .. }));
        assert_eq!(sink.count("backoff"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_contended_trace_has_backoff() {
        let (mutex, sink) = recording_mutex(200);

        let (first, second) = tokio::join!(
            mutex.run(|| sleep(Duration::from_millis(20))),
            mutex.run(|| async {})
        );
        first.unwrap();
        second.unwrap();

        assert!(sink.count("backoff") >= 1);
        assert_eq!(sink.count("acquired"), 2);
        assert_eq!(sink.count("released"), 2);
        assert_eq!(mutex.status().max_waiters, 1);
        assert!(mutex.status().max_lock_attempts >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_traced() {
        let (mutex, sink) = recording_mutex(50);

        let (first, second) = tokio::join!(
            mutex.run(|| sleep(Duration::from_millis(100))),
            mutex.run(|| async {})
        );
        first.unwrap();
        assert_eq!(second, Err(LockError::Timeout(Duration::from_millis(50))));

        assert_eq!(sink.count("timed_out"), 1);
        assert_eq!(sink.count("acquired"), 1);
        assert!(mutex.status().max_lock_wait_time >= Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_run_flattens_errors() {
        #[derive(Debug, PartialEq)]
        enum AppError {
            Lock(LockError),
            Work(&'static str),
        }

        impl From<LockError> for AppError {
            fn from(err: LockError) -> Self {
                AppError::Lock(err)
            }
        }

        let (mutex, _) = recording_mutex(200);

        let ok: Result<u8, AppError> = mutex.try_run(|| async { Ok(7) }).await;
        assert_eq!(ok, Ok(7));

        let failed: Result<u8, AppError> = mutex.try_run(|| async { Err(AppError::Work("boom")) }).await;
        assert_eq!(failed, Err(AppError::Work("boom")));
        assert!(!mutex.is_locked());
    }
}

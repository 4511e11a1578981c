/*!
 * Scoped Lock Guards
 *
 * RAII guards that restore the mutex's shared state on every exit path:
 * normal return, error, panic inside the work unit, or the `run` future
 * being dropped mid-flight.
 */

use crate::monitoring::{LockEvent, TraceSink};
use std::sync::atomic::{
    AtomicBool, AtomicUsize,
    Ordering::{AcqRel, Acquire, Relaxed, Release},
};
use tokio::time::Instant;

/// Registration of one caller in the waiter count
///
/// Decrements the count exactly once, when dropped.
pub(crate) struct WaiterGuard<'a> {
    waiters: &'a AtomicUsize,
}

impl<'a> WaiterGuard<'a> {
    /// Register a waiter, returning the guard and the count including it
    #[inline]
    pub(crate) fn register(waiters: &'a AtomicUsize) -> (Self, usize) {
        let count = waiters.fetch_add(1, AcqRel) + 1;
        (Self { waiters }, count)
    }
}

impl Drop for WaiterGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.waiters.fetch_sub(1, AcqRel);
    }
}

/// Ownership of the lock flag
///
/// Only constructible by winning the `false -> true` transition; releases the
/// flag when dropped.
pub(crate) struct HoldGuard<'a> {
    locked: &'a AtomicBool,
    sink: &'a dyn TraceSink,
    acquired_at: Instant,
}

impl<'a> HoldGuard<'a> {
    #[inline]
    pub(crate) fn try_acquire(locked: &'a AtomicBool, sink: &'a dyn TraceSink) -> Option<Self> {
        locked
            .compare_exchange(false, true, Acquire, Relaxed)
            .ok()
            .map(|_| Self {
                locked,
                sink,
                acquired_at: Instant::now(),
            })
    }
}

impl Drop for HoldGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        // Traced before the flag clears so the next `Acquired` always follows it
        self.sink.trace(&LockEvent::Released {
            held: self.acquired_at.elapsed(),
        });
        self.locked.store(false, Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::{NoopSink, RecordingSink};

    #[test]
    fn test_waiter_guard_counts_once() {
        let waiters = AtomicUsize::new(0);

        let (first, count) = WaiterGuard::register(&waiters);
        assert_eq!(count, 1);
        let (second, count) = WaiterGuard::register(&waiters);
        assert_eq!(count, 2);

        drop(first);
        assert_eq!(waiters.load(Relaxed), 1);
        drop(second);
        assert_eq!(waiters.load(Relaxed), 0);
    }

    #[tokio::test]
    async fn test_hold_guard_is_exclusive() {
        let locked = AtomicBool::new(false);
        let sink = NoopSink;

        let hold = HoldGuard::try_acquire(&locked, &sink).expect("lock should be free");
        assert!(locked.load(Relaxed));
        assert!(HoldGuard::try_acquire(&locked, &sink).is_none());

        drop(hold);
        assert!(!locked.load(Relaxed));
        assert!(HoldGuard::try_acquire(&locked, &sink).is_some());
    }

    #[tokio::test]
    async fn test_release_is_traced() {
        let locked = AtomicBool::new(false);
        let sink = RecordingSink::default();

        drop(HoldGuard::try_acquire(&locked, &sink));
        assert_eq!(sink.count("released"), 1);
    }
}

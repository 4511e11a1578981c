/*!
 * Lock Trace Sink
 *
 * The mutex reports construction parameters, backoff decisions and lock
 * transitions to a [`TraceSink`]. The default sink forwards them to `tracing`;
 * monitors can install a [`RecordingSink`] to inspect recent events.
 */

use crate::core::limits::DEFAULT_RECORDING_CAPACITY;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMicroSeconds};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, warn};

/// Structured lock event
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LockEvent {
    /// Mutex constructed
    Created {
        #[serde_as(as = "DurationMicroSeconds<u64>")]
        timeout: Duration,
        #[serde_as(as = "DurationMicroSeconds<u64>")]
        base: Duration,
        ceiling: u32,
        #[serde_as(as = "DurationMicroSeconds<u64>")]
        max_backoff: Duration,
    },
    /// Caller took the lock
    Acquired {
        attempt: u32,
        #[serde_as(as = "DurationMicroSeconds<u64>")]
        waited: Duration,
        fast_path: bool,
    },
    /// Caller found the lock held and is about to back off
    Backoff {
        attempt: u32,
        #[serde_as(as = "DurationMicroSeconds<u64>")]
        time_left: Duration,
        #[serde_as(as = "DurationMicroSeconds<u64>")]
        wait: Duration,
    },
    /// Holder released the lock
    Released {
        #[serde_as(as = "DurationMicroSeconds<u64>")]
        held: Duration,
    },
    /// Caller gave up without running its work unit
    TimedOut {
        attempts: u32,
        #[serde_as(as = "DurationMicroSeconds<u64>")]
        waited: Duration,
        #[serde_as(as = "DurationMicroSeconds<u64>")]
        timeout: Duration,
    },
}

impl LockEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Acquired { .. } => "acquired",
            Self::Backoff { .. } => "backoff",
            Self::Released { .. } => "released",
            Self::TimedOut { .. } => "timed_out",
        }
    }
}

/// Receiver of lock events
///
/// Called inline on the lock's hot path; implementations must not block.
pub trait TraceSink: Send + Sync {
    fn trace(&self, event: &LockEvent);
}

/// Forwards events to the `tracing` subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn trace(&self, event: &LockEvent) {
        match *event {
            LockEvent::Created {
                timeout,
                base,
                ceiling,
                max_backoff,
            } => debug!(
                target: "lock_async",
                timeout_ms = timeout.as_millis() as u64,
                base_ms = base.as_millis() as u64,
                ceiling,
                max_backoff_ms = max_backoff.as_millis() as u64,
                "mutex created"
            ),
            LockEvent::Acquired {
                attempt,
                waited,
                fast_path,
            } => debug!(
                target: "lock_async",
                attempt,
                waited_us = waited.as_micros() as u64,
                fast_path,
                "locking"
            ),
            LockEvent::Backoff {
                attempt,
                time_left,
                wait,
            } => debug!(
                target: "lock_async",
                attempt,
                time_left_us = time_left.as_micros() as u64,
                wait_us = wait.as_micros() as u64,
                "backing off"
            ),
            LockEvent::Released { held } => debug!(
                target: "lock_async",
                held_us = held.as_micros() as u64,
                "unlocked"
            ),
            LockEvent::TimedOut {
                attempts,
                waited,
                timeout,
            } => warn!(
                target: "lock_async",
                attempts,
                waited_ms = waited.as_millis() as u64,
                timeout_ms = timeout.as_millis() as u64,
                "lock timeout"
            ),
        }
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl TraceSink for NoopSink {
    #[inline(always)]
    fn trace(&self, _event: &LockEvent) {}
}

/// Keeps the most recent events in a bounded ring
#[derive(Debug)]
pub struct RecordingSink {
    events: Mutex<VecDeque<LockEvent>>,
    capacity: usize,
}

impl RecordingSink {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_RECORDING_CAPACITY))),
            capacity,
        }
    }

    /// Copy of the recorded events, oldest first
    pub fn events(&self) -> Vec<LockEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Number of recorded events with the given name
    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| e.name() == name).count()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new(DEFAULT_RECORDING_CAPACITY)
    }
}

impl TraceSink for RecordingSink {
    fn trace(&self, event: &LockEvent) {
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

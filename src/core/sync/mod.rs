/*!
 * Synchronization Primitives
 *
 * Asynchronous mutual exclusion built from a single lock flag and a bounded,
 * randomized-backoff wait instead of a queue of parked tasks.
 *
 * # Architecture
 *
 * - `mutex`: the [`AsyncMutex`] acquisition protocol and public API
 * - `backoff`: full-jitter exponential wait calculation
 * - `guard`: RAII release of the lock flag and waiter registration
 * - `stats`: monotonic contention high-water marks
 * - `config`: immutable timeout and backoff parameters
 *
 * # Guarantees
 *
 * - At most one work unit runs at a time per mutex instance
 * - The lock is released on every exit path of a work unit
 * - A waiter gives up no later than its deadline (plus scheduling latency)
 * - No FIFO ordering among waiters
 */

mod backoff;
mod config;
mod guard;
mod mutex;
mod stats;

pub use config::MutexConfig;
pub use mutex::AsyncMutex;
pub use stats::MutexStatus;

/*!
 * Lock Async Library
 * Asynchronous mutual exclusion with randomized exponential backoff
 */

pub mod core;
pub mod monitoring;

// Re-exports
pub use crate::core::errors::{LockError, LockResult};
pub use crate::core::sync::{AsyncMutex, MutexConfig, MutexStatus};
pub use monitoring::{init_tracing, LockEvent, NoopSink, RecordingSink, TraceSink, TracingSink};

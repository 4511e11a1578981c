/*!
 * Core Module
 * Lock primitive, error handling and limits
 */

pub mod errors;
pub mod limits;
pub mod sync;

// Re-export for convenience
pub use errors::*;
pub use sync::{AsyncMutex, MutexConfig, MutexStatus};

/*!
 * Lock Monitoring
 * Trace sinks for lock events and tracing subscriber setup
 */

mod sink;
mod tracer;

pub use sink::{LockEvent, NoopSink, RecordingSink, TraceSink, TracingSink};
pub use tracer::init_tracing;

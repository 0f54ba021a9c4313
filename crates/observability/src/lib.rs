//! Process-wide tracing setup.

/// Tracing subscriber construction.
pub mod tracing;

pub use crate::tracing::LogOutput;

/// Initialize tracing for the process.
///
/// `filter` takes `EnvFilter` directives; `RUST_LOG` wins when set. Safe to
/// call more than once: later calls are no-ops.
pub fn init(filter: &str, output: LogOutput) {
    crate::tracing::init(filter, output);
}

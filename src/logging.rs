//! Console logging setup for the binary.

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber: `RUST_LOG` if set, `info` otherwise.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ABOUTME: Tracing subscriber setup for the binary
// ABOUTME: Logs go to stderr so stdout carries only command output and NDJSON events

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

//! Tracing subscriber setup for binaries embedding the SDK.

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise `default_directive` (e.g. `dyno_sdk=info`).
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    // A second init (tests, embedding apps) keeps the first subscriber.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

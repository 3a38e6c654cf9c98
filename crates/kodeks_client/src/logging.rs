//! `tracing` setup shared by the binaries. Logs go to stderr so they never mix
//! with the answer text on stdout.

use tracing_subscriber::EnvFilter;

/// Filter directives, e.g. `KODEKS_LOG=kodeks_client=debug`.
pub const LOG_ENV: &str = "KODEKS_LOG";

const DEFAULT_FILTER: &str = "warn";

pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

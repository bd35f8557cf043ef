//! Logging setup for the binary
//!
//! Library code only emits `tracing` events; the CLI installs a
//! `tracing-subscriber` fmt subscriber writing to stderr so stdout stays
//! free for command output.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LogFormat;

/// Filter from `RUST_LOG` when set, else `level` with noisy HTTP crates
/// held at warn.
pub fn build_env_filter(level: &str) -> Result<EnvFilter, String> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directives = [level, "reqwest=warn", "hyper=warn", "hyper_util=warn"].join(",");
    EnvFilter::try_new(&directives).map_err(|e| format!("Invalid log filter '{}': {}", directives, e))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_logging(level: &str, format: LogFormat) -> Result<(), String> {
    let filter = build_env_filter(level)?;

    let layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry().with(layer).try_init().ok();
    Ok(())
}

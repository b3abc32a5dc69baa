//! Tracing initialisation for benchledger binaries.
//!
//! Call [`init_tracing`] once at program start. The filter comes from
//! `BENCHLEDGER_LOG`, then `RUST_LOG`, then the supplied default level.
//! `BENCHLEDGER_LOG_FORMAT=json` forces JSON output even when the caller
//! asked for text.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "BENCHLEDGER_LOG";
/// Environment variable selecting the log format (`json` or `text`).
pub const LOG_FORMAT_ENV: &str = "BENCHLEDGER_LOG_FORMAT";

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

fn json_requested(json: bool) -> bool {
    json || std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Initialise the global tracing subscriber, writing to stderr so command
/// output on stdout stays machine-readable.
///
/// Safe to call multiple times; only the first call takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let filter = env_filter(level);
    let registry = tracing_subscriber::registry().with(filter);

    if json_requested(json) {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .try_init()
            .ok();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()
            .ok();
    }
}

//! Logging initialisation via tracing-subscriber.
//!
//! Call [`init`] once at startup, after the effective level is resolved with
//! [`effective_level`].

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Install the global subscriber, writing to stderr.
pub fn init(level: &str, prefer_level: bool) -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(level, prefer_level)?)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

/// `-v` levels beat `RUST_LOG`; otherwise `RUST_LOG` beats the config level.
/// Either side is a fallback when the preferred one does not parse.
fn filter_for(level: &str, prefer_level: bool) -> Result<EnvFilter, AppError> {
    let from_level = || EnvFilter::try_new(level);
    let from_env = EnvFilter::try_from_default_env;

    let filter = if prefer_level {
        from_level().or_else(|_| from_env().map_err(|e| e.to_string()))
    } else {
        from_env().or_else(|_| from_level().map_err(|e| e.to_string()))
    };
    filter.map_err(|e| AppError::Logger(format!("invalid log level '{level}': {e}")))
}

/// Map a `-v` count onto a level name. `0` keeps the configured level.
///
/// `-v` → warn, `-vv` → info, `-vvv` → debug, `-vvvv`+ → trace.
pub fn verbosity_level(verbosity: u8) -> Option<&'static str> {
    match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    }
}

/// Pick the level to initialise with and whether it should beat `RUST_LOG`.
pub fn effective_level<'a>(verbosity: u8, configured: &'a str) -> (&'a str, bool) {
    match verbosity_level(verbosity) {
        Some(level) => (level, true),
        None => (configured, false),
    }
}

/// Parse a log level string into a [`LevelFilter`], returning an error on
/// unrecognised values.
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}

//! Structured logging for the PPS dashboard.
//!
//! Provides context-rich logging with component and target identifiers
//! (the data source, the requested season or route) on top of `tracing`.
//! Supports console output and an append-mode log file for the proxy.

use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::model::FetchError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl LogLevel {
    /// Directive understood by `EnvFilter`.
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    /// Direct requests to the JKM API.
    Jkm,
    /// Requests through the local relay.
    Relay,
    /// Bundled sample records.
    Sample,
    /// The HTTP proxy server.
    Proxy,
    System,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Jkm => write!(f, "JKM"),
            Component::Relay => write!(f, "RELAY"),
            Component::Sample => write!(f, "SAMPLE"),
            Component::Proxy => write!(f, "PROXY"),
            Component::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the season has no data yet or the feed is idle
    Expected,
    /// Unexpected failure - indicates upstream degradation or misconfiguration
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `min_level` when set. With a `log_file`,
/// output goes to that file in append mode instead of stderr. Calling this
/// more than once is harmless; later calls are ignored.
pub fn init_logger(
    min_level: LogLevel,
    log_file: Option<&str>,
    console_timestamps: bool,
) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(min_level.as_directive()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = match (log_file, console_timestamps) {
        (Some(path), _) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        (None, true) => builder.with_writer(io::stderr).try_init(),
        (None, false) => builder.without_time().with_writer(io::stderr).try_init(),
    };

    // A subscriber is already installed (tests, repeated init).
    let _ = result;
    Ok(())
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Log a general informational message
pub fn info(component: Component, target: Option<&str>, message: &str) {
    tracing::info!(component = %component, subject = target.unwrap_or("-"), "{}", message);
}

/// Log a warning message
pub fn warn(component: Component, target: Option<&str>, message: &str) {
    tracing::warn!(component = %component, subject = target.unwrap_or("-"), "{}", message);
}

/// Log an error message
pub fn error(component: Component, target: Option<&str>, message: &str) {
    tracing::error!(component = %component, subject = target.unwrap_or("-"), "{}", message);
}

/// Log a debug message
pub fn debug(component: Component, target: Option<&str>, message: &str) {
    tracing::debug!(component = %component, subject = target.unwrap_or("-"), "{}", message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a fetch failure by kind.
pub fn classify_fetch_failure(err: &FetchError) -> FailureType {
    match err {
        // No data published for the requested season yet.
        FetchError::Http(404) => FailureType::Expected,
        FetchError::Http(_)
        | FetchError::Relay { .. }
        | FetchError::Parse(_)
        | FetchError::Timeout => FailureType::Unexpected,
        FetchError::Transport(_) => FailureType::Unknown,
    }
}

/// Log a data source failure with automatic classification
pub fn log_fetch_failure(component: Component, target: &str, err: &FetchError) {
    let failure_type = classify_fetch_failure(err);
    let message = format!("fetch failed [{}]: {}", failure_type, err);

    match failure_type {
        FailureType::Expected => debug(component, Some(target), &message),
        FailureType::Unexpected => error(component, Some(target), &message),
        FailureType::Unknown => warn(component, Some(target), &message),
    }
}

// ---------------------------------------------------------------------------
// Fetch Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of a completed fetch + aggregate cycle.
pub fn log_fetch_summary(component: Component, records: u64, states: usize, victims: u64) {
    let message = format!(
        "Fetch complete: {} records across {} states, {} victims",
        records, states, victims
    );

    if records == 0 {
        warn(component, None, &message);
    } else {
        info(component, None, &message);
    }
}

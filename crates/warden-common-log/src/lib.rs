//! Logging infrastructure for Warden.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Subscriber;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::{Layered, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

type FilteredRegistry = Layered<EnvFilter, Registry>;
type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;
type WithStderr = Layered<BoxedLayer<FilteredRegistry>, FilteredRegistry>;

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level.
    pub level: LogLevel,
    /// Output format.
    pub format: LogFormat,
    /// Log file path (if file logging enabled).
    pub file_path: Option<PathBuf>,
    /// Include source location.
    pub source_location: bool,
    /// Include span events.
    pub span_events: bool,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing_subscriber::filter::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
            LogLevel::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
            LogLevel::Info => tracing_subscriber::filter::LevelFilter::INFO,
            LogLevel::Warn => tracing_subscriber::filter::LevelFilter::WARN,
            LogLevel::Error => tracing_subscriber::filter::LevelFilter::ERROR,
        }
    }
}

impl LogLevel {
    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format.
    #[default]
    Pretty,
    /// Compact single-line format.
    Compact,
    /// JSON structured format.
    Json,
}

impl LogFormat {
    /// Parse from string, falling back to [`LogFormat::Pretty`].
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            file_path: None,
            source_location: false,
            span_events: false,
        }
    }
}

impl LogConfig {
    /// Config with an explicit level and format, everything else default.
    pub fn new(level: LogLevel, format: LogFormat) -> Self {
        Self {
            level,
            format,
            ..Self::default()
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        let level = std::env::var("WARDEN_LOG_LEVEL").or_else(|_| std::env::var("RUST_LOG"));
        if let Some(l) = level.ok().as_deref().and_then(LogLevel::parse) {
            config.level = l;
        }

        if let Ok(format) = std::env::var("WARDEN_LOG_FORMAT") {
            config.format = LogFormat::parse(&format);
        }

        if let Ok(file_path) = std::env::var("WARDEN_LOG_FILE") {
            config.file_path = Some(PathBuf::from(file_path));
        }

        if let Ok(source_location) = std::env::var("WARDEN_LOG_SOURCE") {
            config.source_location = env_flag(&source_location);
        }

        if let Ok(span_events) = std::env::var("WARDEN_LOG_SPANS") {
            config.span_events = env_flag(&span_events);
        }

        config
    }
}

fn env_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Initialize logging with the given configuration.
///
/// `RUST_LOG` directives, when present, take precedence over `config.level`.
pub fn init(config: LogConfig) -> Result<(), LogError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_directive()));

    let stderr_layer: BoxedLayer<FilteredRegistry> = fmt_layer(&config, io::stderr, true);

    let file_layer: Option<BoxedLayer<WithStderr>> = match &config.file_path {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            Some(fmt_layer(&config, Arc::new(file), false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LogError::InitError(e.to_string()))
}

fn fmt_layer<S, W>(config: &LogConfig, writer: W, ansi: bool) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_file(config.source_location)
        .with_line_number(config.source_location)
        .with_span_events(span_events);

    match config.format {
        LogFormat::Pretty => layer.with_target(true).boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

/// Logging errors.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("failed to initialize logging: {0}")]
    InitError(String),

    #[error("failed to open log file: {0}")]
    FileError(#[from] io::Error),
}

/// Convenience macros re-exported from tracing.
pub use tracing::{debug, error, info, trace, warn};

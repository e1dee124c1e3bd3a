//! Logging setup for feedview.
//!
//! Structured logging through the `tracing` ecosystem. Library code only
//! emits events; the binary decides where they go.
//!
//! # Usage
//!
//! ```rust
//! use feedview::logging::{init_logging, LogConfig};
//!
//! let config = LogConfig::default();
//! init_logging(&config);
//!
//! tracing::info!("Application started");
//! ```

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Logging configuration.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct LogConfig {
    /// Minimum log level to display.
    pub level: LogLevel,
    /// Output format for log messages.
    pub format: LogFormat,
    /// Include timestamps in log output.
    pub timestamps: bool,
    /// Include target (module path) in log output.
    pub target: bool,
    /// Include span events (enter/exit).
    pub spans: bool,
    /// Enable ANSI colors in output.
    pub colors: bool,
}

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    /// No logging at all.
    Off,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line format.
    Pretty,
    /// Compact single-line format.
    Compact,
    /// Full format with thread ids and source locations.
    Full,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Compact,
            timestamps: false,
            target: false,
            spans: false,
            colors: true,
        }
    }
}

impl LogConfig {
    /// Errors only.
    #[must_use]
    pub const fn quiet() -> Self {
        Self {
            level: LogLevel::Error,
            format: LogFormat::Compact,
            timestamps: false,
            target: false,
            spans: false,
            colors: true,
        }
    }

    /// Debug level with targets, for `--verbose`.
    #[must_use]
    pub const fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            format: LogFormat::Compact,
            timestamps: true,
            target: true,
            spans: false,
            colors: true,
        }
    }

    /// Maximum verbosity, for `-vv`.
    #[must_use]
    pub const fn trace() -> Self {
        Self {
            level: LogLevel::Trace,
            format: LogFormat::Full,
            timestamps: true,
            target: true,
            spans: true,
            colors: true,
        }
    }

    /// Preset for the CLI's `--quiet` flag and `-v` count; quiet wins.
    #[must_use]
    pub fn for_cli(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::quiet(),
            (false, 0) => Self::default(),
            (false, 1) => Self::verbose(),
            (false, _) => Self::trace(),
        }
    }

    /// Same config with colors switched on or off.
    #[must_use]
    pub const fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }
}

impl LogLevel {
    /// Convert to env filter directive string.
    const fn to_filter_string(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
            Self::Off => "off",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" | "e" => Ok(Self::Error),
            "warn" | "warning" | "w" => Ok(Self::Warn),
            "info" | "i" => Ok(Self::Info),
            "debug" | "d" => Ok(Self::Debug),
            "trace" | "t" => Ok(Self::Trace),
            "off" | "none" | "quiet" => Ok(Self::Off),
            _ => Err(format!("Invalid log level: {s}")),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "p" => Ok(Self::Pretty),
            "compact" | "c" => Ok(Self::Compact),
            "full" | "f" => Ok(Self::Full),
            _ => Err(format!("Invalid log format: {s}")),
        }
    }
}

/// Filter for `config`, unless `RUST_LOG` is set.
fn build_filter(config: &LogConfig) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(format!("feedview={}", config.level.to_filter_string()))
    }
}

/// Initialize the logging system. Logs go to stderr so that stdout stays
/// clean for rendered output.
///
/// Subsequent calls are ignored.
pub fn init_logging(config: &LogConfig) {
    let env_filter = build_filter(config);

    let span_events = if config.spans {
        FmtSpan::ENTER | FmtSpan::EXIT
    } else {
        FmtSpan::NONE
    };

    match config.format {
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .pretty()
                .with_writer(std::io::stderr)
                .with_ansi(config.colors)
                .with_target(config.target)
                .with_span_events(span_events);

            if config.timestamps {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer)
                    .try_init()
                    .ok();
            } else {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer.without_time())
                    .try_init()
                    .ok();
            }
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_ansi(config.colors)
                .with_target(config.target)
                .with_span_events(span_events);

            if config.timestamps {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer)
                    .try_init()
                    .ok();
            } else {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer.without_time())
                    .try_init()
                    .ok();
            }
        }
        LogFormat::Full => {
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(config.colors)
                .with_target(config.target)
                .with_span_events(span_events)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(layer)
                .try_init()
                .ok();
        }
    }
}

/// Logs the start and end of an operation with its duration.
pub struct OperationGuard {
    name: &'static str,
    start: std::time::Instant,
}

impl OperationGuard {
    /// Start tracking an operation.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        tracing::debug!(operation = name, "Starting operation");
        Self {
            name,
            start: std::time::Instant::now(),
        }
    }

    /// Complete the operation successfully.
    pub fn complete(self) {
        tracing::debug!(
            operation = self.name,
            duration_ms = self.start.elapsed().as_millis(),
            "Operation completed"
        );
    }

    /// Mark the operation as failed.
    pub fn fail(self, error: &dyn std::error::Error) {
        tracing::warn!(
            operation = self.name,
            duration_ms = self.start.elapsed().as_millis(),
            error = %error,
            "Operation failed"
        );
    }
}

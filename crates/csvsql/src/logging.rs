//! Logging configuration for csvsql
//!
//! Structured logging through `tracing`, written to stderr (stdout carries
//! query results), a daily-rolling log file, or both. `RUST_LOG` overrides the configured level.

use std::io;
use std::path::{Path, PathBuf};

use csvsql_core::error::{Error, Result};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "csvsql.log";

/// Log output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    /// Output to stderr
    Stderr,
    /// Output to a daily-rolling file
    File(PathBuf),
    /// Output to both stderr and file
    Both(PathBuf),
}

/// Log format style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line human-readable output
    Pretty,
    /// Single-line output
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level filter directive, e.g. `info` or `csvsql_core=debug`
    pub level: String,
    /// Output destination
    pub output: LogOutput,
    /// Format style
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            output: LogOutput::Stderr,
            format: LogFormat::Compact,
        }
    }
}

impl LogConfig {
    /// Info level on stderr
    pub fn info() -> Self {
        Self::default().with_level("info")
    }

    /// Debug level on stderr; shows statement compilation and join indexes
    pub fn debug() -> Self {
        Self::default().with_level("debug")
    }

    /// Write to a rolling file instead of stderr
    pub fn with_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::File(path.into());
        self
    }

    /// Write to both stderr and a rolling file
    pub fn with_both<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::Both(path.into());
        self
    }

    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set log level filter
    pub fn with_level<S: Into<String>>(mut self, level: S) -> Self {
        self.level = level.into();
        self
    }

    fn filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .map_err(|e| Error::InvalidInput(format!("log level '{}': {}", self.level, e)))
    }

    /// Install the global subscriber.
    ///
    /// The returned guard flushes the file writer when dropped, so keep it
    /// alive for the lifetime of the program.
    ///
    /// ```rust,no_run
    /// use csvsql::logging::LogConfig;
    ///
    /// let _guard = LogConfig::info().init().unwrap();
    /// ```
    pub fn init(self) -> Result<Option<WorkerGuard>> {
        let env_filter = self.filter()?;
        let registry = tracing_subscriber::registry().with(env_filter);

        let (installed, guard) = match (&self.output, self.format) {
            (LogOutput::Stderr, LogFormat::Pretty) => {
                let layer = fmt::layer().with_writer(io::stderr).pretty();
                (registry.with(layer).try_init(), None)
            }
            (LogOutput::Stderr, LogFormat::Compact) => {
                let layer = fmt::layer().with_writer(io::stderr).compact();
                (registry.with(layer).try_init(), None)
            }
            (LogOutput::File(path), LogFormat::Pretty) => {
                let (writer, guard) = rolling_writer(path);
                let layer = fmt::layer().with_writer(writer).with_ansi(false).pretty();
                (registry.with(layer).try_init(), Some(guard))
            }
            (LogOutput::File(path), LogFormat::Compact) => {
                let (writer, guard) = rolling_writer(path);
                let layer = fmt::layer().with_writer(writer).with_ansi(false).compact();
                (registry.with(layer).try_init(), Some(guard))
            }
            (LogOutput::Both(path), _) => {
                let (writer, guard) = rolling_writer(path);
                let installed = registry
                    .with(fmt::layer().with_writer(io::stderr).compact())
                    .with(fmt::layer().with_writer(writer).with_ansi(false).compact())
                    .try_init();
                (installed, Some(guard))
            }
        };

        installed.map_err(|e| Error::InvalidInput(format!("logging already initialised: {}", e)))?;
        Ok(guard)
    }
}

fn rolling_writer(path: &Path) -> (NonBlocking, WorkerGuard) {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE);
    tracing_appender::non_blocking(tracing_appender::rolling::daily(directory, file_name))
}

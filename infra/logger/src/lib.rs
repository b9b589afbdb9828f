//! # Logger
//!
//! Installs the process-wide `tracing` subscriber: a compact console layer,
//! an optional rolling file layer written through a non-blocking worker, and
//! an environment filter (`RUST_LOG` or an explicit directive string).
//!
//! Applications normally go through [`Logger::from_config`], which reads the
//! `[logging]` section of the server configuration. The typestate
//! [`LoggerBuilder`] is available for finer control: file-only options such as
//! [`LoggerBuilder::json`] exist only after a path has been set.
//!
//! ## Example
//!
//! ```rust
//! # use parley_logger::{Logger, LevelFilter};
//!
//! let _logger = Logger::builder()
//!     .name("parley")
//!     .console(true)
//!     .level(LevelFilter::DEBUG)
//!     .env_filter("parley=debug,tower_http=info")
//!     .init()
//!     .unwrap();
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use parley_domain::config::LoggingConfig;
use private::Sealed;
use std::fs;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_MAX_FILES: usize = 10;
const LOG_FILE_SUFFIX: &str = "log";

#[derive(Debug)]
struct Settings {
    console: bool,
    path: Option<PathBuf>,
    level: LevelFilter,
    rotation: Rotation,
    max_files: usize,
    json: bool,
    env_filter: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            console: true,
            path: None,
            level: LevelFilter::INFO,
            rotation: Rotation::DAILY,
            max_files: DEFAULT_MAX_FILES,
            json: false,
            env_filter: None,
        }
    }
}

#[derive(Debug)]
pub struct NoName;
#[derive(Debug)]
pub struct WithName(String);
#[derive(Debug)]
pub struct NoFile;
#[derive(Debug)]
pub struct WithFile;

mod private {
    pub trait Sealed {}
}
impl Sealed for NoName {}
impl Sealed for WithName {}
impl Sealed for NoFile {}
impl Sealed for WithFile {}

/// Configures the global tracing subscriber. A name is required before
/// [`init`](LoggerBuilder::init) becomes available.
#[derive(Debug)]
pub struct LoggerBuilder<N: Sealed = NoName, F: Sealed = NoFile> {
    settings: Settings,
    name: N,
    file: PhantomData<F>,
}

impl<F: Sealed> LoggerBuilder<NoName, F> {
    /// Names the logger; also the rolling file prefix (`parley.2026-10-16.log`).
    pub fn name(self, name: impl Into<String>) -> LoggerBuilder<WithName, F> {
        LoggerBuilder { settings: self.settings, name: WithName(name.into()), file: PhantomData }
    }
}

impl LoggerBuilder<WithName, WithFile> {
    /// Number of rotated files kept on disk.
    #[must_use]
    pub const fn max_files(mut self, max: usize) -> Self {
        self.settings.max_files = max;
        self
    }

    #[must_use]
    pub const fn rotation(mut self, rotation: Rotation) -> Self {
        self.settings.rotation = rotation;
        self
    }

    /// Writes the file layer as JSON lines. The console stays human-readable.
    #[must_use]
    pub const fn json(mut self, enabled: bool) -> Self {
        self.settings.json = enabled;
        self
    }
}

impl<F: Sealed> LoggerBuilder<WithName, F> {
    /// Default level for targets not covered by the env filter.
    #[must_use]
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.settings.level = level;
        self
    }

    /// Explicit filter directives (e.g., `parley=debug,surrealdb=warn`).
    ///
    /// Without one, `RUST_LOG` is consulted. Invalid directives make
    /// [`LoggerBuilder::init`] fail.
    #[must_use]
    pub fn env_filter(mut self, filter: impl Into<String>) -> Self {
        self.settings.env_filter = Some(filter.into());
        self
    }

    #[must_use]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.settings.console = enabled;
        self
    }

    /// Directory for rolling log files. Created on init if missing.
    pub fn path(self, path: impl Into<PathBuf>) -> LoggerBuilder<WithName, WithFile> {
        let mut settings = self.settings;
        settings.path = Some(path.into());
        LoggerBuilder { settings, name: self.name, file: PhantomData }
    }

    /// Installs the subscriber.
    ///
    /// The returned [`Logger`] owns the file worker guard; keep it alive until
    /// shutdown so buffered lines are flushed.
    ///
    /// # Errors
    /// * [`LoggerError::InvalidConfiguration`] for an empty name, zero `max_files`,
    ///   bad filter directives or when no layer is enabled.
    /// * [`LoggerError::Appender`] if the log file cannot be opened.
    /// * [`LoggerError::Subscriber`] if a global subscriber is already set.
    pub fn init(self) -> Result<Logger, LoggerError> {
        let settings = self.settings;
        let name = self.name.0;
        validate(&settings, &name)?;

        let filter = env_filter(&settings)?;
        let mut layers = Vec::new();

        if settings.console {
            layers.push(layer().compact().with_ansi(true).boxed());
        }

        let guard = match settings.path {
            Some(path) => {
                fs::create_dir_all(&path).map_err(|e| LoggerError::Internal {
                    message: e.to_string().into(),
                    context: Some(format!("Creating log directory {}", path.display()).into()),
                })?;

                let appender = RollingFileAppender::builder()
                    .rotation(settings.rotation)
                    .filename_prefix(&name)
                    .filename_suffix(LOG_FILE_SUFFIX)
                    .max_log_files(settings.max_files)
                    .build(path)?;
                let (writer, guard) = tracing_appender::non_blocking(appender);

                let file_layer = layer().with_writer(writer).with_ansi(false);
                layers.push(if settings.json { file_layer.json().boxed() } else { file_layer.boxed() });
                Some(guard)
            },
            None => None,
        };

        if layers.is_empty() {
            return Err(LoggerError::InvalidConfiguration {
                message: "No logging layers enabled. Enable console or file output.".into(),
                context: None,
            });
        }

        tracing_subscriber::registry().with(filter).with(layers).try_init()?;

        Ok(Logger { guard })
    }
}

/// Handle to the installed logging system.
///
/// Dropping it stops the background file writer after flushing.
#[must_use = "Dropping this handle will stop background logging threads."]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder { settings: Settings::default(), name: NoName, file: PhantomData }
    }

    /// Installs the subscriber described by a `[logging]` section.
    ///
    /// `level` accepts `trace`, `debug`, `info`, `warn`, `error` or `off`;
    /// `json` and `max_files` only take effect together with `path`.
    ///
    /// # Errors
    /// Same as [`LoggerBuilder::init`], plus
    /// [`LoggerError::InvalidConfiguration`] for an unknown level.
    pub fn from_config(name: &str, config: &LoggingConfig) -> Result<Self, LoggerError> {
        let level = parse_level(&config.level)?;
        let mut builder = Self::builder().name(name).level(level);
        if let Some(filter) = &config.filter {
            builder = builder.env_filter(filter);
        }

        match &config.path {
            Some(path) => builder.path(path).max_files(config.max_files).json(config.json).init(),
            None => builder.init(),
        }
    }

    /// Whether a file writer is attached.
    #[must_use]
    pub const fn guard(&self) -> Option<&WorkerGuard> {
        self.guard.as_ref()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::info!("Logging system shutting down, flushing buffers...");
        }
    }
}

fn parse_level(level: &str) -> Result<LevelFilter, LoggerError> {
    LevelFilter::from_str(level.trim()).map_err(|e| LoggerError::InvalidConfiguration {
        message: format!("Unknown log level '{level}': {e}").into(),
        context: None,
    })
}

fn validate(settings: &Settings, name: &str) -> Result<(), LoggerError> {
    if name.trim().is_empty() {
        return Err(LoggerError::InvalidConfiguration {
            message: "Logger name cannot be empty".into(),
            context: None,
        });
    }

    if settings.max_files == 0 {
        return Err(LoggerError::InvalidConfiguration {
            message: "max_files must be greater than zero".into(),
            context: None,
        });
    }

    Ok(())
}

fn env_filter(settings: &Settings) -> Result<EnvFilter, LoggerError> {
    let builder = EnvFilter::builder().with_default_directive(settings.level.into());
    match &settings.env_filter {
        Some(filter) => builder.parse(filter).map_err(|e| LoggerError::InvalidConfiguration {
            message: format!("Invalid env filter '{filter}': {e}").into(),
            context: None,
        }),
        None => Ok(builder.from_env_lossy()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn builder_defaults() {
        let builder = Logger::builder().name("parley").env_filter("parley=debug");
        assert!(builder.settings.console);
        assert_eq!(builder.settings.level, LevelFilter::INFO);
        assert_eq!(builder.settings.max_files, DEFAULT_MAX_FILES);
        assert_eq!(builder.settings.env_filter.as_deref(), Some("parley=debug"));
        assert!(builder.settings.path.is_none());
    }

    #[test]
    fn file_options_follow_path() {
        let builder = Logger::builder()
            .name("parley")
            .path("/tmp/parley-logs")
            .max_files(3)
            .json(true)
            .level(LevelFilter::WARN);

        assert_eq!(builder.settings.max_files, 3);
        assert!(builder.settings.json);
        assert_eq!(builder.settings.level, LevelFilter::WARN);
        assert_eq!(builder.settings.path.as_deref(), Some(std::path::Path::new("/tmp/parley-logs")));
    }

    #[test]
    fn levels_parse_case_insensitively() {
        assert_eq!(parse_level("debug").unwrap(), LevelFilter::DEBUG);
        assert_eq!(parse_level(" WARN ").unwrap(), LevelFilter::WARN);
        assert_eq!(parse_level("off").unwrap(), LevelFilter::OFF);
        assert!(matches!(parse_level("loud"), Err(LoggerError::InvalidConfiguration { .. })));
    }

    #[test]
    #[serial]
    fn rejects_invalid_settings_before_installing() {
        let empty = Logger::builder().name("  ").init();
        assert!(matches!(empty, Err(LoggerError::InvalidConfiguration { .. })));

        let no_files = Logger::builder().name("parley").path("/tmp/parley-logs").max_files(0).init();
        assert!(matches!(no_files, Err(LoggerError::InvalidConfiguration { .. })));

        let silent = Logger::builder().name("parley").console(false).init();
        assert!(matches!(silent, Err(LoggerError::InvalidConfiguration { .. })));

        let bad_filter = Logger::builder().name("parley").env_filter("parley=[").init();
        assert!(matches!(bad_filter, Err(LoggerError::InvalidConfiguration { .. })));
    }
}

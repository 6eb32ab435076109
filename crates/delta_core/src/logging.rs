//! Logging bootstrap for hosts embedding the delta core.
//!
//! # Responsibility
//! - Validate log settings before any backend is touched.
//! - Start file-based rolling logs exactly once per process.
//!
//! # Invariants
//! - Initialization is idempotent for identical settings.
//! - Re-initialization with a different level or directory is rejected.
//! - Initialization never panics.
//! - Container events are metadata-only; item payloads are never logged.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "lazydelta";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;

static ACTIVE_LOGGER: OnceCell<ActiveLogger> = OnceCell::new();

struct ActiveLogger {
    settings: LogSettings,
    _handle: LoggerHandle,
}

/// Validated logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    level: &'static str,
    log_dir: PathBuf,
}

impl LogSettings {
    /// Builds settings from raw host input.
    ///
    /// `level` is one of `trace|debug|info|warn|error` (case-insensitive,
    /// `warning` accepted). `log_dir` must be a non-empty absolute path.
    pub fn new(level: &str, log_dir: impl AsRef<Path>) -> Result<Self, LoggingError> {
        Ok(Self {
            level: normalize_level(level)?,
            log_dir: normalize_log_dir(log_dir.as_ref())?,
        })
    }

    /// Settings using [`default_log_level`] for the current build.
    pub fn with_default_level(log_dir: impl AsRef<Path>) -> Result<Self, LoggingError> {
        Self::new(default_log_level(), log_dir)
    }

    pub fn level(&self) -> &'static str {
        self.level
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

/// Logging setup failures.
#[derive(Debug)]
pub enum LoggingError {
    UnsupportedLevel(String),
    EmptyLogDir,
    RelativeLogDir(PathBuf),
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    Backend(flexi_logger::FlexiLoggerError),
    AlreadyInitialized {
        active: LogSettings,
        requested: LogSettings,
    },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::EmptyLogDir => write!(f, "log_dir cannot be empty"),
            Self::RelativeLogDir(path) => write!(
                f,
                "log_dir must be an absolute path, got `{}`",
                path.display()
            ),
            Self::CreateDir { path, source } => write!(
                f,
                "failed to create log directory `{}`: {source}",
                path.display()
            ),
            Self::Backend(err) => write!(f, "failed to start logger: {err}"),
            Self::AlreadyInitialized { active, requested } => write!(
                f,
                "logging already initialized with level `{}` at `{}`; refusing to switch to level `{}` at `{}`",
                active.level,
                active.log_dir.display(),
                requested.level,
                requested.log_dir.display()
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

/// Starts rolling file logs for the process.
///
/// # Errors
/// - `AlreadyInitialized` when logging runs with different settings.
/// - `CreateDir` or `Backend` when the log backend cannot start.
pub fn init_logging(settings: &LogSettings) -> Result<(), LoggingError> {
    let active = ACTIVE_LOGGER.get_or_try_init(|| start_logger(settings))?;
    if active.settings != *settings {
        return Err(LoggingError::AlreadyInitialized {
            active: active.settings.clone(),
            requested: settings.clone(),
        });
    }
    Ok(())
}

/// Returns the active settings, or `None` before initialization.
pub fn logging_status() -> Option<LogSettings> {
    ACTIVE_LOGGER.get().map(|active| active.settings.clone())
}

/// `debug` in debug builds, `info` in release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_logger(settings: &LogSettings) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(&settings.log_dir).map_err(|source| LoggingError::CreateDir {
        path: settings.log_dir.clone(),
        source,
    })?;

    let handle = Logger::try_with_str(settings.level)
        .map_err(LoggingError::Backend)?
        .log_to_file(
            FileSpec::default()
                .directory(settings.log_dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(LoggingError::Backend)?;

    info!(
        "event=logging_init module=logging status=ok level={} version={}",
        settings.level,
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogger {
        settings: settings.clone(),
        _handle: handle,
    })
}

fn normalize_level(level: &str) -> Result<&'static str, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(LoggingError::UnsupportedLevel(other.to_string())),
    }
}

fn normalize_log_dir(log_dir: &Path) -> Result<PathBuf, LoggingError> {
    if log_dir.as_os_str().is_empty() {
        return Err(LoggingError::EmptyLogDir);
    }
    if !log_dir.is_absolute() {
        return Err(LoggingError::RelativeLogDir(log_dir.to_path_buf()));
    }
    Ok(log_dir.to_path_buf())
}

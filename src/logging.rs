//! Optional diagnostics for hosts.
//!
//! The crate only emits `tracing` events: rejected filter writes at `warn`,
//! commits and partner clears at `debug`, dispatch detail at `trace`. A host
//! that already runs a subscriber needs nothing from here. One that does not
//! can send those events to a file with [`init_file_logging`], or build the
//! subscriber itself with [`file_subscriber`] and scope it.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Env var naming the log file for [`init_from_env`].
pub const LOG_ENV_VAR: &str = "QUERYSTATE_LOG";

/// Directives used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVES: &str = "info";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log file {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid log filter: {0}")]
    InvalidFilter(#[from] ParseError),

    #[error("A global tracing subscriber is already installed: {0}")]
    AlreadyInstalled(#[from] TryInitError),
}

/// Subscriber writing plain-text events matching `directives` to `path`.
///
/// The file is truncated. Nothing is installed; pass the result to
/// `tracing::subscriber::with_default` or to [`init_file_logging`].
pub fn file_subscriber(
    path: &Path,
    directives: &str,
) -> Result<impl Subscriber + Send + Sync + 'static, LoggingError> {
    let filter = EnvFilter::try_new(directives)?;
    let file = std::fs::File::create(path).map_err(|source| LoggingError::CreateFile {
        path: path.to_path_buf(),
        source,
    })?;

    let file_layer = fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .with_level(true);

    Ok(tracing_subscriber::registry().with(filter).with(file_layer))
}

/// Install a [`file_subscriber`] as the process-wide default.
pub fn init_file_logging(path: &Path, directives: &str) -> Result<(), LoggingError> {
    file_subscriber(path, directives)?.try_init()?;
    Ok(())
}

/// [`init_file_logging`] driven by the environment: the path from
/// `QUERYSTATE_LOG`, the directives from `RUST_LOG` or [`DEFAULT_DIRECTIVES`].
///
/// Returns `Ok(false)` when `QUERYSTATE_LOG` is unset.
pub fn init_from_env() -> Result<bool, LoggingError> {
    let Some(path) = std::env::var_os(LOG_ENV_VAR) else {
        return Ok(false);
    };
    let directives =
        std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| DEFAULT_DIRECTIVES.to_string());
    init_file_logging(Path::new(&path), &directives)?;
    Ok(true)
}

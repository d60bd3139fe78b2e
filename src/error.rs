use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("invalid assembly URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid assembly format: {0}")]
    InvalidFormat(String),

    #[error("no assembly URLs given (use --input or the config file)")]
    MissingInput,

    #[error("no output directory given (use --output-dir or the config file)")]
    MissingOutputDir,

    #[error("output directory is not usable: {0}")]
    OutputDir(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to read URL list at {0}")]
    InputRead(PathBuf),

    #[error("FTP request failed: {0}")]
    Ftp(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("remote returned status {status}: {message}")]
    RemoteStatus { status: u16, message: String },

    #[error("data transfer failed: {0}")]
    Transfer(String),

    #[error("failed to install interrupt handler: {0}")]
    InterruptHandler(String),

    #[error("run cancelled by user")]
    Cancelled,
}

/// Raised when the user interrupts the run. Kept apart from [`KiraError`] so
/// that per-file failure handling can never swallow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("run cancelled by user")]
pub struct Cancelled;

impl From<Cancelled> for KiraError {
    fn from(_: Cancelled) -> Self {
        KiraError::Cancelled
    }
}

use std::{path::PathBuf, sync::PoisonError};

use miette::Diagnostic;
use pkgmeta_config::error::ConfigError;
use pkgmeta_package::InstallerError;
use pkgmeta_utils::error::{FileSystemError, HashError};
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Installer(#[from] InstallerError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(code(pkgmeta::fs))]
    FileSystem(#[from] FileSystemError),

    #[error(transparent)]
    #[diagnostic(code(pkgmeta::hash))]
    Hash(#[from] HashError),

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(pkgmeta::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },

    #[error("Failed to serialize output: {0}")]
    #[diagnostic(code(pkgmeta::json))]
    Json(#[from] serde_json::Error),

    #[error("Stored copy {} does not match its fingerprint", path.display())]
    #[diagnostic(
        code(pkgmeta::checksum_mismatch),
        help("The source changed while it was being copied, or the destination is unreliable")
    )]
    ChecksumMismatch { path: PathBuf },

    #[error("{failed} of {total} files could not be processed")]
    #[diagnostic(code(pkgmeta::failed), help("Run with -v for details"))]
    Failed { failed: usize, total: usize },

    #[error("Failed to initialize logging: {0}")]
    #[diagnostic(code(pkgmeta::logging))]
    Logging(String),

    #[error("A lock was poisoned")]
    #[diagnostic(code(pkgmeta::poison))]
    PoisonError,
}

impl<T> From<PoisonError<T>> for CliError {
    fn from(_: PoisonError<T>) -> Self {
        Self::PoisonError
    }
}

pub type CliResult<T> = std::result::Result<T, CliError>;

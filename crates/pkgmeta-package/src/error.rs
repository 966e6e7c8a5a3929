//! Error types for the package crate.

use miette::Diagnostic;
use pkgmeta_utils::error::HashError;
use thiserror::Error;

use crate::formats::FormatId;

/// Errors surfaced to callers of the extraction entry points.
#[derive(Error, Diagnostic, Debug)]
pub enum InstallerError {
    #[error("Invalid input: {0}")]
    #[diagnostic(
        code(pkgmeta_package::invalid_input),
        help("Pass the artifact's file name, including its extension")
    )]
    InvalidInput(String),

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(pkgmeta_package::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },

    #[error("Malformed {format} package: {reason}")]
    #[diagnostic(
        code(pkgmeta_package::malformed),
        help("The file extension and magic number claim a known format, but its structure is invalid")
    )]
    MalformedPackage {
        format: FormatId,
        reason: String,
        /// SHA-256 of every byte supplied; the fingerprint is still valid.
        hash: Vec<u8>,
        size: u64,
    },
}

impl InstallerError {
    /// The fingerprint carried by a malformed-package failure.
    pub fn malformed_hash(&self) -> Option<&[u8]> {
        match self {
            InstallerError::MalformedPackage { hash, .. } => Some(hash),
            _ => None,
        }
    }
}

/// A specialized Result type for extraction.
pub type Result<T> = std::result::Result<T, InstallerError>;

/// Outcome of a single format extractor.
///
/// `Malformed` and `MissingMetadata` are kept apart: the dispatcher recovers
/// from the latter and reports the former.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("{0}")]
    Malformed(String),

    #[error("{0}")]
    MissingMetadata(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ParseResult<T> = std::result::Result<T, ParseError>;

pub(crate) fn malformed<S: Into<String>>(reason: S) -> ParseError {
    ParseError::Malformed(reason.into())
}

pub(crate) fn missing<S: Into<String>>(what: S) -> ParseError {
    ParseError::MissingMetadata(what.into())
}

/// Maps errors raised while decoding a compressed or archived member.
///
/// Decoders report corrupt input through `io::Error`, so everything except
/// interruption-style failures is treated as a structural problem.
pub(crate) fn decode_error(context: &str, err: std::io::Error) -> ParseError {
    use std::io::ErrorKind;
    match err.kind() {
        ErrorKind::PermissionDenied | ErrorKind::BrokenPipe | ErrorKind::TimedOut => {
            ParseError::Io(err)
        }
        _ => ParseError::Malformed(format!("{context}: {err}")),
    }
}

/// Extension trait for adding context to I/O errors.
pub trait ErrorContext<T> {
    /// Adds context to an error, describing what action was being performed.
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            InstallerError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}

impl From<HashError> for InstallerError {
    fn from(err: HashError) -> Self {
        match err {
            HashError::ReadFailed { offset, source } => {
                InstallerError::IoError {
                    action: format!("hashing stream at byte {offset}"),
                    source,
                }
            }
            HashError::OpenFailed { path, source } => {
                InstallerError::IoError {
                    action: format!("opening {}", path.display()),
                    source,
                }
            }
        }
    }
}

//! Installer package identification.
//!
//! Given an installer artifact's file name and content, this crate detects
//! its container format, decodes the embedded product name and version, and
//! computes a SHA-256 fingerprint over the exact bytes supplied.
//!
//! # Supported Formats
//!
//! - **MSI**: `Property` table of a Windows Installer database
//! - **macOS**: `Distribution`/`PackageInfo` of flat `.pkg` archives; `.dmg`
//!   images are validated and named after the file
//! - **Debian**: `control` file of a `.deb`
//! - **RPM**: `NAME`/`VERSION` header tags
//! - **PE**: `VS_VERSIONINFO` resource of a Windows executable
//! - **Generic**: anything else, named after the file stem
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use pkgmeta_package::{extract_installer_metadata, ErrorContext, Result};
//!
//! fn identify(path: &str) -> Result<()> {
//!     let file = File::open(path).with_context(|| format!("opening {path}"))?;
//!     let mut reader = BufReader::new(file);
//!     let meta = extract_installer_metadata("setup.msi", &mut reader)?;
//!     println!("{} {} {}", meta.name, meta.version, meta.hash_hex());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod extract;
pub mod formats;
pub mod metadata;
pub mod traits;

#[cfg(test)]
mod fixtures;

pub use error::{ErrorContext, InstallerError, Result};
pub use extract::{
    extract_from_path, extract_from_stream, extract_installer_metadata,
    extract_installer_metadata_with,
};
pub use formats::{
    detect, FormatId, AR_MAGIC_BYTES, CFB_MAGIC_BYTES, PE_MAGIC_BYTES, RPM_MAGIC_BYTES,
    XAR_MAGIC_BYTES,
};
pub use metadata::{HashAlgorithm, InstallerMetadata, PackageIdentity};
pub use pkgmeta_config::ExtractConfig;
pub use traits::PackageExt;

//! Package format detection and per-format extractors.
//!
//! Detection is keyed on the file extension and confirmed with the magic
//! number found in a short content prefix. Each extractor is an independent
//! function over a seekable [`Source`]; [`extract_identity`] selects one by
//! [`FormatId`].

mod binary;
pub mod cfb;
pub mod deb;
pub mod dmg;
pub mod generic;
pub mod msi;
pub mod pe;
pub mod rpm;
pub mod source;
pub mod xar;

use std::{
    fmt,
    io::{Read, Seek},
};

use pkgmeta_config::ExtractConfig;
use serde::Serialize;

use self::source::Source;
use crate::{error::ParseResult, metadata::PackageIdentity};

/// Magic bytes for compound file binary containers (MSI).
pub const CFB_MAGIC_BYTES: [u8; 8] = [0xd0, 0xcf, 0x11, 0xe0, 0xa1, 0xb1, 0x1a, 0xe1];

/// Magic bytes for XAR archives (flat macOS installer packages).
pub const XAR_MAGIC_BYTES: [u8; 4] = [0x78, 0x61, 0x72, 0x21];

/// Magic bytes for `ar` archives (Debian packages).
pub const AR_MAGIC_BYTES: [u8; 8] = [0x21, 0x3c, 0x61, 0x72, 0x63, 0x68, 0x3e, 0x0a];

/// Magic bytes of the RPM lead.
pub const RPM_MAGIC_BYTES: [u8; 4] = [0xed, 0xab, 0xee, 0xdb];

/// Magic bytes of the DOS stub header of PE executables.
pub const PE_MAGIC_BYTES: [u8; 2] = [0x4d, 0x5a];

/// Supported installer container kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatId {
    /// Windows Installer database.
    Msi,
    /// Flat installer package (XAR) or disk image.
    MacPackage,
    /// Debian binary package.
    DebianPackage,
    /// RPM package.
    RpmPackage,
    /// Windows PE executable.
    PeExecutable,
    /// Anything else; identified by file name only.
    Generic,
}

impl FormatId {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatId::Msi => "msi",
            FormatId::MacPackage => "mac_package",
            FormatId::DebianPackage => "debian_package",
            FormatId::RpmPackage => "rpm_package",
            FormatId::PeExecutable => "pe_executable",
            FormatId::Generic => "generic",
        }
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FormatId::Msi => "MSI",
            FormatId::MacPackage => "macOS",
            FormatId::DebianPackage => "Debian",
            FormatId::RpmPackage => "RPM",
            FormatId::PeExecutable => "PE",
            FormatId::Generic => "generic",
        };
        f.write_str(label)
    }
}

/// Detects the format of an artifact from its file name and the first bytes
/// of its content.
///
/// The extension (case-insensitive) selects a candidate format, which is
/// kept only if the prefix carries that format's magic number. Disk images
/// are accepted on extension alone since their signature is a trailer.
/// Empty content, unknown extensions and contradicting magic numbers all
/// resolve to [`FormatId::Generic`].
///
/// # Example
///
/// ```
/// use pkgmeta_package::{detect, FormatId};
///
/// assert_eq!(detect("tool.DEB", b"!<arch>\ndebian-binary"), FormatId::DebianPackage);
/// assert_eq!(detect("tool.exe", b"\x7fELF"), FormatId::Generic);
/// assert_eq!(detect("notes.xyz", b"MZ"), FormatId::Generic);
/// ```
pub fn detect(filename: &str, prefix: &[u8]) -> FormatId {
    if prefix.is_empty() {
        return FormatId::Generic;
    }
    let Some(ext) = generic::extension(filename) else {
        return FormatId::Generic;
    };

    let (format, magic): (FormatId, &[u8]) = match ext.to_ascii_lowercase().as_str() {
        "msi" => (FormatId::Msi, &CFB_MAGIC_BYTES),
        "pkg" => (FormatId::MacPackage, &XAR_MAGIC_BYTES),
        "dmg" => return FormatId::MacPackage,
        "deb" => (FormatId::DebianPackage, &AR_MAGIC_BYTES),
        "rpm" => (FormatId::RpmPackage, &RPM_MAGIC_BYTES),
        "exe" => (FormatId::PeExecutable, &PE_MAGIC_BYTES),
        _ => return FormatId::Generic,
    };

    if prefix.starts_with(magic) {
        format
    } else {
        FormatId::Generic
    }
}

/// Runs the extractor selected by `format` over `src`.
pub(crate) fn extract_identity<R: Read + Seek>(
    format: FormatId,
    filename: &str,
    src: &mut Source<'_, R>,
    config: &ExtractConfig,
) -> ParseResult<PackageIdentity> {
    match format {
        FormatId::Msi => msi::extract(src),
        FormatId::MacPackage => {
            if src.starts_with(&XAR_MAGIC_BYTES)? {
                xar::extract(src)
            } else {
                dmg::extract(src)
            }
        }
        FormatId::DebianPackage => deb::extract(src),
        FormatId::RpmPackage => rpm::extract(src, config.rpm_include_release),
        FormatId::PeExecutable => pe::extract(src),
        FormatId::Generic => Ok(generic::extract_generic(filename)),
    }
}

//! Detection, hashing and extraction combined into one result.

use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom, Write},
    path::Path,
};

use pkgmeta_config::ExtractConfig;
use pkgmeta_utils::hash::{hash_reader, Fingerprint};
use tracing::{debug, trace};

use crate::{
    error::{ErrorContext, InstallerError, ParseError, Result},
    formats::{detect, extract_identity, generic, source::Source, FormatId},
    metadata::{HashAlgorithm, InstallerMetadata, PackageIdentity},
};

/// Extracts metadata using the default configuration.
///
/// See [`extract_installer_metadata_with`].
pub fn extract_installer_metadata<R: Read + Seek>(
    filename: &str,
    reader: &mut R,
) -> Result<InstallerMetadata> {
    extract_installer_metadata_with(filename, reader, &ExtractConfig::default())
}

/// Identifies the installer in `reader` and fingerprints its content.
///
/// The artifact spans from the reader's current position to EOF. The whole
/// span is hashed first, then the extractor selected by [`detect`] reads
/// the same bytes through absolute seeks.
///
/// Extractors that find a well-formed container without a product name fall
/// back to the file stem with an empty version; the detected format is kept.
///
/// # Errors
///
/// * [`InstallerError::InvalidInput`] if `filename` has no usable stem.
/// * [`InstallerError::IoError`] if the reader fails.
/// * [`InstallerError::MalformedPackage`] if the content claims a format but
///   violates its structure. The error still carries the SHA-256 and size
///   of the full input.
pub fn extract_installer_metadata_with<R: Read + Seek>(
    filename: &str,
    reader: &mut R,
    config: &ExtractConfig,
) -> Result<InstallerMetadata> {
    let fallback = fallback_identity(filename)?;

    let base = reader
        .stream_position()
        .with_context(|| "reading stream position".into())?;
    let prefix = read_prefix(reader, config.sniff_len)?;
    let format = detect(filename, &prefix);

    reader
        .seek(SeekFrom::Start(base))
        .with_context(|| "rewinding stream".into())?;
    let fingerprint = hash_reader(&mut *reader, config.hash_chunk_size())?;

    identify(filename, format, fallback, reader, base, fingerprint, config)
}

/// Like [`extract_installer_metadata_with`] for readers that cannot seek.
///
/// The stream is copied to an anonymous temporary file while it is hashed,
/// and extraction runs over that copy.
pub fn extract_from_stream<R: Read>(
    filename: &str,
    reader: R,
    config: &ExtractConfig,
) -> Result<InstallerMetadata> {
    let fallback = fallback_identity(filename)?;

    let mut spool = tempfile::tempfile().with_context(|| "creating spool file".into())?;
    let fingerprint = hash_reader(
        Tee {
            reader,
            writer: &mut spool,
        },
        config.hash_chunk_size(),
    )?;
    spool.flush().with_context(|| "flushing spool file".into())?;
    trace!(bytes = fingerprint.len, "spooled stream");

    spool
        .seek(SeekFrom::Start(0))
        .with_context(|| "rewinding spool file".into())?;
    let prefix = read_prefix(&mut spool, config.sniff_len)?;
    let format = detect(filename, &prefix);

    identify(filename, format, fallback, &mut spool, 0, fingerprint, config)
}

/// Opens `path` and extracts metadata using its file name.
pub fn extract_from_path<P: AsRef<Path>>(path: P, config: &ExtractConfig) -> Result<InstallerMetadata> {
    let path = path.as_ref();
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| InstallerError::InvalidInput(format!("{} has no file name", path.display())))?;

    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = BufReader::new(file);
    extract_installer_metadata_with(filename, &mut reader, config)
}

fn fallback_identity(filename: &str) -> Result<PackageIdentity> {
    if filename.trim().is_empty() {
        return Err(InstallerError::InvalidInput("empty file name".into()));
    }
    let identity = generic::extract_generic(filename);
    if identity.name.is_empty() {
        return Err(InstallerError::InvalidInput(format!(
            "no name can be derived from file name `{filename}`"
        )));
    }
    Ok(identity)
}

fn read_prefix<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut prefix = Vec::with_capacity(len);
    reader
        .take(len as u64)
        .read_to_end(&mut prefix)
        .with_context(|| "reading content prefix".into())?;
    Ok(prefix)
}

fn identify<R: Read + Seek>(
    filename: &str,
    format: FormatId,
    fallback: PackageIdentity,
    reader: &mut R,
    base: u64,
    fingerprint: Fingerprint,
    config: &ExtractConfig,
) -> Result<InstallerMetadata> {
    debug!(filename, format = %format, bytes = fingerprint.len, "extracting metadata");

    let mut src = Source::new(reader, base, fingerprint.len, config.max_member_size);
    let identity = match extract_identity(format, filename, &mut src, config) {
        Ok(identity) => {
            let identity = identity.trimmed();
            if identity.name.is_empty() {
                debug!(filename, format = %format, "blank name, using file name");
                fallback
            } else {
                identity
            }
        }
        Err(ParseError::MissingMetadata(reason)) => {
            debug!(filename, format = %format, reason = %reason, "no embedded metadata, using file name");
            fallback
        }
        Err(ParseError::Malformed(reason)) => {
            return Err(InstallerError::MalformedPackage {
                format,
                reason,
                hash: fingerprint.digest.to_vec(),
                size: fingerprint.len,
            });
        }
        Err(ParseError::Io(source)) => {
            return Err(InstallerError::IoError {
                action: format!("reading {format} package"),
                source,
            });
        }
    };

    Ok(InstallerMetadata {
        name: identity.name,
        version: identity.version,
        format,
        hash_algorithm: HashAlgorithm::Sha256,
        hash: fingerprint.digest.to_vec(),
        size: fingerprint.len,
    })
}

/// Copies everything read through it into `writer`.
struct Tee<R, W> {
    reader: R,
    writer: W,
}

impl<R: Read, W: Write> Read for Tee<R, W> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.reader.read(buf)?;
        self.writer.write_all(&buf[..n])?;
        Ok(n)
    }
}

use std::{
    fs,
    path::{Path, PathBuf},
};

use nu_ansi_term::Color::{Blue, Cyan, Green, Red, Yellow};
use pkgmeta_config::ExtractConfig;
use pkgmeta_package::{
    extract_from_path, InstallerError, InstallerMetadata, PackageExt, Result as InstallerResult,
};
use pkgmeta_utils::{
    bytes::format_bytes,
    fs::{copy_with_perms, exists},
    hash::verify_checksum,
};
use rayon::prelude::*;
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};
use tracing::{debug, error, info};

use crate::{
    error::{CliError, CliResult},
    utils::{abbreviate_hash, Colored},
};

type Outcome<'a> = (&'a PathBuf, InstallerResult<InstallerMetadata>);

#[derive(Serialize)]
struct InspectRecord<'a> {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a InstallerMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    /// Fingerprint of a file that failed to parse.
    #[serde(skip_serializing_if = "Option::is_none")]
    sha256: Option<String>,
}

#[derive(Serialize)]
struct StoreRecord<'a> {
    path: String,
    stored_as: String,
    skipped: bool,
    metadata: &'a InstallerMetadata,
}

/// Extracts every file in parallel, keeping input order.
fn extract_all<'a>(config: &ExtractConfig, files: &'a [PathBuf]) -> Vec<Outcome<'a>> {
    files
        .par_iter()
        .map(|path| (path, extract_from_path(path, config)))
        .collect()
}

fn failure_hash(err: &InstallerError) -> Option<String> {
    err.malformed_hash().map(hex::encode)
}

/// Name and version cells for the inspect table.
fn identity_cells<P: PackageExt>(pkg: &P) -> [String; 2] {
    let version = if pkg.version().is_empty() {
        "-".to_string()
    } else {
        Colored(Green, pkg.version()).to_string()
    };
    [Colored(Blue, pkg.name()).to_string(), version]
}

fn report_failures(results: &[Outcome<'_>]) -> CliResult<()> {
    let mut failed = 0;
    for (path, result) in results {
        if let Err(err) = result {
            failed += 1;
            match failure_hash(err) {
                Some(hash) => error!("{}: {} (sha256 {})", path.display(), err, hash),
                None => error!("{}: {}", path.display(), err),
            }
        }
    }

    if failed > 0 {
        return Err(CliError::Failed {
            failed,
            total: results.len(),
        });
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn inspect_files(config: &ExtractConfig, files: &[PathBuf], json: bool) -> CliResult<()> {
    let results = extract_all(config, files);

    if json {
        let records: Vec<InspectRecord> = results
            .iter()
            .map(|(path, result)| InspectRecord {
                path: path.display().to_string(),
                metadata: result.as_ref().ok(),
                error: result.as_ref().err().map(ToString::to_string),
                sha256: result.as_ref().err().and_then(failure_hash),
            })
            .collect();
        print_json(&records)?;
    } else {
        let mut builder = Builder::new();
        builder.push_record(["File", "Name", "Version", "Format", "Size", "SHA-256"]);

        let mut rows = 0;
        for (path, result) in &results {
            let Ok(meta) = result else { continue };
            rows += 1;
            let [name, version] = identity_cells(meta);
            builder.push_record([
                path.display().to_string(),
                name,
                version,
                Colored(Cyan, meta.format).to_string(),
                format_bytes(meta.size, 2),
                abbreviate_hash(&meta.hash_hex(), 8),
            ]);
        }

        if rows > 0 {
            let table = builder.build().with(Style::rounded()).to_string();
            info!("\n{table}");
        }
    }

    report_failures(&results)
}

/// Name of the stored copy: the content digest plus the lowercased source
/// extension.
fn stored_file_name(meta: &InstallerMetadata, source: &Path) -> String {
    match source.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{}.{}", meta.hash_hex(), ext.to_ascii_lowercase()),
        _ => meta.hash_hex(),
    }
}

pub fn store_files(
    config: &ExtractConfig,
    dir: &Path,
    files: &[PathBuf],
    json: bool,
) -> CliResult<()> {
    fs::create_dir_all(dir).map_err(|source| CliError::IoError {
        action: format!("creating {}", dir.display()),
        source,
    })?;

    let results = extract_all(config, files);
    let mut records = Vec::new();

    for (path, result) in &results {
        let Ok(meta) = result else { continue };
        let target = dir.join(stored_file_name(meta, path));

        let skipped = exists(&target)?;
        if skipped {
            info!(
                "{} {} already stored as {}",
                Colored(Yellow, "skip"),
                path.display(),
                Colored(Blue, target.display())
            );
        } else {
            copy_with_perms(path, &target)?;
            if !verify_checksum(&target, &meta.hash_hex())? {
                fs::remove_file(&target).ok();
                return Err(CliError::ChecksumMismatch { path: target });
            }
            debug!(path = %path.display(), target = %target.display(), "stored copy verified");
            info!(
                "{} {} {} {}",
                Colored(Green, "stored"),
                path.display(),
                Colored(Red, "->"),
                Colored(Blue, target.display())
            );
        }

        records.push(StoreRecord {
            path: path.display().to_string(),
            stored_as: target.display().to_string(),
            skipped,
            metadata: meta,
        });
    }

    if json {
        print_json(&records)?;
    }

    report_failures(&results)
}

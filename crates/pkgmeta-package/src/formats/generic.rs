//! File-name based identity for artifacts without readable metadata.

use crate::metadata::PackageIdentity;

/// Last path component of `filename`, accepting both `/` and `\` separators.
pub fn base_name(filename: &str) -> &str {
    filename.rsplit(['/', '\\']).next().unwrap_or(filename)
}

/// Splits the last path component into its stem and final extension.
///
/// A leading dot does not start an extension, so `.bashrc` has no
/// extension and keeps its full name as the stem.
fn split_extension(filename: &str) -> (&str, Option<&str>) {
    let name = base_name(filename);
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// Final extension of `filename`, without the dot and with its original case.
pub fn extension(filename: &str) -> Option<&str> {
    split_extension(filename).1
}

/// `filename`'s last component with its final extension removed.
pub fn file_stem(filename: &str) -> &str {
    split_extension(filename).0
}

/// Identity derived from the file name alone: the trimmed stem and an empty
/// version. Never fails.
pub fn extract_generic(filename: &str) -> PackageIdentity {
    PackageIdentity::new(file_stem(filename).trim(), "")
}

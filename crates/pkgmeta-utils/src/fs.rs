use std::{
    fs::{self, File, Permissions},
    io::{self, ErrorKind},
    path::Path,
};

use crate::error::{FileSystemError, FileSystemResult};

#[cfg(unix)]
fn permissions_from_mode(_src: &Path, mode: u32) -> io::Result<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Ok(Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn permissions_from_mode(src: &Path, mode: u32) -> io::Result<Permissions> {
    let mut perms = fs::metadata(src)?.permissions();
    perms.set_readonly(mode & 0o222 == 0);
    Ok(perms)
}

fn copy_contents(src: &Path, dst: &Path, perms: Permissions) -> io::Result<()> {
    let mut reader = File::open(src)?;
    let mut writer = File::create(dst)?;
    io::copy(&mut reader, &mut writer)?;
    writer.sync_all()?;
    // Set explicitly; `create` only applies the mode to new files.
    fs::set_permissions(dst, perms)
}

/// Copies `src` to `dst`, truncating any existing destination, and sets the
/// destination permissions to `mode`.
///
/// # Errors
///
/// * [`FileSystemError::Copy`] if `src` cannot be read or `dst` cannot be
///   created (for example when its parent directory is missing).
pub fn copy<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q, mode: u32) -> FileSystemResult<()> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    permissions_from_mode(src, mode)
        .and_then(|perms| copy_contents(src, dst, perms))
        .map_err(|err| {
            FileSystemError::Copy {
                src: src.to_path_buf(),
                dst: dst.to_path_buf(),
                source: err,
            }
        })
}

/// Copies `src` to `dst`, preserving the permissions of `src`.
pub fn copy_with_perms<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> FileSystemResult<()> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    let perms = fs::metadata(src)
        .map_err(|err| {
            FileSystemError::Copy {
                src: src.to_path_buf(),
                dst: dst.to_path_buf(),
                source: err,
            }
        })?
        .permissions();

    copy_contents(src, dst, perms).map_err(|err| {
        FileSystemError::Copy {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            source: err,
        }
    })
}

/// Reports whether `path` exists and is not a directory.
///
/// A missing path is `Ok(false)`; any other stat failure is an error.
pub fn exists<P: AsRef<Path>>(path: P) -> FileSystemResult<bool> {
    let path = path.as_ref();
    match fs::metadata(path) {
        Ok(meta) => Ok(!meta.is_dir()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => {
            Err(FileSystemError::File {
                path: path.to_path_buf(),
                action: "stat",
                source: err,
            })
        }
    }
}

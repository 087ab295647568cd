//! Filesystem utility functions
//!
//! Recursive size, copy and move helpers used by capture, plus the
//! free-space query used by its preflight. Size and copy agree on
//! symlinks: neither follows them, so the preflight measures exactly what
//! a capture writes.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

use crate::error::{IoResultExt, ProfileError, Result};

/// Recursively calculate the total size of a directory in bytes
///
/// Walks the tree below `path` and sums regular file sizes. Symbolic links
/// inside the tree are not followed and count as zero bytes. `path`
/// itself may be a symlink to a directory.
///
/// # Arguments
/// * `path` - The directory to measure
///
/// # Errors
/// Returns [`ProfileError::Io`] if any directory or metadata read fails.
pub fn dir_size(path: &Path) -> Result<u64> {
    let mut total = 0;
    let entries = fs::read_dir(path).ctx(|| format!("Failed to read directory: {:?}", path))?;
    for entry in entries {
        let entry = entry.ctx(|| format!("Failed to read directory entry in {:?}", path))?;
        let metadata = entry
            .metadata()
            .ctx(|| format!("Failed to read metadata for {:?}", entry.path()))?;
        if metadata.is_file() {
            total += metadata.len();
        } else if metadata.is_dir() {
            total += dir_size(&entry.path())?;
        }
    }
    Ok(total)
}

/// Recursively copy a directory and all its contents to a new location
///
/// The destination is created if missing and the source is left
/// untouched. Symbolic links inside the tree are re-created as links with
/// the same target rather than followed.
///
/// # Arguments
/// * `src` - Source directory (may itself be a symlink to a directory)
/// * `dst` - Destination directory
///
/// # Errors
/// Returns [`ProfileError::Io`] if:
/// - Source doesn't exist or is not a directory
/// - Destination cannot be created
/// - Any file, directory or link cannot be copied
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    if !src.is_dir() {
        return Err(ProfileError::io(
            format!("Source is not a directory: {:?}", src),
            ErrorKind::NotFound.into(),
        ));
    }

    fs::create_dir_all(dst).ctx(|| format!("Failed to create destination directory: {:?}", dst))?;

    for entry in fs::read_dir(src).ctx(|| format!("Failed to read source directory: {:?}", src))? {
        let entry = entry.ctx(|| format!("Failed to read directory entry in {:?}", src))?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let file_type = entry
            .file_type()
            .ctx(|| format!("Failed to read file type of {:?}", src_path))?;

        if file_type.is_symlink() {
            copy_symlink(&src_path, &dst_path)?;
        } else if file_type.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)
                .ctx(|| format!("Failed to copy file: {:?} -> {:?}", src_path, dst_path))?;
        }
    }

    Ok(())
}

/// Re-create the symlink at `src` as `dst`, pointing at the same target
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    let target = fs::read_link(src).ctx(|| format!("Failed to read symlink: {:?}", src))?;
    debug!(link = %dst.display(), target = %target.display(), "copying symlink");

    #[cfg(unix)]
    let res = std::os::unix::fs::symlink(&target, dst);
    #[cfg(windows)]
    let res = if src.is_dir() {
        std::os::windows::fs::symlink_dir(&target, dst)
    } else {
        std::os::windows::fs::symlink_file(&target, dst)
    };

    res.ctx(|| format!("Failed to copy symlink: {:?} -> {:?}", src, dst))
}

/// Move a directory, falling back to copy + delete across filesystems
///
/// # Arguments
/// * `src` - Directory to move; it no longer exists on success
/// * `dst` - New location; its parent must exist
///
/// # Errors
/// Returns [`ProfileError::Io`] if the rename fails for any reason other
/// than crossing devices, or if the fallback copy or removal fails. A
/// failed fallback can leave a partial copy at `dst`.
pub fn move_dir(src: &Path, dst: &Path) -> Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            debug!(src = %src.display(), dst = %dst.display(), "rename crosses devices, copying");
            copy_dir_recursive(src, dst)?;
            fs::remove_dir_all(src).ctx(|| format!("Failed to remove moved directory: {:?}", src))
        }
        Err(e) => Err(ProfileError::io(
            format!("Failed to move {:?} -> {:?}", src, dst),
            e,
        )),
    }
}

/// Free bytes available to this user on the volume holding `path`
///
/// A path that does not exist yet is measured at its nearest existing
/// ancestor.
///
/// # Errors
/// Returns [`ProfileError::Io`] if the volume cannot be queried.
pub fn available_space(path: &Path) -> Result<u64> {
    let probe = path.ancestors().find(|p| p.exists()).unwrap_or(path);
    fs2::available_space(probe).ctx(|| format!("Failed to query free space for {:?}", probe))
}

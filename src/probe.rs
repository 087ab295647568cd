//! Symlink capability check.
//!
//! Unix lets any user create symlinks. Windows needs Administrator rights
//! or Developer Mode, so there we try a throwaway link in the temp
//! directory. The result is advisory: callers warn on failure and still
//! let the real operation report its own error.

use std::fs;
use std::path::Path;
use tracing::debug;

/// How directory symlinks can be created on this machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymlinkSupport {
    /// Plain system call works
    Native,
    /// Only the `mklink` shell route works
    Shell,
    /// Nothing worked during the probe
    Unavailable,
}

impl SymlinkSupport {
    pub fn is_available(self) -> bool {
        !matches!(self, Self::Unavailable)
    }
}

pub fn can_create_symlinks() -> bool {
    detect_symlink_support().is_available()
}

#[cfg(unix)]
pub fn detect_symlink_support() -> SymlinkSupport {
    SymlinkSupport::Native
}

#[cfg(windows)]
pub fn detect_symlink_support() -> SymlinkSupport {
    let scratch = std::env::temp_dir();
    if probe_native(&scratch) {
        SymlinkSupport::Native
    } else if probe_shell(&scratch) {
        SymlinkSupport::Shell
    } else {
        SymlinkSupport::Unavailable
    }
}

/// Create and remove a directory symlink inside `scratch`
pub fn probe_native(scratch: &Path) -> bool {
    probe_with(scratch, |target, link| {
        #[cfg(unix)]
        return std::os::unix::fs::symlink(target, link).is_ok();
        #[cfg(windows)]
        return std::os::windows::fs::symlink_dir(target, link).is_ok();
    })
}

#[cfg(windows)]
fn probe_shell(scratch: &Path) -> bool {
    probe_with(scratch, |target, link| {
        std::process::Command::new("cmd")
            .args(["/C", "mklink", "/D"])
            .arg(link)
            .arg(target)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    })
}

fn probe_with<F>(scratch: &Path, make_link: F) -> bool
where
    F: FnOnce(&Path, &Path) -> bool,
{
    let pid = std::process::id();
    let target = scratch.join(format!("pzprof_probe_target_{pid}"));
    let link = scratch.join(format!("pzprof_probe_link_{pid}"));

    remove_quietly(&link);
    let _ = fs::remove_dir(&target);
    if fs::create_dir_all(&target).is_err() {
        debug!(scratch = %scratch.display(), "cannot create probe target");
        return false;
    }

    let ok = make_link(&target, &link)
        && fs::symlink_metadata(&link)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);

    remove_quietly(&link);
    let _ = fs::remove_dir(&target);
    debug!(ok, "symlink probe finished");
    ok
}

fn remove_quietly(link: &Path) {
    // Windows directory symlinks are removed with remove_dir
    if fs::remove_file(link).is_err() {
        let _ = fs::remove_dir(link);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[cfg(unix)]
    fn test_unix_always_supported() {
        assert_eq!(detect_symlink_support(), SymlinkSupport::Native);
        assert!(can_create_symlinks());
    }

    #[test]
    #[serial]
    fn test_probe_in_system_temp_leaves_nothing() {
        let scratch = std::env::temp_dir();
        let _ = probe_native(&scratch);
        let pid = std::process::id();
        assert!(!scratch.join(format!("pzprof_probe_link_{pid}")).exists());
        assert!(!scratch.join(format!("pzprof_probe_target_{pid}")).exists());
    }

    #[test]
    #[serial]
    #[cfg(unix)]
    fn test_probe_native_unix() {
        let temp_dir = TempDir::new().unwrap();
        assert!(probe_native(temp_dir.path()));
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    #[serial]
    fn test_probe_unwritable_scratch() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("not-a-dir");
        fs::write(&file, "x").unwrap();
        assert!(!probe_native(&file));
    }

    #[test]
    fn test_support_availability() {
        assert!(SymlinkSupport::Native.is_available());
        assert!(SymlinkSupport::Shell.is_available());
        assert!(!SymlinkSupport::Unavailable.is_available());
    }
}

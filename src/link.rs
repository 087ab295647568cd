//! Live link management.
//!
//! "What is live" is defined by two directory symlinks, the game install
//! path and the user-data path, each pointing into a profile, plus the app
//! manifest sitting in steamapps. This module creates and tears down that
//! trio. How a link is physically created is behind [`Linker`] so the
//! platform decision is made once at startup.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{IoResultExt, ProfileError, Result};
use crate::paths::{Paths, normalize};
use crate::probe::SymlinkSupport;

/// Creates a directory symlink at `link` pointing to `target`
pub trait Linker: Send + Sync {
    fn link_dir(&self, target: &Path, link: &Path) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Plain system call (`symlink(2)`, `CreateSymbolicLinkW`)
#[derive(Debug, Default, Clone, Copy)]
pub struct SymlinkLinker;

impl Linker for SymlinkLinker {
    fn link_dir(&self, target: &Path, link: &Path) -> Result<()> {
        #[cfg(unix)]
        let res = std::os::unix::fs::symlink(target, link);
        #[cfg(windows)]
        let res = std::os::windows::fs::symlink_dir(target, link);

        res.map_err(|e| {
            if is_privilege_error(&e) {
                ProfileError::PermissionDenied {
                    link: link.to_path_buf(),
                    reason: e.to_string(),
                }
            } else {
                ProfileError::io(
                    format!(
                        "Failed to create symlink from {} to {}",
                        link.display(),
                        target.display()
                    ),
                    e,
                )
            }
        })
    }

    fn name(&self) -> &'static str {
        "symlink"
    }
}

/// `cmd /C mklink /D`, the route available to elevated shells and
/// Developer Mode on Windows
#[derive(Debug, Default, Clone, Copy)]
pub struct MklinkLinker;

impl Linker for MklinkLinker {
    fn link_dir(&self, target: &Path, link: &Path) -> Result<()> {
        let output = Command::new("cmd")
            .args(["/C", "mklink", "/D"])
            .arg(link)
            .arg(target)
            .output()
            .map_err(|e| ProfileError::PermissionDenied {
                link: link.to_path_buf(),
                reason: format!("could not run mklink: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProfileError::PermissionDenied {
                link: link.to_path_buf(),
                reason: stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mklink"
    }
}

/// Pick the link implementation for the probed capability
pub fn select_linker(support: SymlinkSupport) -> Arc<dyn Linker> {
    match support {
        SymlinkSupport::Native => Arc::new(SymlinkLinker),
        SymlinkSupport::Shell | SymlinkSupport::Unavailable => Arc::new(MklinkLinker),
    }
}

fn is_privilege_error(e: &std::io::Error) -> bool {
    // ERROR_PRIVILEGE_NOT_HELD
    e.kind() == ErrorKind::PermissionDenied || (cfg!(windows) && e.raw_os_error() == Some(1314))
}

/// What currently sits at a live path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    Missing,
    Directory,
    File,
    Symlink { target: PathBuf },
    BrokenSymlink { target: PathBuf },
}

impl LinkStatus {
    pub fn detect(path: &Path) -> Self {
        // symlink_metadata does not follow the link
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.file_type().is_symlink() => {
                let target = fs::read_link(path).unwrap_or_else(|_| PathBuf::from("?"));
                if path.exists() {
                    Self::Symlink { target }
                } else {
                    Self::BrokenSymlink { target }
                }
            }
            Ok(meta) if meta.is_dir() => Self::Directory,
            Ok(_) => Self::File,
            Err(_) => Self::Missing,
        }
    }
}

/// Resolve a link target read from `link` to an absolute, normalized path
pub fn resolve_link_target(link: &Path, target: &Path) -> PathBuf {
    if target.is_absolute() {
        normalize(target)
    } else {
        let base = link.parent().unwrap_or(Path::new(""));
        normalize(&base.join(target))
    }
}

/// Point the install and user-data paths at a profile's GameFiles and
/// UserData.
///
/// Both links are attempted. If one fails the other is left in place and
/// the first error is returned.
///
/// # Arguments
/// * `paths` - Live and profile locations
/// * `name` - Profile whose `GameFiles/` and `UserData/` become live
/// * `linker` - Link strategy chosen at startup
///
/// # Errors
/// Returns [`ProfileError::PermissionDenied`] when the platform refuses
/// the link, or [`ProfileError::Io`] when a parent directory cannot be
/// created or the link path is occupied.
pub fn create_links(paths: &Paths, name: &str, linker: &dyn Linker) -> Result<()> {
    let pairs = [
        (normalize(&paths.profile_game_files(name)), normalize(&paths.install_dir)),
        (normalize(&paths.profile_user_data(name)), normalize(&paths.user_data_dir)),
    ];

    let mut first_err = None;
    for (target, link) in &pairs {
        match make_link(linker, target, link) {
            Ok(()) => info!(link = %link.display(), target = %target.display(), "linked"),
            Err(e) => {
                warn!(link = %link.display(), error = %e, "link creation failed");
                first_err.get_or_insert(e);
            }
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn make_link(linker: &dyn Linker, target: &Path, link: &Path) -> Result<()> {
    if let Some(parent) = link.parent() {
        fs::create_dir_all(parent)
            .ctx(|| format!("Failed to create parent directory: {:?}", parent))?;
    }
    debug!(linker = linker.name(), "creating link");
    linker.link_dir(target, link)
}

/// Remove whatever occupies a live path.
///
/// Symlinks are unlinked without touching their target, real directories
/// are deleted recursively (left behind by an interrupted switch, or a
/// vanilla install that has just been captured). Anything else is left
/// alone.
pub fn clear_live_path(path: &Path) -> Result<()> {
    match LinkStatus::detect(path) {
        LinkStatus::Missing => Ok(()),
        LinkStatus::Symlink { .. } | LinkStatus::BrokenSymlink { .. } => {
            debug!(path = %path.display(), "unlinking");
            remove_symlink(path).ctx(|| format!("Failed to remove symlink: {:?}", path))
        }
        LinkStatus::Directory => {
            info!(path = %path.display(), "removing real directory at live path");
            fs::remove_dir_all(path).ctx(|| format!("Failed to remove directory: {:?}", path))
        }
        LinkStatus::File => {
            warn!(path = %path.display(), "regular file at live path, leaving it");
            Ok(())
        }
    }
}

fn remove_symlink(path: &Path) -> std::io::Result<()> {
    #[cfg(windows)]
    if fs::remove_dir(path).is_ok() {
        return Ok(());
    }
    fs::remove_file(path)
}

/// Tear down the live state: both links and the live manifest.
///
/// Idempotent; running it twice leaves the same (empty) state.
///
/// # Errors
/// Returns [`ProfileError::Io`] if a link, a leftover real directory or
/// the manifest exists but cannot be removed.
pub fn remove_links_and_manifest(paths: &Paths) -> Result<()> {
    clear_live_path(&paths.install_dir)?;
    clear_live_path(&paths.user_data_dir)?;

    match fs::remove_file(&paths.manifest_file) {
        Ok(()) => {
            debug!(path = %paths.manifest_file.display(), "removed live manifest");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ProfileError::io(
            format!("Failed to remove manifest: {:?}", paths.manifest_file),
            e,
        )),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_utils::{Fixture, MANIFEST_STABLE};

    /// Fails every link whose path ends with `fail_name`
    struct FailingLinker {
        fail_name: &'static str,
    }

    impl Linker for FailingLinker {
        fn link_dir(&self, target: &Path, link: &Path) -> Result<()> {
            if link.ends_with(self.fail_name) {
                return Err(ProfileError::PermissionDenied {
                    link: link.to_path_buf(),
                    reason: "test".to_string(),
                });
            }
            SymlinkLinker.link_dir(target, link)
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn test_link_status_detect() {
        let fx = Fixture::new();
        let missing = fx.root().join("missing");
        assert_eq!(LinkStatus::detect(&missing), LinkStatus::Missing);
        assert_eq!(LinkStatus::detect(&fx.paths.install_dir), LinkStatus::Directory);
        assert_eq!(LinkStatus::detect(&fx.paths.manifest_file), LinkStatus::File);

        let link = fx.root().join("dangling");
        std::os::unix::fs::symlink(&missing, &link).unwrap();
        assert!(matches!(LinkStatus::detect(&link), LinkStatus::BrokenSymlink { .. }));
    }

    #[test]
    fn test_create_links() {
        let fx = Fixture::new();
        fx.stored_profile("b41", MANIFEST_STABLE);
        remove_links_and_manifest(&fx.paths).unwrap();

        create_links(&fx.paths, "b41", &SymlinkLinker).unwrap();

        match LinkStatus::detect(&fx.paths.install_dir) {
            LinkStatus::Symlink { target } => {
                assert_eq!(target, fx.paths.profile_game_files("b41"))
            }
            other => panic!("unexpected status: {other:?}"),
        }
        assert!(fx.paths.user_data_dir.join("options.ini").exists());
    }

    #[test]
    fn test_partial_link_failure_keeps_other_link() {
        let fx = Fixture::new();
        fx.stored_profile("b41", MANIFEST_STABLE);
        remove_links_and_manifest(&fx.paths).unwrap();

        let linker = FailingLinker { fail_name: "Zomboid" };
        let err = create_links(&fx.paths, "b41", &linker).unwrap_err();

        assert!(matches!(err, ProfileError::PermissionDenied { .. }));
        assert!(matches!(
            LinkStatus::detect(&fx.paths.install_dir),
            LinkStatus::Symlink { .. }
        ));
        assert_eq!(LinkStatus::detect(&fx.paths.user_data_dir), LinkStatus::Missing);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let fx = Fixture::new();
        fx.stored_profile("b41", MANIFEST_STABLE);
        remove_links_and_manifest(&fx.paths).unwrap();
        create_links(&fx.paths, "b41", &SymlinkLinker).unwrap();
        fs::write(&fx.paths.manifest_file, MANIFEST_STABLE).unwrap();

        remove_links_and_manifest(&fx.paths).unwrap();
        remove_links_and_manifest(&fx.paths).unwrap();

        assert_eq!(LinkStatus::detect(&fx.paths.install_dir), LinkStatus::Missing);
        assert_eq!(LinkStatus::detect(&fx.paths.user_data_dir), LinkStatus::Missing);
        assert!(!fx.paths.manifest_file.exists());
        // Unlinking must not traverse into the profile
        assert!(fx.paths.profile_game_files("b41").join("ProjectZomboid64").exists());
    }

    #[test]
    fn test_remove_real_directories() {
        let fx = Fixture::new();
        assert_eq!(LinkStatus::detect(&fx.paths.install_dir), LinkStatus::Directory);

        remove_links_and_manifest(&fx.paths).unwrap();

        assert!(!fx.paths.install_dir.exists());
        assert!(!fx.paths.user_data_dir.exists());
    }

    #[test]
    fn test_resolve_relative_target() {
        let resolved = resolve_link_target(
            Path::new("/games/steamapps/common/ProjectZomboid"),
            Path::new("../../../store/b41/GameFiles"),
        );
        assert_eq!(resolved, PathBuf::from("/store/b41/GameFiles"));
    }

    #[test]
    fn test_select_linker() {
        assert_eq!(select_linker(SymlinkSupport::Native).name(), "symlink");
        assert_eq!(select_linker(SymlinkSupport::Unavailable).name(), "mklink");
    }
}

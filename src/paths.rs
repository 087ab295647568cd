use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use std::path::{Component, Path, PathBuf};

use crate::config::Config;

/// Steam app id of Project Zomboid
pub const APP_ID: &str = "108600";
/// Install directory name under steamapps/common
pub const INSTALL_DIR_NAME: &str = "ProjectZomboid";

/// Profile children
pub const GAME_FILES_DIR: &str = "GameFiles";
pub const USER_DATA_DIR: &str = "UserData";
pub const STORED_MANIFEST: &str = "manifest.acf";

/// Lock file kept at the root of the manager directory
pub const LOCK_FILE: &str = ".pzprof.lock";

/// All filesystem locations derived from a [`Config`]
///
/// Every path is absolute and lexically normalized so link targets and
/// symlink comparisons line up regardless of how the user typed them.
#[derive(Debug, Clone)]
pub struct Paths {
    /// {steamapps}
    pub steamapps_dir: PathBuf,
    /// {steamapps}/common/ProjectZomboid
    pub install_dir: PathBuf,
    /// {steamapps}/appmanifest_108600.acf
    pub manifest_file: PathBuf,
    /// Root under which profiles are stored
    pub manager_dir: PathBuf,
    /// Live user-data directory (~/Zomboid)
    pub user_data_dir: PathBuf,
}

impl Paths {
    pub fn from_config(config: &Config) -> Self {
        let steamapps_dir = normalize(&config.steamapps_path);
        let install_dir = steamapps_dir.join("common").join(INSTALL_DIR_NAME);
        let manifest_file = steamapps_dir.join(format!("appmanifest_{APP_ID}.acf"));

        Self {
            steamapps_dir,
            install_dir,
            manifest_file,
            manager_dir: normalize(&config.manager_path),
            user_data_dir: normalize(&config.user_data_path),
        }
    }

    /// Get the path to a specific profile directory
    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.manager_dir.join(name)
    }

    pub fn profile_game_files(&self, name: &str) -> PathBuf {
        self.profile_dir(name).join(GAME_FILES_DIR)
    }

    pub fn profile_user_data(&self, name: &str) -> PathBuf {
        self.profile_dir(name).join(USER_DATA_DIR)
    }

    /// Get the path to a profile's stored manifest copy
    pub fn profile_manifest(&self, name: &str) -> PathBuf {
        self.profile_dir(name).join(STORED_MANIFEST)
    }

    pub fn lock_file(&self) -> PathBuf {
        self.manager_dir.join(LOCK_FILE)
    }

    /// Check if a path is within the manager directory
    pub fn is_in_manager_dir(&self, path: &Path) -> bool {
        normalize(path).starts_with(&self.manager_dir)
    }
}

/// Default location of config.json (e.g. ~/.config/pzprof/config.json)
pub fn default_config_file() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "pzprof")
        .context("Failed to determine configuration directory")?;
    Ok(dirs.config_dir().join("config.json"))
}

pub fn home_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|b| b.home_dir().to_path_buf())
}

/// Make a path absolute and fold `.`/`..` components without touching the
/// filesystem (symlinks are not resolved).
pub fn normalize(path: &Path) -> PathBuf {
    if path.as_os_str().is_empty() {
        return PathBuf::new();
    }
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Paths {
        Paths::from_config(&Config {
            steamapps_path: PathBuf::from("/games/steamapps"),
            manager_path: PathBuf::from("/store"),
            user_data_path: PathBuf::from("/home/u/Zomboid"),
        })
    }

    #[test]
    fn test_derived_paths() {
        let paths = sample();
        assert_eq!(
            paths.install_dir,
            PathBuf::from("/games/steamapps/common/ProjectZomboid")
        );
        assert_eq!(
            paths.manifest_file,
            PathBuf::from("/games/steamapps/appmanifest_108600.acf")
        );
        assert!(paths.profile_manifest("b41").ends_with("store/b41/manifest.acf"));
        assert!(paths.profile_game_files("b41").ends_with("b41/GameFiles"));
    }

    #[test]
    fn test_normalize_folds_dots() {
        assert_eq!(
            normalize(Path::new("/store/./a/../b")),
            PathBuf::from("/store/b")
        );
        assert!(normalize(Path::new("relative")).is_absolute());
        assert_eq!(normalize(Path::new("")), PathBuf::new());
    }

    #[test]
    fn test_is_in_manager_dir() {
        let paths = sample();
        assert!(paths.is_in_manager_dir(Path::new("/store/b41/GameFiles")));
        assert!(paths.is_in_manager_dir(Path::new("/store/x/../b41/GameFiles")));
        assert!(!paths.is_in_manager_dir(Path::new("/games/steamapps")));
    }
}

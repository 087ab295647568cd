//! Stored profile lookup.
//!
//! Profiles are plain directories under the manager path, each holding
//! `GameFiles/`, `UserData/` and `manifest.acf`. Which one is active is
//! never stored: it is read off the install-path symlink every time.

use std::fs;
use std::path::{Component, Path};

use crate::error::{IoResultExt, ProfileError, Result};
use crate::link::resolve_link_target;
use crate::paths::{GAME_FILES_DIR, Paths, STORED_MANIFEST, USER_DATA_DIR};

/// List available profiles, sorted by name
///
/// A missing manager directory just means no profiles yet.
pub fn list_profiles(paths: &Paths) -> Result<Vec<String>> {
    let mut profiles = Vec::new();
    if !paths.manager_dir.is_dir() {
        return Ok(profiles);
    }

    let entries = fs::read_dir(&paths.manager_dir)
        .ctx(|| format!("Failed to read manager directory: {:?}", paths.manager_dir))?;
    for entry in entries {
        let entry = entry.ctx(|| "Failed to read directory entry")?;
        let path = entry.path();
        if path.is_dir()
            && let Some(name) = path.file_name().and_then(|n| n.to_str())
        {
            profiles.push(name.to_string());
        }
    }
    profiles.sort();
    Ok(profiles)
}

/// Check if a profile exists
///
/// Only a single plain path component directly under the manager
/// directory counts; `..`, separators and absolute paths never name a
/// profile.
pub fn profile_exists(paths: &Paths, name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && paths.profile_dir(name).is_dir()
}

/// Name of the profile the install-path symlink points into, if any.
///
/// Not a symlink, unreadable, or dangling all mean "nothing active".
pub fn detect_active_profile(paths: &Paths) -> Option<String> {
    let meta = fs::symlink_metadata(&paths.install_dir).ok()?;
    if !meta.file_type().is_symlink() {
        return None;
    }
    let raw = fs::read_link(&paths.install_dir).ok()?;
    let target = resolve_link_target(&paths.install_dir, &raw);
    if !target.exists() {
        return None;
    }
    profile_name_of(&target)
}

/// Profile name owning a link target (`.../{name}/GameFiles` -> `name`)
fn profile_name_of(target: &Path) -> Option<String> {
    target
        .parent()?
        .file_name()?
        .to_str()
        .map(str::to_string)
}

/// Which of a profile's three children are present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileContents {
    pub game_files: bool,
    pub user_data: bool,
    pub manifest: bool,
}

impl ProfileContents {
    pub fn inspect(paths: &Paths, name: &str) -> Self {
        let dir = paths.profile_dir(name);
        Self {
            game_files: dir.join(GAME_FILES_DIR).is_dir(),
            user_data: dir.join(USER_DATA_DIR).is_dir(),
            manifest: dir.join(STORED_MANIFEST).is_file(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.game_files && self.user_data && self.manifest
    }

    /// Names of the missing children
    pub fn missing(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if !self.game_files {
            out.push(GAME_FILES_DIR);
        }
        if !self.user_data {
            out.push(USER_DATA_DIR);
        }
        if !self.manifest {
            out.push(STORED_MANIFEST);
        }
        out
    }
}

/// Validate profile name
///
/// Names become directory names, so anything that is not a single
/// portable path component is refused. Spaces are fine.
pub fn validate_profile_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| -> Result<()> {
        Err(ProfileError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.trim().is_empty() {
        return invalid("name cannot be empty");
    }
    if name.trim() != name {
        return invalid("name cannot start or end with whitespace");
    }
    if name.chars().count() > 64 {
        return invalid("name cannot be longer than 64 characters");
    }
    if name.starts_with('.') {
        return invalid("name cannot start with '.'");
    }
    if let Some(c) = name
        .chars()
        .find(|&c| {
            c.is_control() || matches!(c, '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*')
        })
    {
        return invalid(&format!("character {:?} is not allowed", c));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{Fixture, MANIFEST_STABLE};

    #[test]
    fn test_profile_name_validation() {
        assert!(validate_profile_name("b41").is_ok());
        assert!(validate_profile_name("Build 42 - Unstable").is_ok());
        assert!(validate_profile_name("test_123").is_ok());

        assert!(validate_profile_name("").is_err());
        assert!(validate_profile_name("   ").is_err());
        assert!(validate_profile_name(" padded").is_err());
        assert!(validate_profile_name("..").is_err());
        assert!(validate_profile_name(".hidden").is_err());
        assert!(validate_profile_name("a/b").is_err());
        assert!(validate_profile_name("a\\b").is_err());
        assert!(validate_profile_name("what?").is_err());
        assert!(validate_profile_name(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_list_missing_manager_dir() {
        let fx = Fixture::new();
        fs::remove_dir_all(&fx.paths.manager_dir).unwrap();
        assert!(list_profiles(&fx.paths).unwrap().is_empty());
    }

    #[test]
    fn test_list_only_directories() {
        let fx = Fixture::new();
        fx.stored_profile("b42", MANIFEST_STABLE);
        fx.stored_profile("b41", MANIFEST_STABLE);
        fs::write(fx.paths.manager_dir.join("notes.txt"), "x").unwrap();

        assert_eq!(list_profiles(&fx.paths).unwrap(), vec!["b41", "b42"]);
        assert!(profile_exists(&fx.paths, "b41"));
        assert!(!profile_exists(&fx.paths, "notes.txt"));
    }

    #[test]
    fn test_profile_exists_rejects_paths_outside_store() {
        let fx = Fixture::new();
        fx.stored_profile("b41", MANIFEST_STABLE);
        fs::create_dir_all(fx.root().join("outside")).unwrap();
        fs::create_dir_all(fx.paths.manager_dir.join(".old")).unwrap();

        assert!(!profile_exists(&fx.paths, "../outside"));
        assert!(!profile_exists(&fx.paths, "b41/GameFiles"));
        assert!(!profile_exists(&fx.paths, ""));
        assert!(!profile_exists(&fx.paths, "."));
        assert!(!profile_exists(&fx.paths, fx.root().join("outside").to_str().unwrap()));
        // Anything list_profiles reports is found
        assert!(profile_exists(&fx.paths, ".old"));
        assert!(list_profiles(&fx.paths).unwrap().contains(&".old".to_string()));
    }

    #[test]
    fn test_detect_active_none_for_real_directory() {
        let fx = Fixture::new();
        assert_eq!(detect_active_profile(&fx.paths), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_detect_active_from_symlink() {
        let fx = Fixture::new();
        fx.stored_profile("b41", MANIFEST_STABLE);
        fs::remove_dir_all(&fx.paths.install_dir).unwrap();
        std::os::unix::fs::symlink(fx.paths.profile_game_files("b41"), &fx.paths.install_dir)
            .unwrap();

        assert_eq!(detect_active_profile(&fx.paths).as_deref(), Some("b41"));
    }

    #[cfg(unix)]
    #[test]
    fn test_detect_active_dangling() {
        let fx = Fixture::new();
        fs::remove_dir_all(&fx.paths.install_dir).unwrap();
        std::os::unix::fs::symlink(fx.paths.profile_game_files("gone"), &fx.paths.install_dir)
            .unwrap();

        assert_eq!(detect_active_profile(&fx.paths), None);
    }

    #[test]
    fn test_profile_contents() {
        let fx = Fixture::new();
        fx.stored_profile("b41", MANIFEST_STABLE);
        let contents = ProfileContents::inspect(&fx.paths, "b41");
        assert!(contents.is_complete());

        fs::remove_file(fx.paths.profile_manifest("b41")).unwrap();
        let contents = ProfileContents::inspect(&fx.paths, "b41");
        assert_eq!(contents.missing(), vec![STORED_MANIFEST]);
    }
}

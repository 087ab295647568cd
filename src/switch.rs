//! Profile switching logic.
//!
//! Switching tears down the live links and manifest, restores the
//! target profile's manifest into steamapps, then links the install and
//! user-data paths to the profile. Between teardown and relink nothing is
//! active; re-running the same switch repairs an interrupted one.

use std::fs;
use std::io::ErrorKind;
use tracing::info;

use crate::config::Config;
use crate::error::{IoResultExt, ProfileError, Result};
use crate::link::{Linker, create_links, remove_links_and_manifest};
use crate::paths::{Paths, STORED_MANIFEST};
use crate::profiles::profile_exists;

/// Switch to a specific profile
///
/// # Arguments
/// * `config` - Configured steamapps, manager and user-data paths
/// * `name` - A profile directly under the manager path
/// * `linker` - How the live links are created
///
/// # Errors
/// Returns [`ProfileError::NotFound`] without touching anything when
/// `name` is not a stored profile, including names that would resolve
/// outside the manager path. A profile without a stored manifest is also
/// refused up front. Failures after teardown leave nothing active;
/// running the same switch again repairs that.
pub fn switch_to(config: &Config, name: &str, linker: &dyn Linker) -> Result<()> {
    let paths = Paths::from_config(config);

    if !profile_exists(&paths, name) {
        return Err(ProfileError::NotFound {
            name: name.to_string(),
        });
    }

    // Check before tearing anything down
    let stored_manifest = paths.profile_manifest(name);
    if !stored_manifest.is_file() {
        return Err(ProfileError::io(
            format!("Profile '{}' has no {}", name, STORED_MANIFEST),
            ErrorKind::NotFound.into(),
        ));
    }

    // 1. Remove existing links and manifest
    remove_links_and_manifest(&paths)?;

    // 2. Restore the stored manifest
    fs::copy(&stored_manifest, &paths.manifest_file).ctx(|| {
        format!(
            "Failed to restore manifest: {:?} -> {:?}",
            stored_manifest, paths.manifest_file
        )
    })?;

    // 3. Link to the profile
    create_links(&paths, name, linker)?;

    info!(profile = name, "switched");
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::capture::capture;
    use crate::link::{LinkStatus, SymlinkLinker};
    use crate::profiles::detect_active_profile;
    use crate::test_utils::{Fixture, MANIFEST_STABLE, MANIFEST_UNSTABLE, tree_snapshot};

    /// Two stored profiles, b41 active
    fn two_profiles() -> Fixture {
        let fx = Fixture::new();
        fx.stored_profile("b41", MANIFEST_STABLE);
        fx.stored_profile("b42", MANIFEST_UNSTABLE);
        switch_to(&fx.config, "b41", &SymlinkLinker).unwrap();
        fx
    }

    #[test]
    fn test_switch_nonexistent() {
        let fx = two_profiles();
        let before = tree_snapshot(fx.root());
        let manifest_before = fs::read(&fx.paths.manifest_file).unwrap();

        let err = switch_to(&fx.config, "nope", &SymlinkLinker).unwrap_err();

        assert!(matches!(err, ProfileError::NotFound { .. }));
        assert_eq!(tree_snapshot(fx.root()), before);
        assert_eq!(fs::read(&fx.paths.manifest_file).unwrap(), manifest_before);
        assert_eq!(detect_active_profile(&fx.paths).as_deref(), Some("b41"));
    }

    #[test]
    fn test_switch_outside_manager_dir_is_not_found() {
        let fx = two_profiles();
        let outside = fx.root().join("outside");
        fs::create_dir_all(outside.join("GameFiles")).unwrap();
        fs::create_dir_all(outside.join("UserData")).unwrap();
        fs::write(outside.join(STORED_MANIFEST), MANIFEST_UNSTABLE).unwrap();
        let before = tree_snapshot(fx.root());

        let err = switch_to(&fx.config, "../outside", &SymlinkLinker).unwrap_err();

        assert!(matches!(err, ProfileError::NotFound { .. }));
        assert_eq!(tree_snapshot(fx.root()), before);
        assert_eq!(detect_active_profile(&fx.paths).as_deref(), Some("b41"));
    }

    #[test]
    fn test_switch_restores_manifest_bytes() {
        let fx = two_profiles();

        switch_to(&fx.config, "b42", &SymlinkLinker).unwrap();

        assert_eq!(detect_active_profile(&fx.paths).as_deref(), Some("b42"));
        assert_eq!(
            fs::read(&fx.paths.manifest_file).unwrap(),
            fs::read(fx.paths.profile_manifest("b42")).unwrap()
        );
        assert_eq!(
            fs::read_to_string(fx.paths.user_data_dir.join("options.ini")).unwrap(),
            "b42"
        );
    }

    #[test]
    fn test_switch_round_trip() {
        let fx = two_profiles();

        switch_to(&fx.config, "b42", &SymlinkLinker).unwrap();
        switch_to(&fx.config, "b41", &SymlinkLinker).unwrap();

        assert_eq!(detect_active_profile(&fx.paths).as_deref(), Some("b41"));
        assert_eq!(
            fs::read_to_string(&fx.paths.manifest_file).unwrap(),
            MANIFEST_STABLE
        );
        // Profiles survive switching away from them
        assert!(fx.paths.profile_game_files("b42").join("ProjectZomboid64").exists());
        assert!(fx.paths.profile_user_data("b42").join("options.ini").exists());
    }

    #[test]
    fn test_switch_to_active_profile_is_stable() {
        let fx = two_profiles();
        switch_to(&fx.config, "b41", &SymlinkLinker).unwrap();
        assert_eq!(detect_active_profile(&fx.paths).as_deref(), Some("b41"));
    }

    #[test]
    fn test_switch_repairs_interrupted_state() {
        let fx = two_profiles();
        // Simulate a crash after teardown
        remove_links_and_manifest(&fx.paths).unwrap();
        assert_eq!(detect_active_profile(&fx.paths), None);

        switch_to(&fx.config, "b42", &SymlinkLinker).unwrap();

        assert_eq!(detect_active_profile(&fx.paths).as_deref(), Some("b42"));
        assert!(fx.paths.manifest_file.exists());
    }

    #[test]
    fn test_switch_incomplete_profile_refused() {
        let fx = two_profiles();
        fs::remove_file(fx.paths.profile_manifest("b42")).unwrap();

        assert!(switch_to(&fx.config, "b42", &SymlinkLinker).is_err());

        assert_eq!(detect_active_profile(&fx.paths).as_deref(), Some("b41"));
        assert!(matches!(
            LinkStatus::detect(&fx.paths.user_data_dir),
            LinkStatus::Symlink { .. }
        ));
    }

    #[test]
    fn test_capture_then_switch_back() {
        let fx = Fixture::new();
        fx.stored_profile("b42", MANIFEST_UNSTABLE);

        capture(&fx.config, "b41", &SymlinkLinker).unwrap();
        switch_to(&fx.config, "b42", &SymlinkLinker).unwrap();
        switch_to(&fx.config, "b41", &SymlinkLinker).unwrap();

        assert_eq!(detect_active_profile(&fx.paths).as_deref(), Some("b41"));
        assert_eq!(
            fs::read_to_string(fx.paths.user_data_dir.join("options.ini")).unwrap(),
            "live"
        );
    }
}

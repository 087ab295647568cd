//! Capturing the live installation into a new profile.
//!
//! Steps, in order: space preflight, copy the install tree to
//! `GameFiles/`, move the user-data tree to `UserData/`, copy the live
//! manifest, then relink so the captured profile is the active one.
//! There is no rollback: a failure part-way leaves a partially populated
//! profile directory that needs manual inspection.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{IoResultExt, ProfileError, Result};
use crate::fs_utils::{available_space, copy_dir_recursive, dir_size, move_dir};
use crate::link::{LinkStatus, Linker, clear_live_path, create_links};
use crate::paths::Paths;
use crate::profiles::{profile_exists, validate_profile_name};

/// Outcome of the disk-space preflight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpaceCheck {
    pub install_size: u64,
    /// install_size plus 10% headroom, rounded up
    pub required: u64,
    pub available: u64,
}

impl SpaceCheck {
    pub fn new(install_size: u64, available: u64) -> Self {
        let required = (install_size as u128 * 11).div_ceil(10);
        Self {
            install_size,
            required: u64::try_from(required).unwrap_or(u64::MAX),
            available,
        }
    }

    /// install_size * 1.1 <= available, in integer arithmetic
    pub fn is_sufficient(&self) -> bool {
        self.install_size as u128 * 11 <= self.available as u128 * 10
    }
}

/// Capture source must be a real directory or a link to one
fn ensure_live_dir(path: &Path, label: &str) -> Result<()> {
    let problem = match LinkStatus::detect(path) {
        LinkStatus::Directory => return Ok(()),
        LinkStatus::Symlink { .. } if path.is_dir() => return Ok(()),
        LinkStatus::Missing => "does not exist",
        LinkStatus::File | LinkStatus::Symlink { .. } => "is not a directory",
        LinkStatus::BrokenSymlink { .. } => "is a broken symlink",
    };
    Err(ProfileError::io(
        format!("Live {} path {:?} {}", label, path, problem),
        ErrorKind::NotFound.into(),
    ))
}

/// Measure the live install and the free space behind the manager path
fn preflight_with<F>(paths: &Paths, free_space: F) -> Result<SpaceCheck>
where
    F: Fn(&Path) -> Result<u64>,
{
    let install_size = dir_size(&paths.install_dir)?;
    let available = free_space(&paths.manager_dir)?;
    Ok(SpaceCheck::new(install_size, available))
}

/// Snapshot the live install, user data and manifest as profile `name`
/// and leave it active.
///
/// # Arguments
/// * `config` - Configured steamapps, manager and user-data paths
/// * `name` - Name of the new profile (a directory under the manager path)
/// * `linker` - How the live links are created
///
/// # Returns
/// The disk-space figures measured by the preflight.
///
/// # Errors
/// Nothing is written when the profile already exists
/// ([`ProfileError::AlreadyExists`]), the name is invalid, a live path is
/// missing or dangling ([`ProfileError::Io`]), or the preflight fails
/// ([`ProfileError::InsufficientDiskSpace`]). Any later failure returns
/// the underlying [`ProfileError::Io`] and leaves a partially populated
/// profile behind.
pub fn capture(config: &Config, name: &str, linker: &dyn Linker) -> Result<SpaceCheck> {
    capture_with(config, name, linker, available_space)
}

fn capture_with<F>(
    config: &Config,
    name: &str,
    linker: &dyn Linker,
    free_space: F,
) -> Result<SpaceCheck>
where
    F: Fn(&Path) -> Result<u64>,
{
    let paths = Paths::from_config(config);

    if profile_exists(&paths, name) {
        return Err(ProfileError::AlreadyExists {
            name: name.to_string(),
        });
    }
    validate_profile_name(name)?;

    ensure_live_dir(&paths.install_dir, "game install")?;
    ensure_live_dir(&paths.user_data_dir, "user data")?;

    let space = preflight_with(&paths, free_space)?;
    info!(
        install_size = space.install_size,
        required = space.required,
        available = space.available,
        "capture preflight"
    );
    if !space.is_sufficient() {
        return Err(ProfileError::InsufficientDiskSpace {
            path: paths.manager_dir.clone(),
            required: space.required,
            available: space.available,
        });
    }

    let profile_dir = paths.profile_dir(name);
    fs::create_dir_all(&profile_dir)
        .ctx(|| format!("Failed to create profile directory: {:?}", profile_dir))?;

    let game_files = paths.profile_game_files(name);
    info!(dest = %game_files.display(), "copying game files");
    copy_dir_recursive(&paths.install_dir, &game_files)?;

    let user_data = paths.profile_user_data(name);
    match LinkStatus::detect(&paths.user_data_dir) {
        // The live folder belongs to the currently active profile; moving
        // it would strip that profile, so take a copy instead.
        LinkStatus::Symlink { .. } => {
            info!(dest = %user_data.display(), "copying linked user data");
            copy_dir_recursive(&paths.user_data_dir, &user_data)?;
        }
        _ => {
            warn!(
                src = %paths.user_data_dir.display(),
                dest = %user_data.display(),
                "moving user data out of the live location"
            );
            move_dir(&paths.user_data_dir, &user_data)?;
        }
    }

    let stored_manifest = paths.profile_manifest(name);
    fs::copy(&paths.manifest_file, &stored_manifest).ctx(|| {
        format!(
            "Failed to copy manifest: {:?} -> {:?}",
            paths.manifest_file, stored_manifest
        )
    })?;

    clear_live_path(&paths.install_dir)?;
    clear_live_path(&paths.user_data_dir)?;
    create_links(&paths, name, linker)?;

    info!(profile = name, "capture complete");
    Ok(space)
}

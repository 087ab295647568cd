use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::paths::home_dir;

/// Paths configured by the user, stored in config.json
///
/// Field names on disk match config files written by earlier releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Steam's steamapps folder (contains common/ and the app manifest)
    #[serde(default)]
    pub steamapps_path: PathBuf,

    /// Folder under which profiles are stored
    #[serde(default)]
    pub manager_path: PathBuf,

    /// Live Zomboid user-data folder
    #[serde(default, rename = "zomboid_user_path")]
    pub user_data_path: PathBuf,
}

impl Config {
    /// Read config from file, returning default if file doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Write config to file atomically
    ///
    /// Uses atomic write pattern: write to temp file, then rename.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)
            .with_context(|| format!("Failed to write temp config file: {:?}", temp_path))?;

        std::fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to rename config file: {:?} -> {:?}", temp_path, path))
    }

    /// Load the config, seeding a new file with detected defaults on first run
    pub fn load_or_init(path: &Path) -> Result<Self> {
        let mut config = Self::load_from(path)?;
        if !path.exists() && config.with_detected_defaults() {
            debug!(path = %path.display(), "writing detected defaults");
            config.save_to(path)?;
        }
        Ok(config)
    }

    /// Fill unset paths with the usual Steam and Zomboid locations.
    ///
    /// Returns true if anything was filled in.
    pub fn with_detected_defaults(&mut self) -> bool {
        let Some(home) = home_dir() else {
            return false;
        };
        self.fill_defaults_from(&home)
    }

    fn fill_defaults_from(&mut self, home: &Path) -> bool {
        let mut changed = false;

        if self.steamapps_path.as_os_str().is_empty()
            && let Some(steam_root) = detect_steam_root(home)
        {
            self.steamapps_path = steam_root.join("steamapps");
            changed = true;
        }

        if self.user_data_path.as_os_str().is_empty() {
            self.user_data_path = home.join("Zomboid");
            changed = true;
        }

        changed
    }

    /// Ensure every path has been set before running an operation
    pub fn validate(&self) -> Result<()> {
        let checks = [
            (&self.steamapps_path, "steamapps", "--steamapps"),
            (&self.manager_path, "manager", "--manager"),
            (&self.user_data_path, "user data", "--user-data"),
        ];
        for (value, label, flag) in checks {
            if value.as_os_str().is_empty() {
                bail!(
                    "The {} path is not configured.\nHint: Run 'pzprof config set {} <DIR>'.",
                    label,
                    flag
                );
            }
        }
        Ok(())
    }
}

/// First existing Steam install root
fn detect_steam_root(home: &Path) -> Option<PathBuf> {
    steam_root_candidates(home).into_iter().find(|p| p.exists())
}

#[cfg(not(windows))]
fn steam_root_candidates(home: &Path) -> Vec<PathBuf> {
    vec![home.join(".steam/steam"), home.join(".local/share/Steam")]
}

/// Steam records its install folder under HKCU; the default install
/// location is tried after it.
#[cfg(windows)]
fn steam_root_candidates(_home: &Path) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = registry_steam_path().into_iter().collect();
    candidates.push(PathBuf::from(r"C:\Program Files (x86)\Steam"));
    candidates
}

#[cfg(windows)]
fn registry_steam_path() -> Option<PathBuf> {
    use winreg::RegKey;
    use winreg::enums::HKEY_CURRENT_USER;

    let key = RegKey::predef(HKEY_CURRENT_USER)
        .open_subkey(r"Software\Valve\Steam")
        .ok()?;
    let value: String = key.get_value("SteamPath").ok()?;
    debug!(steam_path = %value, "found Steam in the registry");
    Some(PathBuf::from(value))
}

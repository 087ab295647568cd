//! Diagnostic tool for pzprof.
//!
//! `pzprof doctor` checks:
//! - that the three configured paths are set and exist,
//! - whether symlinks can be created,
//! - that the live links and manifest agree with each other,
//! - that every stored profile is complete.

use anstyle::AnsiColor;
use std::fs;

use crate::config::Config;
use crate::link::{LinkStatus, resolve_link_target};
use crate::manifest::read_manifest;
use crate::paths::Paths;
use crate::probe::SymlinkSupport;
use crate::profiles::{ProfileContents, detect_active_profile, list_profiles};
use crate::ui::Ui;

/// Run the doctor diagnostics, returning true when no issues were found
pub fn run_doctor(config: &Config, support: SymlinkSupport, ui: &Ui) -> bool {
    ui.section("pzprof Doctor");
    ui.newline();

    let paths = Paths::from_config(config);
    let mut healthy = true;

    // 1. Configuration
    let config_ok = check_step(ui, "Configuration", || {
        let mut ok = true;
        let entries = [
            ("steamapps", &config.steamapps_path, &paths.steamapps_dir),
            ("manager", &config.manager_path, &paths.manager_dir),
        ];
        for (label, raw, resolved) in entries {
            if raw.as_os_str().is_empty() {
                ui.println(format!("  {} {} path not set", ui.icon_err(), label));
                ok = false;
            } else if resolved.is_dir() {
                ui.println(format!("  {} {} path: {}", ui.icon_ok(), label, resolved.display()));
            } else {
                ui.println(format!(
                    "  {} {} path does not exist: {}",
                    ui.icon_warn(),
                    label,
                    resolved.display()
                ));
            }
        }
        if config.user_data_path.as_os_str().is_empty() {
            ui.println(format!("  {} user data path not set", ui.icon_err()));
            ok = false;
        } else {
            ui.println(format!(
                "  {} user data path: {}",
                ui.icon_info(),
                paths.user_data_dir.display()
            ));
        }
        ok
    });

    // 2. Permissions
    healthy &= check_step(ui, "Symlink Permissions", || match support {
        SymlinkSupport::Native => {
            ui.println(format!("  {} Symlinks can be created", ui.icon_ok()));
            true
        }
        SymlinkSupport::Shell => {
            ui.println(format!("  {} Symlinks available through mklink", ui.icon_ok()));
            true
        }
        SymlinkSupport::Unavailable => {
            ui.println(format!(
                "  {} Cannot create symlinks. Run as Administrator or enable Developer Mode.",
                ui.icon_err()
            ));
            false
        }
    });

    if !config_ok {
        ui.warn("Skipping link and profile checks until the configuration is complete.");
        return false;
    }

    // 3. Live state
    healthy &= check_step(ui, "Live Links", || check_live_state(&paths, ui));

    // 4. Profiles
    healthy &= check_step(ui, "Profiles", || {
        let profiles = match list_profiles(&paths) {
            Ok(p) => p,
            Err(e) => {
                ui.println(format!("  {} Failed to list profiles: {}", ui.icon_err(), e));
                return false;
            }
        };

        if profiles.is_empty() {
            ui.println(format!("  {} No profiles found", ui.icon_warn()));
            return true;
        }

        ui.println(format!("  Found {} profiles:", profiles.len()));
        let mut all_valid = true;
        for name in profiles {
            let contents = ProfileContents::inspect(&paths, &name);
            if !contents.is_complete() {
                ui.println(format!(
                    "    {} {} (missing: {})",
                    ui.icon_err(),
                    name,
                    contents.missing().join(", ")
                ));
                all_valid = false;
                continue;
            }
            match read_manifest(&paths.profile_manifest(&name)) {
                Ok(status) => {
                    ui.println(format!("    {} {} [{}]", ui.icon_ok(), name, status.label()))
                }
                Err(e) => {
                    ui.println(format!("    {} {} ({})", ui.icon_err(), name, e));
                    all_valid = false;
                }
            }
        }
        all_valid
    });

    healthy
}

fn check_live_state(paths: &Paths, ui: &Ui) -> bool {
    let mut ok = true;
    let mut owners = Vec::new();

    for (label, path) in [("Install", &paths.install_dir), ("User data", &paths.user_data_dir)] {
        match LinkStatus::detect(path) {
            LinkStatus::Symlink { target } => {
                let resolved = resolve_link_target(path, &target);
                ui.println(format!("  {} {} -> {}", ui.icon_ok(), label, resolved.display()));
                if !paths.is_in_manager_dir(&resolved) {
                    ui.println(format!(
                        "  {} Target is outside the manager directory",
                        ui.icon_warn()
                    ));
                }
                owners.push(resolved.parent().map(|p| p.to_path_buf()));
            }
            LinkStatus::BrokenSymlink { target } => {
                ui.println(format!(
                    "  {} {} is a BROKEN symlink to {}",
                    ui.icon_err(),
                    label,
                    target.display()
                ));
                ok = false;
            }
            LinkStatus::Directory => {
                ui.println(format!(
                    "  {} {} is a real directory (not captured yet?)",
                    ui.icon_info(),
                    label
                ));
            }
            LinkStatus::File => {
                ui.println(format!("  {} {} is a regular file", ui.icon_err(), label));
                ok = false;
            }
            LinkStatus::Missing => {
                ui.println(format!("  {} {} is missing", ui.icon_warn(), label));
            }
        }
    }

    if owners.len() == 2 && owners[0] != owners[1] {
        ui.println(format!(
            "  {} Install and user data point into different profiles",
            ui.icon_err()
        ));
        ok = false;
    }

    let manifest_present = paths.manifest_file.is_file();
    match detect_active_profile(paths) {
        Some(active) => {
            ui.println(format!("  {} Active profile: {}", ui.icon_info(), active));
            let stored = fs::read(paths.profile_manifest(&active)).ok();
            let live = fs::read(&paths.manifest_file).ok();
            if !manifest_present {
                ui.println(format!("  {} Live manifest is missing", ui.icon_err()));
                ok = false;
            } else if stored != live {
                ui.println(format!(
                    "  {} Live manifest differs from the profile's copy (game updated?)",
                    ui.icon_warn()
                ));
            }
        }
        None if manifest_present && owners.is_empty() => {
            ui.println(format!("  {} No active profile (vanilla install)", ui.icon_info()));
        }
        None if manifest_present => {
            ui.println(format!("  {} Manifest present but no profile is active", ui.icon_err()));
            ok = false;
        }
        None => {
            ui.println(format!("  {} No active profile", ui.icon_info()));
        }
    }

    ok
}

fn check_step<F>(ui: &Ui, name: &str, check_fn: F) -> bool
where
    F: FnOnce() -> bool,
{
    ui.println(ui.bold(format!("Checking {}...", name)));
    let success = check_fn();
    if !success {
        ui.println(ui.colored("  Issues detected!", AnsiColor::Red));
    }
    ui.newline();
    success
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::link::SymlinkLinker;
    use crate::switch::switch_to;
    use crate::test_utils::{Fixture, MANIFEST_STABLE};
    use crate::ui::ColorMode;

    fn test_ui() -> Ui {
        Ui::new(ColorMode::Never, false)
    }

    #[test]
    fn test_doctor_vanilla_install() {
        let fx = Fixture::new();
        assert!(run_doctor(&fx.config, SymlinkSupport::Native, &test_ui()));
    }

    #[test]
    fn test_doctor_active_profile() {
        let fx = Fixture::new();
        fx.stored_profile("b41", MANIFEST_STABLE);
        switch_to(&fx.config, "b41", &SymlinkLinker).unwrap();
        assert!(run_doctor(&fx.config, SymlinkSupport::Native, &test_ui()));
    }

    #[test]
    fn test_doctor_flags_incomplete_profile() {
        let fx = Fixture::new();
        fx.stored_profile("b41", MANIFEST_STABLE);
        fs::remove_dir_all(fx.paths.profile_user_data("b41")).unwrap();
        assert!(!run_doctor(&fx.config, SymlinkSupport::Native, &test_ui()));
    }

    #[test]
    fn test_doctor_flags_missing_permissions() {
        let fx = Fixture::new();
        assert!(!run_doctor(&fx.config, SymlinkSupport::Unavailable, &test_ui()));
    }

    #[test]
    fn test_doctor_flags_unset_config() {
        assert!(!run_doctor(&Config::default(), SymlinkSupport::Native, &test_ui()));
    }
}

//! High-level command orchestration for the CLI.
//!
//! Each function here corresponds to a subcommand in `main.rs`. Long
//! operations (capture, use) run through `crate::task` so the spinner
//! keeps ticking while files are copied.

use anstyle::AnsiColor;
use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::capture::capture as capture_profile;
use crate::config::Config;
use crate::doctor::run_doctor;
use crate::fs_utils::dir_size;
use crate::link::{LinkStatus, Linker, remove_links_and_manifest};
use crate::lock::OperationLock;
use crate::manifest::read_manifest;
use crate::paths::Paths;
use crate::probe::SymlinkSupport;
use crate::profiles::{
    ProfileContents, detect_active_profile, list_profiles, profile_exists, validate_profile_name,
};
use crate::switch::switch_to;
use crate::task;
use crate::ui::{Ui, format_bytes};

pub const PERMISSION_WARNING: &str = "pzprof may not be able to create symbolic links.\n     On Windows, run it as Administrator or enable Developer Mode.";

/// List all stored profiles
pub fn list(config: &Config, ui: &Ui) -> Result<()> {
    let paths = Paths::from_config(config);
    let profiles = list_profiles(&paths)?;

    if profiles.is_empty() {
        ui.warn("No profiles found.");
        ui.newline();
        ui.println("Capture the installed version with:");
        ui.println(format!("  {} capture <name>", ui.bold("pzprof")));
        return Ok(());
    }

    let active = detect_active_profile(&paths);

    let mut table = ui.simple_table();
    table.set_header(vec![
        ui.header_cell(""),
        ui.header_cell("Profile"),
        ui.header_cell("Version"),
        ui.header_cell("Status"),
    ]);

    for name in &profiles {
        let is_active = active.as_deref() == Some(name.as_str());
        let icon = if is_active { ui.icon_ok() } else { " " };
        let status_cell = if is_active {
            ui.colored_cell("active", AnsiColor::Green)
        } else {
            ui.cell("-")
        };
        let version = match read_manifest(&paths.profile_manifest(name)) {
            Ok(status) => status.label(),
            Err(_) => String::from("?"),
        };

        table.add_row(vec![ui.cell(icon), ui.cell(name), ui.cell(version), status_cell]);
    }

    ui.section("Profiles");
    ui.println(table.to_string());
    Ok(())
}

/// Show the detected active version and the state of the live paths
pub fn status(config: &Config, ui: &Ui) -> Result<()> {
    let paths = Paths::from_config(config);

    ui.section("Current Version");
    ui.newline();

    let mut table = ui.simple_table();

    let version = match read_manifest(&paths.manifest_file) {
        Ok(status) => ui.header_cell(status.label()),
        Err(e) => ui.colored_cell(format!("unreadable ({})", e), AnsiColor::Red),
    };
    table.add_row(vec![ui.cell("Detected version:"), version]);

    let active = match detect_active_profile(&paths) {
        Some(name) => ui.colored_cell(name, AnsiColor::Green),
        None => ui.cell("(none)"),
    };
    table.add_row(vec![ui.cell("Active profile:"), active]);

    let live_paths = [
        ("Game files:", &paths.install_dir),
        ("User data:", &paths.user_data_dir),
    ];
    for (label, path) in live_paths {
        table.add_row(vec![ui.cell(label), link_status_cell(ui, &LinkStatus::detect(path))]);
    }

    ui.println(table.to_string());
    Ok(())
}

fn link_status_cell(ui: &Ui, status: &LinkStatus) -> comfy_table::Cell {
    match status {
        LinkStatus::Missing => ui.colored_cell("missing", AnsiColor::Yellow),
        LinkStatus::Directory => ui.cell("real directory (not managed)"),
        LinkStatus::File => ui.colored_cell("regular file", AnsiColor::Red),
        LinkStatus::Symlink { target } => ui.cell(format!("symlink → {}", target.display())),
        LinkStatus::BrokenSymlink { target } => ui.colored_cell(
            format!("broken symlink → {}", target.display()),
            AnsiColor::Red,
        ),
    }
}

/// Show detailed information about a profile
pub fn inspect(config: &Config, name: &str, ui: &Ui) -> Result<()> {
    let paths = Paths::from_config(config);
    if !profile_exists(&paths, name) {
        bail!(
            "Profile '{}' does not exist.\nHint: Use 'pzprof list' to see available profiles.",
            name
        );
    }

    let profile_dir = paths.profile_dir(name);
    ui.section(format!("Profile: {}", name));
    ui.newline();

    let mut table = ui.simple_table();
    table.add_row(vec![ui.cell("Location:"), ui.cell(profile_dir.display().to_string())]);

    let version = match read_manifest(&paths.profile_manifest(name)) {
        Ok(status) => ui.cell(status.label()),
        Err(e) => ui.colored_cell(e.to_string(), AnsiColor::Red),
    };
    table.add_row(vec![ui.cell("Version:"), version]);

    if let Ok(modified) = profile_dir.metadata().and_then(|m| m.modified()) {
        let datetime: DateTime<Local> = modified.into();
        table.add_row(vec![
            ui.cell("Modified:"),
            ui.cell(datetime.format("%Y-%m-%d %H:%M:%S").to_string()),
        ]);
    }

    let is_active = detect_active_profile(&paths).as_deref() == Some(name);
    table.add_row(vec![
        ui.cell("Active:"),
        if is_active {
            ui.colored_cell("yes", AnsiColor::Green)
        } else {
            ui.cell("no")
        },
    ]);

    ui.println(table.to_string());
    ui.newline();

    let mut contents_table = ui.table();
    contents_table.set_header(vec![ui.header_cell("Content"), ui.header_cell("Size")]);
    for (label, path) in [
        ("GameFiles", paths.profile_game_files(name)),
        ("UserData", paths.profile_user_data(name)),
    ] {
        let size = if path.is_dir() {
            ui.cell(format_bytes(dir_size(&path)?))
        } else {
            ui.colored_cell("missing", AnsiColor::Red)
        };
        contents_table.add_row(vec![ui.cell(label), size]);
    }
    ui.println(contents_table.to_string());

    let contents = ProfileContents::inspect(&paths, name);
    if !contents.is_complete() {
        ui.newline();
        ui.warn(format!(
            "Profile is incomplete (missing: {}). A capture may have been interrupted.",
            contents.missing().join(", ")
        ));
    }

    Ok(())
}

/// Capture the live installation as a new profile
pub fn capture(config: &Config, name: &str, linker: Arc<dyn Linker>, ui: &Ui) -> Result<()> {
    config.validate()?;

    let paths = Paths::from_config(config);
    if profile_exists(&paths, name) {
        bail!(
            "Profile '{}' already exists.\nHint: Choose a different name, or inspect it with 'pzprof inspect {}'.",
            name,
            name
        );
    }
    validate_profile_name(name)?;
    if !paths.install_dir.exists() {
        bail!(
            "No game installation found at {}.\nHint: Check the steamapps path with 'pzprof config show'.",
            paths.install_dir.display()
        );
    }

    let _lock = OperationLock::acquire(&paths.lock_file())?;

    let job_config = config.clone();
    let job_name = name.to_string();
    let handle = task::spawn("capture", move || {
        let space = capture_profile(&job_config, &job_name, linker.as_ref())?;
        Ok(format!(
            "Successfully stored '{}' ({} of game files).",
            job_name,
            format_bytes(space.install_size)
        ))
    })
    .context("Failed to start capture")?;

    finish(ui.wait_for_task(
        format!("Capturing '{}'... This will take a while.", name),
        handle,
    ))
}

/// Switch to a stored profile
pub fn use_profile(
    config: &Config,
    name: &str,
    linker: Arc<dyn Linker>,
    yes: bool,
    ui: &Ui,
) -> Result<()> {
    config.validate()?;
    let paths = Paths::from_config(config);

    if !profile_exists(&paths, name) {
        bail!(
            "Profile '{}' does not exist.\nHint: Use 'pzprof list' to see available profiles.",
            name
        );
    }

    warn_unmanaged_dirs(&paths, ui);
    if !yes && !confirm(&format!("Are you sure you want to switch to '{}'?", name))? {
        ui.warn("Switch cancelled.");
        return Ok(());
    }

    let _lock = OperationLock::acquire(&paths.lock_file())?;

    let job_config = config.clone();
    let job_name = name.to_string();
    let handle = task::spawn("switch", move || {
        switch_to(&job_config, &job_name, linker.as_ref())?;
        Ok(format!("Switched to {}.", job_name))
    })
    .context("Failed to start switch")?;

    finish(ui.wait_for_task(format!("Switching to '{}'...", name), handle))
}

/// Remove the live links and manifest, leaving no version active
pub fn unlink(config: &Config, yes: bool, ui: &Ui) -> Result<()> {
    config.validate()?;
    let paths = Paths::from_config(config);

    warn_unmanaged_dirs(&paths, ui);
    if !yes && !confirm("Remove the live game links and manifest?")? {
        ui.warn("Unlink cancelled.");
        return Ok(());
    }

    let _lock = OperationLock::acquire(&paths.lock_file())?;
    remove_links_and_manifest(&paths)?;

    ui.ok("No version is active now.");
    ui.println("To activate one:");
    ui.println("  pzprof use <name>");
    Ok(())
}

/// Live paths that are real directories get deleted by a switch or unlink
fn warn_unmanaged_dirs(paths: &Paths, ui: &Ui) {
    for path in [&paths.install_dir, &paths.user_data_dir] {
        if LinkStatus::detect(path) == LinkStatus::Directory {
            ui.warn(format!(
                "{} is a real directory, not a profile link. It will be DELETED.\n     Capture it first with 'pzprof capture <name>' to keep it.",
                path.display()
            ));
        }
    }
}

fn confirm(question: &str) -> Result<bool> {
    inquire::Confirm::new(question)
        .with_default(false)
        .prompt()
        .context("Confirmation cancelled")
}

fn finish(outcome: task::TaskOutcome) -> Result<()> {
    if outcome.success {
        Ok(())
    } else {
        Err(anyhow!(outcome.message))
    }
}

/// Print the configuration
pub fn config_show(config: &Config, config_file: &Path, ui: &Ui) -> Result<()> {
    let paths = Paths::from_config(config);

    ui.section("Configuration");
    ui.println(ui.dim(config_file.display().to_string()));
    ui.newline();

    let shown = |p: &Path| {
        if p.as_os_str().is_empty() {
            ui.colored_cell("(not set)", AnsiColor::Yellow)
        } else {
            ui.cell(p.display().to_string())
        }
    };

    let mut table = ui.simple_table();
    table.add_row(vec![ui.cell("steamapps:"), shown(config.steamapps_path.as_path())]);
    table.add_row(vec![ui.cell("manager:"), shown(config.manager_path.as_path())]);
    table.add_row(vec![ui.cell("user data:"), shown(config.user_data_path.as_path())]);
    if !config.steamapps_path.as_os_str().is_empty() {
        table.add_row(vec![
            ui.cell("game files:"),
            ui.cell(paths.install_dir.display().to_string()),
        ]);
        table.add_row(vec![
            ui.cell("manifest:"),
            ui.cell(paths.manifest_file.display().to_string()),
        ]);
    }
    ui.println(table.to_string());
    Ok(())
}

/// Update one or more configured paths and save
pub fn config_set(
    config_file: &Path,
    steamapps: Option<PathBuf>,
    manager: Option<PathBuf>,
    user_data: Option<PathBuf>,
    ui: &Ui,
) -> Result<()> {
    if steamapps.is_none() && manager.is_none() && user_data.is_none() {
        bail!("Nothing to set.\nHint: Pass --steamapps, --manager and/or --user-data.");
    }

    let mut config = Config::load_from(config_file)?;
    if let Some(p) = steamapps {
        config.steamapps_path = p;
    }
    if let Some(p) = manager {
        config.manager_path = p;
    }
    if let Some(p) = user_data {
        config.user_data_path = p;
    }
    config.save_to(config_file)?;

    ui.ok("Settings saved.");
    Ok(())
}

pub fn doctor(config: &Config, support: SymlinkSupport, ui: &Ui) -> Result<()> {
    if !run_doctor(config, support, ui) {
        bail!("Doctor found issues");
    }
    Ok(())
}

//! Test utilities shared across test modules
//!
//! Builds a throwaway Steam library, Zomboid user folder and manager
//! directory inside a temp dir.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::Config;
use crate::paths::Paths;

pub const MANIFEST_STABLE: &str = r#""AppState"
{
	"appid"		"108600"
	"buildid"		"11942712"
	"UserConfig"
	{
		"language"		"english"
	}
}
"#;

pub const MANIFEST_UNSTABLE: &str = r#""AppState"
{
	"appid"		"108600"
	"buildid"		"16218823"
	"UserConfig"
	{
		"language"		"english"
		"BetaKey"		"unstable"
	}
}
"#;

pub struct Fixture {
    pub temp_dir: TempDir,
    pub config: Config,
    pub paths: Paths,
}

impl Fixture {
    /// A vanilla install: real install directory, real user-data folder,
    /// stable manifest, empty manager directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        let config = Config {
            steamapps_path: root.join("steamapps"),
            manager_path: root.join("store"),
            user_data_path: root.join("Zomboid"),
        };
        let paths = Paths::from_config(&config);

        write_game_tree(&paths.install_dir, "live");
        write_user_tree(&paths.user_data_dir, "live");
        fs::write(&paths.manifest_file, MANIFEST_STABLE).unwrap();
        fs::create_dir_all(&paths.manager_dir).unwrap();

        Self {
            temp_dir,
            config,
            paths,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a complete profile directly into the manager directory
    pub fn stored_profile(&self, name: &str, manifest: &str) {
        write_game_tree(&self.paths.profile_game_files(name), name);
        write_user_tree(&self.paths.profile_user_data(name), name);
        fs::write(self.paths.profile_manifest(name), manifest).unwrap();
    }
}

fn write_game_tree(dir: &Path, marker: &str) {
    fs::create_dir_all(dir.join("media/lua")).unwrap();
    fs::write(dir.join("ProjectZomboid64"), vec![7u8; 1000]).unwrap();
    fs::write(dir.join("media/lua/version.txt"), marker).unwrap();
}

fn write_user_tree(dir: &Path, marker: &str) {
    fs::create_dir_all(dir.join("Saves/Sandbox")).unwrap();
    fs::write(dir.join("options.ini"), marker).unwrap();
    fs::write(dir.join("Saves/Sandbox/map.bin"), vec![1u8; 200]).unwrap();
}

/// Sorted relative paths of everything under `root`, symlinks not followed
pub fn tree_snapshot(root: &Path) -> Vec<PathBuf> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) {
        for entry in fs::read_dir(dir).unwrap() {
            let entry = entry.unwrap();
            let path = entry.path();
            out.push(path.strip_prefix(root).unwrap().to_path_buf());
            if entry.file_type().unwrap().is_dir() {
                walk(root, &path, out);
            }
        }
    }

    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}

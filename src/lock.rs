use anyhow::{Context, Result, bail};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Exclusive advisory lock on `{manager}/.pzprof.lock`
///
/// Held by the CLI for the duration of a capture, switch or unlink so two
/// invocations cannot rewire the live paths at the same time. The engine
/// itself takes no locks.
pub struct OperationLock {
    file: File,
    path: PathBuf,
}

impl OperationLock {
    /// Take the lock without waiting; fails if another operation holds it
    pub fn acquire(lock_path: &Path) -> Result<Self> {
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create manager directory: {:?}", parent))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)
            .with_context(|| format!("Failed to open lock file: {:?}", lock_path))?;

        if file.try_lock_exclusive().is_err() {
            bail!(
                "Another pzprof operation is already running.\nHint: Wait for it to finish, or remove {:?} if no pzprof process is alive.",
                lock_path
            );
        }

        Ok(Self {
            file,
            path: lock_path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for OperationLock {
    fn drop(&mut self) {
        // Release the lock (ignore errors during drop)
        let _ = FileExt::unlock(&self.file);
    }
}

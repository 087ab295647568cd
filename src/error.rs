//! Error kinds for the capture/switch engine.
//!
//! The engine modules return [`ProfileError`] so callers can tell a
//! refused operation (profile exists, not enough space, ...) apart from a
//! filesystem failure. The CLI layer wraps these in `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = ProfileError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ProfileError {
    /// Capture target already exists under the manager directory.
    #[error("Profile '{name}' already exists")]
    AlreadyExists { name: String },

    /// Switch target is not a stored profile.
    #[error("Profile '{name}' not found")]
    NotFound { name: String },

    /// The disk-space preflight refused to start a capture.
    #[error(
        "Not enough disk space in '{}': need {required} bytes, {available} available",
        path.display()
    )]
    InsufficientDiskSpace {
        path: PathBuf,
        required: u64,
        available: u64,
    },

    /// Directory symlink could not be created with the available privileges.
    #[error("Permission denied creating symlink {}: {reason}", link.display())]
    PermissionDenied { link: PathBuf, reason: String },

    #[error("Failed to parse manifest {} (line {line}): {message}", path.display())]
    ManifestParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Invalid profile name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Generic copy/move/remove failure carrying the underlying cause.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProfileError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Attach a human-readable context to a raw `std::io::Result`.
pub trait IoResultExt<T> {
    fn ctx<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn ctx<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| ProfileError::io(f(), source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_context_is_in_message() {
        let res: io::Result<()> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = res.ctx(|| "Failed to copy foo").unwrap_err();
        assert_eq!(err.to_string(), "Failed to copy foo: gone");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_disk_space_message() {
        let err = ProfileError::InsufficientDiskSpace {
            path: PathBuf::from("/store"),
            required: 110,
            available: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("/store"));
        assert!(msg.contains("110"));
    }
}

//! Per-user directory layout for the orrery.
//!
//! Config files live under the OS configuration directory (XDG on Linux,
//! Known Folders on Windows, Library on macOS); logs sit next to them.

use std::path::{Path, PathBuf};

const APP_NAME: &str = "orrery";

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("could not determine OS configuration directory")]
    NoConfigDir,

    #[error("failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// OS-specific directories used by the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDirs {
    /// `config.ron` and `bindings.ron`.
    pub config_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl PlatformDirs {
    /// Resolve the directories without touching the filesystem.
    pub fn resolve() -> Result<Self, PlatformError> {
        let base = dirs::config_dir().ok_or(PlatformError::NoConfigDir)?;
        Ok(Self::resolve_with_root(&base))
    }

    /// Resolve directories rooted under `root` instead of the OS location.
    pub fn resolve_with_root(root: &Path) -> Self {
        let app_dir = root.join(APP_NAME);
        Self {
            config_dir: app_dir.join("config"),
            log_dir: app_dir.join("logs"),
        }
    }

    /// Point the config directory somewhere else, keeping the log directory.
    pub fn with_config_dir(mut self, config_dir: PathBuf) -> Self {
        self.config_dir = config_dir;
        self
    }

    /// Create every directory on disk.
    pub fn create_dirs(&self) -> Result<(), PlatformError> {
        for dir in [&self.config_dir, &self.log_dir] {
            std::fs::create_dir_all(dir).map_err(|source| PlatformError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_with_root_layout() {
        let root = Path::new("/tmp/orrery-root");
        let dirs = PlatformDirs::resolve_with_root(root);
        assert_eq!(dirs.config_dir, root.join("orrery").join("config"));
        assert_eq!(dirs.log_dir, root.join("orrery").join("logs"));
    }

    #[test]
    fn test_create_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = PlatformDirs::resolve_with_root(tmp.path());
        dirs.create_dirs().unwrap();
        assert!(dirs.config_dir.is_dir());
        assert!(dirs.log_dir.is_dir());
        // Idempotent
        dirs.create_dirs().unwrap();
    }

    #[test]
    fn test_config_dir_override_keeps_logs() {
        let tmp = tempfile::tempdir().unwrap();
        let custom = tmp.path().join("custom");
        let dirs = PlatformDirs::resolve_with_root(tmp.path()).with_config_dir(custom.clone());
        assert_eq!(dirs.config_dir, custom);
        assert_eq!(dirs.log_dir, tmp.path().join("orrery").join("logs"));
    }

    #[test]
    fn test_create_dirs_reports_path() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let dirs = PlatformDirs::resolve_with_root(&blocker);
        match dirs.create_dirs() {
            Err(PlatformError::CreateDir { path, .. }) => assert!(path.starts_with(&blocker)),
            other => panic!("expected CreateDir error, got {other:?}"),
        }
    }
}

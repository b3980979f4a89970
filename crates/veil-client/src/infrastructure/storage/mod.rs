//! Storage infrastructure: credential and configuration persistence.
//!
//! This module is the thin adapter between the application and the file
//! system:
//!
//! - [`FileTokenStore`] persists the bearer token – a single entry under a
//!   fixed key, surviving process restarts – in a TOML credentials file.
//! - The `config` sub-module reads and writes the application's TOML
//!   configuration, with defaults for first run.
//!
//! Both live in the platform-appropriate config directory
//! (`%APPDATA%\Veil` on Windows, `~/.config/veil` on Linux,
//! `~/Library/Application Support/Veil` on macOS).  Keeping storage concerns
//! here – rather than scattered throughout the application – means the file
//! format can change without touching any other part of the codebase.

pub mod config;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::application::session::{StorageError, TokenStore, AUTH_TOKEN_KEY};

/// Resolves the platform config base directory including the `Veil`/`veil`
/// subdirectory.
pub(crate) fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Veil"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("veil"))
    }

    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/Veil
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Veil")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        // Fallback for unsupported platforms.
        None
    }
}

/// On-disk token store: a `credentials.toml` holding the single
/// [`AUTH_TOKEN_KEY`] entry.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Creates a store at the platform-default credentials path.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoPlatformConfigDir`] when the platform config
    /// base directory cannot be determined from the environment.
    pub fn new() -> Result<Self, StorageError> {
        let dir = platform_config_dir().ok_or(StorageError::NoPlatformConfigDir)?;
        Ok(Self {
            path: dir.join("credentials.toml"),
        })
    }

    /// Creates a store at an explicit path (used by tests and portable mode).
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => toml::from_str(&content)
                .map_err(|e| StorageError::Malformed(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content =
            toml::to_string_pretty(entries).map_err(|e| StorageError::Malformed(e.to_string()))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.read_entries()?.get(AUTH_TOKEN_KEY).cloned())
    }

    fn save(&self, token: &str) -> Result<(), StorageError> {
        let mut entries = self.read_entries()?;
        entries.insert(AUTH_TOKEN_KEY.to_string(), token.to_string());
        self.write_entries(&entries)?;
        debug!("bearer token persisted");
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        // A store that was never written (or an already-removed entry) is a
        // successful clear.
        let mut entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(StorageError::Malformed(_)) => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        entries.remove(AUTH_TOKEN_KEY);
        if entries.is_empty() {
            match std::fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(StorageError::Io(e)),
            }
        } else {
            self.write_entries(&entries)?;
        }
        debug!("bearer token cleared");
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> (FileTokenStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!(
            "veil_store_test_{name}_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        (FileTokenStore::at_path(dir.join("credentials.toml")), dir)
    }

    #[test]
    fn test_load_returns_none_when_file_absent() {
        let (store, dir) = temp_store("absent");
        assert_eq!(store.load().unwrap(), None);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_then_load_round_trips_token() {
        let (store, dir) = temp_store("roundtrip");

        store.save("t1").unwrap();
        assert_eq!(store.load().unwrap(), Some("t1".to_string()));

        // Overwrite on a fresh login.
        store.save("t2").unwrap();
        assert_eq!(store.load().unwrap(), Some("t2".to_string()));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_clear_removes_persisted_token() {
        let (store, dir) = temp_store("clear");
        store.save("t1").unwrap();

        store.clear().unwrap();

        assert_eq!(store.load().unwrap(), None);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_clear_of_absent_store_succeeds() {
        let (store, dir) = temp_store("clear_absent");
        store.clear().unwrap();
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_of_malformed_store_reports_malformed() {
        let (store, dir) = temp_store("malformed");
        std::fs::write(store.path(), "[[[ not valid toml").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, StorageError::Malformed(_)));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_clear_of_malformed_store_succeeds() {
        // A corrupt credentials file must not be able to wedge logout.
        let (store, dir) = temp_store("malformed_clear");
        std::fs::write(store.path(), "[[[ not valid toml").unwrap();

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_token_is_stored_under_fixed_key() {
        let (store, dir) = temp_store("fixed_key");
        store.save("t1").unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(content.contains(AUTH_TOKEN_KEY));

        std::fs::remove_dir_all(&dir).ok();
    }
}

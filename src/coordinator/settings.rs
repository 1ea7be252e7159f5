//! Persisted key/value settings shared between processes.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use fs4::fs_std::FileExt;
use thiserror::Error;

/// Errors raised by a [`SettingsStore`].
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid settings file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to acquire settings lock: {0}")]
    LockFailed(String),
}

/// Process-shared string settings.
///
/// Values written through one instance must be visible to every other
/// instance backed by the same storage, including ones in other processes.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError>;
    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError>;
}

/// In-process store, for tests and single-process hosts.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Locations used by [`FileSettingsStore`].
#[derive(Debug, Clone)]
pub struct SettingsPaths {
    pub dir: PathBuf,
    pub settings_file: PathBuf,
    pub lock_file: PathBuf,
}

impl SettingsPaths {
    /// Paths under `$SKIN_MANAGER_HOME`, or the user config directory.
    pub fn new() -> Self {
        let dir = match std::env::var_os("SKIN_MANAGER_HOME") {
            Some(home) if !home.is_empty() => PathBuf::from(home),
            _ => dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join("skin-manager"),
        };
        Self::in_dir(dir)
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            settings_file: dir.join("settings.json"),
            lock_file: dir.join("settings.lock"),
            dir,
        }
    }
}

impl Default for SettingsPaths {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON file store guarded by an exclusive file lock.
///
/// Every call rereads the file, so writes from other processes are seen
/// on the next read.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    paths: SettingsPaths,
}

impl FileSettingsStore {
    pub fn new(paths: SettingsPaths) -> Result<Self, SettingsError> {
        fs::create_dir_all(&paths.dir)?;
        Ok(Self { paths })
    }

    /// Store under the user config directory.
    pub fn open_default() -> Result<Self, SettingsError> {
        Self::new(SettingsPaths::new())
    }

    pub fn paths(&self) -> &SettingsPaths {
        &self.paths
    }

    fn lock(&self) -> Result<fs::File, SettingsError> {
        let lock_file = fs::File::create(&self.paths.lock_file)?;
        lock_file
            .lock_exclusive()
            .map_err(|e| SettingsError::LockFailed(e.to_string()))?;
        Ok(lock_file)
    }

    fn read_values(path: &Path) -> Result<BTreeMap<String, String>, SettingsError> {
        match fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let lock_file = self.lock()?;
        let values = Self::read_values(&self.paths.settings_file)?;
        drop(lock_file);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let lock_file = self.lock()?;
        let mut values = Self::read_values(&self.paths.settings_file)?;
        values.insert(key.to_string(), value.to_string());

        // Atomic write via temp file
        let tmp_path = self.paths.settings_file.with_extension("tmp");
        fs::write(&tmp_path, serde_json::to_string_pretty(&values)?)?;
        fs::rename(&tmp_path, &self.paths.settings_file)?;

        drop(lock_file);
        log::debug!("Setting {} = {}", key, value);
        Ok(())
    }
}

//! Package loading with default-path fallback.

use std::path::Path;
use std::sync::Arc;

use super::{PackageOpener, ResourcePackage};

/// Result of one package load: the primary package and the default
/// package it falls back to.
#[derive(Debug, Clone)]
pub struct LoadedPackages {
    /// Path the primary package was actually loaded from
    pub effective_path: String,
    /// User-selected package, `None` if it could not be opened
    pub primary: Option<Arc<dyn ResourcePackage>>,
    /// Built-in fallback package, `None` if it could not be opened
    pub default: Option<Arc<dyn ResourcePackage>>,
}

/// Loads primary and default packages through a [`PackageOpener`].
///
/// Loading performs blocking I/O; callers run it on a blocking worker.
pub struct PackageLoader {
    opener: Arc<dyn PackageOpener>,
    default_path: String,
}

impl PackageLoader {
    /// Create a loader that falls back to `default_path`.
    pub fn new(opener: Arc<dyn PackageOpener>, default_path: impl Into<String>) -> Self {
        Self {
            opener,
            default_path: default_path.into(),
        }
    }

    /// Path of the built-in default package.
    pub fn default_path(&self) -> &str {
        &self.default_path
    }

    /// The path a load of `path` will actually open.
    ///
    /// Empty paths and paths that do not reference an existing bundle are
    /// replaced by the default path.
    pub fn effective_path(&self, path: &str) -> String {
        let path = path.trim();
        if path.is_empty() {
            return self.default_path.clone();
        }
        if !self.opener.exists(Path::new(path)) {
            log::warn!(
                "Skin package {} does not exist, using default {}",
                path,
                self.default_path
            );
            return self.default_path.clone();
        }
        path.to_string()
    }

    /// Load the package at `path` together with its default package.
    ///
    /// `cached_default` is reused unless the effective path is the default
    /// path itself, in which case the default is reopened and shared with
    /// the primary slot. Open failures are logged and absorbed.
    pub fn load(
        &self,
        path: &str,
        cached_default: Option<Arc<dyn ResourcePackage>>,
    ) -> LoadedPackages {
        let effective_path = self.effective_path(path);
        let primary = self.open(&effective_path);

        let default = if effective_path == self.default_path {
            primary.clone()
        } else {
            match cached_default {
                Some(package) => Some(package),
                None => self.open(&self.default_path),
            }
        };

        LoadedPackages {
            effective_path,
            primary,
            default,
        }
    }

    fn open(&self, path: &str) -> Option<Arc<dyn ResourcePackage>> {
        match self.opener.open(Path::new(path)) {
            Ok(package) => {
                log::info!("Loaded skin package {} ({})", path, package.namespace());
                Some(package)
            }
            Err(e) => {
                log::warn!("Skin package {} unavailable: {}", path, e);
                None
            }
        }
    }
}

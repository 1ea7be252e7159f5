//! Resolver configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::defaults;
use crate::resolve::DecodeQuality;

/// Errors raised while reading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {0}: {1}")]
    Read(String, std::io::Error),

    #[error("Invalid config {0}: {1}")]
    Parse(String, serde_json::Error),
}

/// Built-in default package paths, one per supported locale family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultPaths {
    /// Base (Chinese) default
    pub base: String,
    pub us: String,
    pub fr: String,
    pub ru: String,
}

impl Default for DefaultPaths {
    fn default() -> Self {
        Self {
            base: defaults::default_path(),
            us: defaults::default_path_us(),
            fr: defaults::default_path_fr(),
            ru: defaults::default_path_ru(),
        }
    }
}

/// Configuration for a [`ThemeResolver`](crate::ThemeResolver).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Namespace resources are looked up under
    pub namespace: String,
    /// Alternate namespaces tried, in order, when a name is missing
    pub compatible_namespaces: Vec<String>,
    /// Built-in default packages
    pub default_paths: DefaultPaths,
    /// Folder used by image operations that do not name one
    pub default_folder: String,
    /// Use visible placeholders for missing assets
    pub diagnostic: bool,
    /// Pixel depth for images decoded without an explicit quality
    pub decode_quality: DecodeQuality,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            namespace: defaults::skin_namespace(),
            compatible_namespaces: Vec::new(),
            default_paths: DefaultPaths::default(),
            default_folder: defaults::global_folder(),
            diagnostic: defaults::diagnostic(),
            decode_quality: DecodeQuality::Low,
        }
    }
}

impl ResolverConfig {
    /// Read a JSON configuration file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(display.clone(), e))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(display, e))
    }
}

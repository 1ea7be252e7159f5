//! Error types for skin-manager.

use thiserror::Error;

/// Skin manager error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Resource package could not be opened
    #[error("Package error: {0}")]
    Package(#[from] crate::package::PackageError),

    /// Persisted settings could not be read or written
    #[error("Settings error: {0}")]
    Settings(#[from] crate::coordinator::settings::SettingsError),

    /// Configuration file is invalid
    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// The asynchronous load step failed before the resolver became ready
    #[error("Load failed: {0}")]
    LoadFailed(String),

    /// Constructed outside a Tokio runtime
    #[error("No Tokio runtime: {0}")]
    NoRuntime(String),

    /// The apply context has shut down
    #[error("Apply context closed")]
    ChannelClosed,

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for skin-manager operations.
pub type Result<T> = std::result::Result<T, Error>;

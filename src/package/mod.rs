//! Resource packages: the bundles a theme is loaded from.
//!
//! A package exposes three capabilities to the resolver:
//! - opening raw asset files by relative path (`assets/<folder>/<file>`)
//! - looking up a symbolic resource id by category, name and namespace
//! - reading the value behind an id (a color or a drawable)

pub mod bundle;
pub mod loader;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use bundle::{Bundle, BundleOpener};
pub use loader::{LoadedPackages, PackageLoader};

/// Errors raised while opening a resource package.
#[derive(Error, Debug)]
pub enum PackageError {
    #[error("Package not available at {0}")]
    Unavailable(PathBuf),

    #[error("Malformed package {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("Unsafe entry in package archive: {0}")]
    UnsafeEntry(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Resource category a symbolic name is looked up under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Color,
    Drawable,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Color => write!(f, "color"),
            Self::Drawable => write!(f, "drawable"),
        }
    }
}

/// Identifier of a resource inside one package. Only meaningful for the
/// package that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub u32);

/// 32-bit ARGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const TRANSPARENT: Color = Color(0x0000_0000);
    pub const WHITE: Color = Color(0xFFFF_FFFF);
    pub const RED: Color = Color(0xFFFF_0000);

    pub fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn blue(self) -> u8 {
        self.0 as u8
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08X}", self.0)
    }
}

/// Error returned when a color literal cannot be parsed.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid color literal '{0}'")]
pub struct ParseColorError(pub String);

impl FromStr for Color {
    type Err = ParseColorError;

    /// Parses `#RRGGBB` (opaque) or `#AARRGGBB`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(err)?;
        let value = u32::from_str_radix(hex, 16).map_err(|_| err())?;
        match hex.len() {
            6 => Ok(Color(0xFF00_0000 | value)),
            8 => Ok(Color(value)),
            _ => Err(err()),
        }
    }
}

/// Undecoded drawable value stored in a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawDrawable {
    /// Solid color drawable
    Color(Color),
    /// Encoded image bytes (PNG or JPEG)
    Encoded(Vec<u8>),
}

/// A loaded resource bundle.
pub trait ResourcePackage: Send + Sync + fmt::Debug {
    /// Path the package was opened from.
    fn origin(&self) -> &Path;

    /// The package's own resource namespace.
    fn namespace(&self) -> &str;

    /// Read an asset file by path relative to the asset root.
    fn open_asset(&self, relative_path: &str) -> io::Result<Vec<u8>>;

    /// Look up the id of `name` under `category` in `namespace`.
    fn identifier(&self, category: Category, name: &str, namespace: &str) -> Option<ResourceId>;

    /// Color value behind `id`, if `id` names a color.
    fn color(&self, id: ResourceId) -> Option<Color>;

    /// Drawable value behind `id`, if `id` names a drawable.
    fn drawable(&self, id: ResourceId) -> Option<RawDrawable>;
}

/// Factory that opens packages from a path.
pub trait PackageOpener: Send + Sync {
    /// Whether `path` references something that could be opened.
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Open the package at `path`.
    fn open(&self, path: &Path) -> Result<Arc<dyn ResourcePackage>, PackageError>;
}

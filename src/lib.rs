//! Skin Manager - runtime theme resolution from swappable resource packages.
//!
//! A [`ThemeResolver`] loads a user-selected package together with a
//! built-in default, resolves colors, images and fonts by symbolic name with
//! fallback between the two, and applies resolved values to UI targets
//! through a [`ThemeSink`]. Requests made before loading finishes are
//! buffered and replayed. A [`ReloadCoordinator`] propagates package
//! switches to other processes through a shared [`SettingsStore`].

pub mod defaults;
pub mod error;

pub mod config;
pub mod coordinator;
pub mod package;
pub mod resolve;
pub mod theme;

pub use error::{Error, Result};

pub use config::{ConfigError, DefaultPaths, ResolverConfig};

pub use package::{
    Bundle, BundleOpener, Category, Color, LoadedPackages, PackageError, PackageLoader,
    PackageOpener, ParseColorError, RawDrawable, ResourceId, ResourcePackage,
};

pub use resolve::{
    AssetCache, DecodeQuality, Drawable, FallbackResolver, Font, FontFormat, ImageKind,
    ResolvedAsset, Sentinels,
};

pub use theme::{
    CommonValues, Generation, LineOrientation, LoadState, LoadedTheme, OnReady, OpClass,
    PendingRequest, PendingRequestQueue, TargetId, TextColorVariant, ThemeOp, ThemeResolver,
    ThemeSink, ThemeUpdate,
};

pub use coordinator::{
    CoordinatorConfig, FileSettingsStore, Language, MemorySettingsStore, ReloadCoordinator,
    RestartPolicy, SettingsError, SettingsPaths, SettingsStore, TickOutcome,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

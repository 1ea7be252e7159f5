//! Default values for package paths, namespaces and timing.

/// Folder holding assets shared across screens (title bars, dividers).
pub const GLOBAL_FOLDER: &str = "Public";
/// Folder fonts are read from inside a bundle's assets.
pub const TYPEFACE_FOLDER: &str = "Typeface";
/// Namespace resources are looked up under unless configured otherwise.
pub const SKIN_NAMESPACE: &str = "com.github.skin";

pub const DEFAULT_PATH: &str = "/system/app/skin.apk";
pub const DEFAULT_PATH_US: &str = "/system/app/skin_us.apk";
pub const DEFAULT_PATH_FR: &str = "/system/app/skin_fr.apk";
pub const DEFAULT_PATH_RU: &str = "/system/app/skin_ru.apk";

/// Persisted key holding the active package path.
pub const SKIN_PATH_KEY: &str = "skin.path";
/// Persisted key holding the change marker.
pub const SKIN_CHANGE_MARK_KEY: &str = "skin.change.mark";

pub const POLL_INTERVAL_MS: u64 = 1000;
pub const CHANGE_DEBOUNCE_MS: u64 = 2200;

pub fn global_folder() -> String { GLOBAL_FOLDER.to_string() }
pub fn skin_namespace() -> String { SKIN_NAMESPACE.to_string() }
pub fn default_path() -> String { DEFAULT_PATH.to_string() }
pub fn default_path_us() -> String { DEFAULT_PATH_US.to_string() }
pub fn default_path_fr() -> String { DEFAULT_PATH_FR.to_string() }
pub fn default_path_ru() -> String { DEFAULT_PATH_RU.to_string() }
pub fn poll_interval_ms() -> u64 { POLL_INTERVAL_MS }
pub fn change_debounce_ms() -> u64 { CHANGE_DEBOUNCE_MS }
pub fn diagnostic() -> bool { cfg!(debug_assertions) }

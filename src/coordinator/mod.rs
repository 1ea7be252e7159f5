//! Coordination of package switches between processes.

pub mod locale;
pub mod reload;
pub mod settings;

pub use locale::{current_language, locale_path, Language};
pub use reload::{CoordinatorConfig, ReloadCoordinator, RestartPolicy, TickOutcome};
pub use settings::{
    FileSettingsStore, MemorySettingsStore, SettingsError, SettingsPaths, SettingsStore,
};

//! Locale-aware default package selection.

use crate::config::DefaultPaths;

/// Language family used to pick a default package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Chinese,
    English,
    French,
    Russian,
    Other,
}

impl Language {
    /// Parse a POSIX locale or BCP 47 tag such as `en_US.UTF-8` or `fr-CA`.
    pub fn from_tag(tag: &str) -> Self {
        let primary = tag
            .split(['_', '-', '.', '@'])
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        match primary.as_str() {
            "zh" => Self::Chinese,
            "en" => Self::English,
            "fr" => Self::French,
            "ru" => Self::Russian,
            _ => Self::Other,
        }
    }
}

/// Language of the current process, from `LC_ALL`, `LC_MESSAGES` or `LANG`.
pub fn current_language() -> Language {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.is_empty())
        .map(|value| Language::from_tag(&value))
        .unwrap_or(Language::Other)
}

/// The package path that should replace `current` for `language`, if any.
///
/// The match is a substring test on the path, so any path lacking the
/// language's marker is replaced, custom packages included. Chinese only
/// replaces paths marked `us` or `fr`.
pub fn locale_path(language: Language, current: &str, defaults: &DefaultPaths) -> Option<String> {
    let rewrite = match language {
        Language::English if !current.contains("us") => &defaults.us,
        Language::French if !current.contains("fr") => &defaults.fr,
        Language::Russian if !current.contains("ru") => &defaults.ru,
        Language::Chinese if current.contains("us") || current.contains("fr") => &defaults.base,
        _ => return None,
    };
    (rewrite != current).then(|| rewrite.clone())
}

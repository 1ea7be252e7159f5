//! Font cache with negative caching.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::defaults::TYPEFACE_FOLDER;
use crate::resolve::decode::Font;
use crate::resolve::fallback::FallbackResolver;

type FontSlot = Arc<OnceLock<Option<Font>>>;

/// Memoizes font decodes by file name, including misses.
///
/// One cache belongs to one loaded theme generation, so replacing the
/// theme drops its cached fonts with it.
#[derive(Debug, Default)]
pub struct AssetCache {
    fonts: Mutex<HashMap<String, FontSlot>>,
    decode_attempts: AtomicUsize,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Font `name` from the `Typeface` folder, primary package first.
    ///
    /// Concurrent callers asking for the same name share one decode.
    /// Other names are not blocked by it.
    pub fn font(&self, name: &str, resolver: &FallbackResolver) -> Option<Font> {
        let slot = self
            .fonts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_default()
            .clone();

        slot.get_or_init(|| {
            self.decode_attempts.fetch_add(1, Ordering::Relaxed);
            let font = resolver.load_font(TYPEFACE_FOLDER, name);
            if font.is_none() {
                log::debug!("Typeface {} not found, caching the miss", name);
            }
            font
        })
        .clone()
    }

    /// Number of names decoded so far (hits excluded).
    pub fn decode_attempts(&self) -> usize {
        self.decode_attempts.load(Ordering::Relaxed)
    }

    /// Number of cached names, misses included.
    pub fn len(&self) -> usize {
        self.fonts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

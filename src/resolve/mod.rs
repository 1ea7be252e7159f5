//! Resource resolution: fallback lookup, decoding and caching.

pub mod cache;
pub mod decode;
pub mod fallback;

pub use cache::AssetCache;
pub use decode::{DecodeQuality, Drawable, Font, FontFormat, ImageKind};
pub use fallback::{FallbackResolver, ResolvedAsset, Sentinels};

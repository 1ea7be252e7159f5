//! Primary → default fallback resolution.

use std::sync::Arc;

use crate::package::{Category, Color, RawDrawable, ResourceId, ResourcePackage};
use crate::resolve::decode::{self, DecodeQuality, Drawable, Font, ImageKind};

/// Outcome of resolving a symbolic resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedAsset {
    Color(Color),
    Drawable(Drawable),
    Font(Font),
    NotFound,
}

impl ResolvedAsset {
    pub fn is_found(&self) -> bool {
        !matches!(self, Self::NotFound)
    }
}

/// Values substituted for assets that could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentinels {
    pub color: Color,
    pub drawable: Color,
}

impl Sentinels {
    /// Visible placeholders so missing assets stand out.
    pub const DIAGNOSTIC: Sentinels = Sentinels {
        color: Color::RED,
        drawable: Color::WHITE,
    };

    /// Placeholders for production builds.
    pub const SILENT: Sentinels = Sentinels {
        color: Color(0xFFFF_FFFF),
        drawable: Color::TRANSPARENT,
    };

    pub fn for_mode(diagnostic: bool) -> Self {
        if diagnostic {
            Self::DIAGNOSTIC
        } else {
            Self::SILENT
        }
    }
}

/// Resolves names against a primary package, then a default package.
///
/// Within each package the own namespace is tried first, then every
/// compatibility alias in order.
#[derive(Debug, Clone)]
pub struct FallbackResolver {
    primary: Option<Arc<dyn ResourcePackage>>,
    default: Option<Arc<dyn ResourcePackage>>,
    namespace: String,
    aliases: Vec<String>,
    sentinels: Sentinels,
}

impl FallbackResolver {
    pub fn new(
        primary: Option<Arc<dyn ResourcePackage>>,
        default: Option<Arc<dyn ResourcePackage>>,
        namespace: impl Into<String>,
        aliases: Vec<String>,
        diagnostic: bool,
    ) -> Self {
        Self {
            primary,
            default,
            namespace: namespace.into(),
            aliases,
            sentinels: Sentinels::for_mode(diagnostic),
        }
    }

    /// A resolver with no packages: everything resolves to sentinels.
    pub fn empty(namespace: impl Into<String>, diagnostic: bool) -> Self {
        Self::new(None, None, namespace, Vec::new(), diagnostic)
    }

    pub fn sentinels(&self) -> Sentinels {
        self.sentinels
    }

    pub fn primary(&self) -> Option<&Arc<dyn ResourcePackage>> {
        self.primary.as_ref()
    }

    pub fn default_package(&self) -> Option<&Arc<dyn ResourcePackage>> {
        self.default.as_ref()
    }

    /// Packages in lookup order. The default is skipped when it is the
    /// primary itself.
    pub fn packages(&self) -> impl Iterator<Item = &Arc<dyn ResourcePackage>> {
        let default = match (&self.primary, &self.default) {
            (Some(primary), Some(default)) if Arc::ptr_eq(primary, default) => None,
            (_, default) => default.as_ref(),
        };
        self.primary.iter().chain(default)
    }

    /// Find the package and id that `name` resolves to.
    pub fn lookup(
        &self,
        category: Category,
        name: &str,
    ) -> Option<(&Arc<dyn ResourcePackage>, ResourceId)> {
        let namespaces: Vec<&str> = std::iter::once(self.namespace.as_str())
            .chain(self.aliases.iter().map(String::as_str))
            .collect();

        self.packages().find_map(|package| {
            namespaces
                .iter()
                .find_map(|namespace| package.identifier(category, name, namespace))
                .map(|id| (package, id))
        })
    }

    /// Resolve `name` under `category`.
    pub fn resolve(&self, category: Category, name: &str) -> ResolvedAsset {
        let Some((package, id)) = self.lookup(category, name) else {
            log::debug!("No {} named '{}'", category, name);
            return ResolvedAsset::NotFound;
        };

        match category {
            Category::Color => package
                .color(id)
                .map_or(ResolvedAsset::NotFound, ResolvedAsset::Color),
            Category::Drawable => match package.drawable(id) {
                Some(RawDrawable::Color(color)) => ResolvedAsset::Drawable(Drawable::Color(color)),
                Some(RawDrawable::Encoded(bytes)) => {
                    match decode::decode_image(&bytes, DecodeQuality::High) {
                        Some(drawable) => ResolvedAsset::Drawable(drawable),
                        None => {
                            log::debug!("Drawable '{}' in {:?} failed to decode", name, package.origin());
                            ResolvedAsset::NotFound
                        }
                    }
                }
                None => ResolvedAsset::NotFound,
            },
        }
    }

    /// Color `name`, or the color sentinel.
    pub fn color(&self, name: &str) -> Color {
        self.color_with_result(name).1
    }

    /// Color `name` and whether it was actually found.
    pub fn color_with_result(&self, name: &str) -> (bool, Color) {
        match self.resolve(Category::Color, name) {
            ResolvedAsset::Color(color) => (true, color),
            _ => (false, self.sentinels.color),
        }
    }

    /// Color `name`, else color `compatible`, else the sentinel.
    pub fn color_or(&self, name: &str, compatible: &str) -> Color {
        match self.color_with_result(name) {
            (true, color) => color,
            (false, _) => self.color(compatible),
        }
    }

    /// Drawable resource `name`, if found.
    pub fn find_res_drawable(&self, name: &str) -> Option<Drawable> {
        match self.resolve(Category::Drawable, name) {
            ResolvedAsset::Drawable(drawable) => Some(drawable),
            _ => None,
        }
    }

    /// Drawable resource `name`, or the drawable sentinel.
    pub fn res_drawable(&self, name: &str) -> Drawable {
        self.find_res_drawable(name)
            .unwrap_or_else(|| self.missing_drawable())
    }

    /// Folder asset `<folder>/<name>.<ext>`, if found and decodable.
    pub fn find_image(
        &self,
        name: &str,
        folder: &str,
        kind: ImageKind,
        quality: DecodeQuality,
    ) -> Option<Drawable> {
        let relative = format!("{}/{}.{}", folder, name, kind.extension());
        self.packages().find_map(|package| {
            let bytes = package.open_asset(&relative).ok()?;
            decode::decode_image_as(&bytes, kind, quality)
        })
    }

    /// Folder asset `<folder>/<name>.<ext>`, or the drawable sentinel.
    pub fn image(&self, name: &str, folder: &str, kind: ImageKind, quality: DecodeQuality) -> Drawable {
        self.find_image(name, folder, kind, quality).unwrap_or_else(|| {
            log::debug!("Image {}/{}.{} not found", folder, name, kind.extension());
            self.missing_drawable()
        })
    }

    /// Decode a font file from `<folder>/<name>`, primary first.
    pub fn load_font(&self, folder: &str, name: &str) -> Option<Font> {
        let relative = format!("{}/{}", folder, name);
        self.packages().find_map(|package| {
            let bytes = package.open_asset(&relative).ok()?;
            decode::decode_font(name, bytes)
        })
    }

    pub fn missing_drawable(&self) -> Drawable {
        Drawable::Color(self.sentinels.drawable)
    }
}

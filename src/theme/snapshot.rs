//! An immutable view of one loaded theme generation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::defaults::GLOBAL_FOLDER;
use crate::package::Color;
use crate::resolve::{AssetCache, DecodeQuality, Drawable, FallbackResolver, Font, ImageKind};
use crate::theme::apply::ThemeUpdate;
use crate::theme::pending::{LineOrientation, TextColorVariant, ThemeOp};

const DIALOG_BACKGROUND: &str = "dialog_background";
const DIALOG_FRAME: &str = "dialog_fram";
const LINE_HORIZONTAL: &str = "line_horizontal";
const LINE_VERTICAL: &str = "line_vertical";

/// Identifies one successful load. Zero means nothing has loaded yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// Values computed once per load from well-known names.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonValues {
    pub color_primary: Color,
    pub color_primary_light: Color,
    pub color_text: Color,
    pub color_text_light: Color,
    pub color_text_dim: Color,
    pub color_text_dark: Color,
    pub color_background: Color,
    pub color_background_light: Color,
    pub line_horizontal: Drawable,
    pub line_vertical: Drawable,
    /// `colorLine`, when the package defines it
    pub color_line: Option<Color>,
    pub dialog_background: Drawable,
}

impl CommonValues {
    pub fn compute(resolver: &FallbackResolver, quality: DecodeQuality) -> Self {
        Self {
            color_primary: resolver.color("colorPrimary"),
            color_primary_light: resolver.color("colorPrimaryLight"),
            color_text: resolver.color("colorText"),
            color_text_light: resolver.color("colorTextLight"),
            color_text_dim: resolver.color("colorTextDim"),
            color_text_dark: resolver.color("colorTextDark"),
            color_background: resolver.color("colorBackground"),
            color_background_light: resolver.color("colorBackgroundLight"),
            line_horizontal: resolver.image(LINE_HORIZONTAL, GLOBAL_FOLDER, ImageKind::Png, quality),
            line_vertical: resolver.image(LINE_VERTICAL, GLOBAL_FOLDER, ImageKind::Png, quality),
            color_line: match resolver.color_with_result("colorLine") {
                (true, color) => Some(color),
                (false, _) => None,
            },
            dialog_background: resolver.res_drawable(DIALOG_BACKGROUND),
        }
    }

    pub fn text_color(&self, variant: TextColorVariant) -> Color {
        match variant {
            TextColorVariant::Primary => self.color_primary,
            TextColorVariant::Text | TextColorVariant::PrimaryState => self.color_text,
            TextColorVariant::Light => self.color_text_light,
            TextColorVariant::Dim => self.color_text_dim,
            TextColorVariant::Dark => self.color_text_dark,
        }
    }

    /// The line image, or a `colorLine` fill when the image is missing.
    pub fn line(&self, orientation: LineOrientation) -> Drawable {
        let image = match orientation {
            LineOrientation::Horizontal => &self.line_horizontal,
            LineOrientation::Vertical => &self.line_vertical,
        };
        match self.color_line {
            Some(color) if image.is_color() => Drawable::Color(color),
            _ => image.clone(),
        }
    }
}

/// Everything resolved for one generation: packages, common values and
/// the font cache.
#[derive(Debug)]
pub struct LoadedTheme {
    generation: Generation,
    path: Option<String>,
    resolver: FallbackResolver,
    common: CommonValues,
    fonts: AssetCache,
}

impl LoadedTheme {
    pub(crate) fn new(
        generation: Generation,
        path: Option<String>,
        resolver: FallbackResolver,
        common: CommonValues,
    ) -> Self {
        Self {
            generation,
            path,
            resolver,
            common,
            fonts: AssetCache::new(),
        }
    }

    /// The theme in effect before any load: every lookup yields a sentinel.
    pub(crate) fn unloaded(generation: Generation, resolver: FallbackResolver) -> Self {
        let common = CommonValues::compute(&resolver, DecodeQuality::Low);
        Self::new(generation, None, resolver, common)
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Path the primary package was loaded from.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn resolver(&self) -> &FallbackResolver {
        &self.resolver
    }

    pub fn common(&self) -> &CommonValues {
        &self.common
    }

    pub fn fonts(&self) -> &AssetCache {
        &self.fonts
    }

    pub fn font(&self, name: &str) -> Option<Font> {
        self.fonts.font(name, &self.resolver)
    }

    /// The dialog background, or the `dialog_fram` drawable when the
    /// package only has a plain color for it.
    pub fn dialog_background(&self) -> Drawable {
        if self.common.dialog_background.is_color() {
            self.resolver.res_drawable(DIALOG_FRAME)
        } else {
            self.common.dialog_background.clone()
        }
    }

    /// Resolve an operation into the value it applies. Performs decoding.
    pub fn resolve_op(&self, op: &ThemeOp, quality: DecodeQuality) -> ThemeUpdate {
        let image = |name: &str, folder: &str, quality| {
            self.resolver.image(name, folder, ImageKind::Png, quality)
        };

        match op {
            ThemeOp::Background { name, folder } => ThemeUpdate::Background(image(name, folder, quality)),
            ThemeOp::HdBackground { name, folder } => {
                ThemeUpdate::Background(image(name, folder, DecodeQuality::High))
            }
            ThemeOp::Selector {
                normal,
                pressed,
                folder,
            } => ThemeUpdate::Selector {
                normal: image(normal, folder, quality),
                pressed: image(pressed, folder, quality),
            },
            ThemeOp::ProgressDrawable {
                background,
                progress,
                folder,
            } => ThemeUpdate::ProgressDrawable {
                background: image(background, folder, quality),
                progress: image(progress, folder, quality),
            },
            ThemeOp::Typeface { name } => ThemeUpdate::Typeface(self.font(name)),
            ThemeOp::CompoundDrawables {
                left,
                top,
                right,
                bottom,
                folder,
            } => {
                let side = |name: &Option<String>| {
                    name.as_deref()
                        .filter(|name| !name.is_empty())
                        .map(|name| image(name, folder, quality))
                };
                ThemeUpdate::CompoundDrawables([side(left), side(top), side(right), side(bottom)])
            }
            ThemeOp::TextColor {
                variant: TextColorVariant::PrimaryState,
            } => ThemeUpdate::TextColorState {
                normal: self.common.color_text,
                pressed: self.common.color_primary,
            },
            ThemeOp::TextColor { variant } => ThemeUpdate::TextColor(self.common.text_color(*variant)),
            ThemeOp::DialogBackground => ThemeUpdate::Background(self.dialog_background()),
            ThemeOp::Line { orientation } => {
                ThemeUpdate::Background(self.common.line(*orientation))
            }
            ThemeOp::ResBackground { name } => {
                ThemeUpdate::ResBackground(self.resolver.res_drawable(name))
            }
        }
    }
}

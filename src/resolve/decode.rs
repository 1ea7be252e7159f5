//! Decoding of drawable and font bytes.

use std::fmt;
use std::sync::Arc;

use ab_glyph::{Font as _, FontRef};
use image::{DynamicImage, GenericImageView, ImageFormat};
use serde::{Deserialize, Serialize};

use crate::package::Color;

/// Image file extension used when addressing a folder asset by base name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpg,
}

impl ImageKind {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
        }
    }

    fn format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpg => ImageFormat::Jpeg,
        }
    }
}

/// Pixel depth images are decoded to.
///
/// `Low` drops the alpha channel (opaque 24-bit), `High` keeps full RGBA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeQuality {
    #[default]
    Low,
    High,
}

/// A resolved drawable.
#[derive(Clone, PartialEq)]
pub enum Drawable {
    /// Solid color fill
    Color(Color),
    /// Decoded bitmap
    Image(Arc<DynamicImage>),
}

impl Drawable {
    pub fn is_color(&self) -> bool {
        matches!(self, Self::Color(_))
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Self::Color(color) => Some(*color),
            Self::Image(_) => None,
        }
    }

    /// Pixel size of an image drawable.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            Self::Color(_) => None,
            Self::Image(image) => Some(image.dimensions()),
        }
    }
}

impl fmt::Debug for Drawable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Color(color) => write!(f, "Drawable::Color({})", color),
            Self::Image(image) => {
                let (w, h) = image.dimensions();
                write!(f, "Drawable::Image({}x{}, {:?})", w, h, image.color())
            }
        }
    }
}

/// Decode image bytes, guessing the format from the content.
pub fn decode_image(bytes: &[u8], quality: DecodeQuality) -> Option<Drawable> {
    let image = match image::load_from_memory(bytes) {
        Ok(image) => image,
        Err(e) => {
            log::debug!("Image decode failed: {}", e);
            return None;
        }
    };
    Some(Drawable::Image(Arc::new(convert(image, quality))))
}

/// Decode image bytes of a known kind.
pub fn decode_image_as(bytes: &[u8], kind: ImageKind, quality: DecodeQuality) -> Option<Drawable> {
    match image::load_from_memory_with_format(bytes, kind.format()) {
        Ok(image) => Some(Drawable::Image(Arc::new(convert(image, quality)))),
        Err(e) => {
            log::debug!("{:?} decode failed: {}", kind, e);
            None
        }
    }
}

fn convert(image: DynamicImage, quality: DecodeQuality) -> DynamicImage {
    match quality {
        DecodeQuality::Low => DynamicImage::ImageRgb8(image.to_rgb8()),
        DecodeQuality::High => DynamicImage::ImageRgba8(image.to_rgba8()),
    }
}

/// Outline format of a font file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFormat {
    TrueType,
    OpenType,
    Collection,
}

/// A decoded font handle.
#[derive(Clone, PartialEq, Eq)]
pub struct Font {
    name: String,
    format: FontFormat,
    glyph_count: usize,
    data: Arc<[u8]>,
}

impl Font {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> FontFormat {
        self.format
    }

    pub fn glyph_count(&self) -> usize {
        self.glyph_count
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Font")
            .field("name", &self.name)
            .field("format", &self.format)
            .field("glyphs", &self.glyph_count)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Parse font bytes and wrap them in a handle.
///
/// Collections are validated through their first face. Truncated or
/// malformed table directories yield `None`.
pub fn decode_font(name: &str, bytes: Vec<u8>) -> Option<Font> {
    let format = match bytes.get(0..4)? {
        &[0x00, 0x01, 0x00, 0x00] | b"true" => FontFormat::TrueType,
        b"OTTO" => FontFormat::OpenType,
        b"ttcf" => FontFormat::Collection,
        tag => {
            log::debug!("Font {} has unknown sfnt tag {:02X?}", name, tag);
            return None;
        }
    };

    let glyph_count = match FontRef::try_from_slice(&bytes) {
        Ok(face) => face.glyph_count(),
        Err(e) => {
            log::debug!("Font {} is malformed: {:?}", name, e);
            return None;
        }
    };

    Some(Font {
        name: name.to_string(),
        format,
        glyph_count,
        data: Arc::from(bytes),
    })
}

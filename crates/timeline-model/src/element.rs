//! Slide elements: positioned text and image overlays.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::color::Color;
use crate::{new_id, TimelineError};

/// Smallest allowed font size in pixels.
pub const MIN_FONT_SIZE: f64 = 12.0;
/// Largest allowed font size in pixels.
pub const MAX_FONT_SIZE: f64 = 160.0;

/// An overlay drawn on a slide. Z-order follows list order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Element {
    Text(TextElement),
    Image(ImageElement),
}

impl Element {
    pub fn id(&self) -> &str {
        match self {
            Element::Text(text) => &text.id,
            Element::Image(image) => &image.id,
        }
    }

    /// Copy with a fresh id.
    pub fn duplicate(&self) -> Self {
        match self {
            Element::Text(text) => Element::Text(TextElement {
                id: new_id(),
                ..text.clone()
            }),
            Element::Image(image) => Element::Image(ImageElement {
                id: new_id(),
                ..image.clone()
            }),
        }
    }
}

/// Horizontal text alignment relative to the anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// A block of (possibly wrapped) text anchored at a fractional point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    pub id: String,
    pub text: String,
    /// Anchor x as a fraction of surface width.
    #[serde(deserialize_with = "clamped_unit")]
    pub x: f64,
    /// Anchor y as a fraction of surface height. Lines are centered on it.
    #[serde(deserialize_with = "clamped_unit")]
    pub y: f64,
    /// Font size in pixels.
    #[serde(deserialize_with = "clamped_font_size")]
    pub font_size: f64,
    pub color: Color,
    pub align: TextAlign,
}

impl TextElement {
    /// Centered white text at the given size.
    pub fn new(text: impl Into<String>, font_size: f64) -> Self {
        Self {
            id: new_id(),
            text: text.into(),
            x: 0.5,
            y: 0.5,
            font_size: clamp_font_size(font_size),
            color: Color::WHITE,
            align: TextAlign::Center,
        }
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.set_position(x, y);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn set_font_size(&mut self, font_size: f64) {
        self.font_size = clamp_font_size(font_size);
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = clamp_unit(x);
        self.y = clamp_unit(y);
    }
}

impl Default for TextElement {
    fn default() -> Self {
        Self::new("Text", 48.0)
    }
}

/// An image centered at a fractional point, fitted to a fraction of the
/// surface width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageElement {
    pub id: String,
    pub src: ImageSource,
    /// Center x as a fraction of surface width.
    #[serde(deserialize_with = "clamped_unit")]
    pub x: f64,
    /// Center y as a fraction of surface height.
    #[serde(deserialize_with = "clamped_unit")]
    pub y: f64,
    /// Maximum drawn width as a fraction of surface width.
    #[serde(deserialize_with = "clamped_unit")]
    pub width: f64,
}

impl ImageElement {
    /// Centered image at 60% of surface width.
    pub fn new(src: ImageSource) -> Self {
        Self {
            id: new_id(),
            src,
            x: 0.5,
            y: 0.5,
            width: 0.6,
        }
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.set_position(x, y);
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.set_width(width);
        self
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = clamp_unit(x);
        self.y = clamp_unit(y);
    }

    pub fn set_width(&mut self, width: f64) {
        self.width = clamp_unit(width);
    }
}

/// Encoded image bytes plus their media type.
///
/// Cloning shares the underlying buffer. Serialized as a `data:` URL.
/// A source that is not a base64 `data:` URL loads as an empty source,
/// which never decodes, so only that element goes missing.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ImageSource {
    mime: String,
    bytes: Arc<[u8]>,
}

impl ImageSource {
    pub fn from_bytes(mime: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Parse a base64 `data:` URL such as `data:image/png;base64,iVBOR...`.
    pub fn from_data_url(url: &str) -> Result<Self, TimelineError> {
        let invalid = |message: &str| TimelineError::InvalidImageSource {
            message: message.to_string(),
        };
        let rest = url
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| invalid("expected a data: URL"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| invalid("missing ',' separator"))?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or_else(|| invalid("only base64 data URLs are supported"))?;
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| invalid(&format!("bad base64 payload: {e}")))?;

        Ok(Self::from_bytes(mime, bytes))
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Cheap identity check: same shared buffer, or equal contents.
    pub fn same_source(&self, other: &ImageSource) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes) || self.bytes == other.bytes
    }
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageSource")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl From<String> for ImageSource {
    fn from(value: String) -> Self {
        Self::from_data_url(&value).unwrap_or_else(|err| {
            let shown: String = value.chars().take(64).collect();
            tracing::warn!(src = %shown, error = %err, "Unusable image source; element will not be drawn");
            Self::from_bytes(String::new(), Vec::<u8>::new())
        })
    }
}

impl From<ImageSource> for String {
    fn from(src: ImageSource) -> Self {
        src.to_data_url()
    }
}

fn clamped_font_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    f64::deserialize(deserializer).map(clamp_font_size)
}

fn clamped_unit<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    f64::deserialize(deserializer).map(clamp_unit)
}

fn clamp_font_size(size: f64) -> f64 {
    if size.is_nan() {
        return MIN_FONT_SIZE;
    }
    size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.5;
    }
    value.clamp(0.0, 1.0)
}

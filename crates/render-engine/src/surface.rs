//! Drawing surfaces.
//!
//! The compositor draws through the [`Surface`] trait so the same frame code
//! serves interactive playback, export and tests. [`RasterSurface`] is the
//! CPU implementation backed by an RGBA8 buffer.

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, Blend};
use imageproc::rect::Rect;
use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_timeline_model::{Color, TextAlign};

use crate::text::{estimate_width, FontFace};

/// Largest accepted surface edge in pixels.
pub const MAX_SURFACE_DIMENSION: u32 = 8192;

/// Style for a single line of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_px: f32,
    pub color: Color,
    pub align: TextAlign,
}

/// Destination rectangle in surface pixels. May extend past the edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// A 2D drawing target with a global alpha, in the style of a canvas context.
pub trait Surface {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Reset every pixel to transparent black.
    fn clear(&mut self);

    /// Fill the whole surface with `color` at the current global alpha.
    fn fill(&mut self, color: Color);

    fn set_global_alpha(&mut self, alpha: f32);

    fn global_alpha(&self) -> f32;

    /// Advance width of `text` at `font_px`.
    fn measure_text(&self, text: &str, font_px: f32) -> f32;

    /// Draw one line of text. `x` is the alignment anchor and `y` the
    /// vertical middle of the line.
    fn fill_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle);

    /// Draw `image` scaled into `rect` at the current global alpha.
    fn draw_image(&mut self, image: &RgbaImage, rect: DrawRect);
}

/// CPU raster surface. Every draw is alpha-blended source-over.
pub struct RasterSurface {
    canvas: Blend<RgbaImage>,
    alpha: f32,
    font: Option<Arc<FontFace>>,
    warned_missing_font: bool,
}

impl std::fmt::Debug for RasterSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterSurface")
            .field("width", &self.canvas.0.width())
            .field("height", &self.canvas.0.height())
            .field("alpha", &self.alpha)
            .field("font", &self.font)
            .finish()
    }
}

impl RasterSurface {
    /// Allocate a cleared surface.
    ///
    /// Fails with [`SlidecastError::Unsupported`] for zero or oversized
    /// dimensions.
    pub fn new(width: u32, height: u32, font: Option<Arc<FontFace>>) -> SlidecastResult<Self> {
        if width == 0 || height == 0 {
            return Err(SlidecastError::unsupported(format!(
                "cannot create a {width}x{height} surface"
            )));
        }
        if width > MAX_SURFACE_DIMENSION || height > MAX_SURFACE_DIMENSION {
            return Err(SlidecastError::unsupported(format!(
                "surface {width}x{height} exceeds the {MAX_SURFACE_DIMENSION}px limit"
            )));
        }

        Ok(Self {
            canvas: Blend(RgbaImage::new(width, height)),
            alpha: 1.0,
            font,
            warned_missing_font: false,
        })
    }

    /// Raw RGBA bytes, row-major, no padding.
    pub fn as_bytes(&self) -> &[u8] {
        self.canvas.0.as_raw()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Color {
        let [r, g, b, a] = self.canvas.0.get_pixel(x, y).0;
        Color::rgba(r, g, b, a)
    }

    pub fn save_png(&self, path: &Path) -> SlidecastResult<()> {
        self.canvas
            .0
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| SlidecastError::render(format!("Failed to write {}: {e}", path.display())))
    }

    /// `color` with the global alpha applied, or `None` when nothing would show.
    fn faded(&self, color: Color) -> Option<Rgba<u8>> {
        let color = color.with_opacity(self.alpha);
        (color.a > 0).then(|| Rgba(color.to_array()))
    }
}

/// Left edge of a line of width `line_width` anchored at `x`.
pub fn aligned_left(x: f32, line_width: f32, align: TextAlign) -> f32 {
    match align {
        TextAlign::Left => x,
        TextAlign::Center => x - line_width / 2.0,
        TextAlign::Right => x - line_width,
    }
}

/// Copy of `image` with every alpha sample scaled by `alpha`.
fn with_alpha(image: &RgbaImage, alpha: f32) -> RgbaImage {
    let mut faded = image.clone();
    for pixel in faded.pixels_mut() {
        pixel.0[3] = (pixel.0[3] as f32 * alpha).round() as u8;
    }
    faded
}

impl Surface for RasterSurface {
    fn width(&self) -> u32 {
        self.canvas.0.width()
    }

    fn height(&self) -> u32 {
        self.canvas.0.height()
    }

    fn clear(&mut self) {
        for pixel in self.canvas.0.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    fn fill(&mut self, color: Color) {
        let Some(color) = self.faded(color) else {
            return;
        };
        let area = Rect::at(0, 0).of_size(self.width(), self.height());
        draw_filled_rect_mut(&mut self.canvas, area, color);
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.alpha = if alpha.is_nan() { 0.0 } else { alpha.clamp(0.0, 1.0) };
    }

    fn global_alpha(&self) -> f32 {
        self.alpha
    }

    fn measure_text(&self, text: &str, font_px: f32) -> f32 {
        match &self.font {
            Some(font) => font.measure(text, font_px),
            None => estimate_width(text, font_px),
        }
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle) {
        let Some(font) = self.font.clone() else {
            if !self.warned_missing_font {
                tracing::warn!("No font loaded; skipping text drawing");
                self.warned_missing_font = true;
            }
            return;
        };
        let Some(color) = self.faded(style.color) else {
            return;
        };

        let width = font.measure(text, style.font_px);
        let left = aligned_left(x, width, style.align);
        let top = y + font.middle_to_top(style.font_px);
        draw_text_mut(
            &mut self.canvas,
            color,
            left.round() as i32,
            top.round() as i32,
            font.scale(style.font_px),
            font.font(),
            text,
        );
    }

    fn draw_image(&mut self, image: &RgbaImage, rect: DrawRect) {
        if rect.width == 0 || rect.height == 0 || image.width() == 0 || image.height() == 0 {
            return;
        }
        if self.alpha <= 0.0 {
            return;
        }

        let mut layer: Cow<'_, RgbaImage> =
            if image.width() == rect.width && image.height() == rect.height {
                Cow::Borrowed(image)
            } else {
                Cow::Owned(imageops::resize(
                    image,
                    rect.width,
                    rect.height,
                    imageops::FilterType::Triangle,
                ))
            };
        if self.alpha < 1.0 {
            layer = Cow::Owned(with_alpha(&layer, self.alpha));
        }

        imageops::overlay(&mut self.canvas.0, &*layer, rect.x as i64, rect.y as i64);
    }
}

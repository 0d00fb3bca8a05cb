//! Frame compositor: draws one resolved slide onto a surface.
//!
//! The same code renders interactive playback ticks and export frames, so
//! both paths produce identical pixels for the same instant.

use slidecast_timeline_model::{Element, ImageElement, TextElement};

use crate::image_cache::{ImageCache, ImageStatus};
use crate::resolver::ResolvedFrame;
use crate::surface::{DrawRect, Surface, TextStyle};
use crate::text::{line_positions, wrap_text};

/// Portion of a slide's duration spent fading in.
pub const FADE_IN_FRACTION: f64 = 0.1;

/// Maximum line width as a fraction of surface width.
pub const TEXT_WRAP_FRACTION: f64 = 0.9;

/// Line height as a multiple of font size.
pub const LINE_HEIGHT_FACTOR: f64 = 1.3;

/// Opacity applied to every element of a slide at `local_progress`.
pub fn fade_opacity(local_progress: f64) -> f64 {
    (local_progress / FADE_IN_FRACTION).max(0.0).min(1.0)
}

/// Downscale factor for an image of `natural_width` constrained to
/// `max_width_px`. Images are never enlarged; an unknown width scales by 1.
pub fn image_scale(max_width_px: f64, natural_width: u32) -> f64 {
    if natural_width == 0 {
        return 1.0;
    }
    (max_width_px / natural_width as f64).min(1.0)
}

/// Round half up, matching canvas pixel snapping for negative values too.
fn round_px(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Destination rectangle of an image element.
///
/// `natural` is `None` while the image is still decoding; the placeholder
/// is then a `max_width_px` square.
pub fn place_image(
    element: &ImageElement,
    natural: Option<(u32, u32)>,
    surface_width: u32,
    surface_height: u32,
) -> DrawRect {
    let max_width = round_px(element.width * surface_width as f64);
    let (natural_w, natural_h) = match natural {
        Some((w, h)) if w > 0 => (w as f64, h as f64),
        _ => (max_width, max_width),
    };
    let scale = image_scale(max_width, natural_w as u32);
    let draw_w = round_px(natural_w * scale);
    let draw_h = round_px(natural_h * scale);
    let cx = round_px(element.x * surface_width as f64);
    let cy = round_px(element.y * surface_height as f64);

    DrawRect {
        x: (cx - round_px(draw_w / 2.0)) as i32,
        y: (cy - round_px(draw_h / 2.0)) as i32,
        width: draw_w.max(0.0) as u32,
        height: draw_h.max(0.0) as u32,
    }
}

/// A text element broken into positioned lines.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub style: TextStyle,
    pub anchor_x: f32,
    /// Each line with the y of its vertical middle.
    pub lines: Vec<(String, f32)>,
}

/// Wrap and position a text element for `surface`.
pub fn layout_text<S: Surface + ?Sized>(surface: &S, element: &TextElement) -> TextLayout {
    let width = surface.width() as f64;
    let height = surface.height() as f64;
    let font_px = round_px(element.font_size) as f32;
    let max_width = round_px(width * TEXT_WRAP_FRACTION) as f32;
    let line_height = font_px * LINE_HEIGHT_FACTOR as f32;
    let anchor_x = round_px(element.x * width) as f32;
    let anchor_y = round_px(element.y * height) as f32;

    let lines = wrap_text(&element.text, max_width, |candidate| {
        surface.measure_text(candidate, font_px)
    });
    let ys = line_positions(anchor_y, lines.len(), line_height);

    TextLayout {
        style: TextStyle {
            font_px,
            color: element.color,
            align: element.align,
        },
        anchor_x,
        lines: lines.into_iter().zip(ys).collect(),
    }
}

/// Render one frame.
///
/// The surface is always cleared. With no active slide it stays blank;
/// otherwise the background is filled and the elements are drawn in list
/// order at the slide's fade opacity.
pub fn render_frame<S: Surface + ?Sized>(
    frame: Option<&ResolvedFrame<'_>>,
    surface: &mut S,
    cache: &mut ImageCache,
) {
    surface.set_global_alpha(1.0);
    surface.clear();
    let Some(frame) = frame else {
        return;
    };

    surface.fill(frame.slide.background);
    let opacity = fade_opacity(frame.local_progress) as f32;

    for element in &frame.slide.elements {
        surface.set_global_alpha(opacity);
        match element {
            Element::Text(text) => draw_text(surface, text),
            Element::Image(image) => draw_image(surface, cache, image),
        }
        surface.set_global_alpha(1.0);
    }
}

fn draw_text<S: Surface + ?Sized>(surface: &mut S, element: &TextElement) {
    let layout = layout_text(surface, element);
    for (line, y) in &layout.lines {
        surface.fill_text(line, layout.anchor_x, *y, &layout.style);
    }
}

fn draw_image<S: Surface + ?Sized>(surface: &mut S, cache: &mut ImageCache, element: &ImageElement) {
    let (width, height) = (surface.width(), surface.height());
    match cache.status(element) {
        ImageStatus::Ready {
            width: natural_w,
            height: natural_h,
        } => {
            let rect = place_image(element, Some((natural_w, natural_h)), width, height);
            if let Some(fitted) = cache.fitted(&element.id, rect.width, rect.height) {
                surface.draw_image(&fitted, rect);
            }
        }
        ImageStatus::Pending => {
            let rect = place_image(element, None, width, height);
            tracing::trace!(element = %element.id, ?rect, "Image still decoding");
        }
        ImageStatus::Failed => {}
    }
}

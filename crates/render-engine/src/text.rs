//! Font loading, text measurement and greedy line wrapping.

use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use slidecast_common::config::FontConfig;

/// Well-known locations of a plain sans-serif face, tried in order when no
/// font is configured.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\segoeui.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// DejaVu Sans, compiled in so text always has a face to draw with.
const BUNDLED_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");
const BUNDLED_FONT_NAME: &str = "DejaVu Sans (bundled)";

/// Average advance, as a fraction of the font size, used to estimate text
/// width on surfaces created without a font.
const FALLBACK_ADVANCE_EM: f32 = 0.55;

/// A loaded TrueType/OpenType face.
pub struct FontFace {
    font: FontArc,
    source: String,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("source", &self.source)
            .finish()
    }
}

impl FontFace {
    /// Parse a face from raw font bytes.
    pub fn from_bytes(bytes: Vec<u8>, source: impl Into<String>) -> Option<Self> {
        FontArc::try_from_vec(bytes).ok().map(|font| Self {
            font,
            source: source.into(),
        })
    }

    /// Load a face from a file.
    pub fn from_path(path: &Path) -> Option<Self> {
        let bytes = std::fs::read(path).ok()?;
        Self::from_bytes(bytes, path.display().to_string())
    }

    /// The face shipped inside the binary.
    pub fn bundled() -> Option<Self> {
        FontArc::try_from_slice(BUNDLED_FONT)
            .ok()
            .map(|font| Self {
                font,
                source: BUNDLED_FONT_NAME.to_string(),
            })
    }

    /// Load the configured font, else the first system font found, else the
    /// bundled face.
    pub fn load(config: &FontConfig) -> Option<Self> {
        if let Some(path) = &config.path {
            match Self::from_path(path) {
                Some(face) => return Some(face),
                None => tracing::warn!(
                    path = %path.display(),
                    "Configured font could not be loaded; searching system fonts"
                ),
            }
        }

        let face = SYSTEM_FONT_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .filter(|path| path.exists())
            .find_map(|path| Self::from_path(&path))
            .or_else(Self::bundled);

        match &face {
            Some(face) => tracing::debug!(font = %face.source, "Loaded font"),
            None => tracing::warn!("No usable font found; text will be measured but not drawn"),
        }
        face
    }

    /// Where the face came from: a file path or the bundled name.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_bundled(&self) -> bool {
        self.source == BUNDLED_FONT_NAME
    }

    pub(crate) fn font(&self) -> &FontArc {
        &self.font
    }

    /// Glyph scale for a CSS-style pixel size (the em height).
    pub fn scale(&self, font_px: f32) -> PxScale {
        let units_per_em = self.font.units_per_em().unwrap_or(1000.0);
        PxScale::from(font_px * self.font.height_unscaled() / units_per_em)
    }

    /// Advance width of `text` at `font_px`, including kerning.
    pub fn measure(&self, text: &str, font_px: f32) -> f32 {
        let font = self.font.as_scaled(self.scale(font_px));
        let mut width = 0.0;
        let mut previous = None;
        for c in text.chars() {
            let id = font.glyph_id(c);
            if let Some(previous) = previous {
                width += font.kern(previous, id);
            }
            width += font.h_advance(id);
            previous = Some(id);
        }
        width
    }

    /// Offset from the vertical middle of a line to the top of its layout
    /// box, which is where glyph drawing places its origin.
    pub fn middle_to_top(&self, font_px: f32) -> f32 {
        let font = self.font.as_scaled(self.scale(font_px));
        (font.descent() - font.ascent()) / 2.0
    }
}

/// Width estimate used when no font face is available.
pub fn estimate_width(text: &str, font_px: f32) -> f32 {
    text.chars().count() as f32 * font_px * FALLBACK_ADVANCE_EM
}

/// Greedy word wrap.
///
/// Words are appended to the current line while `measure` reports the
/// candidate line no wider than `max_width`. A word that does not fit starts
/// a new line; a single word wider than `max_width` keeps a line to itself
/// and is never split.
pub fn wrap_text(text: &str, max_width: f32, mut measure: impl FnMut(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        if line.is_empty() {
            line.push_str(word);
            continue;
        }

        let candidate = format!("{line} {word}");
        if measure(&candidate) > max_width {
            lines.push(std::mem::replace(&mut line, word.to_string()));
        } else {
            line = candidate;
        }
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Vertical positions (middle lines) of `count` lines centered on `anchor_y`.
pub fn line_positions(anchor_y: f32, count: usize, line_height: f32) -> Vec<f32> {
    let start = anchor_y - (count.saturating_sub(1) as f32 * line_height) / 2.0;
    (0..count).map(|i| start + i as f32 * line_height).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Ten pixels per character.
    fn mono(s: &str) -> f32 {
        s.chars().count() as f32 * 10.0
    }

    #[test]
    fn test_wrap_fits_on_one_line() {
        assert_eq!(wrap_text("Hello world", 200.0, mono), vec!["Hello world"]);
    }

    #[test]
    fn test_wrap_breaks_between_words() {
        let lines = wrap_text("aaa bbb ccc ddd", 70.0, mono);
        assert_eq!(lines, vec!["aaa bbb", "ccc ddd"]);
    }

    #[test]
    fn test_overlong_word_keeps_own_line() {
        let lines = wrap_text("hi supercalifragilistic yo", 50.0, mono);
        assert_eq!(lines, vec!["hi", "supercalifragilistic", "yo"]);
    }

    #[test]
    fn test_whitespace_only_yields_no_lines() {
        assert!(wrap_text("", 100.0, mono).is_empty());
        assert!(wrap_text("  \n\t ", 100.0, mono).is_empty());
    }

    #[test]
    fn test_collapses_runs_of_whitespace() {
        assert_eq!(wrap_text("a   b\nc", 1000.0, mono), vec!["a b c"]);
    }

    #[test]
    fn test_line_positions_centered_on_anchor() {
        let ys = line_positions(360.0, 3, 100.0);
        assert_eq!(ys, vec![260.0, 360.0, 460.0]);
        assert_eq!(line_positions(360.0, 1, 83.2), vec![360.0]);
        assert!(line_positions(360.0, 0, 10.0).is_empty());
    }

    #[test]
    fn test_bundled_face_measures_text() {
        let face = FontFace::bundled().unwrap();
        assert!(face.is_bundled());
        let narrow = face.measure("Hello", 32.0);
        let wide = face.measure("Hello", 64.0);
        assert!(narrow > 0.0);
        assert!((wide - 2.0 * narrow).abs() < 0.5);
        assert_eq!(face.measure("", 64.0), 0.0);
        assert!(face.middle_to_top(64.0) < 0.0);
    }

    #[test]
    fn test_load_falls_back_to_a_face() {
        let config = FontConfig {
            path: Some(PathBuf::from("/nonexistent/slidecast.ttf")),
        };
        assert!(FontFace::load(&config).is_some());
    }

    #[test]
    fn test_estimate_width_scales_with_size() {
        assert!((estimate_width("abcd", 10.0) - 22.0).abs() < 1e-4);
    }

    proptest! {
        #[test]
        fn prop_multi_word_lines_fit(
            words in prop::collection::vec("[a-z]{1,14}", 1..30),
            max_width in 20.0f32..300.0,
        ) {
            let text = words.join(" ");
            let lines = wrap_text(&text, max_width, mono);
            for line in &lines {
                if line.contains(' ') {
                    prop_assert!(mono(line) <= max_width);
                }
            }
            // Words are preserved, in order, unsplit.
            let rejoined: Vec<&str> = lines.iter().flat_map(|l| l.split(' ')).collect();
            prop_assert_eq!(rejoined, words.iter().map(String::as_str).collect::<Vec<_>>());
        }
    }
}

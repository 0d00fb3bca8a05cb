//! Slidecast Timeline Model
//!
//! Defines the data contracts shared by preview and export:
//! - **Timeline:** ordered slides; order is playback order
//! - **Slide:** a duration, a background and an ordered element list
//! - **Element:** text or image overlays, drawn in list order
//!
//! All positions and widths are fractions in `[0.0, 1.0]` of the target
//! surface so a slide renders identically at any output resolution.

pub mod color;
pub mod element;
pub mod slide;
pub mod timeline;

pub use color::*;
pub use element::*;
pub use slide::*;
pub use timeline::*;

/// Errors raised by model validation and parsing.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("Invalid color {value:?}: expected #rgb, #rrggbb or #rrggbbaa")]
    InvalidColor { value: String },

    #[error("Invalid image source: {message}")]
    InvalidImageSource { message: String },

    #[error("Duplicate id {id:?} in {scope}")]
    DuplicateId { id: String, scope: String },

    #[error("Slide {id:?} has non-positive duration {duration_secs}")]
    NonPositiveDuration { id: String, duration_secs: f64 },

    #[error("Slide not found: {id}")]
    SlideNotFound { id: String },
}

/// Generate a fresh opaque id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

//! Slidecast Render Engine
//!
//! Turns a slide timeline into pixels, either interactively against a
//! wall clock or offline into a WebM video at a fixed frame rate.
//!
//! # Pipeline Architecture
//!
//! ```text
//!                 elapsed ms (wall clock)      synthetic ms (frame i)
//!                        │                            │
//!                     Player                       Exporter
//!                        │                            │
//! timeline ──────────────┴──── resolve ───────────────┘
//!                                 │
//!                          (slide, progress)
//!                                 │
//!             image cache ──── compositor ──── font
//!                                 │
//!                              surface
//!                                 │
//!                 ┌───────────────┴───────────────┐
//!                 ▼                               ▼
//!            preview frame                 encoder (ffmpeg)
//!                                                 │
//!                                                 ▼
//!                                            video.webm
//! ```

pub mod compositor;
pub mod encoder;
pub mod export;
pub mod image_cache;
pub mod playback;
pub mod resolver;
pub mod surface;
pub mod text;

pub use compositor::{fade_opacity, image_scale, render_frame};
pub use encoder::{EncoderBackend, EncoderSettings, FfmpegBackend, FrameEncoder, VideoCodec};
pub use export::*;
pub use image_cache::{DecodePolicy, ImageCache, ImageStatus};
pub use playback::{run_playback, PlaybackState, PlaybackTick, Player};
pub use resolver::{current_slide_index, resolve, resolve_clamped, ResolvedFrame};
pub use surface::{DrawRect, RasterSurface, Surface, TextStyle};
pub use text::FontFace;

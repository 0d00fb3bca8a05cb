//! Render a single frame to PNG.

use std::path::PathBuf;
use std::sync::Arc;

use slidecast_common::config::AppConfig;
use slidecast_render_engine::{
    render_frame, resolve_clamped, DecodePolicy, FontFace, ImageCache, RasterSurface,
};

use super::load_timeline;

pub fn run(
    config: &AppConfig,
    timeline: Option<PathBuf>,
    at_ms: f64,
    output: PathBuf,
) -> anyhow::Result<()> {
    let timeline = load_timeline(timeline.as_deref())?;

    let font = FontFace::load(&config.fonts).map(Arc::new);
    let mut surface = RasterSurface::new(config.output.width, config.output.height, font)?;
    let mut cache = ImageCache::new(DecodePolicy::Blocking);

    let frame = resolve_clamped(&timeline, at_ms);
    render_frame(frame.as_ref(), &mut surface, &mut cache);
    surface.save_png(&output)?;

    match frame {
        Some(frame) => println!(
            "Frame at {at_ms}ms: slide {} ({:.0}% through) -> {}",
            frame.slide_index + 1,
            frame.local_progress * 100.0,
            output.display()
        ),
        None => println!("Frame at {at_ms}ms: blank -> {}", output.display()),
    }
    Ok(())
}

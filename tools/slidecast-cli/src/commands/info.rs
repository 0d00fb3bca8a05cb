//! Show timeline information.

use std::path::PathBuf;

use slidecast_common::clock::FrameRate;
use slidecast_common::config::AppConfig;
use slidecast_render_engine::playback::format_clock;
use slidecast_timeline_model::Element;

use super::load_timeline;

pub fn run(config: &AppConfig, timeline: Option<PathBuf>) -> anyhow::Result<()> {
    let timeline = load_timeline(timeline.as_deref())?;
    let total_ms = timeline.total_duration_ms_rounded();
    let rate = FrameRate::new(config.output.fps);

    println!("Timeline:");
    println!("  Slides: {}", timeline.len());
    println!("  Duration: {} ({total_ms}ms)", format_clock(total_ms as f64));
    println!(
        "  Export: {} frames @ {}fps, {}x{}",
        rate.frame_count(total_ms),
        rate.fps(),
        config.output.width,
        config.output.height
    );
    println!();

    let mut start_ms = 0.0;
    for (index, slide) in timeline.slides().iter().enumerate() {
        println!(
            "  {}. {} [{} - {}] {:.2}s background {}",
            index + 1,
            slide.id,
            format_clock(start_ms),
            format_clock(start_ms + slide.duration_ms()),
            slide.duration_secs,
            slide.background
        );
        for element in &slide.elements {
            match element {
                Element::Text(text) => println!(
                    "       text  {:?} {}px {} at ({:.2}, {:.2})",
                    text.text, text.font_size, text.color, text.x, text.y
                ),
                Element::Image(image) => println!(
                    "       image {} ({} bytes) width {:.0}% at ({:.2}, {:.2})",
                    image.src.mime(),
                    image.src.len(),
                    image.width * 100.0,
                    image.x,
                    image.y
                ),
            }
        }
        start_ms += slide.duration_ms();
    }

    Ok(())
}

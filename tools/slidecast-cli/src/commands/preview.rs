//! Headless playback.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use slidecast_common::clock::MonotonicClock;
use slidecast_common::config::AppConfig;
use slidecast_render_engine::playback::{format_clock, run_playback, Player};
use slidecast_render_engine::{DecodePolicy, FontFace, ImageCache, RasterSurface};

use super::load_timeline;

pub async fn run(config: &AppConfig, timeline: Option<PathBuf>, seconds: f64) -> anyhow::Result<()> {
    let run_for = preview_duration(seconds)?;
    let timeline = load_timeline(timeline.as_deref())?;
    let total_ms = timeline.total_duration_ms_rounded();

    let font = FontFace::load(&config.fonts).map(Arc::new);
    let mut surface = RasterSurface::new(config.output.width, config.output.height, font)?;
    let mut cache = ImageCache::new(DecodePolicy::Background);
    cache.preload(&timeline);

    let mut player = Player::new(MonotonicClock::start(), total_ms);
    player.play();

    let stop = Arc::new(AtomicBool::new(false));
    let timer_flag = Arc::clone(&stop);
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(run_for) => {}
            _ = tokio::signal::ctrl_c() => {}
        }
        timer_flag.store(true, Ordering::Relaxed);
    });

    println!(
        "Previewing {} slide(s), {} total, for {seconds}s",
        timeline.len(),
        format_clock(total_ms as f64)
    );

    let mut current: Option<Option<usize>> = None;
    let frames = run_playback(
        &mut player,
        &timeline,
        &mut surface,
        &mut cache,
        config.output.refresh_hz,
        stop,
        |tick, _surface| {
            if current != Some(tick.slide_index) {
                current = Some(tick.slide_index);
                match tick.slide_index {
                    Some(index) => tracing::info!(
                        slide = index + 1,
                        elapsed = %format_clock(tick.elapsed_ms),
                        "Slide changed"
                    ),
                    None => tracing::info!(elapsed_ms = tick.elapsed_ms, "Blank frame"),
                }
            }
        },
    )
    .await;

    player.pause();
    println!(
        "Rendered {frames} frame(s); stopped at {} / {}",
        format_clock(player.elapsed_ms()),
        format_clock(total_ms as f64)
    );
    Ok(())
}

fn preview_duration(seconds: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| anyhow::anyhow!("Invalid --seconds value {seconds}: {e}"))
}

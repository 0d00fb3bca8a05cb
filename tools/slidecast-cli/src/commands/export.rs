//! Export a timeline to video.

use std::io::Write;
use std::path::PathBuf;

use slidecast_common::config::AppConfig;
use slidecast_render_engine::export::{ExportProgress, ExportSettings, ExportStage, Exporter};

use super::load_timeline;

pub async fn run(
    config: &AppConfig,
    timeline: Option<PathBuf>,
    output: PathBuf,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
    json: bool,
) -> anyhow::Result<()> {
    let timeline = load_timeline(timeline.as_deref())?;

    let mut settings = ExportSettings::from_config(config);
    settings.width = width.unwrap_or(settings.width);
    settings.height = height.unwrap_or(settings.height);
    settings.fps = fps.unwrap_or(settings.fps);

    println!("Exporting {} slide(s)", timeline.len());
    println!("  Output: {}", output.display());
    println!(
        "  Resolution: {}x{} @ {}fps",
        settings.width, settings.height, settings.fps
    );

    let exporter = Exporter::ffmpeg(settings);

    let progress_cb: Box<dyn Fn(ExportProgress) + Send> = Box::new(move |p| {
        if json {
            match serde_json::to_string(&p) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "Failed to serialize progress"),
            }
        } else if p.stage == ExportStage::Rendering {
            print!(
                "\r  Progress: {:.1}% ({}/{} frames, ETA: {:.0}s)  ",
                p.progress * 100.0,
                p.frames_rendered,
                p.total_frames,
                p.eta_secs,
            );
            let _ = std::io::stdout().flush();
        }
    });

    let export = exporter.export(&timeline, Some(progress_cb));
    tokio::pin!(export);
    let result = loop {
        tokio::select! {
            result = &mut export => break result,
            _ = tokio::signal::ctrl_c() => exporter.abort(),
        }
    };

    let handle = match result {
        Ok(handle) => handle,
        Err(e) => {
            println!("\nExport failed: {e}");
            return Err(e.into());
        }
    };
    let artifact = handle
        .get()
        .ok_or_else(|| anyhow::anyhow!("Export artifact was released before it was saved"))?;
    artifact.write_to(&output)?;

    println!(
        "\nExport complete: {} ({} frames, {:.1} KiB, {})",
        output.display(),
        artifact.frame_count,
        artifact.len() as f64 / 1024.0,
        artifact.mime
    );
    Ok(())
}

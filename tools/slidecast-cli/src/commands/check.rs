//! Check system capabilities.

use slidecast_common::config::{config_file_path, AppConfig};
use slidecast_render_engine::encoder::{command_exists, EncoderBackend, FfmpegBackend};
use slidecast_render_engine::FontFace;

pub fn run(config: &AppConfig, save_config: bool) -> anyhow::Result<()> {
    println!("Slidecast System Check");
    println!("{}", "=".repeat(50));

    let backend = FfmpegBackend::default();
    let ffmpeg_ok = command_exists("ffmpeg");
    if ffmpeg_ok {
        println!("[OK] ffmpeg found on PATH");
    } else {
        println!("[FAIL] ffmpeg not found on PATH");
    }

    let codec = if ffmpeg_ok { backend.select_codec() } else { None };
    match codec {
        Some(codec) => println!(
            "[OK] Video codec: {} ({})",
            codec.ffmpeg_name(),
            codec.mime()
        ),
        None => println!("[FAIL] No WebM encoder (libvpx-vp9 or libvpx) available"),
    }

    match FontFace::load(&config.fonts) {
        Some(face) if face.is_bundled() => println!(
            "[OK] Font: {} (no system font found; set fonts.path to override)",
            face.source()
        ),
        Some(face) => println!("[OK] Font: {}", face.source()),
        None => println!("[WARN] No font could be loaded; text will not be drawn"),
    }

    println!(
        "[OK] Output: {}x{} @ {}fps, {} kbps",
        config.output.width,
        config.output.height,
        config.output.fps,
        config.output.video_bitrate_kbps
    );

    let path = config_file_path();
    if save_config {
        config.save()?;
        println!("[OK] Wrote configuration to {}", path.display());
    } else {
        println!("     Config file: {}", path.display());
    }

    println!();
    if codec.is_some() {
        println!("Slidecast is ready to export.");
    } else {
        println!("Export is unavailable. Install ffmpeg built with libvpx.");
    }

    Ok(())
}

//! Deterministic export: timeline to WebM.
//!
//! Frames are rendered at synthetic timestamps stepped by the frame
//! interval, not at wall-clock time, so an export never drops or duplicates
//! frames regardless of how fast the machine renders.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use slidecast_common::clock::FrameRate;
use slidecast_common::config::{AppConfig, FontConfig};
use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_timeline_model::Timeline;

use crate::compositor::render_frame;
use crate::encoder::{EncoderBackend, EncoderSettings, FfmpegBackend, FrameEncoder, VideoCodec};
use crate::image_cache::{DecodePolicy, ImageCache};
use crate::resolver::resolve_clamped;
use crate::surface::RasterSurface;
use crate::text::FontFace;

/// Suggested file name for exported videos.
pub const SUGGESTED_FILENAME: &str = "video.webm";

/// Output parameters for an export.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_bitrate_kbps: u32,
    pub font: FontConfig,
}

impl ExportSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            width: config.output.width,
            height: config.output.height,
            fps: config.output.fps,
            video_bitrate_kbps: config.output.video_bitrate_kbps,
            font: config.fonts.clone(),
        }
    }

    fn encoder_settings(&self) -> EncoderSettings {
        EncoderSettings {
            width: self.width,
            height: self.height,
            fps: FrameRate::new(self.fps).fps(),
            bitrate_kbps: self.video_bitrate_kbps,
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Export progress report.
#[derive(Debug, Clone, Serialize)]
pub struct ExportProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Frames rendered so far.
    pub frames_rendered: u64,

    /// Total frames to render.
    pub total_frames: u64,

    /// Synthetic timestamp of the last rendered frame.
    pub synthetic_time_ms: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: ExportStage,
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStage {
    Preparing,
    Rendering,
    Encoding,
    Finalizing,
    Complete,
    Failed,
}

/// A finished video held in memory.
#[derive(Debug, Clone)]
pub struct VideoArtifact {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub codec: VideoCodec,
    pub suggested_filename: String,
    pub frame_count: u64,
    pub duration_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl VideoArtifact {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn write_to(&self, path: &Path) -> SlidecastResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.bytes)?;
        tracing::info!(
            path = %path.display(),
            bytes = self.bytes.len(),
            "Wrote video artifact"
        );
        Ok(())
    }
}

/// Shared, revocable reference to an exported artifact.
///
/// Clones observe the same slot: once any holder (or the exporter, when a
/// new export starts) revokes it, [`ArtifactHandle::get`] returns `None`
/// everywhere and the bytes are freed when the last `Arc` drops.
#[derive(Debug, Clone)]
pub struct ArtifactHandle {
    slot: Arc<Mutex<Option<Arc<VideoArtifact>>>>,
}

impl ArtifactHandle {
    fn new(artifact: VideoArtifact) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(Arc::new(artifact)))),
        }
    }

    pub fn get(&self) -> Option<Arc<VideoArtifact>> {
        self.lock().clone()
    }

    pub fn revoke(&self) {
        self.lock().take();
    }

    pub fn is_revoked(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Arc<VideoArtifact>>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Runs exports one at a time and owns the most recent artifact.
pub struct Exporter {
    backend: Box<dyn EncoderBackend>,
    settings: ExportSettings,
    font: Option<Arc<FontFace>>,
    in_flight: AtomicBool,
    abort_requested: AtomicBool,
    current: Mutex<Option<ArtifactHandle>>,
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("backend", &self.backend.name())
            .field("settings", &self.settings)
            .field("font", &self.font)
            .field("in_flight", &self.is_exporting())
            .finish()
    }
}

impl Exporter {
    /// Exporter using `ffmpeg` from `PATH` and the configured font.
    pub fn ffmpeg(settings: ExportSettings) -> Self {
        Self::new(Box::new(FfmpegBackend::default()), settings)
    }

    pub fn new(backend: Box<dyn EncoderBackend>, settings: ExportSettings) -> Self {
        let font = FontFace::load(&settings.font).map(Arc::new);
        Self::with_font(backend, settings, font)
    }

    pub fn with_font(
        backend: Box<dyn EncoderBackend>,
        settings: ExportSettings,
        font: Option<Arc<FontFace>>,
    ) -> Self {
        Self {
            backend,
            settings,
            font,
            in_flight: AtomicBool::new(false),
            abort_requested: AtomicBool::new(false),
            current: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn is_exporting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Ask the running export to stop at the next frame boundary.
    pub fn abort(&self) {
        if self.is_exporting() {
            tracing::info!("Export abort requested");
            self.abort_requested.store(true, Ordering::SeqCst);
        }
    }

    /// Handle to the artifact of the last successful export, if not revoked.
    pub fn current_artifact(&self) -> Option<ArtifactHandle> {
        self.lock_current()
            .as_ref()
            .filter(|handle| !handle.is_revoked())
            .cloned()
    }

    /// Revoke and forget the current artifact.
    pub fn release_artifact(&self) {
        if let Some(handle) = self.lock_current().take() {
            handle.revoke();
            tracing::debug!("Released previous video artifact");
        }
    }

    /// Export `timeline` to a video.
    ///
    /// Fails with [`SlidecastError::Busy`] while another export runs,
    /// [`SlidecastError::Unsupported`] when no surface or codec is
    /// available, [`SlidecastError::Export`] when encoding fails and
    /// [`SlidecastError::Aborted`] after [`Exporter::abort`]. No artifact is
    /// produced on failure and nothing is retried.
    pub async fn export(
        &self,
        timeline: &Timeline,
        progress: Option<ProgressCallback>,
    ) -> SlidecastResult<ArtifactHandle> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(SlidecastError::Busy)?;
        self.abort_requested.store(false, Ordering::SeqCst);
        self.release_artifact();

        let snapshot = timeline.clone();
        let mut reporter = ProgressReporter::new(progress);
        let started = Instant::now();

        match self.run(&snapshot, &mut reporter).await {
            Ok(artifact) => {
                tracing::info!(
                    bytes = artifact.len(),
                    frames = artifact.frame_count,
                    codec = %artifact.codec,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "Export finished"
                );
                let handle = ArtifactHandle::new(artifact);
                *self.lock_current() = Some(handle.clone());
                Ok(handle)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Export failed");
                reporter.report(ExportStage::Failed, reporter.frames_rendered, 0);
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        timeline: &Timeline,
        reporter: &mut ProgressReporter,
    ) -> SlidecastResult<VideoArtifact> {
        let total_ms = timeline.total_duration_ms_rounded();
        if total_ms == 0 {
            return Err(SlidecastError::export(
                "Export duration resolved to zero seconds",
            ));
        }
        let rate = FrameRate::new(self.settings.fps);
        let total_frames = rate.frame_count(total_ms);
        reporter.total_frames = total_frames;
        reporter.report(ExportStage::Preparing, 0, 0);

        tracing::info!(
            slides = timeline.len(),
            total_ms,
            fps = rate.fps(),
            total_frames,
            width = self.settings.width,
            height = self.settings.height,
            "Starting export"
        );

        let mut surface =
            RasterSurface::new(self.settings.width, self.settings.height, self.font.clone())?;

        if !self.backend.is_available() {
            return Err(SlidecastError::unsupported(format!(
                "{} encoder not found",
                self.backend.name()
            )));
        }
        let codec = self.backend.select_codec().ok_or_else(|| {
            SlidecastError::unsupported("no WebM video encoder (VP9 or VP8) is available")
        })?;
        tracing::info!(backend = self.backend.name(), codec = %codec, "Using encoder");

        let mut cache = ImageCache::new(DecodePolicy::Blocking);
        cache.preload(timeline);

        let mut encoder = self
            .backend
            .open(codec, self.settings.encoder_settings())?;
        let mut chunks: Vec<Vec<u8>> = Vec::new();

        for index in 0..total_frames {
            if self.abort_requested.load(Ordering::SeqCst) {
                encoder.abort();
                tracing::info!(frames_rendered = index, "Export aborted");
                return Err(SlidecastError::Aborted);
            }

            let t_ms = rate.frame_time_ms(index, total_ms);
            let frame = resolve_clamped(timeline, t_ms as f64);
            render_frame(frame.as_ref(), &mut surface, &mut cache);

            if let Err(err) = encoder.submit(surface.as_bytes()) {
                encoder.abort();
                return Err(into_export_failure(err));
            }
            chunks.append(&mut encoder.take_chunks());
            reporter.report(ExportStage::Rendering, index + 1, t_ms);

            tokio::task::yield_now().await;
        }

        if self.abort_requested.load(Ordering::SeqCst) {
            encoder.abort();
            return Err(SlidecastError::Aborted);
        }

        reporter.report(ExportStage::Encoding, total_frames, total_ms);
        let tail = finish_encoder(encoder).await?;
        chunks.extend(tail);

        reporter.report(ExportStage::Finalizing, total_frames, total_ms);
        let bytes = chunks.concat();
        if bytes.is_empty() {
            return Err(SlidecastError::export("encoder produced no output"));
        }

        reporter.report(ExportStage::Complete, total_frames, total_ms);
        Ok(VideoArtifact {
            bytes,
            mime: codec.mime().to_string(),
            codec,
            suggested_filename: SUGGESTED_FILENAME.to_string(),
            frame_count: total_frames,
            duration_ms: total_ms,
            created_at: Utc::now(),
        })
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, Option<ArtifactHandle>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn finish_encoder(encoder: Box<dyn FrameEncoder>) -> SlidecastResult<Vec<Vec<u8>>> {
    tokio::task::spawn_blocking(move || encoder.finish())
        .await
        .map_err(|e| SlidecastError::export(format!("Encoder flush task failed: {e}")))?
        .map_err(into_export_failure)
}

fn into_export_failure(err: SlidecastError) -> SlidecastError {
    if err.is_export_failure() {
        err
    } else {
        SlidecastError::export(err.to_string())
    }
}

/// Marks an export as running for as long as it lives.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

struct ProgressReporter {
    callback: Option<ProgressCallback>,
    started: Instant,
    total_frames: u64,
    frames_rendered: u64,
}

impl ProgressReporter {
    fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            started: Instant::now(),
            total_frames: 0,
            frames_rendered: 0,
        }
    }

    fn report(&mut self, stage: ExportStage, frames_rendered: u64, synthetic_time_ms: u64) {
        self.frames_rendered = frames_rendered;
        let Some(cb) = &self.callback else {
            return;
        };
        cb(progress_report(
            stage,
            frames_rendered,
            self.total_frames,
            synthetic_time_ms,
            self.started.elapsed().as_secs_f64(),
        ));
    }
}

fn progress_report(
    stage: ExportStage,
    frames_rendered: u64,
    total_frames: u64,
    synthetic_time_ms: u64,
    elapsed_secs: f64,
) -> ExportProgress {
    let progress = match stage {
        ExportStage::Complete => 1.0,
        _ if total_frames == 0 => 0.0,
        _ => (frames_rendered as f64 / total_frames as f64).clamp(0.0, 1.0),
    };
    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    ExportProgress {
        progress,
        frames_rendered,
        total_frames,
        synthetic_time_ms,
        eta_secs,
        stage,
    }
}

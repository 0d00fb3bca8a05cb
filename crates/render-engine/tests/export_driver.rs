mod common;

use std::sync::{Arc, Mutex};

use common::FakeBackend;
use slidecast_common::error::SlidecastError;
use slidecast_render_engine::encoder::command_exists;
use slidecast_render_engine::{
    EncoderBackend, ExportProgress, ExportSettings, ExportStage, Exporter, FfmpegBackend,
    VideoCodec,
};
use slidecast_timeline_model::{Color, Element, Slide, TextElement, Timeline};

fn small_settings(fps: u32) -> ExportSettings {
    ExportSettings {
        width: 64,
        height: 36,
        fps,
        ..ExportSettings::default()
    }
}

fn exporter(backend: &FakeBackend, fps: u32) -> Exporter {
    Exporter::with_font(Box::new(backend.clone()), small_settings(fps), None)
}

fn three_second_timeline() -> Timeline {
    Timeline::from_slides(vec![Slide::new(3.0, Color::BLACK)
        .with_element(Element::Text(TextElement::new("Hello", 64.0)))])
}

type Reports = Arc<Mutex<Vec<ExportProgress>>>;

fn collecting() -> (Reports, Option<slidecast_render_engine::ProgressCallback>) {
    let reports: Reports = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    let callback: slidecast_render_engine::ProgressCallback =
        Box::new(move |p| sink.lock().unwrap().push(p));
    (reports, Some(callback))
}

#[tokio::test]
async fn three_seconds_at_thirty_fps_is_ninety_frames() {
    let backend = FakeBackend::default();
    let exporter = exporter(&backend, 30);
    let (reports, callback) = collecting();

    let handle = exporter
        .export(&three_second_timeline(), callback)
        .await
        .expect("export should succeed");
    let artifact = handle.get().expect("artifact should be live");

    assert_eq!(artifact.frame_count, 90);
    assert_eq!(artifact.duration_ms, 3000);
    assert_eq!(artifact.suggested_filename, "video.webm");
    assert_eq!(artifact.codec, VideoCodec::Vp9);
    assert_eq!(artifact.mime, "video/webm;codecs=vp9");

    let log = backend.log();
    assert_eq!(log.frames, 90);
    assert!(log.finished);
    assert!(!log.aborted);
    assert!(log.frame_sizes.iter().all(|len| *len == 64 * 36 * 4));

    // Chunks arrive in frame order, followed by the flush output.
    let expected: Vec<u8> = (0..90u8).chain(*b"END").collect();
    assert_eq!(artifact.bytes, expected);

    let reports = reports.lock().unwrap();
    let times: Vec<u64> = reports
        .iter()
        .filter(|p| p.stage == ExportStage::Rendering)
        .map(|p| p.synthetic_time_ms)
        .collect();
    assert_eq!(times.len(), 90);
    assert_eq!(times[0], 33);
    assert_eq!(*times.last().unwrap(), 3000);
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(reports.first().map(|p| p.stage), Some(ExportStage::Preparing));
    assert_eq!(reports.last().map(|p| p.stage), Some(ExportStage::Complete));
}

#[tokio::test]
async fn fractional_duration_rounds_and_clamps_last_frame() {
    let backend = FakeBackend::default();
    let exporter = exporter(&backend, 24);
    let (reports, callback) = collecting();
    let timeline = Timeline::from_slides(vec![Slide::new(1.25, Color::WHITE)]);

    let handle = exporter.export(&timeline, callback).await.unwrap();
    // ceil(1250 * 24 / 1000) = 30
    assert_eq!(handle.get().unwrap().frame_count, 30);

    let last = reports
        .lock()
        .unwrap()
        .iter()
        .filter(|p| p.stage == ExportStage::Rendering)
        .map(|p| p.synthetic_time_ms)
        .max();
    assert_eq!(last, Some(1250));
}

#[tokio::test]
async fn encoder_failure_mid_export_yields_no_artifact() {
    let backend = FakeBackend {
        fail_at_frame: Some(10),
        ..FakeBackend::default()
    };
    let exporter = exporter(&backend, 30);
    let (reports, callback) = collecting();

    let err = exporter
        .export(&three_second_timeline(), callback)
        .await
        .unwrap_err();
    assert!(matches!(err, SlidecastError::Export { .. }));
    assert!(err.is_export_failure());
    assert!(exporter.current_artifact().is_none());
    assert!(!exporter.is_exporting());

    let log = backend.log();
    assert_eq!(log.frames, 10);
    assert!(log.aborted);
    assert!(!log.finished);
    assert_eq!(
        reports.lock().unwrap().last().map(|p| p.stage),
        Some(ExportStage::Failed)
    );
}

#[tokio::test]
async fn missing_encoder_is_unsupported_before_capture() {
    let backend = FakeBackend {
        available: false,
        ..FakeBackend::default()
    };
    let err = exporter(&backend, 30)
        .export(&three_second_timeline(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SlidecastError::Unsupported { .. }));
    assert_eq!(backend.log().opened, 0);
}

#[tokio::test]
async fn no_supported_codec_is_unsupported() {
    let backend = FakeBackend {
        codec: None,
        ..FakeBackend::default()
    };
    let err = exporter(&backend, 30)
        .export(&three_second_timeline(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SlidecastError::Unsupported { .. }));
    assert_eq!(backend.log().opened, 0);
}

#[tokio::test]
async fn unusable_surface_is_unsupported() {
    let backend = FakeBackend::default();
    let settings = ExportSettings {
        width: 0,
        ..small_settings(30)
    };
    let exporter = Exporter::with_font(Box::new(backend.clone()), settings, None);
    let err = exporter
        .export(&three_second_timeline(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SlidecastError::Unsupported { .. }));
    assert_eq!(backend.log().opened, 0);
}

#[tokio::test]
async fn empty_timeline_is_rejected() {
    let backend = FakeBackend::default();
    let err = exporter(&backend, 30)
        .export(&Timeline::new(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SlidecastError::Export { .. }));
    assert_eq!(backend.log().opened, 0);
}

#[tokio::test]
async fn second_export_while_running_is_busy() {
    let backend = FakeBackend::default();
    let exporter = exporter(&backend, 30);
    let timeline = three_second_timeline();

    let (first, second) = tokio::join!(exporter.export(&timeline, None), async {
        tokio::task::yield_now().await;
        assert!(exporter.is_exporting());
        exporter.export(&timeline, None).await
    });

    assert!(first.is_ok());
    assert!(matches!(second, Err(SlidecastError::Busy)));
    assert_eq!(backend.log().opened, 1);
}

#[tokio::test]
async fn abort_stops_the_export() {
    let backend = FakeBackend::default();
    let exporter = exporter(&backend, 30);
    let timeline = three_second_timeline();

    let (result, ()) = tokio::join!(exporter.export(&timeline, None), async {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        exporter.abort();
    });

    assert!(matches!(result, Err(SlidecastError::Aborted)));
    assert!(exporter.current_artifact().is_none());
    let log = backend.log();
    assert!(log.aborted);
    assert!(log.frames < 90);
}

#[tokio::test]
async fn new_export_revokes_previous_artifact() {
    let backend = FakeBackend::default();
    let exporter = exporter(&backend, 10);
    let timeline = Timeline::from_slides(vec![Slide::new(1.0, Color::BLACK)]);

    let first = exporter.export(&timeline, None).await.unwrap();
    assert!(!first.is_revoked());

    let second = exporter.export(&timeline, None).await.unwrap();
    assert!(first.is_revoked());
    assert!(first.get().is_none());
    assert!(second.get().is_some());
    assert!(exporter.current_artifact().is_some());

    exporter.release_artifact();
    assert!(second.is_revoked());
    assert!(exporter.current_artifact().is_none());
}

#[tokio::test]
async fn ffmpeg_produces_a_webm_stream() {
    let backend = FfmpegBackend::default();
    if !command_exists("ffmpeg") || backend.select_codec().is_none() {
        eprintln!("skipping: ffmpeg with libvpx not available");
        return;
    }

    let exporter = Exporter::with_font(Box::new(backend), small_settings(10), None);
    let timeline = Timeline::from_slides(vec![
        Slide::new(1.0, Color::parse_or_black("#336699")),
        Slide::new(1.0, Color::WHITE),
    ]);
    let handle = exporter.export(&timeline, None).await.unwrap();
    let artifact = handle.get().unwrap();

    assert_eq!(artifact.frame_count, 20);
    // EBML header magic.
    assert_eq!(&artifact.bytes[..4], &[0x1a, 0x45, 0xdf, 0xa3]);
}

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use image::RgbaImage;
use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_render_engine::{
    DrawRect, EncoderBackend, EncoderSettings, FrameEncoder, Surface, TextStyle, VideoCodec,
};
use slidecast_timeline_model::Color;

/// A drawing call captured by [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear,
    Fill { color: Color, alpha: f32 },
    Text { text: String, x: f32, y: f32, font_px: f32, alpha: f32 },
    Image { rect: DrawRect, alpha: f32 },
}

/// Surface that records calls instead of drawing. Text measures half the
/// font size per character.
#[derive(Debug)]
pub struct RecordingSurface {
    pub width: u32,
    pub height: u32,
    pub alpha: f32,
    pub ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            alpha: 1.0,
            ops: Vec::new(),
        }
    }

    pub fn texts(&self) -> Vec<&DrawOp> {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Text { .. }))
            .collect()
    }
}

impl Surface for RecordingSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear(&mut self) {
        self.ops.clear();
        self.ops.push(DrawOp::Clear);
    }

    fn fill(&mut self, color: Color) {
        self.ops.push(DrawOp::Fill {
            color,
            alpha: self.alpha,
        });
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
    }

    fn global_alpha(&self) -> f32 {
        self.alpha
    }

    fn measure_text(&self, text: &str, font_px: f32) -> f32 {
        text.chars().count() as f32 * font_px * 0.5
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            x,
            y,
            font_px: style.font_px,
            alpha: self.alpha,
        });
    }

    fn draw_image(&mut self, _image: &RgbaImage, rect: DrawRect) {
        self.ops.push(DrawOp::Image {
            rect,
            alpha: self.alpha,
        });
    }
}

/// What a [`FakeBackend`] observed.
#[derive(Debug, Default)]
pub struct FakeLog {
    pub opened: u32,
    pub frames: u64,
    pub frame_sizes: Vec<usize>,
    pub finished: bool,
    pub aborted: bool,
}

/// In-memory encoder: each frame becomes a one-byte chunk holding its
/// index, and finishing appends `b"END"`.
#[derive(Debug, Clone)]
pub struct FakeBackend {
    pub available: bool,
    pub codec: Option<VideoCodec>,
    pub fail_at_frame: Option<u64>,
    pub log: Arc<Mutex<FakeLog>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            available: true,
            codec: Some(VideoCodec::Vp9),
            fail_at_frame: None,
            log: Arc::new(Mutex::new(FakeLog::default())),
        }
    }
}

impl FakeBackend {
    pub fn log(&self) -> std::sync::MutexGuard<'_, FakeLog> {
        self.log.lock().unwrap()
    }
}

impl EncoderBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn select_codec(&self) -> Option<VideoCodec> {
        self.codec
    }

    fn open(
        &self,
        codec: VideoCodec,
        settings: EncoderSettings,
    ) -> SlidecastResult<Box<dyn FrameEncoder>> {
        self.log().opened += 1;
        Ok(Box::new(FakeEncoder {
            codec,
            frame_len: settings.frame_len(),
            fail_at_frame: self.fail_at_frame,
            pending: Vec::new(),
            log: Arc::clone(&self.log),
        }))
    }
}

struct FakeEncoder {
    codec: VideoCodec,
    frame_len: usize,
    fail_at_frame: Option<u64>,
    pending: Vec<Vec<u8>>,
    log: Arc<Mutex<FakeLog>>,
}

impl FrameEncoder for FakeEncoder {
    fn codec(&self) -> VideoCodec {
        self.codec
    }

    fn submit(&mut self, rgba: &[u8]) -> SlidecastResult<()> {
        let mut log = self.log.lock().unwrap();
        if Some(log.frames) == self.fail_at_frame {
            return Err(SlidecastError::export("fake encoder failure"));
        }
        assert_eq!(rgba.len(), self.frame_len);
        self.pending.push(vec![log.frames as u8]);
        log.frame_sizes.push(rgba.len());
        log.frames += 1;
        Ok(())
    }

    fn take_chunks(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.pending)
    }

    fn finish(mut self: Box<Self>) -> SlidecastResult<Vec<Vec<u8>>> {
        self.log.lock().unwrap().finished = true;
        let mut rest = std::mem::take(&mut self.pending);
        rest.push(b"END".to_vec());
        Ok(rest)
    }

    fn abort(self: Box<Self>) {
        self.log.lock().unwrap().aborted = true;
    }
}

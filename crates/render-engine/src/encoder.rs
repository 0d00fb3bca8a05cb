//! Streaming video encoders.
//!
//! Frames go in as raw RGBA buffers, container bytes come out as ordered
//! chunks. The production backend pipes frames into an `ffmpeg` child
//! process and reads the WebM stream back from its stdout.

use std::io::{BufReader, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc;
use std::thread::JoinHandle;

use slidecast_common::error::{SlidecastError, SlidecastResult};

/// Size of the stdout read buffer; each read becomes one chunk.
const CHUNK_SIZE: usize = 64 * 1024;

/// Codecs the exporter can produce, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    Vp9,
    Vp8,
}

impl VideoCodec {
    pub const PREFERENCE: [VideoCodec; 2] = [VideoCodec::Vp9, VideoCodec::Vp8];

    /// Encoder name as listed by `ffmpeg -encoders`.
    pub fn ffmpeg_name(self) -> &'static str {
        match self {
            Self::Vp9 => "libvpx-vp9",
            Self::Vp8 => "libvpx",
        }
    }

    /// Container MIME type including the codec parameter.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Vp9 => "video/webm;codecs=vp9",
            Self::Vp8 => "video/webm;codecs=vp8",
        }
    }

    pub fn extension(self) -> &'static str {
        "webm"
    }
}

impl std::fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vp9 => f.write_str("vp9"),
            Self::Vp8 => f.write_str("vp8"),
        }
    }
}

/// Parameters for one encoding session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub bitrate_kbps: u32,
}

impl EncoderSettings {
    /// Bytes in one RGBA frame.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// An open encoding session.
pub trait FrameEncoder: Send {
    fn codec(&self) -> VideoCodec;

    /// Encode one RGBA frame. Frames must arrive in presentation order.
    fn submit(&mut self, rgba: &[u8]) -> SlidecastResult<()>;

    /// Chunks emitted since the last call, in arrival order.
    fn take_chunks(&mut self) -> Vec<Vec<u8>>;

    /// Signal end of input, wait for the encoder to flush and return the
    /// chunks not yet taken.
    fn finish(self: Box<Self>) -> SlidecastResult<Vec<Vec<u8>>>;

    /// Stop immediately and discard any pending output.
    fn abort(self: Box<Self>);
}

/// Factory for encoding sessions (ffmpeg, test fakes, ...).
pub trait EncoderBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Check if this backend can run on the system.
    fn is_available(&self) -> bool;

    /// The preferred supported codec, or `None` if nothing usable exists.
    fn select_codec(&self) -> Option<VideoCodec>;

    fn open(
        &self,
        codec: VideoCodec,
        settings: EncoderSettings,
    ) -> SlidecastResult<Box<dyn FrameEncoder>>;
}

/// Encoder backend that shells out to `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    binary: String,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegBackend {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Video encoder names compiled into the ffmpeg binary.
    pub fn list_encoders(&self) -> Vec<String> {
        let output = match Command::new(&self.binary)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .output()
        {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                tracing::warn!(status = %output.status, "ffmpeg -encoders failed");
                return Vec::new();
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to run ffmpeg -encoders");
                return Vec::new();
            }
        };
        parse_video_encoders(&String::from_utf8_lossy(&output.stdout))
    }
}

impl EncoderBackend for FfmpegBackend {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn select_codec(&self) -> Option<VideoCodec> {
        let encoders = self.list_encoders();
        let codec = pick_codec(&encoders);
        tracing::debug!(available = encoders.len(), ?codec, "Selected video codec");
        codec
    }

    fn open(
        &self,
        codec: VideoCodec,
        settings: EncoderSettings,
    ) -> SlidecastResult<Box<dyn FrameEncoder>> {
        let args = ffmpeg_args(codec, &settings);
        tracing::debug!(?args, "Running ffmpeg");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SlidecastError::export(format!("Failed to start ffmpeg: {e}")))?;

        tracing::info!(
            pid = child.id(),
            codec = %codec,
            width = settings.width,
            height = settings.height,
            fps = settings.fps,
            "ffmpeg encoder started"
        );

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (Some(stdin), Some(stdout), Some(stderr)) = (stdin, stdout, stderr) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(SlidecastError::export("Failed to capture ffmpeg pipes"));
        };

        // Drain stderr concurrently to avoid ffmpeg blocking on a full stderr pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let (tx, rx) = mpsc::channel();
        let stdout_task = std::thread::spawn(move || -> std::io::Result<()> {
            let mut stdout = stdout;
            let mut buf = vec![0u8; CHUNK_SIZE];
            loop {
                let n = stdout.read(&mut buf)?;
                if n == 0 {
                    return Ok(());
                }
                if tx.send(buf[..n].to_vec()).is_err() {
                    return Ok(());
                }
            }
        });

        Ok(Box::new(FfmpegEncoder {
            codec,
            frame_len: settings.frame_len(),
            child,
            stdin: Some(stdin),
            chunks: rx,
            stdout_task: Some(stdout_task),
            stderr_task: Some(stderr_task),
            frames: 0,
            done: false,
        }))
    }
}

struct FfmpegEncoder {
    codec: VideoCodec,
    frame_len: usize,
    child: Child,
    stdin: Option<ChildStdin>,
    chunks: mpsc::Receiver<Vec<u8>>,
    stdout_task: Option<JoinHandle<std::io::Result<()>>>,
    stderr_task: Option<JoinHandle<String>>,
    frames: u64,
    done: bool,
}

impl FfmpegEncoder {
    fn stderr_output(&mut self) -> String {
        self.stderr_task
            .take()
            .map(|task| {
                task.join()
                    .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
            })
            .unwrap_or_default()
    }

    fn kill(&mut self) {
        self.stdin = None;
        if let Err(err) = self.child.kill() {
            tracing::debug!(error = %err, "ffmpeg already exited");
        }
        let _ = self.child.wait();
        self.done = true;
    }
}

impl FrameEncoder for FfmpegEncoder {
    fn codec(&self) -> VideoCodec {
        self.codec
    }

    fn submit(&mut self, rgba: &[u8]) -> SlidecastResult<()> {
        if rgba.len() != self.frame_len {
            return Err(SlidecastError::export(format!(
                "frame {} has {} bytes, expected {}",
                self.frames,
                rgba.len(),
                self.frame_len
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| SlidecastError::export("ffmpeg input already closed"))?;
        if let Err(err) = stdin.write_all(rgba) {
            self.kill();
            let stderr = self.stderr_output();
            return Err(SlidecastError::export(format!(
                "ffmpeg rejected frame {}: {err}: {}",
                self.frames,
                stderr.trim()
            )));
        }
        self.frames += 1;
        Ok(())
    }

    fn take_chunks(&mut self) -> Vec<Vec<u8>> {
        self.chunks.try_iter().collect()
    }

    fn finish(mut self: Box<Self>) -> SlidecastResult<Vec<Vec<u8>>> {
        // Closing stdin is ffmpeg's end-of-input signal.
        self.stdin = None;

        let status = self
            .child
            .wait()
            .map_err(|e| SlidecastError::export(format!("Failed to wait on ffmpeg: {e}")))?;
        self.done = true;

        let read_result = match self.stdout_task.take() {
            Some(task) => task
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdout reader panicked"))),
            None => Ok(()),
        };
        let stderr = self.stderr_output();

        if !status.success() {
            return Err(SlidecastError::export(format!(
                "ffmpeg export failed (status {status}): {}",
                stderr.trim()
            )));
        }
        read_result
            .map_err(|e| SlidecastError::export(format!("Failed reading ffmpeg output: {e}")))?;

        let chunks: Vec<Vec<u8>> = self.chunks.try_iter().collect();
        tracing::debug!(frames = self.frames, chunks = chunks.len(), "ffmpeg encoder finished");
        Ok(chunks)
    }

    fn abort(mut self: Box<Self>) {
        tracing::debug!(frames = self.frames, "Aborting ffmpeg encoder");
        self.kill();
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        if !self.done {
            self.kill();
        }
    }
}

fn ffmpeg_args(codec: VideoCodec, settings: &EncoderSettings) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgba".to_string(),
        "-s".to_string(),
        format!("{}x{}", settings.width, settings.height),
        "-r".to_string(),
        settings.fps.to_string(),
        "-i".to_string(),
        "pipe:0".to_string(),
        "-an".to_string(),
        "-c:v".to_string(),
        codec.ffmpeg_name().to_string(),
        "-b:v".to_string(),
        format!("{}k", settings.bitrate_kbps.max(1)),
        "-deadline".to_string(),
        "realtime".to_string(),
        "-cpu-used".to_string(),
        "8".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-f".to_string(),
        "webm".to_string(),
        "pipe:1".to_string(),
    ]
}

/// Names of the video encoders in `ffmpeg -encoders` output.
fn parse_video_encoders(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let flags = fields.next()?;
            let name = fields.next()?;
            let is_video = flags.len() == 6 && flags.starts_with('V') && name != "=";
            is_video.then(|| name.to_string())
        })
        .collect()
}

/// First codec of [`VideoCodec::PREFERENCE`] present in `encoders`.
pub fn pick_codec(encoders: &[String]) -> Option<VideoCodec> {
    VideoCodec::PREFERENCE
        .into_iter()
        .find(|codec| encoders.iter().any(|name| name == codec.ffmpeg_name()))
}

/// Whether `binary` resolves on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

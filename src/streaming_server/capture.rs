//! Frame capture
//!
//! `FfmpegFrameSource` runs ffmpeg against the stream URL and reads an MJPEG
//! elementary stream from its stdout (`-f image2pipe -vcodec mjpeg`). Frames
//! are cut on JPEG SOI/EOI markers.

use super::types::Frame;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// Upper bound on buffered bytes without a complete frame
const MAX_PENDING_BYTES: usize = 16 * 1024 * 1024;

const READ_CHUNK: usize = 64 * 1024;

/// Capture handle for one camera
#[async_trait]
pub trait FrameSource: Send {
    /// Connect; succeeds once the source delivered its first frame
    async fn open(&mut self) -> Result<()>;

    async fn read_frame(&mut self) -> Result<Frame>;

    fn is_open(&self) -> bool;

    /// Release the handle; safe to call repeatedly
    async fn close(&mut self);
}

/// Builds a capture handle per camera
pub trait FrameSourceFactory: Send + Sync {
    fn create(&self, camera_id: &str, url: &str) -> Box<dyn FrameSource>;
}

/// ffmpeg-backed sources
#[derive(Debug, Clone)]
pub struct FfmpegSourceFactory {
    pub ffmpeg_path: String,
    pub read_timeout: Duration,
    pub fps: Option<u32>,
}

impl FfmpegSourceFactory {
    pub fn new(read_timeout: Duration, fps: Option<u32>) -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            read_timeout,
            fps,
        }
    }
}

impl FrameSourceFactory for FfmpegSourceFactory {
    fn create(&self, camera_id: &str, url: &str) -> Box<dyn FrameSource> {
        Box::new(FfmpegFrameSource {
            camera_id: camera_id.to_string(),
            url: url.to_string(),
            ffmpeg_path: self.ffmpeg_path.clone(),
            read_timeout: self.read_timeout,
            fps: self.fps,
            child: None,
            stdout: None,
            buffer: Vec::new(),
            pending: None,
        })
    }
}

/// MJPEG-over-pipe capture from an ffmpeg subprocess
pub struct FfmpegFrameSource {
    camera_id: String,
    url: String,
    ffmpeg_path: String,
    read_timeout: Duration,
    fps: Option<u32>,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    buffer: Vec<u8>,
    /// First frame read during `open`
    pending: Option<Frame>,
}

impl FfmpegFrameSource {
    fn ffmpeg_args(&self) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        if self.url.starts_with("rtsp://") {
            args.extend(["-rtsp_transport".to_string(), "tcp".to_string()]);
        }
        args.extend(["-i".to_string(), self.url.clone()]);
        if let Some(fps) = self.fps {
            args.extend(["-r".to_string(), fps.to_string()]);
        }
        args.extend(
            [
                "-f", "image2pipe", "-vcodec", "mjpeg", "-q:v", "5", "-loglevel", "error", "-",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        args
    }

    async fn next_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(data) = extract_jpeg(&mut self.buffer) {
                return Ok(Frame::new(data));
            }

            let stdout = self
                .stdout
                .as_mut()
                .ok_or_else(|| Error::FrameSource("Capture not open".to_string()))?;

            let mut chunk = vec![0u8; READ_CHUNK];
            let n = tokio::time::timeout(self.read_timeout, stdout.read(&mut chunk))
                .await
                .map_err(|_| {
                    Error::FrameSource(format!(
                        "No frame within {}s",
                        self.read_timeout.as_secs()
                    ))
                })??;

            if n == 0 {
                return Err(Error::FrameSource("Capture stream ended".to_string()));
            }
            self.buffer.extend_from_slice(&chunk[..n]);

            if self.buffer.len() > MAX_PENDING_BYTES {
                tracing::warn!(
                    camera_id = %self.camera_id,
                    bytes = self.buffer.len(),
                    "Discarding capture buffer without a complete frame"
                );
                self.buffer.clear();
            }
        }
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameSource {
    async fn open(&mut self) -> Result<()> {
        self.close().await;

        let mut child = Command::new(&self.ffmpeg_path)
            .args(self.ffmpeg_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::FrameSource(format!("ffmpeg spawn failed: {}", e)))?;

        self.stdout = child.stdout.take();
        self.child = Some(child);

        match self.next_frame().await {
            Ok(frame) => {
                tracing::debug!(
                    camera_id = %self.camera_id,
                    size = frame.data.len(),
                    "Capture opened"
                );
                self.pending = Some(frame);
                Ok(())
            }
            Err(e) => {
                self.close().await;
                Err(e)
            }
        }
    }

    async fn read_frame(&mut self) -> Result<Frame> {
        if let Some(frame) = self.pending.take() {
            return Ok(frame);
        }
        match self.next_frame().await {
            Ok(frame) => Ok(frame),
            Err(e) => {
                self.close().await;
                Err(e)
            }
        }
    }

    fn is_open(&self) -> bool {
        self.child.is_some() && self.stdout.is_some()
    }

    async fn close(&mut self) {
        self.stdout = None;
        self.pending = None;
        self.buffer.clear();
        if let Some(mut child) = self.child.take() {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }
}

/// Pop the first complete JPEG out of `buffer`
///
/// Bytes before the first SOI are dropped.
pub fn extract_jpeg(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let start = match find_marker(buffer, JPEG_SOI, 0) {
        Some(i) => i,
        None => {
            // keep a trailing 0xFF, it may start the next marker
            let keep = usize::from(buffer.last() == Some(&0xFF));
            let len = buffer.len();
            buffer.drain(..len - keep);
            return None;
        }
    };

    let end = find_marker(buffer, JPEG_EOI, start + 2)? + 2;
    let frame = buffer[start..end].to_vec();
    buffer.drain(..end);
    Some(frame)
}

fn find_marker(buffer: &[u8], marker: [u8; 2], from: usize) -> Option<usize> {
    if buffer.len() < from + 2 {
        return None;
    }
    buffer[from..]
        .windows(2)
        .position(|w| w == marker)
        .map(|i| i + from)
}

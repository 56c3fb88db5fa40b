//! Supervised per-camera task
//!
//! Connect once; on failure the camera ends in `Error` without retries.
//! Once online, a failed read gets exactly one reconnect after
//! `reconnect_delay`; a failed reconnect ends the task in `Error`. The frame
//! counter is never reset. The capture handle is closed before the task
//! returns, whatever the exit path.

use super::analysis::{MotionDetector, ObjectDetector};
use super::capture::FrameSource;
use super::registry::CameraHandle;
use super::types::{CameraStatus, Frame, StreamEvent};
use crate::config::StreamingConfig;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;

/// Collaborators shared by every camera task
pub(crate) struct TaskContext {
    pub config: StreamingConfig,
    pub motion: Option<Arc<dyn MotionDetector>>,
    pub detector: Option<Arc<dyn ObjectDetector>>,
    pub ai_global: Arc<AtomicBool>,
}

/// Camera-level and server-level stop signals
pub(crate) struct Cancellation {
    camera: watch::Receiver<bool>,
    server: watch::Receiver<bool>,
}

impl Cancellation {
    pub fn new(camera: watch::Receiver<bool>, server: watch::Receiver<bool>) -> Self {
        Self { camera, server }
    }

    /// Resolves once either side asks to stop (or went away)
    pub async fn cancelled(&mut self) {
        tokio::select! {
            _ = stop_requested(&mut self.camera) => {}
            _ = stop_requested(&mut self.server) => {}
        }
    }
}

/// Waits for `true`; the borrowed value is released before returning
async fn stop_requested(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

enum Step {
    Frame(crate::error::Result<Frame>),
    Demoted,
    Stop,
}

pub(crate) struct CameraTask {
    handle: Arc<CameraHandle>,
    source: Box<dyn FrameSource>,
    ctx: Arc<TaskContext>,
    cancel: Cancellation,
    prev_frame: Option<Frame>,
    last_motion_event: Option<Instant>,
}

impl CameraTask {
    pub fn new(
        handle: Arc<CameraHandle>,
        source: Box<dyn FrameSource>,
        ctx: Arc<TaskContext>,
        cancel: Cancellation,
    ) -> Self {
        Self {
            handle,
            source,
            ctx,
            cancel,
            prev_frame: None,
            last_motion_event: None,
        }
    }

    pub async fn run(mut self) {
        let camera_id = self.handle.id.clone();
        tracing::info!(camera_id = %camera_id, url = %self.handle.capture_url, "Camera task started");

        if self.connect().await {
            self.run_loop().await;
        }

        self.source.close().await;
        self.handle.set_capture_open(false);
        self.prev_frame = None;

        tracing::info!(
            camera_id = %camera_id,
            frames = self.handle.frame_count(),
            "Camera task stopped"
        );
    }

    /// Connecting -> Online, or Error on failure. False when the task must exit.
    async fn connect(&mut self) -> bool {
        self.handle.set_status(CameraStatus::Connecting, None).await;

        let opened = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return false,
            r = self.source.open() => r,
        };
        self.handle.set_capture_open(self.source.is_open());

        match opened {
            Ok(()) => {
                self.handle.set_status(CameraStatus::Online, None).await;
                true
            }
            Err(e) => {
                tracing::error!(camera_id = %self.handle.id, error = %e, "Camera connect failed");
                self.source.close().await;
                self.handle.set_capture_open(false);
                self.handle
                    .set_status(CameraStatus::Error, Some(e.to_string()))
                    .await;
                false
            }
        }
    }

    /// Close the handle and connect again; previous-frame state is dropped
    async fn reconnect(&mut self) -> bool {
        self.source.close().await;
        self.handle.set_capture_open(false);
        self.prev_frame = None;
        self.connect().await
    }

    async fn run_loop(&mut self) {
        loop {
            let step = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Step::Stop,
                _ = self.handle.demoted() => Step::Demoted,
                r = self.source.read_frame() => Step::Frame(r),
            };

            match step {
                Step::Stop => return,
                Step::Demoted => {
                    // stale wake-up from a demotion already handled by a reconnect
                    if self.handle.status().await != CameraStatus::Offline {
                        continue;
                    }
                    tracing::warn!(camera_id = %self.handle.id, "Camera offline, reconnecting");
                    if !self.reconnect().await {
                        return;
                    }
                }
                Step::Frame(Ok(frame)) => {
                    self.handle.set_capture_open(self.source.is_open());
                    self.process_frame(frame).await;
                }
                Step::Frame(Err(e)) => {
                    self.handle.set_capture_open(self.source.is_open());
                    tracing::warn!(
                        camera_id = %self.handle.id,
                        error = %e,
                        delay_ms = self.ctx.config.reconnect_delay.as_millis() as u64,
                        "Frame read failed, reconnecting"
                    );

                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return,
                        _ = tokio::time::sleep(self.ctx.config.reconnect_delay) => {}
                    }

                    if !self.reconnect().await {
                        return;
                    }
                }
            }
        }
    }

    async fn process_frame(&mut self, frame: Frame) {
        let frame_no = self.handle.next_frame_number();
        self.handle.store_frame(frame.clone()).await;

        if self.handle.motion_enabled() {
            self.check_motion(&frame, frame_no).await;
        }

        let ai_on = self.handle.ai_enabled() && self.ctx.ai_global.load(Ordering::SeqCst);
        if ai_on && frame_no % self.ctx.config.ai_frame_interval.max(1) == 0 {
            self.run_detection(&frame, frame_no).await;
        }

        self.prev_frame = Some(frame);
    }

    async fn check_motion(&mut self, frame: &Frame, frame_no: u64) {
        let (Some(detector), Some(prev)) = (self.ctx.motion.as_ref(), self.prev_frame.as_ref())
        else {
            return;
        };

        match detector.detect_motion(prev, frame).await {
            Ok(true) => {
                let now = Instant::now();
                let cooled = self
                    .last_motion_event
                    .map_or(true, |last| now.duration_since(last) >= self.ctx.config.motion_cooldown);
                if !cooled {
                    return;
                }

                self.last_motion_event = Some(now);
                let at = Utc::now();
                self.handle.record_motion(at).await;
                tracing::debug!(camera_id = %self.handle.id, frame = frame_no, "Motion detected");
                self.handle.emit(StreamEvent::Motion {
                    camera_id: self.handle.id.clone(),
                    frame: frame_no,
                    at,
                });
            }
            Ok(false) => {}
            Err(e) => {
                tracing::debug!(camera_id = %self.handle.id, error = %e, "Motion detector failed");
            }
        }
    }

    async fn run_detection(&mut self, frame: &Frame, frame_no: u64) {
        let Some(detector) = self.ctx.detector.as_ref() else {
            return;
        };

        match detector.detect(frame).await {
            Ok(detections) => {
                let threshold = self.ctx.config.ai_confidence_threshold;
                for detection in detections
                    .into_iter()
                    .filter(|d| d.confidence >= threshold)
                {
                    tracing::info!(
                        camera_id = %self.handle.id,
                        frame = frame_no,
                        label = %detection.label,
                        confidence = detection.confidence,
                        "Object detected"
                    );
                    self.handle.emit(StreamEvent::ObjectDetected {
                        camera_id: self.handle.id.clone(),
                        frame: frame_no,
                        detection,
                        at: Utc::now(),
                    });
                }
            }
            Err(e) => {
                tracing::warn!(camera_id = %self.handle.id, error = %e, "Object detection failed");
            }
        }
    }
}

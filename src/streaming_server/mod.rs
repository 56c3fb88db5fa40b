//! StreamingServer - Camera Stream Lifecycle Manager
//!
//! ## Responsibilities
//!
//! - Camera add/remove with one supervised task per camera
//! - Connect / reconnect state machine (see `camera_task`)
//! - Motion and object-detection triggers per frame
//! - Periodic health sweep demoting idle cameras with a closed capture
//! - Best-effort relay registration for downstream viewers
//!
//! The camera record kept by callers, the runtime entry here and the relay
//! registration can drift apart; divergence is only logged.

mod analysis;
mod camera_task;
mod capture;
mod registry;
mod types;

#[cfg(test)]
mod tests;

pub use analysis::{MotionDetector, ObjectDetector};
pub use capture::{extract_jpeg, FfmpegFrameSource, FfmpegSourceFactory, FrameSource, FrameSourceFactory};
pub use registry::{CameraHandle, CameraRegistry};
pub use types::*;

use crate::config::StreamingConfig;
use crate::error::{Error, Result};
use crate::relay_supervisor::{StreamProtocol, StreamRelay, StreamUrls};
use camera_task::{CameraTask, Cancellation, TaskContext};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;

/// Event channel capacity; slow subscribers lose the oldest events
const EVENT_CAPACITY: usize = 256;

/// Relay stream name for a camera
pub fn relay_stream_name(camera_id: &str) -> String {
    format!("camera_{}", camera_id)
}

/// Health rule: online, idle past the threshold, and capture closed
pub fn should_demote(
    status: CameraStatus,
    idle: Duration,
    capture_open: bool,
    threshold: Duration,
) -> bool {
    status == CameraStatus::Online && idle > threshold && !capture_open
}

/// StreamingServer service
pub struct StreamingServer {
    relay: Arc<dyn StreamRelay>,
    config: StreamingConfig,
    registry: Arc<CameraRegistry>,
    sources: Arc<dyn FrameSourceFactory>,
    ctx: Arc<TaskContext>,
    ai_enabled: Arc<AtomicBool>,
    events: broadcast::Sender<StreamEvent>,
    shutdown_tx: watch::Sender<bool>,
    health_task: Mutex<Option<JoinHandle<()>>>,
}

impl StreamingServer {
    pub fn new(
        relay: Arc<dyn StreamRelay>,
        config: StreamingConfig,
        sources: Arc<dyn FrameSourceFactory>,
    ) -> Self {
        Self::with_analysis(relay, config, sources, None, None)
    }

    /// Server with motion / object-detection capabilities attached
    pub fn with_analysis(
        relay: Arc<dyn StreamRelay>,
        config: StreamingConfig,
        sources: Arc<dyn FrameSourceFactory>,
        motion: Option<Arc<dyn MotionDetector>>,
        detector: Option<Arc<dyn ObjectDetector>>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (shutdown_tx, _) = watch::channel(false);
        let ai_enabled = Arc::new(AtomicBool::new(config.ai_detection_enabled));
        let ctx = Arc::new(TaskContext {
            config: config.clone(),
            motion,
            detector,
            ai_global: ai_enabled.clone(),
        });

        Self {
            relay,
            config,
            registry: Arc::new(CameraRegistry::new()),
            sources,
            ctx,
            ai_enabled,
            events,
            shutdown_tx,
            health_task: Mutex::new(None),
        }
    }

    /// Start the periodic health sweep
    pub async fn start(&self) {
        let mut slot = self.health_task.lock().await;
        if slot.is_some() {
            return;
        }

        let registry = self.registry.clone();
        let interval = self.config.health_interval;
        let threshold = self.config.health_idle_threshold;
        let mut shutdown = self.shutdown_tx.subscribe();

        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => break,
                    _ = ticker.tick() => {
                        health_sweep(&registry, threshold, Utc::now()).await;
                    }
                }
            }
            tracing::debug!("Health sweep stopped");
        }));

        tracing::info!(
            interval_sec = interval.as_secs(),
            idle_threshold_sec = threshold.as_secs(),
            "Streaming server started"
        );
    }

    /// Register a camera and start its supervised task
    pub async fn add_camera(&self, id: &str, url: &str) -> Result<CameraStatusInfo> {
        let id = id.trim();
        if id.is_empty() {
            return Err(Error::Validation("Camera id is required".to_string()));
        }
        if url.trim().is_empty() {
            return Err(Error::Validation("Camera URL is required".to_string()));
        }
        if *self.shutdown_tx.borrow() {
            return Err(Error::Internal("Streaming server is shut down".to_string()));
        }
        self.registry.reserve(id).await?;

        let (relay_stream, capture_url) = self.register_with_relay(id, url).await;

        let handle = Arc::new(CameraHandle::new(
            id,
            url,
            capture_url,
            relay_stream,
            self.events.clone(),
        ));

        if let Err(e) = self.registry.insert(handle.clone()).await {
            self.registry.release(id).await;
            self.deregister_from_relay(&handle).await;
            return Err(e);
        }

        let source = self.sources.create(id, &handle.capture_url);
        let cancel = Cancellation::new(handle.cancel_receiver(), self.shutdown_tx.subscribe());
        let task = CameraTask::new(handle.clone(), source, self.ctx.clone(), cancel);
        handle.attach_task(tokio::spawn(task.run())).await;

        tracing::info!(
            camera_id = %id,
            capture_url = %handle.capture_url,
            relay_stream = ?handle.relay_stream,
            "Camera added"
        );

        Ok(handle.info().await)
    }

    /// Stop a camera's task, release its capture and drop it from the relay
    pub async fn remove_camera(&self, id: &str) -> Result<()> {
        let handle = self
            .registry
            .remove(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("Camera {}", id)))?;

        handle.stop().await;
        self.deregister_from_relay(&handle).await;

        tracing::info!(camera_id = %id, "Camera removed");
        Ok(())
    }

    /// Cancel every camera task and the health sweep, then wait for all of them
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);

        if let Some(task) = self.health_task.lock().await.take() {
            let _ = task.await;
        }

        let cameras = self.registry.drain().await;
        let count = cameras.len();
        for handle in cameras {
            handle.stop().await;
            self.deregister_from_relay(&handle).await;
        }

        tracing::info!(cameras = count, "Streaming server shut down");
    }

    pub async fn get_camera_status(&self, id: &str) -> Result<CameraStatusInfo> {
        Ok(self.camera(id).await?.info().await)
    }

    pub async fn update_camera_settings(
        &self,
        id: &str,
        motion_enabled: bool,
        ai_enabled: bool,
    ) -> Result<CameraStatusInfo> {
        let handle = self.camera(id).await?;
        handle.update_settings(motion_enabled, ai_enabled);
        tracing::info!(
            camera_id = %id,
            motion_enabled = motion_enabled,
            ai_enabled = ai_enabled,
            "Camera settings updated"
        );
        Ok(handle.info().await)
    }

    /// Most recent frame of a camera
    pub async fn get_snapshot(&self, id: &str) -> Result<Frame> {
        self.camera(id)
            .await?
            .last_frame()
            .await
            .ok_or_else(|| Error::NotFound(format!("No frame captured yet for camera {}", id)))
    }

    pub async fn list_cameras(&self) -> Vec<CameraStatusInfo> {
        let mut out = Vec::new();
        for handle in self.registry.snapshot().await {
            out.push(handle.info().await);
        }
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Relay access URLs for a camera's relay stream
    pub async fn camera_stream_urls(&self, id: &str) -> Result<StreamUrls> {
        let handle = self.camera(id).await?;
        let name = handle
            .relay_stream
            .as_deref()
            .ok_or_else(|| Error::NotFound(format!("Camera {} is not served by the relay", id)))?;

        Ok(StreamUrls {
            name: name.to_string(),
            rtsp: self.relay.get_stream_url(name, StreamProtocol::Rtsp),
            webrtc: self.relay.get_stream_url(name, StreamProtocol::Webrtc),
            mse: self.relay.get_stream_url(name, StreamProtocol::Mse),
            hls: self.relay.get_stream_url(name, StreamProtocol::Hls),
            mjpeg: self.relay.get_stream_url(name, StreamProtocol::Mjpeg),
        })
    }

    /// Global object-detection toggle
    pub fn set_ai_detection(&self, enabled: bool) {
        self.ai_enabled.store(enabled, Ordering::SeqCst);
        tracing::info!(enabled = enabled, "AI detection toggled");
    }

    pub fn ai_detection_enabled(&self) -> bool {
        self.ai_enabled.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.events.subscribe()
    }

    /// Run one health sweep as of `now`; returns the demoted camera ids
    pub async fn run_health_sweep(&self, now: DateTime<Utc>) -> Vec<String> {
        health_sweep(&self.registry, self.config.health_idle_threshold, now).await
    }

    async fn camera(&self, id: &str) -> Result<Arc<CameraHandle>> {
        self.registry
            .get(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("Camera {}", id)))
    }

    /// Register `camera_{id}` with the relay; capture reads the relay restream when accepted
    async fn register_with_relay(&self, id: &str, url: &str) -> (Option<String>, String) {
        if !self.relay.is_running() {
            tracing::debug!(camera_id = %id, "Relay not running, capturing from source");
            return (None, url.to_string());
        }

        let name = relay_stream_name(id);
        match self.relay.add_stream(&name, url).await {
            Ok(()) => {
                let capture_url = self.relay.get_stream_url(&name, StreamProtocol::Rtsp);
                (Some(name), capture_url)
            }
            Err(e) => {
                tracing::warn!(
                    camera_id = %id,
                    stream = %name,
                    error = %e,
                    "Relay registration failed, relay and camera registry diverge"
                );
                (None, url.to_string())
            }
        }
    }

    async fn deregister_from_relay(&self, handle: &CameraHandle) {
        let Some(name) = handle.relay_stream.as_deref() else {
            return;
        };
        if let Err(e) = self.relay.remove_stream(name).await {
            tracing::warn!(
                camera_id = %handle.id,
                stream = %name,
                error = %e,
                "Relay deregistration failed, stream left behind"
            );
        }
    }
}

/// Demote online cameras that are idle with a closed capture
///
/// Evaluates a snapshot taken under the read lock, outside the critical section.
async fn health_sweep(
    registry: &CameraRegistry,
    threshold: Duration,
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut demoted = Vec::new();

    for handle in registry.snapshot().await {
        let status = handle.status().await;
        let idle = now
            .signed_duration_since(handle.idle_since().await)
            .to_std()
            .unwrap_or(Duration::ZERO);
        let capture_open = handle.capture_open();

        if !should_demote(status, idle, capture_open, threshold) {
            continue;
        }
        if !handle.demote_if_online().await {
            continue;
        }

        tracing::warn!(
            camera_id = %handle.id,
            idle_sec = idle.as_secs(),
            "Camera lost: idle with capture closed"
        );
        handle.emit(StreamEvent::CameraLost {
            camera_id: handle.id.clone(),
            reason: format!("No motion for {}s and capture closed", idle.as_secs()),
            at: now,
        });
        demoted.push(handle.id.clone());
    }

    demoted
}

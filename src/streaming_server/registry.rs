//! Camera registry and per-camera runtime handle

use super::types::{CameraStatus, CameraStatusInfo, Frame, StreamEvent};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex, Notify, RwLock};
use tokio::task::JoinHandle;

/// Mutable runtime fields guarded together
#[derive(Debug, Clone)]
struct CameraRuntime {
    status: CameraStatus,
    last_motion_at: Option<DateTime<Utc>>,
    online_since: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Runtime handle of one camera
///
/// The supervised task is the only writer of frame data; the server reads
/// status and flips settings.
pub struct CameraHandle {
    pub id: String,
    pub name: String,
    pub source_url: String,
    pub capture_url: String,
    pub relay_stream: Option<String>,
    pub created_at: DateTime<Utc>,
    runtime: RwLock<CameraRuntime>,
    motion_enabled: AtomicBool,
    ai_enabled: AtomicBool,
    frame_count: AtomicU64,
    capture_open: AtomicBool,
    last_frame: RwLock<Option<Frame>>,
    /// Raised by the health sweep when it demotes the camera
    demoted: Notify,
    cancel: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<StreamEvent>,
}

impl CameraHandle {
    pub fn new(
        id: impl Into<String>,
        source_url: impl Into<String>,
        capture_url: impl Into<String>,
        relay_stream: Option<String>,
        events: broadcast::Sender<StreamEvent>,
    ) -> Self {
        let id = id.into();
        let (cancel, _) = watch::channel(false);
        Self {
            name: id.clone(),
            id,
            source_url: source_url.into(),
            capture_url: capture_url.into(),
            relay_stream,
            created_at: Utc::now(),
            runtime: RwLock::new(CameraRuntime {
                status: CameraStatus::Connecting,
                last_motion_at: None,
                online_since: None,
                last_error: None,
            }),
            motion_enabled: AtomicBool::new(true),
            ai_enabled: AtomicBool::new(true),
            frame_count: AtomicU64::new(0),
            capture_open: AtomicBool::new(false),
            last_frame: RwLock::new(None),
            demoted: Notify::new(),
            cancel,
            task: Mutex::new(None),
            events,
        }
    }

    pub async fn status(&self) -> CameraStatus {
        self.runtime.read().await.status
    }

    /// Move to `status`, emitting `StatusChanged` when it differs
    pub async fn set_status(&self, status: CameraStatus, error: Option<String>) {
        let previous = {
            let mut rt = self.runtime.write().await;
            let previous = rt.status;
            rt.status = status;
            if status == CameraStatus::Online && previous != CameraStatus::Online {
                rt.online_since = Some(Utc::now());
            }
            if error.is_some() || status == CameraStatus::Online {
                rt.last_error = error;
            }
            previous
        };

        if previous != status {
            tracing::info!(
                camera_id = %self.id,
                from = %previous,
                to = %status,
                "Camera status changed"
            );
            let _ = self.events.send(StreamEvent::StatusChanged {
                camera_id: self.id.clone(),
                from: previous,
                to: status,
                at: Utc::now(),
            });
        }
    }

    /// Online -> Offline, only if the camera is still online
    pub async fn demote_if_online(&self) -> bool {
        {
            let mut rt = self.runtime.write().await;
            if rt.status != CameraStatus::Online {
                return false;
            }
            rt.status = CameraStatus::Offline;
        }

        let _ = self.events.send(StreamEvent::StatusChanged {
            camera_id: self.id.clone(),
            from: CameraStatus::Online,
            to: CameraStatus::Offline,
            at: Utc::now(),
        });
        self.demoted.notify_one();
        true
    }

    pub(crate) async fn demoted(&self) {
        self.demoted.notified().await
    }

    /// Reference point for idle time: last motion, else when it came online, else creation
    pub async fn idle_since(&self) -> DateTime<Utc> {
        let rt = self.runtime.read().await;
        rt.last_motion_at
            .or(rt.online_since)
            .unwrap_or(self.created_at)
    }

    pub async fn record_motion(&self, at: DateTime<Utc>) {
        self.runtime.write().await.last_motion_at = Some(at);
    }

    pub fn motion_enabled(&self) -> bool {
        self.motion_enabled.load(Ordering::SeqCst)
    }

    pub fn ai_enabled(&self) -> bool {
        self.ai_enabled.load(Ordering::SeqCst)
    }

    pub fn update_settings(&self, motion_enabled: bool, ai_enabled: bool) {
        self.motion_enabled.store(motion_enabled, Ordering::SeqCst);
        self.ai_enabled.store(ai_enabled, Ordering::SeqCst);
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::SeqCst)
    }

    /// Count one frame; returns the new counter value
    pub(crate) fn next_frame_number(&self) -> u64 {
        self.frame_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn capture_open(&self) -> bool {
        self.capture_open.load(Ordering::SeqCst)
    }

    pub(crate) fn set_capture_open(&self, open: bool) {
        self.capture_open.store(open, Ordering::SeqCst);
    }

    pub async fn last_frame(&self) -> Option<Frame> {
        self.last_frame.read().await.clone()
    }

    pub(crate) async fn store_frame(&self, frame: Frame) {
        *self.last_frame.write().await = Some(frame);
    }

    pub(crate) async fn clear_frames(&self) {
        *self.last_frame.write().await = None;
    }

    pub(crate) fn emit(&self, event: StreamEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn cancel_receiver(&self) -> watch::Receiver<bool> {
        self.cancel.subscribe()
    }

    pub(crate) async fn attach_task(&self, task: JoinHandle<()>) {
        *self.task.lock().await = Some(task);
    }

    /// Cancel the supervised task and wait for it to finish
    pub(crate) async fn stop(&self) {
        let _ = self.cancel.send(true);
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(camera_id = %self.id, error = %e, "Camera task failed");
            }
        }
        self.clear_frames().await;
    }

    pub async fn info(&self) -> CameraStatusInfo {
        let rt = self.runtime.read().await.clone();
        CameraStatusInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            source_url: self.source_url.clone(),
            capture_url: self.capture_url.clone(),
            relay_stream: self.relay_stream.clone(),
            status: rt.status,
            motion_enabled: self.motion_enabled(),
            ai_enabled: self.ai_enabled(),
            last_motion_at: rt.last_motion_at,
            online_since: rt.online_since,
            frame_count: self.frame_count(),
            capture_open: self.capture_open(),
            last_error: rt.last_error,
            created_at: self.created_at,
        }
    }
}

/// id -> camera map behind a read-write lock
///
/// Ids being added are reserved first so that concurrent adds of the same id
/// fail before either touches the relay. Lock order: `reserved`, then `cameras`.
#[derive(Default)]
pub struct CameraRegistry {
    cameras: RwLock<HashMap<String, Arc<CameraHandle>>>,
    reserved: Mutex<HashSet<String>>,
}

impl CameraRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `id` for an add in progress
    pub async fn reserve(&self, id: &str) -> Result<()> {
        let mut reserved = self.reserved.lock().await;
        if reserved.contains(id) || self.cameras.read().await.contains_key(id) {
            return Err(Error::Validation(format!("Camera {} already exists", id)));
        }
        reserved.insert(id.to_string());
        Ok(())
    }

    /// Drop a reservation without inserting
    pub async fn release(&self, id: &str) {
        self.reserved.lock().await.remove(id);
    }

    /// Insert a camera; a reservation for its id is consumed
    pub async fn insert(&self, handle: Arc<CameraHandle>) -> Result<()> {
        let mut reserved = self.reserved.lock().await;
        let mut cameras = self.cameras.write().await;
        if cameras.contains_key(&handle.id) {
            return Err(Error::Validation(format!(
                "Camera {} already exists",
                handle.id
            )));
        }
        reserved.remove(&handle.id);
        cameras.insert(handle.id.clone(), handle);
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Option<Arc<CameraHandle>> {
        self.cameras.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &str) -> Option<Arc<CameraHandle>> {
        self.cameras.write().await.remove(id)
    }

    /// Copy of all handles; the lock is released on return
    pub async fn snapshot(&self) -> Vec<Arc<CameraHandle>> {
        self.cameras.read().await.values().cloned().collect()
    }

    pub async fn drain(&self) -> Vec<Arc<CameraHandle>> {
        self.cameras.write().await.drain().map(|(_, h)| h).collect()
    }

    pub async fn len(&self) -> usize {
        self.cameras.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cameras.read().await.is_empty()
    }
}

//! StreamingServer types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Camera runtime state
///
/// `Connecting -> Online -> {Offline, Error}`; `Offline` and post-online read
/// failures go back through `Connecting`. `Error` ends the camera's task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraStatus {
    Connecting,
    Online,
    Offline,
    Error,
}

impl CameraStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraStatus::Connecting => "connecting",
            CameraStatus::Online => "online",
            CameraStatus::Offline => "offline",
            CameraStatus::Error => "error",
        }
    }
}

impl fmt::Display for CameraStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of one camera
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraStatusInfo {
    pub id: String,
    pub name: String,
    pub source_url: String,
    /// URL the capture actually reads (relay restream or the source itself)
    pub capture_url: String,
    /// Relay stream name, when the relay accepted the registration
    pub relay_stream: Option<String>,
    pub status: CameraStatus,
    pub motion_enabled: bool,
    pub ai_enabled: bool,
    pub last_motion_at: Option<DateTime<Utc>>,
    pub online_since: Option<DateTime<Utc>>,
    pub frame_count: u64,
    pub capture_open: bool,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One decoded-to-JPEG frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            captured_at: Utc::now(),
        }
    }
}

/// Normalized bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// Object reported by the detector capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Events raised by camera tasks and the health sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum StreamEvent {
    Motion {
        camera_id: String,
        frame: u64,
        at: DateTime<Utc>,
    },
    ObjectDetected {
        camera_id: String,
        frame: u64,
        detection: Detection,
        at: DateTime<Utc>,
    },
    CameraLost {
        camera_id: String,
        reason: String,
        at: DateTime<Utc>,
    },
    StatusChanged {
        camera_id: String,
        from: CameraStatus,
        to: CameraStatus,
        at: DateTime<Utc>,
    },
}

impl StreamEvent {
    pub fn camera_id(&self) -> &str {
        match self {
            StreamEvent::Motion { camera_id, .. }
            | StreamEvent::ObjectDetected { camera_id, .. }
            | StreamEvent::CameraLost { camera_id, .. }
            | StreamEvent::StatusChanged { camera_id, .. } => camera_id,
        }
    }
}

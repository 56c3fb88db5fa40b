//! DetectorClient - HTTP Object Detector Adapter
//!
//! ## Responsibilities
//!
//! - Send JPEG frames to an inference endpoint (multipart)
//! - Map returned bounding boxes to `Detection`s
//! - Endpoint health check

use crate::error::{Error, Result};
use crate::streaming_server::{BoundingBox, Detection, Frame, ObjectDetector};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounding box as returned by the inference endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub label: String,
    pub conf: f32,
}

impl From<BBox> for Detection {
    fn from(b: BBox) -> Self {
        Detection {
            label: b.label,
            confidence: b.conf,
            bbox: BoundingBox {
                x1: b.x1,
                y1: b.y1,
                x2: b.x2,
                y2: b.y2,
            },
        }
    }
}

/// Inference response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectResponse {
    #[serde(default)]
    pub detected: bool,
    #[serde(default)]
    pub bboxes: Vec<BBox>,
}

/// HTTP object detector
pub struct HttpObjectDetector {
    client: reqwest::Client,
    base_url: String,
}

impl HttpObjectDetector {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Check endpoint health
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/healthz", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Run inference on one JPEG frame
    pub async fn analyze(&self, frame: &Frame) -> Result<DetectResponse> {
        let url = format!("{}/v1/analyze", self.base_url);

        let form = Form::new()
            .part(
                "infer_image",
                Part::bytes(frame.data.clone())
                    .file_name("frame.jpg")
                    .mime_str("image/jpeg")?,
            )
            .text("captured_at", frame.captured_at.to_rfc3339());

        let resp = self.client.post(&url).multipart(form).send().await?;

        if !resp.status().is_success() {
            return Err(Error::Internal(format!(
                "Object detector failed: {}",
                resp.status()
            )));
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl ObjectDetector for HttpObjectDetector {
    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>> {
        let response = self.analyze(frame).await?;
        Ok(response.bboxes.into_iter().map(Detection::from).collect())
    }
}

//! Frame analysis capabilities
//!
//! Pixel-level algorithms live outside this crate; camera tasks only see
//! these two seams.

use super::types::{Detection, Frame};
use crate::error::Result;
use async_trait::async_trait;

/// `DetectMotion(prev, curr) -> bool`
#[async_trait]
pub trait MotionDetector: Send + Sync {
    async fn detect_motion(&self, prev: &Frame, curr: &Frame) -> Result<bool>;
}

/// `Detect(frame) -> [Detection]`
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>>;
}

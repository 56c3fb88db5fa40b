//! Relay control-plane types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access protocol for a relay stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamProtocol {
    Rtsp,
    Webrtc,
    Mse,
    Hls,
    Mjpeg,
}

impl StreamProtocol {
    pub const ALL: [StreamProtocol; 5] = [
        StreamProtocol::Rtsp,
        StreamProtocol::Webrtc,
        StreamProtocol::Mse,
        StreamProtocol::Hls,
        StreamProtocol::Mjpeg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamProtocol::Rtsp => "rtsp",
            StreamProtocol::Webrtc => "webrtc",
            StreamProtocol::Mse => "mse",
            StreamProtocol::Hls => "hls",
            StreamProtocol::Mjpeg => "mjpeg",
        }
    }
}

impl fmt::Display for StreamProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamProtocol {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rtsp" => Ok(StreamProtocol::Rtsp),
            "webrtc" => Ok(StreamProtocol::Webrtc),
            "mse" | "mp4" => Ok(StreamProtocol::Mse),
            "hls" | "m3u8" => Ok(StreamProtocol::Hls),
            "mjpeg" => Ok(StreamProtocol::Mjpeg),
            other => Err(crate::Error::Validation(format!(
                "Unknown stream protocol: {}",
                other
            ))),
        }
    }
}

/// Producer attached to a relay stream
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProducerInfo {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub remote_addr: Option<String>,
    #[serde(default)]
    pub medias: Option<Vec<String>>,
    #[serde(default)]
    pub recv: Option<u64>,
    #[serde(default)]
    pub send: Option<u64>,
}

/// Relay-side managed stream descriptor
///
/// The relay reports `null` for empty lists, so every list is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamInfo {
    #[serde(default)]
    pub sources: Option<Vec<String>>,
    #[serde(default)]
    pub codecs: Option<Vec<String>>,
    #[serde(default)]
    pub channels: Option<serde_json::Value>,
    #[serde(default)]
    pub producers: Option<Vec<ProducerInfo>>,
    #[serde(default)]
    pub consumers: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub recv: Option<u64>,
    #[serde(default)]
    pub send: Option<u64>,
}

impl StreamInfo {
    pub fn producers(&self) -> &[ProducerInfo] {
        self.producers.as_deref().unwrap_or(&[])
    }

    pub fn consumers(&self) -> &[serde_json::Value] {
        self.consumers.as_deref().unwrap_or(&[])
    }

    pub fn has_producers(&self) -> bool {
        !self.producers().is_empty()
    }

    /// True when any producer is receiving data
    pub fn is_receiving(&self) -> bool {
        self.recv.unwrap_or(0) > 0 || self.producers().iter().any(|p| p.recv.unwrap_or(0) > 0)
    }
}

/// One source enumerated by the relay's ONVIF probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnvifSource {
    #[serde(default)]
    pub name: String,
    pub url: String,
}

/// ONVIF probe response (`GET /api/onvif?src=...`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OnvifProbeResponse {
    #[serde(default)]
    pub sources: Option<Vec<OnvifSource>>,
}

/// Access URLs for one stream, per protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamUrls {
    pub name: String,
    pub rtsp: String,
    pub webrtc: String,
    pub mse: String,
    pub hls: String,
    pub mjpeg: String,
}

//! StreamScanner types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Protocol family of a candidate URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateProtocol {
    Rtsp,
    Onvif,
    Http,
    Rtmp,
    /// Password-only TP-Link scheme
    Tapo,
    /// Xiongmai binary protocol
    Dvrip,
    /// Bubble DVR protocol
    Bubble,
    /// ffmpeg-wrapped source
    Ffmpeg,
}

impl CandidateProtocol {
    /// Best-effort protocol from a URL scheme
    pub fn from_url(url: &str) -> Self {
        let scheme = url.split(':').next().unwrap_or_default().to_ascii_lowercase();
        match scheme.as_str() {
            "onvif" => CandidateProtocol::Onvif,
            "http" | "https" => CandidateProtocol::Http,
            "rtmp" | "rtmps" => CandidateProtocol::Rtmp,
            "tapo" => CandidateProtocol::Tapo,
            "dvrip" => CandidateProtocol::Dvrip,
            "bubble" => CandidateProtocol::Bubble,
            "ffmpeg" => CandidateProtocol::Ffmpeg,
            _ => CandidateProtocol::Rtsp,
        }
    }
}

/// One stream URL hypothesis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub url: String,
    pub protocol: CandidateProtocol,
    pub description: String,
    /// Ordering hint, not a probability
    pub priority: i32,
    pub working: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "probe_duration_ms", with = "duration_ms", default)]
    pub probe_duration: Duration,
}

impl Candidate {
    pub fn new(
        url: impl Into<String>,
        protocol: CandidateProtocol,
        description: impl Into<String>,
        priority: i32,
    ) -> Self {
        Self {
            url: url.into(),
            protocol,
            description: description.into(),
            priority,
            working: false,
            error: None,
            probe_duration: Duration::ZERO,
        }
    }
}

/// Outcome of a full scan: working candidates only, in completion order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub ip: String,
    pub streams: Vec<Candidate>,
    pub best_match: Option<Candidate>,
    /// Candidates actually probed before the scan stopped
    pub probed: usize,
    pub total_candidates: usize,
    #[serde(rename = "elapsed_ms", with = "duration_ms")]
    pub elapsed: Duration,
}

impl ScanResult {
    pub fn new(
        ip: impl Into<String>,
        streams: Vec<Candidate>,
        probed: usize,
        total_candidates: usize,
        elapsed: Duration,
    ) -> Self {
        let best_match = best_match(&streams);
        Self {
            ip: ip.into(),
            streams,
            best_match,
            probed,
            total_candidates,
            elapsed,
        }
    }
}

/// Highest-priority working candidate; the earliest one wins ties
pub fn best_match(streams: &[Candidate]) -> Option<Candidate> {
    streams
        .iter()
        .filter(|c| c.working)
        .fold(None::<&Candidate>, |best, c| match best {
            Some(b) if b.priority >= c.priority => Some(b),
            _ => Some(c),
        })
        .cloned()
}

/// Per-probe progress notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    pub ip: String,
    pub processed: usize,
    pub total: usize,
    pub working_found: usize,
    pub candidate: Candidate,
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

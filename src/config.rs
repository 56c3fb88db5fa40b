//! Engine configuration
//!
//! All settings come from the environment (optionally seeded from `.env`),
//! with defaults that match a relay running next to the engine.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub relay: RelayConfig,
    pub scan: ScanConfig,
    pub streaming: StreamingConfig,
    /// Optional HTTP object detector endpoint
    pub ai_detector_url: Option<String>,
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            relay: RelayConfig::from_env(),
            scan: ScanConfig::from_env(),
            streaming: StreamingConfig::from_env(),
            ai_detector_url: std::env::var("AI_DETECTOR_URL").ok().filter(|v| !v.is_empty()),
        }
    }
}

/// Relay process supervisor settings
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Bundled executable path (checked before PATH lookup)
    pub binary_path: PathBuf,
    /// Working directory for downloaded binaries and the bootstrap config
    pub data_dir: PathBuf,
    /// Bootstrap YAML path
    pub config_path: PathBuf,
    /// Host used when building access URLs and control-plane requests
    pub host: String,
    pub api_port: u16,
    pub rtsp_port: u16,
    pub webrtc_port: u16,
    pub log_level: String,
    /// Release download base (asset name is appended)
    pub release_url: String,
    /// Liveness polls during start (1s apart)
    pub startup_attempts: u32,
    /// Default control-plane timeout
    pub request_timeout: Duration,
    /// Timeout for explicit stream tests
    pub test_timeout: Duration,
    /// Wait between registration and producer inspection in `test_stream`
    pub test_settle: Duration,
    /// Grace period between SIGTERM and forced kill
    pub stop_timeout: Duration,
    /// Attach to a relay managed elsewhere instead of spawning one
    pub external: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("./data/relay");
        Self {
            binary_path: PathBuf::from("./bin/go2rtc"),
            config_path: data_dir.join("go2rtc.yaml"),
            data_dir,
            host: "127.0.0.1".to_string(),
            api_port: 1984,
            rtsp_port: 8554,
            webrtc_port: 8555,
            log_level: "info".to_string(),
            release_url: "https://github.com/AlexxIT/go2rtc/releases/latest/download".to_string(),
            startup_attempts: 15,
            request_timeout: Duration::from_secs(5),
            test_timeout: Duration::from_secs(15),
            test_settle: Duration::from_secs(2),
            stop_timeout: Duration::from_secs(5),
            external: false,
        }
    }
}

impl RelayConfig {
    /// Load relay settings from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let data_dir = std::env::var("RELAY_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let config_path = std::env::var("RELAY_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("go2rtc.yaml"));

        Self {
            binary_path: std::env::var("RELAY_BINARY")
                .map(PathBuf::from)
                .unwrap_or(defaults.binary_path),
            data_dir,
            config_path,
            host: std::env::var("RELAY_HOST").unwrap_or(defaults.host),
            api_port: env_parse("RELAY_API_PORT", defaults.api_port),
            rtsp_port: env_parse("RELAY_RTSP_PORT", defaults.rtsp_port),
            webrtc_port: env_parse("RELAY_WEBRTC_PORT", defaults.webrtc_port),
            log_level: std::env::var("RELAY_LOG_LEVEL").unwrap_or(defaults.log_level),
            release_url: std::env::var("RELAY_RELEASE_URL").unwrap_or(defaults.release_url),
            startup_attempts: env_parse("RELAY_STARTUP_ATTEMPTS", defaults.startup_attempts),
            request_timeout: Duration::from_secs(env_parse("RELAY_REQUEST_TIMEOUT_SECS", 5)),
            test_timeout: Duration::from_secs(env_parse("RELAY_TEST_TIMEOUT_SECS", 15)),
            test_settle: defaults.test_settle,
            stop_timeout: defaults.stop_timeout,
            external: env_parse("RELAY_EXTERNAL", defaults.external),
        }
    }

    /// Control-plane base URL (`http://host:apiPort`)
    pub fn api_base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.api_port)
    }
}

/// Protocol prober settings
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Concurrent probe workers
    pub workers: usize,
    /// Minimum spacing between probe admissions (global)
    pub rate_interval: Duration,
    /// Stop once this many working candidates were found
    pub max_working: usize,
    /// Stop once this many candidates were processed
    pub max_probes: usize,
    /// Stop once this many candidates were processed without any success
    pub zero_success_cutoff: usize,
    /// Special-cased known-good URL templates per camera IP
    pub known_sources: HashMap<Ipv4Addr, String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            rate_interval: Duration::from_millis(20),
            max_working: 10,
            max_probes: 20,
            zero_success_cutoff: 50,
            known_sources: default_known_sources(),
        }
    }
}

impl ScanConfig {
    /// Load prober settings from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut known_sources = defaults.known_sources;
        if let Ok(raw) = std::env::var("SCAN_KNOWN_SOURCES") {
            known_sources.extend(parse_known_sources(&raw));
        }

        Self {
            workers: env_parse("SCAN_WORKERS", defaults.workers).max(1),
            rate_interval: Duration::from_millis(env_parse("SCAN_RATE_INTERVAL_MS", 20)),
            max_working: env_parse("SCAN_MAX_WORKING", defaults.max_working),
            max_probes: env_parse("SCAN_MAX_PROBES", defaults.max_probes),
            zero_success_cutoff: env_parse("SCAN_ZERO_SUCCESS_CUTOFF", defaults.zero_success_cutoff),
            known_sources,
        }
    }
}

/// Camera lifecycle manager settings
#[derive(Debug, Clone)]
pub struct StreamingConfig {
    /// Minimum spacing between motion events of one camera
    pub motion_cooldown: Duration,
    /// Run the object detector once every N frames
    pub ai_frame_interval: u64,
    /// Detections below this confidence are ignored
    pub ai_confidence_threshold: f32,
    /// Global AI toggle at startup
    pub ai_detection_enabled: bool,
    /// Health sweep period
    pub health_interval: Duration,
    /// Motion idle time after which a closed capture is demoted
    pub health_idle_threshold: Duration,
    /// Pause before the single reconnect attempt
    pub reconnect_delay: Duration,
    /// Per-frame read timeout
    pub frame_read_timeout: Duration,
    /// Optional capture frame rate passed to ffmpeg
    pub capture_fps: Option<u32>,
    /// Cameras attached at boot (id, url)
    pub boot_cameras: Vec<(String, String)>,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            motion_cooldown: Duration::from_secs(5),
            ai_frame_interval: 25,
            ai_confidence_threshold: 0.5,
            ai_detection_enabled: true,
            health_interval: Duration::from_secs(30),
            health_idle_threshold: Duration::from_secs(300),
            reconnect_delay: Duration::from_secs(1),
            frame_read_timeout: Duration::from_secs(10),
            capture_fps: None,
            boot_cameras: Vec::new(),
        }
    }
}

impl StreamingConfig {
    /// Load lifecycle settings from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            motion_cooldown: Duration::from_secs(env_parse("MOTION_COOLDOWN_SECS", 5)),
            ai_frame_interval: env_parse("AI_FRAME_INTERVAL", defaults.ai_frame_interval).max(1),
            ai_confidence_threshold: env_parse(
                "AI_CONFIDENCE_THRESHOLD",
                defaults.ai_confidence_threshold,
            ),
            ai_detection_enabled: env_parse("AI_DETECTION_ENABLED", defaults.ai_detection_enabled),
            health_interval: Duration::from_secs(env_parse("HEALTH_INTERVAL_SECS", 30)),
            health_idle_threshold: Duration::from_secs(env_parse("HEALTH_IDLE_SECS", 300)),
            reconnect_delay: Duration::from_millis(env_parse("RECONNECT_DELAY_MS", 1000)),
            frame_read_timeout: Duration::from_secs(env_parse("FRAME_READ_TIMEOUT_SECS", 10)),
            capture_fps: std::env::var("CAPTURE_FPS").ok().and_then(|v| v.parse().ok()),
            boot_cameras: std::env::var("CAMERAS")
                .map(|v| parse_pairs(&v))
                .unwrap_or_default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parse `key=value;key=value` lists
fn parse_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|entry| {
            let (key, value) = entry.split_once('=')?;
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || value.is_empty() {
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

/// Cameras whose working stream is known up front
const KNOWN_SOURCES: &[(Ipv4Addr, &str)] = &[(
    Ipv4Addr::new(10, 0, 20, 111),
    "rtsp://{user}:{pass}@{ip}:554/live/main",
)];

/// Built-in known-source table; `SCAN_KNOWN_SOURCES` entries are merged on top
pub fn default_known_sources() -> HashMap<Ipv4Addr, String> {
    KNOWN_SOURCES
        .iter()
        .map(|(ip, template)| (*ip, template.to_string()))
        .collect()
}

/// Parse `ip=template;...` known-source entries, skipping invalid IPs
pub fn parse_known_sources(raw: &str) -> HashMap<Ipv4Addr, String> {
    parse_pairs(raw)
        .into_iter()
        .filter_map(|(ip, template)| match ip.parse::<Ipv4Addr>() {
            Ok(ip) => Some((ip, template)),
            Err(_) => {
                tracing::warn!(entry = %ip, "Ignoring known source with invalid IP");
                None
            }
        })
        .collect()
}

//! Relay bootstrap configuration (YAML)

use crate::config::RelayConfig;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;

/// Fragment that marks a bootstrap file as corrupted
pub const CORRUPTION_MARKER: &str = "streams: {}";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenSection {
    pub listen: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSection {
    pub level: String,
}

/// Bootstrap file layout: `api`, `rtsp`, `webrtc`, `streams`, `log`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayBootstrap {
    pub api: ListenSection,
    pub rtsp: ListenSection,
    pub webrtc: ListenSection,
    /// Always written empty; streams are registered through the control plane
    pub streams: Option<BTreeMap<String, Vec<String>>>,
    pub log: LogSection,
}

impl RelayBootstrap {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            api: ListenSection {
                listen: format!(":{}", config.api_port),
            },
            rtsp: ListenSection {
                listen: format!(":{}", config.rtsp_port),
            },
            webrtc: ListenSection {
                listen: format!(":{}", config.webrtc_port),
            },
            streams: None,
            log: LogSection {
                level: config.log_level.clone(),
            },
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// What `ensure_bootstrap` did with the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Reused,
    Created,
    Regenerated,
}

/// Make sure a usable bootstrap file exists at `path`
///
/// An existing file is reused unless it contains `CORRUPTION_MARKER`.
pub async fn ensure_bootstrap(path: &Path, config: &RelayConfig) -> Result<BootstrapOutcome> {
    let outcome = match fs::read_to_string(path).await {
        Ok(existing) if !existing.contains(CORRUPTION_MARKER) => {
            tracing::debug!(path = %path.display(), "Reusing relay bootstrap config");
            return Ok(BootstrapOutcome::Reused);
        }
        Ok(_) => {
            tracing::warn!(path = %path.display(), "Relay bootstrap config corrupted, regenerating");
            BootstrapOutcome::Regenerated
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => BootstrapOutcome::Created,
        Err(e) => return Err(e.into()),
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let yaml = RelayBootstrap::from_config(config).to_yaml()?;
    fs::write(path, yaml).await?;

    tracing::info!(path = %path.display(), outcome = ?outcome, "Relay bootstrap config written");

    Ok(outcome)
}

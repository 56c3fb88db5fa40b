//! RelaySupervisor - External Media Relay Process
//!
//! ## Responsibilities
//!
//! - Relay subprocess lifecycle (start / stop / restart)
//! - Executable resolution and bootstrap config
//! - Control-plane calls (register / deregister / list streams)
//! - Access URL construction per protocol
//!
//! Lifecycle transitions are serialized behind one lock. Control-plane calls
//! only check the running flag and go straight to the relay, which
//! serializes concurrent registrations itself.

mod api_client;
mod binary;
mod bootstrap;
mod types;

pub use api_client::RelayApiClient;
pub use binary::{find_in_path, release_asset, resolve_binary, BinarySource, RELAY_BINARY_NAME};
pub use bootstrap::{ensure_bootstrap, BootstrapOutcome, RelayBootstrap, CORRUPTION_MARKER};
pub use types::{
    OnvifProbeResponse, OnvifSource, ProducerInfo, StreamInfo, StreamProtocol, StreamUrls,
};

use crate::config::RelayConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// Default settle time between registration and producer inspection
pub const DEFAULT_TEST_SETTLE: Duration = Duration::from_secs(2);

/// Unique name for a short-lived stream (`{prefix}_{millis}_{random}`)
pub fn transient_stream_name(prefix: &str) -> String {
    format!(
        "{}_{}_{:08x}",
        prefix,
        Utc::now().timestamp_millis(),
        rand::random::<u32>()
    )
}

/// Narrow capability interface over the media relay
///
/// Anything that can register/deregister streams and hand out access URLs
/// can stand in for the subprocess-backed `RelaySupervisor`.
#[async_trait]
pub trait StreamRelay: Send + Sync {
    async fn start(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    async fn restart(&self) -> Result<()>;

    fn is_running(&self) -> bool;

    async fn add_stream(&self, name: &str, source: &str) -> Result<()>;

    async fn remove_stream(&self, name: &str) -> Result<()>;

    async fn get_streams(&self) -> Result<HashMap<String, StreamInfo>>;

    async fn get_stream_info(&self, name: &str) -> Result<StreamInfo>;

    fn get_stream_url(&self, name: &str, protocol: StreamProtocol) -> String;

    /// Enumerate an ONVIF device's sources through the relay
    async fn probe_onvif(&self, source: &str) -> Result<Vec<OnvifSource>>;

    /// Register a temporary stream, inspect its producers, always remove it
    ///
    /// Succeeds only when at least one producer showed up.
    async fn test_stream(&self, source: &str) -> Result<()> {
        let name = transient_stream_name("test");
        self.add_stream(&name, source).await?;
        tokio::time::sleep(DEFAULT_TEST_SETTLE).await;
        let info = self.get_stream_info(&name).await;
        if let Err(e) = self.remove_stream(&name).await {
            tracing::warn!(stream = %name, error = %e, "Failed to remove test stream");
        }
        check_producers(source, info)
    }
}

fn check_producers(source: &str, info: Result<StreamInfo>) -> Result<()> {
    let info = info?;
    if info.has_producers() {
        Ok(())
    } else {
        Err(Error::Relay(format!("No producers for source {}", source)))
    }
}

/// Running relay subprocess and its cancellation scope
struct RelayProcess {
    child: Child,
    binary: BinarySource,
    shutdown_tx: watch::Sender<bool>,
    log_tasks: Vec<JoinHandle<()>>,
}

/// Subprocess-backed relay supervisor
pub struct RelaySupervisor {
    config: RelayConfig,
    api: RelayApiClient,
    lifecycle: Mutex<Option<RelayProcess>>,
    running: Arc<AtomicBool>,
}

impl RelaySupervisor {
    /// Create a supervisor; nothing is launched until `start`
    pub fn new(config: RelayConfig) -> Result<Self> {
        let api = RelayApiClient::new(&config)?;
        Ok(Self {
            config,
            api,
            lifecycle: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Raw control-plane client
    pub fn api(&self) -> &RelayApiClient {
        &self.api
    }

    /// Access URLs for every protocol
    pub fn stream_urls(&self, name: &str) -> StreamUrls {
        self.api.stream_urls(name)
    }

    /// Liveness of the relay API
    pub async fn health_check(&self) -> Result<bool> {
        self.ensure_running()?;
        self.api.health_check().await
    }

    /// Relay version string
    pub async fn version(&self) -> Result<String> {
        self.ensure_running()?;
        self.api.version().await
    }

    /// Executable currently in use
    pub async fn binary(&self) -> Option<BinarySource> {
        self.lifecycle.lock().await.as_ref().map(|p| p.binary.clone())
    }

    /// OS process id of the spawned relay
    pub async fn pid(&self) -> Option<u32> {
        self.lifecycle.lock().await.as_ref().and_then(|p| p.child.id())
    }

    fn ensure_running(&self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::RelayNotRunning)
        }
    }

    async fn start_locked(&self, slot: &mut Option<RelayProcess>) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            tracing::debug!("Relay already running");
            return Ok(());
        }
        if slot.is_some() {
            // Previous process died on its own; reap it before relaunching
            self.stop_locked(slot).await?;
        }
        if self.config.external {
            return self.attach().await;
        }

        let binary = resolve_binary(&self.config).await?;
        ensure_bootstrap(&self.config.config_path, &self.config).await?;

        tracing::info!(
            binary = %binary.path().display(),
            config = %self.config.config_path.display(),
            "Starting relay"
        );

        let mut command = Command::new(binary.path());
        command
            .arg("-config")
            .arg(&self.config.config_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if self.config.data_dir.is_dir() {
            command.current_dir(&self.config.data_dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| Error::Relay(format!("Relay spawn failed: {}", e)))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut log_tasks = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            log_tasks.push(spawn_log_forwarder(
                stdout,
                shutdown_rx.clone(),
                Some(self.running.clone()),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            log_tasks.push(spawn_log_forwarder(stderr, shutdown_rx, None));
        }

        let mut process = RelayProcess {
            child,
            binary,
            shutdown_tx,
            log_tasks,
        };

        for attempt in 1..=self.config.startup_attempts {
            if let Some(status) = process.child.try_wait()? {
                let _ = process.shutdown_tx.send(true);
                return Err(Error::Relay(format!(
                    "Relay exited during startup: {}",
                    status
                )));
            }

            match self.api.health_check().await {
                Ok(true) => {
                    self.running.store(true, Ordering::SeqCst);
                    tracing::info!(attempt = attempt, pid = ?process.child.id(), "Relay is live");
                    *slot = Some(process);
                    return Ok(());
                }
                Ok(false) => tracing::debug!(attempt = attempt, "Relay API not ready"),
                Err(e) => tracing::debug!(attempt = attempt, error = %e, "Relay API unreachable"),
            }

            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        tracing::error!(
            attempts = self.config.startup_attempts,
            "Relay did not become live, killing process"
        );
        let _ = process.child.kill().await;
        let _ = process.shutdown_tx.send(true);

        Err(Error::StartupTimeout {
            attempts: self.config.startup_attempts,
        })
    }

    /// Wait for an externally managed relay to answer
    async fn attach(&self) -> Result<()> {
        for attempt in 1..=self.config.startup_attempts {
            if let Ok(true) = self.api.health_check().await {
                self.running.store(true, Ordering::SeqCst);
                tracing::info!(url = %self.api.base_url(), "Attached to external relay");
                return Ok(());
            }
            tracing::debug!(attempt = attempt, "External relay not answering");
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        Err(Error::StartupTimeout {
            attempts: self.config.startup_attempts,
        })
    }

    async fn stop_locked(&self, slot: &mut Option<RelayProcess>) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);

        let Some(mut process) = slot.take() else {
            return Ok(());
        };

        request_termination(&mut process.child);

        match tokio::time::timeout(self.config.stop_timeout, process.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::info!(status = %status, "Relay stopped");
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Relay wait failed, killing");
                process.child.kill().await?;
            }
            Err(_) => {
                tracing::warn!(
                    timeout_sec = self.config.stop_timeout.as_secs(),
                    "Relay ignored termination request, killing"
                );
                process.child.kill().await?;
            }
        }

        let _ = process.shutdown_tx.send(true);
        for task in process.log_tasks {
            let _ = tokio::time::timeout(Duration::from_secs(1), task).await;
        }

        Ok(())
    }
}

#[async_trait]
impl StreamRelay for RelaySupervisor {
    async fn start(&self) -> Result<()> {
        let mut slot = self.lifecycle.lock().await;
        self.start_locked(&mut slot).await
    }

    async fn stop(&self) -> Result<()> {
        let mut slot = self.lifecycle.lock().await;
        self.stop_locked(&mut slot).await
    }

    async fn restart(&self) -> Result<()> {
        let mut slot = self.lifecycle.lock().await;
        tracing::info!("Restarting relay");
        self.stop_locked(&mut slot).await?;
        self.start_locked(&mut slot).await
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn add_stream(&self, name: &str, source: &str) -> Result<()> {
        self.ensure_running()?;
        self.api.add_stream(name, source).await
    }

    async fn remove_stream(&self, name: &str) -> Result<()> {
        self.ensure_running()?;
        self.api.remove_stream(name).await
    }

    async fn get_streams(&self) -> Result<HashMap<String, StreamInfo>> {
        self.ensure_running()?;
        self.api.get_streams().await
    }

    async fn get_stream_info(&self, name: &str) -> Result<StreamInfo> {
        self.ensure_running()?;
        self.api.get_stream_info(name).await
    }

    fn get_stream_url(&self, name: &str, protocol: StreamProtocol) -> String {
        self.api.stream_url(name, protocol)
    }

    async fn probe_onvif(&self, source: &str) -> Result<Vec<OnvifSource>> {
        self.ensure_running()?;
        let response = self.api.probe_onvif(source).await?;
        Ok(response.sources.unwrap_or_default())
    }

    async fn test_stream(&self, source: &str) -> Result<()> {
        self.ensure_running()?;

        let name = transient_stream_name("test");
        self.api.add_stream(&name, source).await?;
        tokio::time::sleep(self.config.test_settle).await;

        let info = self
            .api
            .get_stream_info_with_timeout(&name, self.config.test_timeout)
            .await;

        if let Err(e) = self.api.remove_stream(&name).await {
            tracing::warn!(stream = %name, error = %e, "Failed to remove test stream");
        }

        check_producers(source, info)
    }
}

/// Ask the process to exit; SIGTERM on Unix, hard kill elsewhere
#[cfg(unix)]
fn request_termination(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    match child.id() {
        Some(pid) => {
            if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                tracing::warn!(pid = pid, error = %e, "SIGTERM failed");
            }
        }
        None => tracing::debug!("Relay already exited"),
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        tracing::warn!(error = %e, "Relay kill request failed");
    }
}

/// Forward subprocess output lines into tracing
///
/// When `running` is given, end-of-stream means the process went away.
fn spawn_log_forwarder<R>(
    reader: R,
    mut shutdown_rx: watch::Receiver<bool>,
    running: Option<Arc<AtomicBool>>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                line = lines.next_line() => match line {
                    Ok(Some(line)) => tracing::info!(target: "relay", "{}", line),
                    Ok(None) | Err(_) => {
                        if let Some(running) = &running {
                            if running.swap(false, Ordering::SeqCst) {
                                tracing::warn!("Relay process exited unexpectedly");
                            }
                        }
                        break;
                    }
                },
            }
        }
    })
}

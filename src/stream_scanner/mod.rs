//! StreamScanner - Protocol Candidate Prober
//!
//! ## Responsibilities
//!
//! - Candidate URL generation for an arbitrary camera (known, ONVIF, vendor, generic, ...)
//! - Concurrent probing through transient relay registrations
//! - Global probe pacing and early stop
//! - Quick sequential scan and ONVIF profile enumeration
//!
//! ## Probe pipeline
//!
//! A dispatcher feeds priority-ordered candidates into a bounded queue that
//! a fixed pool of workers drains. Each worker takes a rate-limiter slot
//! before dequeuing, so dispatch order follows priority while throughput
//! stays under the global ceiling. Results arrive in completion order.
//! Once a stop rule fires, a shared cancel signal reaches the dispatcher and
//! every worker; in-flight probes finish, including their deregistration.

mod candidates;
mod rate_limiter;
mod types;
mod utils;
mod vendor_paths;


pub use candidates::{
    finalize, generate_candidates, quick_candidates, PRIORITY_FFMPEG, PRIORITY_KNOWN,
    PRIORITY_ONVIF, PRIORITY_PROPRIETARY, PRIORITY_RTSP_CREDENTIALS, PRIORITY_RTSP_OPEN,
};
pub use rate_limiter::RateLimiter;
pub use types::*;
pub use utils::validate_ipv4;
pub use vendor_paths::{VendorPath, QUICK_SCAN_PATHS, VENDOR_RTSP_PATHS};

use crate::config::ScanConfig;
use crate::error::{Error, Result};
use crate::relay_supervisor::{transient_stream_name, StreamRelay};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch, Mutex};

/// Default ONVIF service port
pub const DEFAULT_ONVIF_PORT: u16 = 80;

/// StreamScanner service
pub struct StreamScanner {
    relay: Arc<dyn StreamRelay>,
    config: ScanConfig,
    limiter: Arc<RateLimiter>,
}

impl StreamScanner {
    /// Create a scanner probing through `relay`
    pub fn new(relay: Arc<dyn StreamRelay>, config: ScanConfig) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.rate_interval));
        Self {
            relay,
            config,
            limiter,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Candidate list a scan of `ip` would dispatch, in order
    pub fn candidates_for(&self, ip: Ipv4Addr, user: &str, pass: &str) -> Vec<Candidate> {
        let known = self.config.known_sources.get(&ip).map(String::as_str);
        generate_candidates(ip, user, pass, known)
    }

    /// Discover working stream URLs for a camera
    ///
    /// Only malformed input is an error; a scan that finds nothing returns an
    /// empty result. `progress` receives one notification per completed
    /// probe, dropped when the receiver is full or gone.
    pub async fn scan(
        &self,
        ip: &str,
        user: &str,
        pass: &str,
        progress: Option<mpsc::Sender<ScanProgress>>,
    ) -> Result<ScanResult> {
        let addr = validate_ipv4(ip)?;
        let candidates = self.candidates_for(addr, user, pass);
        let total = candidates.len();
        let started = Instant::now();
        let workers = self.config.workers.max(1);

        tracing::info!(
            ip = %addr,
            candidates = total,
            workers = workers,
            "Stream scan started"
        );

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (job_tx, job_rx) = mpsc::channel::<Candidate>(workers);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (result_tx, mut result_rx) = mpsc::channel::<Candidate>(workers * 2);

        let dispatcher = tokio::spawn(dispatch(candidates, job_tx, cancel_rx.clone()));

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            handles.push(tokio::spawn(probe_worker(
                worker_id,
                self.relay.clone(),
                self.limiter.clone(),
                job_rx.clone(),
                result_tx.clone(),
                cancel_rx.clone(),
            )));
        }
        drop(result_tx);

        let mut working = Vec::new();
        let mut processed = 0usize;
        let mut stopped = false;

        while let Some(candidate) = result_rx.recv().await {
            processed += 1;
            if candidate.working {
                tracing::info!(ip = %addr, url = %candidate.url, "Working stream found");
                working.push(candidate.clone());
            }

            if let Some(tx) = &progress {
                let _ = tx.try_send(ScanProgress {
                    ip: addr.to_string(),
                    processed,
                    total,
                    working_found: working.len(),
                    candidate,
                });
            }

            if !stopped && self.should_stop(processed, working.len()) {
                stopped = true;
                tracing::debug!(
                    ip = %addr,
                    processed = processed,
                    working = working.len(),
                    "Scan stop condition reached"
                );
                let _ = cancel_tx.send(true);
            }
        }

        if let Err(e) = dispatcher.await {
            tracing::warn!(error = %e, "Scan dispatcher task failed");
        }
        for joined in futures::future::join_all(handles).await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "Probe worker task failed");
            }
        }

        let result = ScanResult::new(addr.to_string(), working, processed, total, started.elapsed());

        tracing::info!(
            ip = %addr,
            probed = result.probed,
            working = result.streams.len(),
            best = ?result.best_match.as_ref().map(|c| c.url.as_str()),
            elapsed_ms = result.elapsed.as_millis() as u64,
            "Stream scan finished"
        );

        Ok(result)
    }

    /// Try a short curated list in order and return the first accepted URL
    pub async fn quick_scan(&self, ip: &str, user: &str, pass: &str) -> Result<Candidate> {
        let addr = validate_ipv4(ip)?;
        let known = self.config.known_sources.get(&addr).map(String::as_str);
        let candidates = quick_candidates(addr, user, pass, known);

        tracing::info!(ip = %addr, candidates = candidates.len(), "Quick scan started");

        for candidate in candidates {
            self.limiter.acquire().await;
            let result = probe_candidate(self.relay.as_ref(), candidate).await;
            if result.working {
                tracing::info!(ip = %addr, url = %result.url, "Quick scan hit");
                return Ok(result);
            }
        }

        Err(Error::NotFound(format!("No working stream found for {}", addr)))
    }

    /// Enumerate an ONVIF device's media profiles through the relay
    pub async fn scan_onvif_camera(
        &self,
        ip: &str,
        user: &str,
        pass: &str,
        port: Option<u16>,
    ) -> Result<Vec<Candidate>> {
        let addr = validate_ipv4(ip)?;
        let port = port.unwrap_or(DEFAULT_ONVIF_PORT);
        let source = format!("onvif://{}{}:{}", utils::userinfo(user, pass), addr, port);

        let started = Instant::now();
        let sources = self.relay.probe_onvif(&source).await?;
        let elapsed = started.elapsed();

        tracing::info!(ip = %addr, port = port, profiles = sources.len(), "ONVIF probe finished");

        Ok(sources
            .into_iter()
            .enumerate()
            .map(|(i, src)| {
                let description = if src.name.is_empty() {
                    format!("ONVIF profile {}", i + 1)
                } else {
                    src.name
                };
                let mut candidate = Candidate::new(
                    src.url.clone(),
                    CandidateProtocol::from_url(&src.url),
                    description,
                    PRIORITY_ONVIF - i as i32,
                );
                candidate.working = true;
                candidate.probe_duration = elapsed;
                candidate
            })
            .collect())
    }

    fn should_stop(&self, processed: usize, working: usize) -> bool {
        working >= self.config.max_working
            || processed >= self.config.max_probes
            || (working == 0 && processed >= self.config.zero_success_cutoff)
    }
}

/// Resolves once the scan is cancelled (or the scan itself went away)
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let _ = cancel.wait_for(|stop| *stop).await;
}

async fn dispatch(
    candidates: Vec<Candidate>,
    jobs: mpsc::Sender<Candidate>,
    mut cancel: watch::Receiver<bool>,
) {
    for candidate in candidates {
        tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => break,
            sent = jobs.send(candidate) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
}

async fn probe_worker(
    worker_id: usize,
    relay: Arc<dyn StreamRelay>,
    limiter: Arc<RateLimiter>,
    jobs: Arc<Mutex<mpsc::Receiver<Candidate>>>,
    results: mpsc::Sender<Candidate>,
    mut cancel: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => break,
            _ = limiter.acquire() => {}
        }

        let next = {
            let mut queue = jobs.lock().await;
            tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => None,
                candidate = queue.recv() => candidate,
            }
        };
        let Some(candidate) = next else {
            break;
        };

        let result = probe_candidate(relay.as_ref(), candidate).await;
        if results.send(result).await.is_err() {
            break;
        }
    }

    tracing::trace!(worker_id = worker_id, "Probe worker exiting");
}

/// Register the candidate under a unique transient name, then always remove it
async fn probe_candidate(relay: &dyn StreamRelay, mut candidate: Candidate) -> Candidate {
    let name = transient_stream_name("probe");
    let started = Instant::now();
    let outcome = relay.add_stream(&name, &candidate.url).await;
    candidate.probe_duration = started.elapsed();

    match outcome {
        Ok(()) => candidate.working = true,
        Err(e) => {
            tracing::debug!(url = %candidate.url, error = %e, "Probe rejected");
            candidate.error = Some(e.to_string());
        }
    }

    if let Err(e) = relay.remove_stream(&name).await {
        tracing::warn!(stream = %name, error = %e, "Failed to remove probe stream");
    }

    candidate
}

//! Camstream Engine - camera discovery and stream supervision
//!
//! Main entry point. `serve` runs the relay and the camera lifecycle manager
//! until Ctrl-C; the scan subcommands probe one camera and print JSON.

use anyhow::Context;
use camstream_engine::{
    detector_client::HttpObjectDetector,
    relay_supervisor::{RelaySupervisor, StreamRelay},
    stream_scanner::StreamScanner,
    streaming_server::{FfmpegSourceFactory, ObjectDetector, StreamEvent, StreamingServer},
    EngineConfig,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "camstream-engine")]
#[command(about = "Camera discovery and stream supervision engine")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the relay and every camera listed in CAMERAS until Ctrl-C
    Serve,
    /// Probe all protocol candidates for a camera
    Scan(CameraArgs),
    /// Try a short list of common stream paths, stop at the first hit
    QuickScan(CameraArgs),
    /// Enumerate ONVIF media profiles through the relay
    Onvif {
        #[command(flatten)]
        camera: CameraArgs,

        /// ONVIF service port
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(clap::Args, Debug)]
struct CameraArgs {
    /// Camera IPv4 address
    ip: String,

    /// Camera user name
    #[arg(short, long, default_value = "")]
    user: String,

    /// Camera password
    #[arg(short, long, default_value = "")]
    pass: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camstream_engine=debug,relay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = EngineConfig::from_env();

    tracing::info!("Starting Camstream Engine v{}", env!("CARGO_PKG_VERSION"));

    let relay = Arc::new(RelaySupervisor::new(config.relay.clone()).context("relay client")?);

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, relay).await,
        Command::Scan(camera) => {
            with_relay(&relay, async {
                let scanner = StreamScanner::new(relay.clone(), config.scan.clone());
                let (tx, rx) = mpsc::channel(64);
                let reporter = tokio::spawn(report_progress(rx));
                let result = scanner
                    .scan(&camera.ip, &camera.user, &camera.pass, Some(tx))
                    .await;
                let _ = reporter.await;
                print_json(&result?)
            })
            .await
        }
        Command::QuickScan(camera) => {
            with_relay(&relay, async {
                let scanner = StreamScanner::new(relay.clone(), config.scan.clone());
                print_json(&scanner.quick_scan(&camera.ip, &camera.user, &camera.pass).await?)
            })
            .await
        }
        Command::Onvif { camera, port } => {
            with_relay(&relay, async {
                let scanner = StreamScanner::new(relay.clone(), config.scan.clone());
                print_json(
                    &scanner
                        .scan_onvif_camera(&camera.ip, &camera.user, &camera.pass, port)
                        .await?,
                )
            })
            .await
        }
    }
}

async fn serve(config: EngineConfig, relay: Arc<RelaySupervisor>) -> anyhow::Result<()> {
    if let Err(e) = relay.start().await {
        tracing::error!(error = %e, "Relay failed to start, cameras will be captured directly");
    }

    let detector: Option<Arc<dyn ObjectDetector>> = match &config.ai_detector_url {
        Some(url) => {
            tracing::info!(url = %url, "Object detector configured");
            Some(Arc::new(HttpObjectDetector::new(url.clone())?))
        }
        None => None,
    };

    let sources = Arc::new(FfmpegSourceFactory::new(
        config.streaming.frame_read_timeout,
        config.streaming.capture_fps,
    ));
    let server = StreamingServer::with_analysis(
        relay.clone(),
        config.streaming.clone(),
        sources,
        None,
        detector,
    );
    server.start().await;

    let event_logger = tokio::spawn(log_events(server.subscribe()));

    for (id, url) in &config.streaming.boot_cameras {
        if let Err(e) = server.add_camera(id, url).await {
            tracing::error!(camera_id = %id, error = %e, "Failed to add camera");
        }
    }

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    tracing::info!("Shutdown requested");

    server.shutdown().await;
    event_logger.abort();
    relay.stop().await?;

    tracing::info!("Camstream Engine stopped");
    Ok(())
}

/// Run `work` with the relay started, stopping it afterwards
async fn with_relay<F>(relay: &RelaySupervisor, work: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = anyhow::Result<()>>,
{
    relay.start().await.context("relay start")?;
    let result = work.await;
    if let Err(e) = relay.stop().await {
        tracing::warn!(error = %e, "Relay stop failed");
    }
    result
}

async fn report_progress(mut rx: mpsc::Receiver<camstream_engine::stream_scanner::ScanProgress>) {
    while let Some(p) = rx.recv().await {
        tracing::info!(
            processed = p.processed,
            total = p.total,
            working = p.working_found,
            url = %p.candidate.url,
            ok = p.candidate.working,
            "Probe finished"
        );
    }
}

async fn log_events(mut rx: broadcast::Receiver<StreamEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => tracing::info!(camera_id = %event.camera_id(), event = %json, "Stream event"),
                Err(e) => tracing::warn!(error = %e, "Event serialization failed"),
            },
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "Event logger lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

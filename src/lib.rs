//! Camstream Engine Library
//!
//! Camera discovery and stream supervision
//!
//! ## Architecture (3 Components)
//!
//! 1. RelaySupervisor - external media relay process and its control API
//! 2. StreamScanner - concurrent protocol-candidate prober
//! 3. StreamingServer - per-camera connect/reconnect state machine and analysis triggers
//!
//! DetectorClient adapts an HTTP inference endpoint to the object-detection
//! capability consumed by StreamingServer.
//!
//! ## Flow
//!
//! An operator layer scans a camera with StreamScanner, which probes
//! candidates through transient relay registrations. The chosen URL is added
//! to StreamingServer, which also registers it with the relay for viewers.

pub mod config;
pub mod detector_client;
pub mod error;
pub mod relay_supervisor;
pub mod stream_scanner;
pub mod streaming_server;

pub use config::EngineConfig;
pub use error::{Error, Result};

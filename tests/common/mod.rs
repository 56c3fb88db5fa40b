//! In-process relay control plane for integration tests
//!
//! Mimics the relay's local API closely enough for the HTTP client and the
//! supervisor: stream registration, listing (`null` when empty), per-stream
//! lookup, ONVIF enumeration and the liveness endpoint.

#![allow(dead_code)]

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use camstream_engine::config::RelayConfig;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

type Accept = Box<dyn Fn(&str) -> bool + Send + Sync>;

struct RelayState {
    accept: Accept,
    streams: Mutex<HashMap<String, String>>,
    puts: Mutex<Vec<String>>,
    onvif_sources: Vec<(String, String)>,
    onvif_requests: Mutex<Vec<String>>,
}

pub struct FakeRelayServer {
    pub port: u16,
    state: Arc<RelayState>,
    task: JoinHandle<()>,
}

impl FakeRelayServer {
    /// Relay that accepts every source
    pub async fn start() -> Self {
        Self::start_with(|_| true, Vec::new()).await
    }

    pub async fn start_with(
        accept: impl Fn(&str) -> bool + Send + Sync + 'static,
        onvif_sources: Vec<(&str, &str)>,
    ) -> Self {
        let state = Arc::new(RelayState {
            accept: Box::new(accept),
            streams: Mutex::new(HashMap::new()),
            puts: Mutex::new(Vec::new()),
            onvif_sources: onvif_sources
                .into_iter()
                .map(|(n, u)| (n.to_string(), u.to_string()))
                .collect(),
            onvif_requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/api", get(info))
            .route(
                "/api/streams",
                get(list_or_get).put(add_stream).delete(remove_stream),
            )
            .route("/api/onvif", get(onvif))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { port, state, task }
    }

    /// Relay settings pointing at this server, attach mode
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            host: "127.0.0.1".to_string(),
            api_port: self.port,
            external: true,
            startup_attempts: 3,
            request_timeout: Duration::from_secs(2),
            test_timeout: Duration::from_secs(2),
            test_settle: Duration::from_millis(10),
            stop_timeout: Duration::from_secs(2),
            ..RelayConfig::default()
        }
    }

    /// Currently registered streams (name -> source)
    pub fn streams(&self) -> HashMap<String, String> {
        self.state.streams.lock().unwrap().clone()
    }

    /// Sources of every registration attempt, in arrival order
    pub fn put_sources(&self) -> Vec<String> {
        self.state.puts.lock().unwrap().clone()
    }

    pub fn onvif_requests(&self) -> Vec<String> {
        self.state.onvif_requests.lock().unwrap().clone()
    }

    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for FakeRelayServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A local port with nothing listening on it
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

async fn info() -> Json<Value> {
    Json(json!({ "version": "1.9.4", "config_path": "go2rtc.yaml" }))
}

fn descriptor(source: &str) -> Value {
    json!({
        "producers": [{ "url": source, "recv": 0 }],
        "consumers": null
    })
}

async fn list_or_get(
    State(state): State<Arc<RelayState>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let streams = state.streams.lock().unwrap();

    match params.get("src") {
        Some(name) => match streams.get(name) {
            Some(source) => (StatusCode::OK, Json(descriptor(source))),
            None => (StatusCode::NOT_FOUND, Json(Value::Null)),
        },
        None if streams.is_empty() => (StatusCode::OK, Json(Value::Null)),
        None => {
            let all: serde_json::Map<String, Value> = streams
                .iter()
                .map(|(name, source)| (name.clone(), descriptor(source)))
                .collect();
            (StatusCode::OK, Json(Value::Object(all)))
        }
    }
}

async fn add_stream(
    State(state): State<Arc<RelayState>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let (Some(name), Some(source)) = (params.get("dst"), params.get("src")) else {
        return (StatusCode::BAD_REQUEST, "missing dst or src".to_string());
    };

    state.puts.lock().unwrap().push(source.clone());

    if !(state.accept)(source) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("streams: can't open {}", source),
        );
    }

    state
        .streams
        .lock()
        .unwrap()
        .insert(name.clone(), source.clone());
    (StatusCode::OK, String::new())
}

async fn remove_stream(
    State(state): State<Arc<RelayState>>,
    Query(params): Query<HashMap<String, String>>,
) -> StatusCode {
    if let Some(name) = params.get("src") {
        state.streams.lock().unwrap().remove(name);
    }
    StatusCode::OK
}

async fn onvif(
    State(state): State<Arc<RelayState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    if let Some(src) = params.get("src") {
        state.onvif_requests.lock().unwrap().push(src.clone());
    }
    let sources: Vec<Value> = state
        .onvif_sources
        .iter()
        .map(|(name, url)| json!({ "name": name, "url": url }))
        .collect();
    Json(json!({ "sources": sources }))
}

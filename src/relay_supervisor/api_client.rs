//! Relay control-plane HTTP client
//!
//! Thin adapter over the relay's local API. It does not know whether the
//! subprocess is alive; `RelaySupervisor` gates every call on that.

use super::types::{OnvifProbeResponse, StreamInfo, StreamProtocol, StreamUrls};
use crate::config::RelayConfig;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::time::Duration;

/// Relay API client
#[derive(Clone)]
pub struct RelayApiClient {
    client: reqwest::Client,
    base_url: String,
    host: String,
    api_port: u16,
    rtsp_port: u16,
}

impl RelayApiClient {
    /// Create a client from relay settings
    pub fn new(config: &RelayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url(),
            host: config.host.clone(),
            api_port: config.api_port,
            rtsp_port: config.rtsp_port,
        })
    }

    /// Control-plane base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Register a stream
    ///
    /// `PUT /api/streams?dst={name}&src={source}`
    pub async fn add_stream(&self, name: &str, source: &str) -> Result<()> {
        let url = format!(
            "{}/api/streams?dst={}&src={}",
            self.base_url,
            urlencoding::encode(name),
            urlencoding::encode(source)
        );

        let resp = self.client.put(&url).send().await?;
        let status = resp.status();

        if status.is_success() {
            tracing::debug!(stream = %name, status = %status, "Relay stream registered");
            return Ok(());
        }

        Err(Error::Relay(format!(
            "Failed to add stream {}: {} - {}",
            name,
            status,
            resp.text().await.unwrap_or_default().trim()
        )))
    }

    /// Deregister a stream
    ///
    /// `DELETE /api/streams?src={name}`; 200 and 204 are both success.
    pub async fn remove_stream(&self, name: &str) -> Result<()> {
        let url = format!(
            "{}/api/streams?src={}",
            self.base_url,
            urlencoding::encode(name)
        );

        let resp = self.client.delete(&url).send().await?;

        if !resp.status().is_success() {
            return Err(Error::Relay(format!(
                "Failed to remove stream {}: {}",
                name,
                resp.status()
            )));
        }

        Ok(())
    }

    /// All streams, keyed by name
    pub async fn get_streams(&self) -> Result<HashMap<String, StreamInfo>> {
        let url = format!("{}/api/streams", self.base_url);

        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(Error::Relay(format!(
                "Failed to list streams: {}",
                resp.status()
            )));
        }

        // The relay answers `null` when nothing is registered
        let streams: Option<HashMap<String, StreamInfo>> = resp.json().await?;
        Ok(streams.unwrap_or_default())
    }

    /// Producer/codec descriptor of one stream
    pub async fn get_stream_info(&self, name: &str) -> Result<StreamInfo> {
        self.get_stream_info_with(&self.client, name).await
    }

    /// Producer descriptor using a longer timeout (explicit stream tests)
    pub async fn get_stream_info_with_timeout(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<StreamInfo> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        self.get_stream_info_with(&client, name).await
    }

    async fn get_stream_info_with(&self, client: &reqwest::Client, name: &str) -> Result<StreamInfo> {
        let url = format!(
            "{}/api/streams?src={}",
            self.base_url,
            urlencoding::encode(name)
        );

        let resp = client.get(&url).send().await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("Relay stream {}", name)));
        }
        if !resp.status().is_success() {
            return Err(Error::Relay(format!(
                "Failed to get stream {}: {}",
                name,
                resp.status()
            )));
        }

        let json: serde_json::Value = resp.json().await?;

        // Some relay versions wrap the descriptor in a `{name: {...}}` map
        let descriptor = match json.get(name) {
            Some(inner) if inner.is_object() => inner.clone(),
            _ => json,
        };

        if descriptor.is_null() {
            return Err(Error::NotFound(format!("Relay stream {}", name)));
        }

        Ok(serde_json::from_value(descriptor)?)
    }

    /// Ask the relay to enumerate an ONVIF device's media profiles
    ///
    /// `GET /api/onvif?src=onvif://user:pass@ip:port`
    pub async fn probe_onvif(&self, source: &str) -> Result<OnvifProbeResponse> {
        let url = format!(
            "{}/api/onvif?src={}",
            self.base_url,
            urlencoding::encode(source)
        );

        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(Error::Relay(format!(
                "ONVIF probe failed: {} - {}",
                resp.status(),
                resp.text().await.unwrap_or_default().trim()
            )));
        }

        Ok(resp.json().await?)
    }

    /// Check relay liveness (`GET /api`)
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api", self.base_url);
        let resp = self.client.get(&url).send().await?;
        Ok(resp.status().is_success())
    }

    /// Relay version as reported by `GET /api`
    pub async fn version(&self) -> Result<String> {
        let url = format!("{}/api", self.base_url);
        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(Error::Relay(format!(
                "Failed to get relay info: {}",
                resp.status()
            )));
        }

        let json: serde_json::Value = resp.json().await?;

        if let Some(version) = json.get("version").and_then(|v| v.as_str()) {
            return Ok(version.to_string());
        }
        if let Some(version) = json
            .get("info")
            .and_then(|v| v.get("version"))
            .and_then(|v| v.as_str())
        {
            return Ok(version.to_string());
        }

        Err(Error::Relay("Could not parse relay version".to_string()))
    }

    /// Access URL for a stream and protocol
    pub fn stream_url(&self, name: &str, protocol: StreamProtocol) -> String {
        let encoded = urlencoding::encode(name);
        let http = format!("http://{}:{}", self.host, self.api_port);
        match protocol {
            StreamProtocol::Rtsp => format!("rtsp://{}:{}/{}", self.host, self.rtsp_port, name),
            StreamProtocol::Webrtc => format!("{}/stream/{}", http, name),
            StreamProtocol::Mse => format!("{}/api/stream.mp4?src={}", http, encoded),
            StreamProtocol::Hls => format!("{}/api/stream.m3u8?src={}", http, encoded),
            StreamProtocol::Mjpeg => format!("{}/api/stream.mjpeg?src={}", http, encoded),
        }
    }

    /// Access URLs for every protocol
    pub fn stream_urls(&self, name: &str) -> StreamUrls {
        StreamUrls {
            name: name.to_string(),
            rtsp: self.stream_url(name, StreamProtocol::Rtsp),
            webrtc: self.stream_url(name, StreamProtocol::Webrtc),
            mse: self.stream_url(name, StreamProtocol::Mse),
            hls: self.stream_url(name, StreamProtocol::Hls),
            mjpeg: self.stream_url(name, StreamProtocol::Mjpeg),
        }
    }
}

//! GET Nano API client
//!
//! Polling/triggering client over the remote device-control API. Every
//! failure terminates in a structured result or a `ClientError`; nothing
//! propagates past this boundary as a panic.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::config::TriggerConfig;
use crate::error::ClientError;
use crate::models::{DeviceStatus, LogListing, LogSummary, TriggerResult, UpstreamStatus};

/// Client for the upstream GET Nano API
pub struct NanoClient {
    base_url: String,
    http_client: Client,
    timeout_margin: Duration,
    inter_device_delay: Duration,
    default_timeout_ms: u64,
}

impl NanoClient {
    pub fn new(base_url: &str, trigger: &TriggerConfig) -> Self {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            timeout_margin: Duration::from_millis(trigger.timeout_margin_ms),
            inter_device_delay: Duration::from_millis(trigger.inter_device_delay_ms),
            default_timeout_ms: trigger.default_timeout_ms,
        }
    }

    pub fn inter_device_delay(&self) -> Duration {
        self.inter_device_delay
    }

    pub fn default_timeout_ms(&self) -> u64 {
        self.default_timeout_ms
    }

    /// Transport timeout for a trigger request. Strictly greater than the
    /// device-side timeout, so the device's own timeout fires first and
    /// produces a meaningful error instead of a generic transport one.
    fn transport_timeout(&self, timeout_ms: u64) -> Duration {
        Duration::from_millis(timeout_ms) + self.timeout_margin
    }

    /// Fetch the connection state of all devices. Never cached.
    pub async fn status(&self) -> Result<DeviceStatus, ClientError> {
        let status: UpstreamStatus = self.get_json("/status").await?;
        Ok(status.nanos)
    }

    /// Trigger a single device.
    ///
    /// Checks connectivity first and fails fast without issuing the POST
    /// when the device is unknown or disconnected. All failures come back
    /// as a `TriggerResult`; this method never returns an error.
    pub async fn trigger_device(
        &self,
        device: &str,
        reason: &str,
        timeout_ms: u64,
    ) -> TriggerResult {
        let status = match self.status().await {
            Ok(status) => status,
            Err(e) => return TriggerResult::failed(e.to_string()),
        };

        if !status.get(device).map(|n| n.connected).unwrap_or(false) {
            return TriggerResult::failed(ClientError::DeviceNotConnected(device.to_string()).to_string());
        }

        self.send_trigger(device, reason, timeout_ms).await
    }

    /// Trigger every known device sequentially.
    ///
    /// Status is fetched once; disconnected devices get a failure result
    /// without a round trip, and consecutive POSTs are separated by the
    /// inter-device delay (the downstream serial link is single-command).
    pub async fn trigger_all(
        &self,
        reason: &str,
    ) -> Result<BTreeMap<String, TriggerResult>, ClientError> {
        let status = self.status().await?;

        let mut results = BTreeMap::new();
        let mut first_trigger = true;

        for (device, info) in &status {
            if !info.connected {
                results.insert(
                    device.clone(),
                    TriggerResult::failed(ClientError::DeviceNotConnected(device.clone()).to_string()),
                );
                continue;
            }

            if !first_trigger {
                tokio::time::sleep(self.inter_device_delay).await;
            }
            first_trigger = false;

            let result = self.send_trigger(device, reason, self.default_timeout_ms).await;
            results.insert(device.clone(), result);
        }

        Ok(results)
    }

    /// Fetch the most recent trigger response recorded for a device
    pub async fn last_response(&self, device: &str) -> Result<TriggerResult, ClientError> {
        self.get_json(&format!("/get-nano/{}/last", device)).await
    }

    /// List available log files on the upstream server
    pub async fn list_logs(&self) -> Result<Vec<LogSummary>, ClientError> {
        let listing: LogListing = self.get_json("/logs").await?;
        Ok(listing.logs)
    }

    /// Download raw log content
    pub async fn download_log(&self, filename: &str) -> Result<String, ClientError> {
        let url = format!("{}/logs/{}", self.base_url, filename);
        let resp = self.http_client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(ClientError::UpstreamHttp(resp.status().as_u16()));
        }

        resp.text()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Issue the trigger POST without the connectivity pre-check
    async fn send_trigger(&self, device: &str, reason: &str, timeout_ms: u64) -> TriggerResult {
        tracing::info!("[NanoClient] Triggering {} ({})", device, reason);

        let url = format!("{}/get-nano/{}", self.base_url, device);
        let body = serde_json::json!({ "timeout": timeout_ms });

        let resp = match self
            .http_client
            .post(&url)
            .json(&body)
            .timeout(self.transport_timeout(timeout_ms))
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return TriggerResult::failed(ClientError::from(e).to_string()),
        };

        if !resp.status().is_success() {
            return TriggerResult::failed(format!("HTTP {}", resp.status().as_u16()));
        }

        match resp.json::<TriggerResult>().await {
            Ok(result) => result,
            Err(e) => TriggerResult::failed(ClientError::Decode(e.to_string()).to_string()),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.http_client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(ClientError::UpstreamHttp(resp.status().as_u16()));
        }

        resp.json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

//! Configuration module

use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub trigger: TriggerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the GET Nano API server
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// Tunables for trigger calls and the auto-trigger loop. The original
/// deployment values (2s pause, +5s transport margin, 10s device timeout,
/// 60s interval) are the defaults, not hard-coded semantics.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerConfig {
    /// Added to the per-device timeout to form the transport timeout, so
    /// the device-side timeout always fires before the transport one.
    #[serde(default = "default_timeout_margin_ms")]
    pub timeout_margin_ms: u64,
    /// Pause between consecutive trigger commands. The downstream serial
    /// link services one command at a time.
    #[serde(default = "default_inter_device_delay_ms")]
    pub inter_device_delay_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    #[serde(default = "default_interval_secs")]
    pub default_interval_secs: u64,
    /// Primary devices targeted by `POST /trigger/both`
    #[serde(default = "default_devices")]
    pub devices: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            timeout_margin_ms: default_timeout_margin_ms(),
            inter_device_delay_ms: default_inter_device_delay_ms(),
            default_timeout_ms: default_timeout_ms(),
            default_interval_secs: default_interval_secs(),
            devices: default_devices(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_base_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_timeout_margin_ms() -> u64 {
    5000
}

fn default_inter_device_delay_ms() -> u64 {
    2000
}

fn default_timeout_ms() -> u64 {
    10000
}

fn default_interval_secs() -> u64 {
    60
}

fn default_devices() -> Vec<String> {
    vec!["nano1".to_string(), "nano2".to_string()]
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("NANOTRIGGER").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize().unwrap_or_default();
        config.validate()?;

        Ok(config)
    }

    /// Fail at startup rather than on the first upstream call
    fn validate(&self) -> anyhow::Result<()> {
        Url::parse(&self.upstream.base_url)
            .map_err(|e| anyhow::anyhow!("invalid upstream.base_url '{}': {}", self.upstream.base_url, e))?;

        // A zero margin would let the transport timeout fire together with
        // the device-side one instead of strictly after it
        if self.trigger.timeout_margin_ms == 0 {
            anyhow::bail!("trigger.timeout_margin_ms must be nonzero");
        }

        Ok(())
    }
}

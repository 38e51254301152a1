//! Data models for nano-trigger-gateway

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Upstream API Models
// ============================================================================

/// Connection state of a single device as reported by the upstream API
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NanoInfo {
    #[serde(default)]
    pub connected: bool,
}

/// Device id -> connection info.
///
/// A `BTreeMap` keeps iteration order stable, so bulk operations always
/// walk devices in the same (lexicographic) order.
pub type DeviceStatus = BTreeMap<String, NanoInfo>;

/// Body of the upstream `GET /status` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamStatus {
    #[serde(default)]
    pub nanos: DeviceStatus,
}

/// Outcome of a single trigger call. Failures are data, not faults.
///
/// `nano` and `timestamp` mirror the upstream response; locally produced
/// failures are stamped at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nano: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl TriggerResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            nano: None,
            timestamp: Some(Utc::now()),
        }
    }
}

/// One entry from the upstream log listing. The upstream response carries
/// extra bookkeeping fields (size, download URL) that we do not re-expose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSummary {
    pub filename: String,
    #[serde(default)]
    pub entries: u64,
}

/// Body of the upstream `GET /logs` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogListing {
    #[serde(default)]
    pub logs: Vec<LogSummary>,
}

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on the length of a result's error message, in characters
pub const MAX_ERROR_MESSAGE_LEN: usize = 100;

/// Outcome of a single probe. Unknown is a registry-only state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Up,
    Down,
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeStatus::Up => write!(f, "up"),
            ProbeStatus::Down => write!(f, "down"),
        }
    }
}

/// Why a probe failed before any HTTP response was received
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    #[error("Request timeout")]
    Timeout,

    #[error("SSL Error: {0}")]
    Tls(String),

    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Request error: {0}")]
    Request(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Result of a monitoring check, in the shape the ingestion backend expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    /// ID of the monitor that was checked
    pub monitor_id: String,

    /// Up or down
    pub status: ProbeStatus,

    /// HTTP status code, 0 when no response was received
    pub status_code: u16,

    /// Response time in milliseconds
    pub response_time: u64,

    /// Error message (only when down)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// When the check completed
    pub checked_at: DateTime<Utc>,
}

impl CheckResult {
    /// Result for a probe that received an HTTP response. 2xx and 3xx count
    /// as up.
    pub fn from_response(monitor_id: String, status_code: u16, response_time: u64) -> Self {
        let up = (200..400).contains(&status_code);

        Self {
            monitor_id,
            status: if up { ProbeStatus::Up } else { ProbeStatus::Down },
            status_code,
            response_time,
            error_message: (!up).then(|| format!("HTTP {status_code}")),
            checked_at: Utc::now(),
        }
    }

    /// Result for a probe that failed before a response arrived
    pub fn from_failure(monitor_id: String, failure: &ProbeFailure, response_time: u64) -> Self {
        Self {
            monitor_id,
            status: ProbeStatus::Down,
            status_code: 0,
            response_time,
            error_message: Some(truncate_message(&failure.to_string())),
            checked_at: Utc::now(),
        }
    }
}

/// Cut a message down to `MAX_ERROR_MESSAGE_LEN` characters
pub fn truncate_message(message: &str) -> String {
    match message.char_indices().nth(MAX_ERROR_MESSAGE_LEN) {
        Some((end, _)) => message[..end].to_string(),
        None => message.to_string(),
    }
}

/// Elapsed time rounded to the nearest millisecond
pub fn rounded_millis(elapsed: Duration) -> u64 {
    ((elapsed.as_micros() + 500) / 1000) as u64
}

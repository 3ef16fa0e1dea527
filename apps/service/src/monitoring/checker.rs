use std::error::Error as StdError;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use anyhow::Result;
use futures::FutureExt;
use tracing::{error, info, warn};

use super::types::{CheckResult, ProbeFailure, rounded_millis};
use crate::database::Monitor;

/// User agent sent with every probe and report
pub const USER_AGENT: &str = concat!("pulse-worker/", env!("CARGO_PKG_VERSION"));

/// Checker trait for probing a single monitor.
///
/// Implementations never fail: every outcome, including internal faults,
/// is folded into the returned `CheckResult`.
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    async fn check(&self, monitor: &Monitor) -> CheckResult;
}

/// Build the HTTP client shared by probes and reports.
///
/// Redirects are followed and certificates are always verified. The client
/// timeout is only a fallback, every request sets its own.
pub fn build_http_client(default_timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(default_timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()?;

    Ok(client)
}

/// HTTP/HTTPS checker
pub struct HttpChecker {
    client: reqwest::Client,
}

impl HttpChecker {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn probe(&self, monitor: &Monitor) -> Result<u16, ProbeFailure> {
        let response = self
            .client
            .request(monitor.method.as_reqwest(), monitor.url.clone())
            .timeout(monitor.timeout)
            .send()
            .await
            .map_err(|e| classify(&e))?;

        Ok(response.status().as_u16())
    }
}

#[async_trait::async_trait]
impl Checker for HttpChecker {
    async fn check(&self, monitor: &Monitor) -> CheckResult {
        info!(monitor_id = %monitor.id, "Checking monitor: {} ({})", monitor.name, monitor.url);

        let start = Instant::now();
        let outcome = AssertUnwindSafe(self.probe(monitor))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ProbeFailure::Unexpected(panic_message(panic.as_ref()))));
        let response_time = rounded_millis(start.elapsed());

        match outcome {
            Ok(status_code) => {
                let result = CheckResult::from_response(monitor.id.clone(), status_code, response_time);
                info!(
                    monitor_id = %monitor.id,
                    "{}: {} - {} - {}ms",
                    monitor.name,
                    result.status.to_string().to_uppercase(),
                    status_code,
                    response_time
                );
                result
            }
            Err(failure) => {
                match &failure {
                    ProbeFailure::Timeout => {
                        warn!(monitor_id = %monitor.id, "{}: TIMEOUT after {}ms", monitor.name, response_time)
                    }
                    other => error!(monitor_id = %monitor.id, "{}: {}", monitor.name, other),
                }
                CheckResult::from_failure(monitor.id.clone(), &failure, response_time)
            }
        }
    }
}

/// Map a transport error onto the probe failure taxonomy
fn classify(err: &reqwest::Error) -> ProbeFailure {
    if err.is_timeout() {
        ProbeFailure::Timeout
    } else if mentions_tls(err) {
        ProbeFailure::Tls(root_cause(err))
    } else if err.is_connect() {
        ProbeFailure::Connect(root_cause(err))
    } else {
        ProbeFailure::Request(root_cause(err))
    }
}

/// Whether any error below the top level comes from the TLS layer.
///
/// The top level is skipped because reqwest puts the URL there.
fn mentions_tls(err: &(dyn StdError + 'static)) -> bool {
    const MARKERS: [&str; 4] = ["certificate", "tls", "ssl", "handshake"];

    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string().to_ascii_lowercase();
        if MARKERS.iter().any(|marker| text.contains(marker)) {
            return true;
        }
        source = cause.source();
    }
    false
}

/// Innermost error message, which is the useful one for transport errors
fn root_cause(err: &(dyn StdError + 'static)) -> String {
    let mut current = err;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "probe panicked".to_string()
    }
}

use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, error};
use url::Url;

use super::types::CheckResult;

/// Delivers check results to the ingestion backend
#[async_trait::async_trait]
pub trait Reporter: Send + Sync {
    /// Single delivery attempt. `true` only when the backend accepted the result.
    async fn report(&self, result: &CheckResult) -> bool;
}

/// Reports results by POSTing them as JSON
pub struct HttpReporter {
    client: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpReporter {
    pub fn new(client: reqwest::Client, endpoint: Url, timeout: Duration) -> Self {
        Self { client, endpoint, timeout }
    }
}

#[async_trait::async_trait]
impl Reporter for HttpReporter {
    async fn report(&self, result: &CheckResult) -> bool {
        let response = self
            .client
            .post(self.endpoint.clone())
            .timeout(self.timeout)
            .json(result)
            .send()
            .await;

        match response {
            Ok(response) if response.status() == StatusCode::CREATED => {
                debug!(monitor_id = %result.monitor_id, "Reported result");
                true
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                error!(
                    monitor_id = %result.monitor_id,
                    "Failed to report result: {} - {}",
                    status.as_u16(),
                    body
                );
                false
            }
            Err(e) => {
                error!(monitor_id = %result.monitor_id, "Error reporting to backend: {}", e);
                false
            }
        }
    }
}

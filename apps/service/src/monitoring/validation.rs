//! Validation of monitor targets and timing values.
//!
//! Registry rows are validated before they become `Monitor` snapshots, and
//! configuration values are bounds-checked at startup.

use anyhow::{Result, anyhow};
use url::Url;

/// Parse and validate a monitor URL. Only http and https targets are probed.
pub fn validate_monitor_url(target: &str) -> Result<Url> {
    let url = Url::parse(target).map_err(|e| anyhow!("Invalid URL {target:?}: {e}"))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(anyhow!("Invalid scheme for HTTP monitor: {}", other)),
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(anyhow!("URL has no host: {}", target));
    }

    Ok(url)
}

/// Validate the global check interval
pub fn validate_check_interval(interval_seconds: u64) -> Result<()> {
    const MIN_INTERVAL: u64 = 1;
    const MAX_INTERVAL: u64 = 86400; // 24 hours

    if interval_seconds < MIN_INTERVAL {
        return Err(anyhow!(
            "Check interval too short: {} seconds (minimum: {})",
            interval_seconds,
            MIN_INTERVAL
        ));
    }

    if interval_seconds > MAX_INTERVAL {
        return Err(anyhow!(
            "Check interval too long: {} seconds (maximum: {})",
            interval_seconds,
            MAX_INTERVAL
        ));
    }

    Ok(())
}

/// Validate timeout is reasonable
pub fn validate_timeout(timeout_seconds: u64) -> Result<()> {
    const MIN_TIMEOUT: u64 = 1;
    const MAX_TIMEOUT: u64 = 300; // 5 minutes

    if timeout_seconds < MIN_TIMEOUT {
        return Err(anyhow!(
            "Timeout too short: {} seconds (minimum: {})",
            timeout_seconds,
            MIN_TIMEOUT
        ));
    }

    if timeout_seconds > MAX_TIMEOUT {
        return Err(anyhow!(
            "Timeout too long: {} seconds (maximum: {})",
            timeout_seconds,
            MAX_TIMEOUT
        ));
    }

    Ok(())
}

/// Validate the worker pool size
pub fn validate_pool_size(max_workers: usize) -> Result<()> {
    const MAX_WORKERS: usize = 1024;

    if max_workers == 0 {
        return Err(anyhow!("Worker pool size must be at least 1"));
    }

    if max_workers > MAX_WORKERS {
        return Err(anyhow!(
            "Worker pool too large: {} (maximum: {})",
            max_workers,
            MAX_WORKERS
        ));
    }

    Ok(())
}

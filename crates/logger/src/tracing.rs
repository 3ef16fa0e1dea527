use std::env::var;
use std::str::FromStr;

use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing with a default level taken from configuration.
///
/// Unknown level names fall back to `INFO`. `RUST_LOG` still takes
/// precedence over the configured level.
pub fn init_tracing_with_level(level: &str) {
    let parsed = LevelFilter::from_str(level).ok();
    initialize_tracing(parsed.unwrap_or(LevelFilter::INFO));

    if parsed.is_none() {
        warn!("Unknown log level {level:?}, using info");
    }
}

fn initialize_tracing(level: LevelFilter) {
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    // Missing RUST_LOG_FORMAT is the normal case, so no warning here.
    let log_format = var("RUST_LOG_FORMAT").unwrap_or_default();

    let log_layer = match log_format.as_str() {
        "json" => tracing_subscriber::fmt::layer().json().with_filter(env_filter).boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_filter(env_filter)
            .boxed(),
    };

    // A subscriber may already be installed (tests, embedding binaries).
    let _ = tracing_subscriber::registry().with(log_layer).try_init();
}

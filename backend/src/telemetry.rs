//! Telemetry initialization: tracing subscriber with an env-driven filter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "formwork_backend=debug,tower_http=debug";

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise `log_level` is used, and an empty or
/// unparsable level falls back to the crate default.
pub fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(build_filter(std::env::var("RUST_LOG").ok().as_deref(), log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn build_filter(rust_log: Option<&str>, log_level: &str) -> EnvFilter {
    rust_log
        .into_iter()
        .chain(Some(log_level))
        .filter(|directives| !directives.trim().is_empty())
        .find_map(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

//! Global `tracing` subscriber installation

use credstore_domain::LoggingConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber described by `config`.
///
/// `RUST_LOG`, when set and valid, replaces `config.level`. Returns `false`
/// when a global subscriber was already installed, in which case nothing
/// changes.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.json {
        let layer = fmt::layer().json().with_target(true).with_current_span(false);
        tracing::subscriber::set_global_default(registry.with(layer)).is_ok()
    } else {
        let layer = fmt::layer().with_target(true);
        tracing::subscriber::set_global_default(registry.with(layer)).is_ok()
    };

    if installed {
        tracing::debug!(level = %config.level, json = config.json, "tracing initialised");
    }
    installed
}

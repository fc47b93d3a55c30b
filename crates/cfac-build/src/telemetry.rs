//! Log setup for `cfac`.
//!
//! Logs go to stderr; stdout belongs to configure and make.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber for a build run.
///
/// `RUST_LOG` wins when set; otherwise everything at `level` and above is
/// shown. With `json`, each event is one JSON object per line. A second
/// call leaves the first subscriber in place.
pub fn init_tracing(json: bool, level: Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if json {
        registry.with(layer.json()).try_init()
    } else {
        registry.with(layer).try_init()
    };
    if installed.is_err() {
        tracing::debug!("Subscriber already installed");
    }
}

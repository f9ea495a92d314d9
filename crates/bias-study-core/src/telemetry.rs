//! Tracing setup for the `bias-study` binary.
//!
//! Logs always go to stderr. `bias-study validate` prints the fabrication
//! report on stdout and other commands print the paths they wrote, so stdout
//! must stay free of log lines for callers that pipe or capture it.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter from `RUST_LOG` when set, otherwise `level` for every target.
fn filter_for(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install the global subscriber: text lines by default, JSON lines when
/// `json` is set. Returns `false` if a subscriber was already installed.
pub fn init_tracing(json: bool, level: Level) -> bool {
    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });
    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter_for(level))
        .with(text_layer)
        .with(json_layer)
        .try_init()
        .is_ok()
}

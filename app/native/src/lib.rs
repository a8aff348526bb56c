//! Reel - actor-supervised timeline documents with hotkey watcher notification.
//!
//! A timeline is an ordered tree of items, each owned by its own actor and
//! supervised by a timeline actor that publishes every structural change.
//! Hotkeys track press/release state from key snapshots and notify
//! weakly-held watchers scoped by context.

pub mod actor;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod modules;
pub mod schema;

/// Installs the global `tracing` subscriber.
///
/// Filtering follows `RUST_LOG` and defaults to `info`. Output goes to
/// stderr so command output on stdout stays machine readable.
pub fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

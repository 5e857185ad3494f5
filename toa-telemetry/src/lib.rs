//! # toa-telemetry
//!
//! Tracing setup for the Tree of Approach tools.
//!
//! - [`init_telemetry`] - human-readable logs on stderr
//! - [`init_json`] - JSON lines, one object per event
//! - [`capture_subscriber`] - a subscriber that records events in memory,
//!   for tests that assert something was logged
//!
//! All initialisers honour `RUST_LOG` and default to `info`.

pub mod memory;

#[cfg(test)]
mod test_capture;

pub use memory::{CapturedEvent, EventCapture, SharedEventStorage};

use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a global `fmt` subscriber writing to stderr.
///
/// Fails if a global subscriber is already set.
pub fn init_telemetry(service_name: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .try_init()?;
    tracing::debug!(service.name = service_name, "telemetry initialized");
    Ok(())
}

/// Install a global subscriber emitting JSON lines on stderr.
pub fn init_json(service_name: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_current_span(true).with_writer(std::io::stderr))
        .try_init()?;
    tracing::debug!(service.name = service_name, "telemetry initialized");
    Ok(())
}

/// A subscriber that records every event into `storage`, unfiltered.
///
/// Meant for `tracing::subscriber::set_default` in tests, so concurrent
/// tests do not share captured events.
pub fn capture_subscriber(storage: SharedEventStorage) -> impl Subscriber + Send + Sync {
    tracing_subscriber::registry().with(EventCapture::new(storage))
}

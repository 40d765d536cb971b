//! Tracing setup for binaries and tests embedding the resolver.
//!
//! The resolver itself only emits `tracing` events; installing a subscriber is
//! left to the application. [`init_tracing`] is a ready-made one.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

const DEFAULT_FILTER: &str = "info";

/// Installs a console subscriber filtered by `RUST_LOG` (default `info`)
///
/// Calling this more than once, or after another global subscriber was set,
/// leaves the existing subscriber in place.
pub fn init_tracing() {
    TRACING_INITIALIZED.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_filter(filter),
        );

        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized");
        }
    });
}

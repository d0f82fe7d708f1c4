//! Tracing setup for the `sklint` binary.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static INIT: Once = Once::new();

/// Installs the global subscriber, writing to stderr so stdout stays
/// machine-readable.
///
/// Levels come from `SKLINT_LOG` (e.g. `SKLINT_LOG=sklint::host=debug`),
/// falling back to `sklint=info`. Safe to call more than once.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env("SKLINT_LOG").unwrap_or_else(|_| EnvFilter::new("sklint=info"));

        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .with(filter)
            .try_init();
    });
}

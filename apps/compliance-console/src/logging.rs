//! Logging setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber
///
/// `RUST_LOG` wins unless `verbose` is set. Returns `false` when a subscriber
/// was already installed, which leaves the existing one in place.
pub fn init(verbose: bool) -> bool {
    let filter = if verbose {
        EnvFilter::new("compliance_console=debug,compliance_client=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}

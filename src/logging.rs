//! Logging setup for hosts that do not install their own subscriber.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Installs a global `fmt` subscriber filtered by `RUST_LOG`, falling back
/// to `default_directive` (for example `"scan_jobs=debug"`).
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(default_directive: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_fails() {
        // The first call may lose to a subscriber installed elsewhere.
        let _ = init_logging("scan_jobs=debug");
        assert!(init_logging("scan_jobs=debug").is_err());
    }
}

//! Structured logging setup

use mockrtc_core::{MockRtcError, MockRtcResult};
use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set. Returns `Ok(false)` if a
/// global subscriber was already installed, which is common when several
/// tests in one binary each initialize logging.
pub fn init_logging(default_filter: &str) -> MockRtcResult<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter).map_err(|e| MockRtcError::Configuration {
            reason: format!("invalid log filter '{}': {}", default_filter, e),
        })?,
    };

    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok())
}

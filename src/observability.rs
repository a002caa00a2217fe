//! Observability: structured logging initialization.
//!
//! An `EnvFilter`
//! seeded from `RUST_LOG` with a crate-specific default directive, plus an
//! optional JSON formatter for production deployments. The session
//! communication log (`orchestrator::communication_log`) is a separate,
//! UI-facing structure and is not routed through `tracing`.

use tracing_subscriber::EnvFilter;

/// Initialize the global `tracing` subscriber.
///
/// # Errors
///
/// Returns an error if the default filter directive fails to parse, or if
/// a global subscriber has already been installed.
pub fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("eol_sentinel=info,tower_http=info"));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;
    }

    Ok(())
}

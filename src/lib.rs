//! Precinct-level election ledger
//!
//! Resolves scanned marks to candidates, stores ballots, tallies them with
//! overvote exclusion, and seals a precinct's result once its board of
//! inspectors has signed. [`ElectionLedger`] is the entry point; everything
//! else is usable on its own against any [`store::ElectionStore`].

pub mod attestation;
pub mod capture;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod locks;
pub mod mapping;
pub mod precinct;
pub mod store;
pub mod tally;
pub mod types;

// Re-export commonly used types
pub use errors::{Error, Result};
pub use ledger::ElectionLedger;

use config::LoggingConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging from `RUST_LOG`, defaulting to `ledger=info`
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledger=info".into()),
        )
        .try_init()
        .map_err(|e| Error::internal(format!("Failed to initialize logging: {e}")))?;

    tracing::info!("🗳️  Precinct ledger v{} initialized", VERSION);
    Ok(())
}

/// Initialize logging from configuration (`LOG_LEVEL`, `LOG_FORMAT`)
pub fn init_with(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("ledger={}", logging.level).into());

    let installed = match logging.format.as_str() {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init(),
        _ => tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(filter)
            .try_init(),
    };
    installed.map_err(|e| Error::internal(format!("Failed to initialize logging: {e}")))?;

    tracing::info!(format = %logging.format, "🗳️  Precinct ledger v{} initialized", VERSION);
    Ok(())
}

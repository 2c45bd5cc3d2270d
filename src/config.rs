//! Configuration management for the precinct ledger
//!
//! Loads configuration from environment variables (and a `.env` file when
//! present) with validation.

use crate::attestation::export::ExportPayload;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which [`crate::store::ElectionStore`] implementation to construct
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local maps; contents vanish with the process
    Memory,
    /// SQLite database file
    Sqlite,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Database file, required for [`StoreBackend::Sqlite`]
    pub database_path: Option<PathBuf>,
}

impl StoreConfig {
    /// Load storage configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let backend = match std::env::var("LEDGER_STORE")
            .unwrap_or_else(|_| "memory".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            "sqlite" => StoreBackend::Sqlite,
            other => {
                return Err(Error::internal(format!(
                    "Invalid LEDGER_STORE '{other}', expected 'memory' or 'sqlite'"
                )));
            }
        };

        let database_path = std::env::var("LEDGER_DATABASE_PATH").ok().map(PathBuf::from);

        if backend == StoreBackend::Sqlite && database_path.is_none() {
            return Err(Error::internal(
                "LEDGER_DATABASE_PATH environment variable required for sqlite store",
            ));
        }

        Ok(Self {
            backend,
            database_path,
        })
    }

    pub fn memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            database_path: None,
        }
    }

    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            database_path: Some(path.into()),
        }
    }
}

/// Where and how finalized election returns are exported
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub directory: PathBuf,
    pub payload: ExportPayload,
}

impl ExportConfig {
    /// Load export configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let directory = std::env::var("LEDGER_EXPORT_DIR")
            .unwrap_or_else(|_| "./storage/election-returns".to_string())
            .into();

        let payload = std::env::var("LEDGER_EXPORT_PAYLOAD")
            .unwrap_or_else(|_| "full".to_string())
            .parse()
            .map_err(|_| {
                Error::internal("Invalid LEDGER_EXPORT_PAYLOAD, expected 'minimal' or 'full'")
            })?;

        Ok(Self { directory, payload })
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub store: StoreConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,

    /// Length of generated election return codes
    pub return_code_length: usize,
}

impl LedgerConfig {
    /// Load configuration from environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store = StoreConfig::from_env()?;
        let export = ExportConfig::from_env()?;

        let logging = LoggingConfig {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
        };

        let return_code_length = std::env::var("LEDGER_RETURN_CODE_LENGTH")
            .unwrap_or_else(|_| "12".to_string())
            .parse()
            .map_err(|_| Error::internal("Invalid LEDGER_RETURN_CODE_LENGTH"))?;

        if return_code_length == 0 {
            return Err(Error::internal("LEDGER_RETURN_CODE_LENGTH must be at least 1"));
        }

        Ok(Self {
            store,
            export,
            logging,
            return_code_length,
        })
    }

    /// Create configuration for testing
    pub fn for_testing() -> Self {
        let directory = std::env::temp_dir()
            .join("precinct-ledger-tests")
            .join(uuid::Uuid::new_v4().to_string());

        Self {
            store: StoreConfig::memory(),
            export: ExportConfig {
                directory,
                payload: ExportPayload::Full,
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: "pretty".to_string(),
            },
            return_code_length: 12,
        }
    }
}

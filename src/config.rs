//! Configuration management for the Shelby uploader

use serde::Deserialize;
use std::env;
use std::time::Duration;
use thiserror::Error;

pub const SIGNER_URL_VAR: &str = "SHELBY_SIGNER_URL";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var} must be a number of seconds, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub ledger: LedgerConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Shelby RPC base; blobs live under `{rpc_endpoint}/v1/blobs/...`
    pub rpc_endpoint: String,
    /// Per-attempt bound on a blob `PUT`
    pub transfer_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Wallet signer service that signs and submits transactions
    pub signer_url: Option<String>,
    pub submit_timeout_secs: u64,
    pub explorer_url: String,
    pub network: String,
    /// Account used when `--owner` is not given
    pub default_owner: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

impl StorageConfig {
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }
}

impl LedgerConfig {
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    /// Signer endpoint; only commands that register blobs need it
    pub fn signer_url(&self) -> Result<&str, ConfigError> {
        self.signer_url
            .as_deref()
            .ok_or(ConfigError::Missing(SIGNER_URL_VAR))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage: StorageConfig {
                rpc_endpoint: "https://api.shelbynet.shelby.xyz/shelby".to_string(),
                transfer_timeout_secs: 300,
            },
            ledger: LedgerConfig {
                signer_url: None,
                submit_timeout_secs: 120,
                explorer_url: "https://explorer.aptoslabs.com".to_string(),
                network: "shelbynet".to_string(),
                default_owner: None,
            },
            database: DatabaseConfig {
                url: "sqlite:./shelby_uploads.db".to_string(),
            },
        }
    }
}

impl Config {
    /// Read configuration from the environment
    ///
    /// Unset variables fall back to the shelbynet defaults. A missing
    /// `SHELBY_SIGNER_URL` is reported only when a signer is needed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let secs = |key: &'static str, default: u64| match var(key) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidNumber { var: key, value }),
            None => Ok(default),
        };

        Ok(Config {
            storage: StorageConfig {
                rpc_endpoint: var("SHELBY_RPC_ENDPOINT").unwrap_or(defaults.storage.rpc_endpoint),
                transfer_timeout_secs: secs(
                    "SHELBY_TRANSFER_TIMEOUT_SECS",
                    defaults.storage.transfer_timeout_secs,
                )?,
            },
            ledger: LedgerConfig {
                signer_url: var(SIGNER_URL_VAR),
                submit_timeout_secs: secs(
                    "SHELBY_SUBMIT_TIMEOUT_SECS",
                    defaults.ledger.submit_timeout_secs,
                )?,
                explorer_url: var("SHELBY_EXPLORER_URL").unwrap_or(defaults.ledger.explorer_url),
                network: var("SHELBY_NETWORK").unwrap_or(defaults.ledger.network),
                default_owner: var("SHELBY_OWNER"),
            },
            database: DatabaseConfig {
                url: var("DATABASE_URL").unwrap_or(defaults.database.url),
            },
        })
    }
}

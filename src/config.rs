//! Runtime configuration, read from `LEDGER_*` environment variables.

use thiserror::Error;

use crate::blockchain::Difficulty;

use std::env;
use std::str::FromStr;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Mining and nonce settings for a ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Required hex prefix of every mining hash
    pub difficulty: String,

    /// Upper bound on nonces tried per append, `None` for unbounded
    pub max_iterations: Option<u64>,

    /// Seed for starting nonces; random when unset
    pub nonce_seed: Option<u64>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            difficulty: Difficulty::default().to_string(),
            max_iterations: Some(100_000_000),
            nonce_seed: None,
        }
    }
}

impl LedgerConfig {
    /// Reads `LEDGER_DIFFICULTY`, `LEDGER_MAX_ITERATIONS` (0 means unbounded)
    /// and `LEDGER_NONCE_SEED`, falling back to the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = LedgerConfig::default();

        let difficulty = env::var("LEDGER_DIFFICULTY").unwrap_or(defaults.difficulty);

        let max_iterations = match parse_var::<u64>("LEDGER_MAX_ITERATIONS")? {
            Some(0) => None,
            Some(max) => Some(max),
            None => defaults.max_iterations,
        };

        let nonce_seed = parse_var::<u64>("LEDGER_NONCE_SEED")?;

        Ok(LedgerConfig {
            difficulty,
            max_iterations,
            nonce_seed,
        })
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Replay the sample transfers at startup
    pub demo: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            demo: false,
        }
    }
}

impl ServerConfig {
    /// Reads `LEDGER_HOST`, `LEDGER_PORT` and `LEDGER_DEMO`
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = ServerConfig::default();

        Ok(ServerConfig {
            host: env::var("LEDGER_HOST").unwrap_or(defaults.host),
            port: parse_var("LEDGER_PORT")?.unwrap_or(defaults.port),
            demo: parse_var("LEDGER_DEMO")?.unwrap_or(defaults.demo),
        })
    }
}

fn parse_var<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) => parse_value(key, &value).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

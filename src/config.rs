use std::env;
use std::thread;

use crate::blockchain::{DEFAULT_DIFFICULTY_PREFIX, LedgerConfig};
use crate::error::{LedgerError, Result};

/// Process configuration, read from the environment (a `.env` file is loaded first by the binary).
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub difficulty_prefix: String,
    /// Worker threads for proof-of-work jobs.
    pub miner_threads: usize,
    pub max_pow_attempts: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            difficulty_prefix: DEFAULT_DIFFICULTY_PREFIX.to_string(),
            miner_threads: default_miner_threads(),
            max_pow_attempts: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("HOST").unwrap_or(defaults.host);
        let port = match lookup("PORT") {
            Some(v) => parse_var("PORT", &v)?,
            None => defaults.port,
        };
        let difficulty_prefix = lookup("DIFFICULTY_PREFIX").unwrap_or(defaults.difficulty_prefix);
        let miner_threads = match lookup("MINER_THREADS") {
            Some(v) => match parse_var::<usize>("MINER_THREADS", &v)? {
                0 => return Err(LedgerError::Config("MINER_THREADS must be > 0".into())),
                n => n,
            },
            None => defaults.miner_threads,
        };
        let max_pow_attempts = match lookup("MAX_POW_ATTEMPTS") {
            Some(v) if !v.trim().is_empty() => Some(parse_var("MAX_POW_ATTEMPTS", &v)?),
            _ => None,
        };

        Ok(Self {
            host,
            port,
            difficulty_prefix,
            miner_threads,
            max_pow_attempts,
        })
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            difficulty_prefix: self.difficulty_prefix.clone(),
            max_pow_attempts: self.max_pow_attempts,
        }
    }
}

fn default_miner_threads() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| LedgerError::Config(format!("{key} has invalid value {raw:?}")))
}

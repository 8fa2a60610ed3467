use thiserror::Error;

use crate::blockchain::ChainFault;

/// Errors surfaced by the ledger core and its collaborators.
///
/// Chain-linkage defects found while walking a live chain are not errors: `validate_chain`
/// reports them as a [`ChainFault`] value. `InvalidChain` only appears when a snapshot is
/// restored and refuses to load.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid rating: {0}")]
    InvalidRating(String),

    #[error("invalid difficulty prefix {0:?} (expected lower-case hex digits)")]
    InvalidDifficulty(String),

    #[error("transaction id {0} is already pending")]
    DuplicateId(u64),

    #[error("mining cancelled")]
    MiningCancelled,

    #[error("no proof found within {0} attempts")]
    IterationLimit(u64),

    #[error("chain rejected: {0}")]
    InvalidChain(ChainFault),

    #[error("miner unavailable: {0}")]
    MinerUnavailable(String),

    #[error("unknown content id {0}")]
    UnknownContent(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

use serde::{Deserialize, Serialize};

use super::Block;
use crate::transaction::Transaction;

/// Read-only view of a ledger: what `export_state` returns and what gets archived.
/// Blocks serialize with their computed `hash`; it is ignored when read back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub length: usize,
    pub chain: Vec<Block>,
    pub mempool: Vec<Transaction>,
    pub difficulty_prefix: String,
}

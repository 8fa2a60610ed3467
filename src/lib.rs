//! Append-only proof-of-work ledger: a transaction pool, hash-chained blocks and the
//! proof search that admits each new block, with an HTTP surface on top.

pub mod api;
pub mod archive;
pub mod attack;
pub mod blockchain;
pub mod clock;
pub mod config;
pub mod error;
pub mod transaction;

pub use blockchain::{Block, ChainFault, ChainSnapshot, Ledger, LedgerConfig, MineOptions};
pub use error::{LedgerError, Result};
pub use transaction::{Transaction, TxOptions};

pub mod block;
pub mod miner;
pub mod model;
pub mod pow;
pub mod snapshot;
pub mod validation;

pub use block::{Block, BlockOptions};
pub use miner::{MinerPool, MiningJob};
pub use model::{Ledger, LedgerConfig, MineOptions};
pub use pow::{CancelFlag, Solution};
pub use snapshot::ChainSnapshot;
pub use validation::{ChainFault, FaultKind, validate_blocks};

/// Default difficulty: four leading hex zeros.
pub const DEFAULT_DIFFICULTY_PREFIX: &str = "0000";

/// Proof carried by the genesis block.
pub const GENESIS_PROOF: u64 = 100;

/// `previous_hash` sentinel of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "1";

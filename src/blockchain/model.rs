use log::{debug, info, warn};
use parking_lot::Mutex;
use std::mem;
use std::sync::Arc;

use super::pow::{self, CancelFlag};
use super::validation::{ChainFault, validate_blocks};
use super::{
    Block, BlockOptions, ChainSnapshot, DEFAULT_DIFFICULTY_PREFIX, GENESIS_PREVIOUS_HASH,
    GENESIS_PROOF,
};
use crate::clock::{IdGenerator, MillisIdGenerator, unix_timestamp};
use crate::error::{LedgerError, Result};
use crate::transaction::{Transaction, TxOptions};

/// Ledger-wide settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    /// Required leading hex digits of every proof guess hash.
    pub difficulty_prefix: String,
    /// Give up a proof search after this many candidates. `None` searches forever.
    pub max_pow_attempts: Option<u64>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty_prefix: DEFAULT_DIFFICULTY_PREFIX.to_string(),
            max_pow_attempts: None,
        }
    }
}

/// Who mined a block and why.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MineOptions {
    pub miner: String,
    pub notes: String,
}

#[derive(Debug)]
struct ChainState {
    chain: Vec<Block>,
    mempool: Vec<Transaction>,
}

impl ChainState {
    fn tail(&self) -> &Block {
        self.chain
            .last()
            .expect("Ledger should always have at least the genesis block")
    }

    fn is_pending(&self, id: u64) -> bool {
        self.mempool.iter().any(|tx| tx.id() == id)
    }
}

/// In-memory append-only ledger: committed blocks plus the pending-transaction pool.
///
/// Share it as `Arc<Ledger>`. Chain and mempool sit behind one lock that is never held
/// during a proof search.
pub struct Ledger {
    state: Mutex<ChainState>,
    difficulty_prefix: String,
    max_pow_attempts: Option<u64>,
    ids: Arc<dyn IdGenerator>,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("state", &self.state)
            .field("difficulty_prefix", &self.difficulty_prefix)
            .field("max_pow_attempts", &self.max_pow_attempts)
            .finish_non_exhaustive()
    }
}

impl Ledger {
    /// New ledger with a genesis block and millisecond-clock ids.
    pub fn new(config: LedgerConfig) -> Result<Self> {
        Self::with_id_generator(config, Arc::new(MillisIdGenerator::new()))
    }

    pub fn with_id_generator(config: LedgerConfig, ids: Arc<dyn IdGenerator>) -> Result<Self> {
        check_prefix(&config.difficulty_prefix)?;

        let genesis = Block::new(
            1,
            unix_timestamp(),
            Vec::new(),
            GENESIS_PROOF,
            GENESIS_PREVIOUS_HASH.to_string(),
            BlockOptions::default(),
            ids.as_ref(),
        );
        debug!("LEDGER - genesis {}", genesis.hash());

        Ok(Self {
            state: Mutex::new(ChainState {
                chain: vec![genesis],
                mempool: Vec::new(),
            }),
            difficulty_prefix: config.difficulty_prefix,
            max_pow_attempts: config.max_pow_attempts,
            ids,
        })
    }

    /// Rebuild a ledger from an exported snapshot. The chain must validate under the
    /// snapshot's own difficulty prefix; pending transactions are restored as they were.
    pub fn restore(
        snapshot: ChainSnapshot,
        max_pow_attempts: Option<u64>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self> {
        check_prefix(&snapshot.difficulty_prefix)?;
        validate_blocks(&snapshot.chain, &snapshot.difficulty_prefix)
            .map_err(LedgerError::InvalidChain)?;
        if snapshot.length != snapshot.chain.len() {
            warn!(
                "LEDGER - snapshot declares length {} but carries {} blocks",
                snapshot.length,
                snapshot.chain.len()
            );
        }
        info!(
            "LEDGER - restored {} blocks, {} pending transactions",
            snapshot.chain.len(),
            snapshot.mempool.len()
        );

        Ok(Self {
            state: Mutex::new(ChainState {
                chain: snapshot.chain,
                mempool: snapshot.mempool,
            }),
            difficulty_prefix: snapshot.difficulty_prefix,
            max_pow_attempts,
            ids,
        })
    }

    pub fn difficulty_prefix(&self) -> &str {
        &self.difficulty_prefix
    }

    pub fn len(&self) -> usize {
        self.state.lock().chain.len()
    }

    /// Always false: the genesis block exists from construction.
    pub fn is_empty(&self) -> bool {
        self.state.lock().chain.is_empty()
    }

    pub fn mempool_len(&self) -> usize {
        self.state.lock().mempool.len()
    }

    /// Copy of the current tail block.
    pub fn last_block(&self) -> Block {
        self.state.lock().tail().clone()
    }

    /// Queue a transaction for the next block. Returns the index of that block.
    ///
    /// Ids are unique within the mempool: a caller-chosen id that is already pending is
    /// rejected, a generated one that collides is skipped. Nothing else is checked beyond
    /// the fields being well formed.
    pub fn submit_transaction(
        &self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: f64,
        opts: TxOptions,
    ) -> Result<u64> {
        let mut state = self.state.lock();
        let id = match opts.id {
            Some(id) if state.is_pending(id) => return Err(LedgerError::DuplicateId(id)),
            Some(id) => id,
            None => loop {
                let id = self.ids.next_id();
                if !state.is_pending(id) {
                    break id;
                }
                debug!("LEDGER - generated tx id {id} is already pending, skipping");
            },
        };
        let tx = Transaction::new(
            sender,
            recipient,
            amount,
            TxOptions {
                id: Some(id),
                ..opts
            },
            self.ids.as_ref(),
        )?;

        let next_index = state.tail().index() + 1;
        debug!(
            "LEDGER - tx {} {} -> {} ({}) queued for block #{} (mempool {})",
            tx.id(),
            tx.sender(),
            tx.recipient(),
            tx.amount(),
            next_index,
            state.mempool.len() + 1
        );
        state.mempool.push(tx);
        Ok(next_index)
    }

    /// Find a proof on top of the current tail and seal the mempool into a new block.
    pub fn mine(&self, opts: MineOptions) -> Result<Block> {
        self.mine_with_cancel(opts, &CancelFlag::new())
    }

    /// Like [`Ledger::mine`], stopping without any change to chain or mempool once
    /// `cancel` is raised.
    ///
    /// The search runs unlocked. If another miner extended the chain meanwhile, the
    /// proof is stale and the search restarts against the new tail.
    pub fn mine_with_cancel(&self, opts: MineOptions, cancel: &CancelFlag) -> Result<Block> {
        loop {
            let (last_index, last_proof, last_hash) = {
                let state = self.state.lock();
                let tail = state.tail();
                (tail.index(), tail.proof(), tail.hash())
            };

            let solution = pow::solve_with(
                last_proof,
                &last_hash,
                &self.difficulty_prefix,
                cancel,
                self.max_pow_attempts,
            )?;
            debug!(
                "MINER - proof {} over block #{} after {} attempts",
                solution.proof, last_index, solution.attempts
            );

            let mut state = self.state.lock();
            if cancel.is_cancelled() {
                return Err(LedgerError::MiningCancelled);
            }
            let tail = state.tail();
            if tail.index() != last_index {
                debug!(
                    "MINER - tail moved from #{} to #{}, searching again",
                    last_index,
                    tail.index()
                );
                continue;
            }

            let transactions = mem::take(&mut state.mempool);
            let block = Block::new(
                last_index + 1,
                unix_timestamp(),
                transactions,
                solution.proof,
                last_hash,
                BlockOptions {
                    miner: opts.miner,
                    notes: opts.notes,
                    ..BlockOptions::default()
                },
                self.ids.as_ref(),
            );
            state.chain.push(block.clone());
            drop(state);

            info!(
                "MINER - sealed block #{} (proof={}, txs={}, hash={})",
                block.index(),
                block.proof(),
                block.transactions().len(),
                block.hash()
            );
            return Ok(block);
        }
    }

    /// Length, every block, pending transactions and difficulty, copied out.
    pub fn export_state(&self) -> ChainSnapshot {
        let state = self.state.lock();
        ChainSnapshot {
            length: state.chain.len(),
            chain: state.chain.clone(),
            mempool: state.mempool.clone(),
            difficulty_prefix: self.difficulty_prefix.clone(),
        }
    }

    /// Pending transactions, copied out.
    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.state.lock().mempool.clone()
    }

    /// Verify every link and proof from genesis to tail.
    pub fn validate_chain(&self) -> std::result::Result<(), ChainFault> {
        let chain = self.state.lock().chain.clone();
        let outcome = validate_blocks(&chain, &self.difficulty_prefix);
        if let Err(fault) = &outcome {
            warn!("LEDGER - chain validation failed: {fault}");
        }
        outcome
    }
}

fn check_prefix(prefix: &str) -> Result<()> {
    if pow::is_valid_prefix(prefix) {
        Ok(())
    } else {
        Err(LedgerError::InvalidDifficulty(prefix.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SequentialIdGenerator;

    fn ledger(prefix: &str) -> Ledger {
        Ledger::with_id_generator(
            LedgerConfig {
                difficulty_prefix: prefix.to_string(),
                max_pow_attempts: None,
            },
            Arc::new(SequentialIdGenerator::starting_at(1)),
        )
        .unwrap()
    }

    #[test]
    fn starts_with_genesis() {
        let l = ledger("0");
        assert_eq!(l.len(), 1);
        assert!(!l.is_empty());
        let g = l.last_block();
        assert_eq!(g.index(), 1);
        assert_eq!(g.proof(), GENESIS_PROOF);
        assert_eq!(g.previous_hash(), "1");
        assert!(g.transactions().is_empty());
    }

    #[test]
    fn rejects_non_hex_prefix() {
        let err = Ledger::new(LedgerConfig {
            difficulty_prefix: "zz".into(),
            max_pow_attempts: None,
        })
        .unwrap_err();
        assert_eq!(err, LedgerError::InvalidDifficulty("zz".into()));
    }

    #[test]
    fn submit_returns_next_block_index() {
        let l = ledger("0");
        assert_eq!(l.submit_transaction("a", "b", 1.0, TxOptions::default()).unwrap(), 2);
        assert_eq!(l.submit_transaction("b", "c", 2.0, TxOptions::default()).unwrap(), 2);
        assert_eq!(l.mempool_len(), 2);
        l.mine(MineOptions::default()).unwrap();
        assert_eq!(l.submit_transaction("c", "d", 3.0, TxOptions::default()).unwrap(), 3);
    }

    #[test]
    fn submit_rejects_bad_amount_without_touching_mempool() {
        let l = ledger("0");
        let err = l
            .submit_transaction("a", "b", f64::NAN, TxOptions::default())
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
        assert_eq!(l.mempool_len(), 0);
    }

    #[test]
    fn repeated_caller_id_is_rejected() {
        let l = ledger("0");
        let opts = || TxOptions {
            id: Some(7),
            ..TxOptions::default()
        };
        l.submit_transaction("a", "b", 1.0, opts()).unwrap();
        let err = l.submit_transaction("c", "d", 2.0, opts()).unwrap_err();
        assert_eq!(err, LedgerError::DuplicateId(7));
        assert_eq!(l.mempool_len(), 1);

        // Once sealed, the id is free again for the next block.
        l.mine(MineOptions::default()).unwrap();
        assert_eq!(l.submit_transaction("c", "d", 2.0, opts()).unwrap(), 3);
    }

    #[test]
    fn generated_id_skips_caller_chosen_one() {
        // Genesis took id 1, so the generator hands out 2 next.
        let l = ledger("0");
        let chosen = TxOptions {
            id: Some(2),
            ..TxOptions::default()
        };
        l.submit_transaction("a", "b", 1.0, chosen).unwrap();
        l.submit_transaction("b", "c", 1.0, TxOptions::default()).unwrap();

        let block = l.mine(MineOptions::default()).unwrap();
        let ids: Vec<u64> = block.transactions().iter().map(Transaction::id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn mine_seals_and_clears_mempool() {
        let l = ledger("0");
        l.submit_transaction("a", "b", 1.0, TxOptions::default()).unwrap();
        let genesis_hash = l.last_block().hash();

        let block = l
            .mine(MineOptions {
                miner: "m1".into(),
                notes: "first".into(),
            })
            .unwrap();

        assert_eq!(block.index(), 2);
        assert_eq!(block.previous_hash(), genesis_hash);
        assert_eq!(block.transactions().len(), 1);
        assert_eq!(block.miner(), "m1");
        assert_eq!(block.notes(), "first");
        assert_eq!(l.mempool_len(), 0);
        assert_eq!(l.last_block(), block);
        assert_eq!(l.validate_chain(), Ok(()));
    }

    #[test]
    fn cancelled_mine_changes_nothing() {
        let l = Ledger::with_id_generator(
            LedgerConfig {
                difficulty_prefix: "0000000000".into(),
                max_pow_attempts: None,
            },
            Arc::new(SequentialIdGenerator::starting_at(1)),
        )
        .unwrap();
        l.submit_transaction("a", "b", 1.0, TxOptions::default()).unwrap();
        let before = l.export_state();

        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = l.mine_with_cancel(MineOptions::default(), &cancel).unwrap_err();

        assert_eq!(err, LedgerError::MiningCancelled);
        assert_eq!(l.export_state(), before);
    }

    #[test]
    fn attempt_cap_surfaces_as_error() {
        let l = Ledger::with_id_generator(
            LedgerConfig {
                difficulty_prefix: "0000000000".into(),
                max_pow_attempts: Some(100),
            },
            Arc::new(SequentialIdGenerator::starting_at(1)),
        )
        .unwrap();
        assert_eq!(
            l.mine(MineOptions::default()).unwrap_err(),
            LedgerError::IterationLimit(100)
        );
        assert_eq!(l.len(), 1);
    }

    #[test]
    fn restore_round_trips_through_json() {
        let l = ledger("0");
        l.submit_transaction("a", "b", 1.0, TxOptions::default()).unwrap();
        l.mine(MineOptions::default()).unwrap();
        l.submit_transaction("b", "c", 2.0, TxOptions::default()).unwrap();

        let text = serde_json::to_string(&l.export_state()).unwrap();
        let snapshot: ChainSnapshot = serde_json::from_str(&text).unwrap();
        let ids = Arc::new(SequentialIdGenerator::starting_at(100));
        let restored = Ledger::restore(snapshot, None, ids).unwrap();

        assert_eq!(restored.export_state(), l.export_state());
        assert_eq!(restored.validate_chain(), Ok(()));
    }

    #[test]
    fn restore_rejects_broken_chain() {
        let l = ledger("0");
        l.mine(MineOptions::default()).unwrap();
        l.mine(MineOptions::default()).unwrap();

        let mut json = serde_json::to_value(l.export_state()).unwrap();
        json["chain"][1]["timestamp"] = 1.5.into();
        let snapshot: ChainSnapshot = serde_json::from_value(json).unwrap();

        let err = Ledger::restore(snapshot, None, Arc::new(SequentialIdGenerator::starting_at(1)))
            .unwrap_err();
        match err {
            LedgerError::InvalidChain(fault) => assert_eq!(fault.index, 3),
            other => panic!("unexpected error {other:?}"),
        }
    }
}

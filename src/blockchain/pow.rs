//! Proof-of-work: find `proof` such that
//! `sha256("{last_proof}{proof}{last_hash}")` in hex starts with the difficulty prefix.

use log::debug;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{LedgerError, Result};

/// How many attempts run between two looks at the cancel flag.
pub const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// Cooperative cancellation shared between a running search and whoever may stop it.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A proof plus the number of candidates tried to reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Solution {
    pub proof: u64,
    pub attempts: u64,
}

/// Hex digest of the guess string for `proof`.
pub fn guess_hash(last_proof: u64, proof: u64, last_hash: &str) -> String {
    let guess = format!("{last_proof}{proof}{last_hash}");
    hex::encode(Sha256::digest(guess.as_bytes()))
}

/// Check a claimed proof without searching.
pub fn valid_proof(last_proof: u64, proof: u64, last_hash: &str, difficulty_prefix: &str) -> bool {
    guess_hash(last_proof, proof, last_hash).starts_with(difficulty_prefix)
}

/// Unbounded search from `proof = 0`.
pub fn solve(last_proof: u64, last_hash: &str, difficulty_prefix: &str) -> Solution {
    let mut proof = 0u64;
    while !valid_proof(last_proof, proof, last_hash, difficulty_prefix) {
        proof += 1;
    }
    Solution {
        proof,
        attempts: proof + 1,
    }
}

/// Same search as [`solve`], but stops early when `cancel` is raised or after
/// `max_attempts` candidates.
pub fn solve_with(
    last_proof: u64,
    last_hash: &str,
    difficulty_prefix: &str,
    cancel: &CancelFlag,
    max_attempts: Option<u64>,
) -> Result<Solution> {
    // The `last_proof` part of the guess never changes; hash it once and fork the state.
    let mut seed = Sha256::new();
    seed.update(last_proof.to_string().as_bytes());

    let mut proof = 0u64;
    loop {
        if proof % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
            debug!("POW - cancelled after {proof} attempts");
            return Err(LedgerError::MiningCancelled);
        }
        if let Some(limit) = max_attempts {
            if proof >= limit {
                return Err(LedgerError::IterationLimit(limit));
            }
        }

        let mut hasher = seed.clone();
        hasher.update(proof.to_string().as_bytes());
        hasher.update(last_hash.as_bytes());
        if hex::encode(hasher.finalize()).starts_with(difficulty_prefix) {
            return Ok(Solution {
                proof,
                attempts: proof + 1,
            });
        }

        proof = proof
            .checked_add(1)
            .ok_or(LedgerError::IterationLimit(u64::MAX))?;
    }
}

/// A prefix is usable only if a hex digest could ever start with it.
pub fn is_valid_prefix(difficulty_prefix: &str) -> bool {
    difficulty_prefix
        .chars()
        .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

use std::fmt;

use super::pow::valid_proof;
use super::{Block, GENESIS_PREVIOUS_HASH};

/// What went wrong at the first bad block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultKind {
    EmptyChain,
    IndexMismatch { expected: u64, found: u64 },
    GenesisLink { found: String },
    PreviousHashMismatch { expected: String, found: String },
    InvalidProof { last_proof: u64, proof: u64 },
}

/// First integrity failure found while walking a chain from genesis.
/// `index` is the 1-based index of the block whose check failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainFault {
    pub index: u64,
    pub kind: FaultKind,
}

impl fmt::Display for ChainFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FaultKind::EmptyChain => write!(f, "chain has no genesis block"),
            FaultKind::IndexMismatch { expected, found } => write!(
                f,
                "block at position {} has index {found}, expected {expected}",
                self.index
            ),
            FaultKind::GenesisLink { found } => write!(
                f,
                "genesis block previous_hash is {found:?}, expected {GENESIS_PREVIOUS_HASH:?}"
            ),
            FaultKind::PreviousHashMismatch { expected, found } => write!(
                f,
                "block #{} previous_hash {found} does not match predecessor hash {expected}",
                self.index
            ),
            FaultKind::InvalidProof { last_proof, proof } => write!(
                f,
                "block #{} proof {proof} does not satisfy difficulty over last proof {last_proof}",
                self.index
            ),
        }
    }
}

/// Walk `blocks` from genesis to tail: positions must match indices, every block must
/// point at its predecessor's recomputed hash and carry a proof valid for it.
pub fn validate_blocks(blocks: &[Block], difficulty_prefix: &str) -> Result<(), ChainFault> {
    let Some(genesis) = blocks.first() else {
        return Err(ChainFault {
            index: 0,
            kind: FaultKind::EmptyChain,
        });
    };
    if genesis.previous_hash() != GENESIS_PREVIOUS_HASH {
        return Err(ChainFault {
            index: 1,
            kind: FaultKind::GenesisLink {
                found: genesis.previous_hash().to_string(),
            },
        });
    }

    for (pos, block) in blocks.iter().enumerate() {
        let expected = pos as u64 + 1;
        if block.index() != expected {
            return Err(ChainFault {
                index: expected,
                kind: FaultKind::IndexMismatch {
                    expected,
                    found: block.index(),
                },
            });
        }
        if pos == 0 {
            continue;
        }

        let prev = &blocks[pos - 1];
        let prev_hash = prev.hash();
        if block.previous_hash() != prev_hash {
            return Err(ChainFault {
                index: expected,
                kind: FaultKind::PreviousHashMismatch {
                    expected: prev_hash,
                    found: block.previous_hash().to_string(),
                },
            });
        }
        if !valid_proof(prev.proof(), block.proof(), &prev_hash, difficulty_prefix) {
            return Err(ChainFault {
                index: expected,
                kind: FaultKind::InvalidProof {
                    last_proof: prev.proof(),
                    proof: block.proof(),
                },
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::pow::solve;
    use crate::blockchain::{BlockOptions, GENESIS_PROOF};
    use crate::clock::SequentialIdGenerator;

    const PREFIX: &str = "0";

    fn build_chain(len: usize) -> Vec<Block> {
        let ids = SequentialIdGenerator::starting_at(1);
        let mut chain = vec![Block::new(
            1,
            1.0,
            Vec::new(),
            GENESIS_PROOF,
            GENESIS_PREVIOUS_HASH.to_string(),
            BlockOptions::default(),
            &ids,
        )];
        while chain.len() < len {
            let prev = chain.last().unwrap();
            let prev_hash = prev.hash();
            let sol = solve(prev.proof(), &prev_hash, PREFIX);
            let next = Block::new(
                prev.index() + 1,
                prev.timestamp() + 1.0,
                Vec::new(),
                sol.proof,
                prev_hash,
                BlockOptions::default(),
                &ids,
            );
            chain.push(next);
        }
        chain
    }

    #[test]
    fn well_formed_chain_passes() {
        assert_eq!(validate_blocks(&build_chain(4), PREFIX), Ok(()));
    }

    #[test]
    fn empty_chain_is_reported() {
        let fault = validate_blocks(&[], PREFIX).unwrap_err();
        assert_eq!(fault.kind, FaultKind::EmptyChain);
    }

    #[test]
    fn broken_link_is_reported_at_the_linking_block() {
        let mut chain = build_chain(4);
        let mut json = chain[1].to_json();
        json["timestamp"] = 99.0.into();
        chain[1] = serde_json::from_value(json).unwrap();

        let fault = validate_blocks(&chain, PREFIX).unwrap_err();
        assert_eq!(fault.index, 3);
        assert!(matches!(fault.kind, FaultKind::PreviousHashMismatch { .. }));
    }

    #[test]
    fn bad_proof_is_reported() {
        let mut chain = build_chain(3);
        let prev_hash = chain[1].hash();
        let bad_proof = (0..)
            .find(|p| !valid_proof(chain[1].proof(), *p, &prev_hash, PREFIX))
            .unwrap();
        let mut json = chain[2].to_json();
        json["proof"] = bad_proof.into();
        chain[2] = serde_json::from_value(json).unwrap();

        let fault = validate_blocks(&chain, PREFIX).unwrap_err();
        assert_eq!(fault.index, 3);
        assert!(matches!(fault.kind, FaultKind::InvalidProof { .. }));
    }

    #[test]
    fn index_gap_is_reported() {
        let mut chain = build_chain(3);
        chain.remove(1);
        let fault = validate_blocks(&chain, PREFIX).unwrap_err();
        assert_eq!(
            fault.kind,
            FaultKind::IndexMismatch {
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn genesis_must_use_sentinel() {
        let mut chain = build_chain(1);
        let mut json = chain[0].to_json();
        json["previous_hash"] = "0".into();
        chain[0] = serde_json::from_value(json).unwrap();
        let fault = validate_blocks(&chain, PREFIX).unwrap_err();
        assert_eq!(fault.index, 1);
        assert!(matches!(fault.kind, FaultKind::GenesisLink { .. }));
    }
}

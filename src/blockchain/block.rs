use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::clock::IdGenerator;
use crate::transaction::Transaction;

/// Optional fields for a new block, with their defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockOptions {
    /// When `None` the id generator assigns one.
    pub block_id: Option<u64>,
    pub rating: f64,
    pub miner: String,
    pub notes: String,
}

/// A sealed batch of transactions linked to its predecessor by hash.
///
/// Blocks are only built by the ledger and never change afterwards, so the hash is not
/// stored: [`Block::hash`] recomputes it from the content every time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Block {
    block_id: u64,
    index: u64,
    timestamp: f64,
    transactions: Vec<Transaction>,
    proof: u64,
    previous_hash: String,
    #[serde(default)]
    rating: f64,
    #[serde(default)]
    miner: String,
    #[serde(default)]
    notes: String,
}

/// Digest preimage. Keys are declared in lexicographic order and this field list is the
/// whole canonical form; metadata such as `miner` or `notes` is not covered by the hash.
#[derive(Serialize)]
struct CanonicalBlock<'a> {
    index: u64,
    previous_hash: &'a str,
    proof: u64,
    timestamp: f64,
    transactions: &'a [Transaction],
}

/// External representation, including the freshly computed hash.
#[derive(Serialize)]
struct BlockView<'a> {
    block_id: u64,
    index: u64,
    timestamp: f64,
    transactions: &'a [Transaction],
    proof: u64,
    previous_hash: &'a str,
    hash: String,
    rating: f64,
    miner: &'a str,
    notes: &'a str,
}

impl Block {
    /// The ledger is responsible for passing the right `index` and `previous_hash`;
    /// nothing is re-validated here.
    pub fn new(
        index: u64,
        timestamp: f64,
        transactions: Vec<Transaction>,
        proof: u64,
        previous_hash: String,
        opts: BlockOptions,
        ids: &dyn IdGenerator,
    ) -> Self {
        Self {
            block_id: opts.block_id.unwrap_or_else(|| ids.next_id()),
            index,
            timestamp,
            transactions,
            proof,
            previous_hash,
            rating: opts.rating,
            miner: opts.miner,
            notes: opts.notes,
        }
    }

    pub fn block_id(&self) -> u64 {
        self.block_id
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn proof(&self) -> u64 {
        self.proof
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn miner(&self) -> &str {
        &self.miner
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Canonical bytes the hash is computed over (compact JSON, fixed key order).
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let preimage = CanonicalBlock {
            index: self.index,
            previous_hash: &self.previous_hash,
            proof: self.proof,
            timestamp: self.timestamp,
            transactions: &self.transactions,
        };
        serde_json::to_vec(&preimage).expect("canonical block encoding")
    }

    /// SHA-256 of the canonical encoding, lower-case hex.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_bytes());
        hex::encode(hasher.finalize())
    }

    /// Full external form, `hash` included.
    pub fn to_json(&self) -> Value {
        let transactions: Vec<Value> = self.transactions.iter().map(Transaction::to_json).collect();
        json!({
            "block_id": self.block_id,
            "index": self.index,
            "timestamp": self.timestamp,
            "transactions": transactions,
            "proof": self.proof,
            "previous_hash": self.previous_hash,
            "hash": self.hash(),
            "rating": self.rating,
            "miner": self.miner,
            "notes": self.notes,
        })
    }
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        BlockView {
            block_id: self.block_id,
            index: self.index,
            timestamp: self.timestamp,
            transactions: &self.transactions,
            proof: self.proof,
            previous_hash: &self.previous_hash,
            hash: self.hash(),
            rating: self.rating,
            miner: &self.miner,
            notes: &self.notes,
        }
        .serialize(serializer)
    }
}

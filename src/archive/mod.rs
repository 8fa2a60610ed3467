//! Content-addressed archival of ledger snapshots.

use log::{debug, info};
use parking_lot::RwLock;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

use crate::blockchain::{ChainSnapshot, Ledger};
use crate::clock::unix_timestamp;
use crate::error::{LedgerError, Result};

/// Identifier of archived content, derived from the content bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveEntry {
    pub cid: ContentId,
    pub name: String,
    pub size: usize,
    pub pinned: bool,
    pub uploaded_at: f64,
}

/// Upload/retrieve/pin/list by content id.
pub trait ArchiveStore: Send + Sync {
    fn upload_json(&self, name: &str, payload: &Value) -> Result<ContentId>;
    fn retrieve_json(&self, cid: &ContentId) -> Result<Value>;
    fn pin(&self, cid: &ContentId) -> Result<()>;
    fn list(&self) -> Result<Vec<ArchiveEntry>>;
}

struct Stored {
    entry: ArchiveEntry,
    bytes: Vec<u8>,
}

/// Process-local store keyed by the SHA-256 of the uploaded bytes.
#[derive(Default)]
pub struct MemoryArchive {
    items: RwLock<HashMap<ContentId, Stored>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArchiveStore for MemoryArchive {
    fn upload_json(&self, name: &str, payload: &Value) -> Result<ContentId> {
        let bytes = serde_json::to_vec(payload)?;
        let cid = ContentId(hex::encode(Sha256::digest(&bytes)));

        let mut items = self.items.write();
        if let Some(existing) = items.get(&cid) {
            debug!("ARCHIVE - {cid} already stored as {:?}", existing.entry.name);
            return Ok(cid);
        }
        items.insert(
            cid.clone(),
            Stored {
                entry: ArchiveEntry {
                    cid: cid.clone(),
                    name: name.to_string(),
                    size: bytes.len(),
                    pinned: false,
                    uploaded_at: unix_timestamp(),
                },
                bytes,
            },
        );
        debug!("ARCHIVE - stored {name:?} as {cid}");
        Ok(cid)
    }

    fn retrieve_json(&self, cid: &ContentId) -> Result<Value> {
        let items = self.items.read();
        let stored = items
            .get(cid)
            .ok_or_else(|| LedgerError::UnknownContent(cid.to_string()))?;
        Ok(serde_json::from_slice(&stored.bytes)?)
    }

    fn pin(&self, cid: &ContentId) -> Result<()> {
        let mut items = self.items.write();
        let stored = items
            .get_mut(cid)
            .ok_or_else(|| LedgerError::UnknownContent(cid.to_string()))?;
        stored.entry.pinned = true;
        Ok(())
    }

    fn list(&self) -> Result<Vec<ArchiveEntry>> {
        let items = self.items.read();
        let mut entries: Vec<ArchiveEntry> = items.values().map(|s| s.entry.clone()).collect();
        entries.sort_by(|a, b| {
            a.uploaded_at
                .partial_cmp(&b.uploaded_at)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.cid.cmp(&b.cid))
        });
        Ok(entries)
    }
}

/// Export the ledger and upload it. Upload failures leave the ledger as it was.
pub fn archive_ledger(ledger: &Ledger, store: &dyn ArchiveStore, name: &str) -> Result<ContentId> {
    let snapshot = ledger.export_state();
    let payload = serde_json::to_value(&snapshot)?;
    let cid = store.upload_json(name, &payload)?;
    info!("ARCHIVE - {} blocks archived as {cid}", snapshot.length);
    Ok(cid)
}

pub fn load_snapshot(store: &dyn ArchiveStore, cid: &ContentId) -> Result<ChainSnapshot> {
    let payload = store.retrieve_json(cid)?;
    Ok(serde_json::from_value(payload)?)
}

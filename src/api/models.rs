use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::archive::ArchiveStore;
use crate::blockchain::{Block, Ledger, MinerPool, MiningJob};
use crate::error::Result;
use crate::transaction::Transaction;

/// Finished jobs kept around for a later poll before the oldest are dropped.
pub const FINISHED_JOB_LIMIT: usize = 64;

/// A dispatched mining job and, once polled to completion, its outcome.
pub struct JobEntry {
    pub job: MiningJob,
    pub started: Instant,
    pub outcome: Option<Result<Block>>,
}

impl JobEntry {
    pub fn new(job: MiningJob) -> Self {
        Self {
            job,
            started: Instant::now(),
            outcome: None,
        }
    }

    /// Collect the outcome if the job has finished. Returns whether it has.
    pub fn poll(&mut self) -> bool {
        if self.outcome.is_none() {
            self.outcome = self.job.try_result();
        }
        self.outcome.is_some()
    }
}

/// Shared application state: the ledger, the mining pool and the archive it snapshots into.
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub miners: MinerPool,
    pub jobs: Mutex<HashMap<Uuid, JobEntry>>,
    pub finished_job_limit: usize,
    pub archive: Arc<dyn ArchiveStore>,
}

impl AppState {
    pub fn new(
        ledger: Arc<Ledger>,
        miner_threads: usize,
        archive: Arc<dyn ArchiveStore>,
    ) -> Result<Self> {
        Ok(Self {
            miners: MinerPool::new(Arc::clone(&ledger), miner_threads)?,
            ledger,
            jobs: Mutex::new(HashMap::new()),
            finished_job_limit: FINISHED_JOB_LIMIT,
            archive,
        })
    }

    pub fn with_finished_job_limit(mut self, limit: usize) -> Self {
        self.finished_job_limit = limit;
        self
    }
}

/// Poll every job and drop the oldest finished ones beyond `limit`. Running jobs stay.
pub fn prune_finished_jobs(jobs: &mut HashMap<Uuid, JobEntry>, limit: usize) {
    let mut finished: Vec<(Instant, Uuid)> = jobs
        .iter_mut()
        .filter_map(|(id, entry)| entry.poll().then_some((entry.started, *id)))
        .collect();
    if finished.len() <= limit {
        return;
    }
    finished.sort();
    let excess = finished.len() - limit;
    for (_, id) in finished.into_iter().take(excess) {
        jobs.remove(&id);
    }
    debug!("JOBS - dropped {excess} unpolled finished jobs");
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub length: usize,
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct FaultResponse {
    pub index: u64,
    pub reason: String,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
    pub difficulty_prefix: String,
    pub fault: Option<FaultResponse>,
}

#[derive(Deserialize, Default)]
pub struct MineRequest {
    #[serde(default)]
    pub miner: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Serialize)]
pub struct MineResponse {
    pub message: &'static str,
    pub block: Block,
}

/* ---------- Mining job Models ---------- */

#[derive(Serialize)]
pub struct JobCreatedResponse {
    pub job_id: String,
}

#[derive(Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: &'static str,
    pub block: Option<Block>,
    pub error: Option<String>,
}

/* ---------- TX API Models ---------- */

#[derive(Deserialize)]
pub struct NewTxRequest {
    pub sender: String,
    pub recipient: String,
    /// Number or numeric string.
    pub amount: serde_json::Value,
    pub id: Option<u64>,
    pub rating: Option<f64>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
}

#[derive(Serialize)]
pub struct NewTxResponse {
    pub message: String,
    pub index: u64,
}

#[derive(Serialize)]
pub struct MempoolResponse {
    pub size: usize,
    pub transactions: Vec<Transaction>,
}

/* ---------- Archive Models ---------- */

#[derive(Deserialize, Default)]
pub struct ArchiveRequest {
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct ArchiveResponse {
    pub cid: String,
}

/* ---------- Attack estimator Models ---------- */

#[derive(Deserialize)]
pub struct AttackQuery {
    pub attacker_power: f64,
    pub confirmations: u32,
    pub runs: Option<u32>,
}

#[derive(Serialize)]
pub struct AttackResponse {
    pub attacker_power: f64,
    pub confirmations: u32,
    pub probability: f64,
    pub monte_carlo: Option<f64>,
}

use crossbeam_channel::{Receiver, TryRecvError, bounded};
use log::{debug, info};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use uuid::Uuid;

use super::pow::CancelFlag;
use super::{Block, Ledger, MineOptions};
use crate::error::{LedgerError, Result};

/// Runs proof-of-work searches on dedicated worker threads, one job per mine request,
/// so callers serving requests never block on the search itself.
pub struct MinerPool {
    pool: ThreadPool,
    ledger: Arc<Ledger>,
}

/// Handle to one dispatched mine. Dropping it does not stop the job; call
/// [`MiningJob::cancel`] for that.
#[derive(Debug)]
pub struct MiningJob {
    id: Uuid,
    cancel: CancelFlag,
    result: Receiver<Result<Block>>,
}

impl MinerPool {
    pub fn new(ledger: Arc<Ledger>, threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("pow-worker-{i}"))
            .build()
            .map_err(|e| LedgerError::MinerUnavailable(e.to_string()))?;
        info!("MINER - pool ready with {} threads", pool.current_num_threads());
        Ok(Self { pool, ledger })
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queue a mine on the pool and return immediately.
    pub fn submit(&self, opts: MineOptions) -> MiningJob {
        let id = Uuid::new_v4();
        let cancel = CancelFlag::new();
        let (tx, rx) = bounded(1);

        let ledger = Arc::clone(&self.ledger);
        let flag = cancel.clone();
        self.pool.spawn(move || {
            debug!("MINER - job {id} started");
            let outcome = ledger.mine_with_cancel(opts, &flag);
            if tx.send(outcome).is_err() {
                debug!("MINER - job {id} finished with nobody waiting");
            }
        });

        MiningJob {
            id,
            cancel,
            result: rx,
        }
    }
}

impl MiningJob {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Ask the search to stop. A job that already committed its block is unaffected.
    pub fn cancel(&self) {
        debug!("MINER - job {} cancel requested", self.id);
        self.cancel.cancel();
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Block the current thread until the job finishes.
    pub fn wait(self) -> Result<Block> {
        self.result
            .recv()
            .map_err(|_| LedgerError::MinerUnavailable(format!("job {} was dropped", self.id)))?
    }

    /// Non-blocking poll; `None` while the search is still running.
    pub fn try_result(&self) -> Option<Result<Block>> {
        match self.result.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(LedgerError::MinerUnavailable(format!(
                "job {} was dropped",
                self.id
            )))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::LedgerConfig;
    use crate::clock::SequentialIdGenerator;
    use crate::transaction::TxOptions;

    fn pool(prefix: &str, threads: usize) -> MinerPool {
        let ledger = Ledger::with_id_generator(
            LedgerConfig {
                difficulty_prefix: prefix.to_string(),
                max_pow_attempts: None,
            },
            Arc::new(SequentialIdGenerator::starting_at(1)),
        )
        .unwrap();
        MinerPool::new(Arc::new(ledger), threads).unwrap()
    }

    #[test]
    fn job_seals_block() {
        let miners = pool("0", 2);
        miners
            .ledger()
            .submit_transaction("a", "b", 3.0, TxOptions::default())
            .unwrap();

        let block = miners.submit(MineOptions::default()).wait().unwrap();
        assert_eq!(block.index(), 2);
        assert_eq!(block.transactions().len(), 1);
        assert_eq!(miners.ledger().len(), 2);
    }

    #[test]
    fn concurrent_jobs_get_distinct_indices() {
        let miners = pool("00", 4);
        let jobs: Vec<_> = (0..6).map(|_| miners.submit(MineOptions::default())).collect();

        let mut indices: Vec<u64> = jobs.into_iter().map(|j| j.wait().unwrap().index()).collect();
        indices.sort_unstable();

        assert_eq!(indices, vec![2, 3, 4, 5, 6, 7]);
        assert_eq!(miners.ledger().len(), 7);
        assert_eq!(miners.ledger().validate_chain(), Ok(()));
    }

    #[test]
    fn cancelled_job_leaves_ledger_untouched() {
        let miners = pool("0000000000", 1);
        miners
            .ledger()
            .submit_transaction("a", "b", 1.0, TxOptions::default())
            .unwrap();

        let job = miners.submit(MineOptions::default());
        job.cancel();

        assert_eq!(job.wait().unwrap_err(), LedgerError::MiningCancelled);
        assert_eq!(miners.ledger().len(), 1);
        assert_eq!(miners.ledger().mempool_len(), 1);
    }

    #[test]
    fn try_result_polls_until_done() {
        let miners = pool("0", 1);
        let job = miners.submit(MineOptions::default());
        let outcome = loop {
            if let Some(outcome) = job.try_result() {
                break outcome;
            }
            std::thread::yield_now();
        };
        assert_eq!(outcome.unwrap().index(), 2);
    }
}

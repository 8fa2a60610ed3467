use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Current Unix time in seconds, microsecond resolution.
pub fn unix_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Source of integer ids for transactions and blocks.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> u64;
}

/// Millisecond wall-clock ids. Each id is bumped past the previous one, so ids stay
/// strictly increasing within the process even when several are issued in the same
/// millisecond or the clock steps backwards.
#[derive(Debug, Default)]
pub struct MillisIdGenerator {
    last: AtomicU64,
}

impl MillisIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for MillisIdGenerator {
    fn next_id(&self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(prev, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Plain counter, handy when ids must be predictable.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

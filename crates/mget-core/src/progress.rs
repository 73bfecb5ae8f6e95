//! Shared progress accounting and job status snapshots.

use std::sync::atomic::{AtomicU64, Ordering};

/// Bytes-transferred accumulator shared by all of one job's segment workers.
///
/// Mutated only by addition; reads and writes are lock-free and O(1), so any
/// number of workers can update it while status queries read it.
#[derive(Debug, Default)]
pub struct ProgressCounter {
    bytes: AtomicU64,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically add `n` bytes to the counter.
    pub fn add(&self, n: u64) {
        self.bytes.fetch_add(n, Ordering::Relaxed);
    }

    /// Current total.
    pub fn get(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// Point-in-time view of one job's queryable fields.
///
/// This is a value, not a live handle: it is computed from the job's state at
/// query time and does not change afterwards.
#[derive(Debug, Clone)]
pub struct DownloadStatus {
    /// External handle the job was registered under.
    pub process_id: String,
    /// Discovered file name; `None` until metadata discovery ran (or if it failed).
    pub file_name: Option<String>,
    /// Discovered total size in bytes (0 until known).
    pub file_size: u64,
    /// Bytes transferred so far across all segments.
    pub downloaded: u64,
    /// Whether the job ever started running.
    pub ran: bool,
    /// Whether the job reached a terminal state.
    pub finished: bool,
    /// Whether the job finished successfully.
    pub success: bool,
}

impl DownloadStatus {
    /// Fraction complete in `[0.0, 1.0]` (1.0 when the total is unknown or zero).
    pub fn fraction(&self) -> f64 {
        if self.file_size == 0 {
            return 1.0;
        }
        (self.downloaded as f64 / self.file_size as f64).min(1.0)
    }
}

//! Per-segment download worker: resume, retry, cooperative cancellation.

use crate::progress::ProgressCounter;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::segmenter::ByteRange;
use crate::transport::{FetchError, Transport};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Fetches one byte range of a job into one target file.
///
/// Each attempt opens a fresh transport connection and re-checks resume state
/// from the bytes already on disk. The cancellation flag is observed between
/// body chunks; a stalled read therefore delays cancellation until it
/// returns. When the retry budget is exhausted the worker sets the shared
/// flag so sibling segments stop instead of timing out independently.
pub struct SegmentWorker {
    url: String,
    target: PathBuf,
    range: ByteRange,
    transport: Arc<dyn Transport>,
    progress: Arc<ProgressCounter>,
    cancel: Arc<AtomicBool>,
    retry: RetryPolicy,
}

impl SegmentWorker {
    pub fn new(
        url: String,
        target: PathBuf,
        range: ByteRange,
        transport: Arc<dyn Transport>,
        progress: Arc<ProgressCounter>,
        cancel: Arc<AtomicBool>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            url,
            target,
            range,
            transport,
            progress,
            cancel,
            retry,
        }
    }

    /// Drive this segment to a terminal outcome. Returns `true` on success.
    pub fn run(&self) -> bool {
        let mut attempt = 1u32;
        loop {
            match self.attempt(attempt) {
                Ok(()) => return true,
                Err(FetchError::Interrupted) => {
                    tracing::debug!(part = %self.target.display(), "segment stopped by cancellation");
                    return false;
                }
                Err(e) => match self.retry.decide(attempt) {
                    RetryDecision::RetryAfter(delay) => {
                        tracing::warn!(
                            part = %self.target.display(),
                            attempt,
                            error = %e,
                            "segment fetch failed, retrying"
                        );
                        std::thread::sleep(delay);
                        attempt += 1;
                    }
                    RetryDecision::NoRetry => {
                        tracing::warn!(
                            part = %self.target.display(),
                            attempt,
                            error = %e,
                            "segment fetch failed, giving up and cancelling job"
                        );
                        // Fail fast: siblings see the flag at their next chunk.
                        self.cancel.store(true, Ordering::SeqCst);
                        return false;
                    }
                },
            }
        }
    }

    /// One fetch attempt, including the resume check.
    fn attempt(&self, attempt: u32) -> Result<(), FetchError> {
        let mut range = self.range;

        if let Ok(meta) = fs::metadata(&self.target) {
            let on_disk = meta.len();
            if on_disk >= range.len() {
                // Segment already complete from a prior run.
                return Ok(());
            }
            if attempt == 1 {
                // Credit bytes persisted by a prior run exactly once.
                self.progress.add(on_disk);
            }
            range.min += on_disk;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.target)?;

        let mut write_error: Option<io::Error> = None;
        let result = self.transport.fetch_range(&self.url, range, &mut |chunk| {
            if self.cancel.load(Ordering::SeqCst) {
                return false;
            }
            match file.write_all(chunk) {
                Ok(()) => {
                    self.progress.add(chunk.len() as u64);
                    true
                }
                Err(e) => {
                    write_error = Some(e);
                    false
                }
            }
        });

        match result {
            // The sink refused a chunk: either our cancellation flag fired or
            // the local write failed. Only the latter is worth retrying.
            Err(FetchError::Aborted) => match write_error {
                Some(e) => Err(FetchError::Io(e)),
                None => Err(FetchError::Interrupted),
            },
            other => other,
        }
    }
}

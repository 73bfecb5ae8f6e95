//! Scripted in-memory transport for unit tests.

use super::{ChunkSink, FetchError, RemoteMetadata, Transport};
use crate::segmenter::ByteRange;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Transport serving a fixed body from memory, with scripted failures.
///
/// Ranged requests are clamped to the body length the way a real server
/// clamps an over-long `Range` header. Every requested range is recorded so
/// tests can assert on resume/retry behavior.
pub(crate) struct ScriptedTransport {
    body: Vec<u8>,
    meta: RemoteMetadata,
    probe_fails: bool,
    chunk_size: usize,
    stall: Duration,
    remaining_failures: AtomicU32,
    fail_range_min: Option<u64>,
    ranges: Mutex<Vec<ByteRange>>,
}

impl ScriptedTransport {
    pub fn serving(body: Vec<u8>) -> Self {
        let meta = RemoteMetadata {
            content_length: Some(body.len() as u64),
            accept_ranges: true,
            content_disposition: None,
        };
        Self {
            body,
            meta,
            probe_fails: false,
            chunk_size: 64,
            stall: Duration::ZERO,
            remaining_failures: AtomicU32::new(0),
            fail_range_min: None,
            ranges: Mutex::new(Vec::new()),
        }
    }

    /// Override the probed metadata (size lies, missing range support, ...).
    pub fn with_meta(mut self, meta: RemoteMetadata) -> Self {
        self.meta = meta;
        self
    }

    /// Advertise no range support.
    pub fn without_range_support(mut self) -> Self {
        self.meta.accept_ranges = false;
        self
    }

    /// Attach a Content-Disposition header value to probe responses.
    pub fn with_disposition(mut self, value: &str) -> Self {
        self.meta.content_disposition = Some(value.to_string());
        self
    }

    /// Make `probe` fail.
    pub fn probe_failing(mut self) -> Self {
        self.probe_fails = true;
        self
    }

    /// Fail the first `n` fetch calls (connection reset) before serving.
    pub fn failing_first(self, n: u32) -> Self {
        self.remaining_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Permanently fail every fetch whose range starts at `min`.
    pub fn failing_range_at(mut self, min: u64) -> Self {
        self.fail_range_min = Some(min);
        self
    }

    /// Sleep between body chunks so cancellation can land mid-stream.
    pub fn stalled(mut self, per_chunk: Duration) -> Self {
        self.stall = per_chunk;
        self
    }

    /// Ranges requested so far, in call order.
    pub fn requested_ranges(&self) -> Vec<ByteRange> {
        self.ranges.lock().unwrap().clone()
    }

    fn connection_reset() -> FetchError {
        FetchError::Io(io::Error::new(io::ErrorKind::ConnectionReset, "scripted failure"))
    }
}

impl Transport for ScriptedTransport {
    fn probe(&self, _url: &str) -> Result<RemoteMetadata, FetchError> {
        if self.probe_fails {
            return Err(FetchError::Http(500));
        }
        Ok(self.meta.clone())
    }

    fn fetch_range(
        &self,
        _url: &str,
        range: ByteRange,
        sink: &mut ChunkSink<'_>,
    ) -> Result<(), FetchError> {
        self.ranges.lock().unwrap().push(range);

        if self.fail_range_min == Some(range.min) {
            return Err(Self::connection_reset());
        }
        if self.remaining_failures.load(Ordering::SeqCst) > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(Self::connection_reset());
        }

        let start = (range.min as usize).min(self.body.len());
        let end = ((range.max as usize).saturating_add(1)).min(self.body.len());
        for chunk in self.body[start..end].chunks(self.chunk_size) {
            if !self.stall.is_zero() {
                std::thread::sleep(self.stall);
            }
            if !sink(chunk) {
                return Err(FetchError::Aborted);
            }
        }
        Ok(())
    }
}

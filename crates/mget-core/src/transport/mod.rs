//! HTTP transport interface consumed by the engine.
//!
//! The job and worker layers only depend on this trait; the default
//! implementation is [`CurlTransport`]. Tests substitute scripted transports
//! to exercise retry, resume, and cancellation without a network.

mod curl_transport;
#[cfg(test)]
pub(crate) mod testing;

pub use curl_transport::CurlTransport;

use crate::segmenter::ByteRange;
use thiserror::Error;

/// Streaming body consumer for [`Transport::fetch_range`].
///
/// Called once per received chunk; returning `false` aborts the transfer,
/// which surfaces as [`FetchError::Aborted`].
pub type ChunkSink<'a> = dyn FnMut(&[u8]) -> bool + 'a;

/// Response metadata needed to plan a download.
#[derive(Debug, Clone, Default)]
pub struct RemoteMetadata {
    /// Total size in bytes, if the server sent `Content-Length`.
    pub content_length: Option<u64>,
    /// True if the server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    /// Raw `Content-Disposition` value, if present (filename hint).
    pub content_disposition: Option<String>,
}

/// Error from a single transport operation.
#[derive(Debug, Error)]
pub enum FetchError {
    /// libcurl reported an error (timeout, connection, TLS, ...).
    #[error("transport: {0}")]
    Curl(#[from] curl::Error),
    /// Response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// Local file I/O failed while consuming the body.
    #[error("storage: {0}")]
    Io(#[from] std::io::Error),
    /// The chunk sink refused further data; the caller inspects its own
    /// cancellation flag and write-error slot to learn why.
    #[error("transfer aborted by consumer")]
    Aborted,
    /// The transfer was stopped by a cancellation request. Never retried.
    #[error("interrupted by cancellation")]
    Interrupted,
}

/// Narrow HTTP capability the engine calls into.
///
/// One `probe` per job (metadata discovery) and one `fetch_range` per segment
/// attempt. Implementations open a fresh connection per call and release it
/// before returning.
pub trait Transport: Send + Sync {
    /// Fetch response headers for `url` without downloading the body.
    fn probe(&self, url: &str) -> Result<RemoteMetadata, FetchError>;

    /// Issue a ranged GET for `url` and stream the body into `sink`.
    fn fetch_range(
        &self,
        url: &str,
        range: ByteRange,
        sink: &mut ChunkSink<'_>,
    ) -> Result<(), FetchError>;
}

//! libcurl-backed transport: HEAD probe and ranged GET.

use super::{ChunkSink, FetchError, RemoteMetadata};
use crate::segmenter::ByteRange;
use std::str;
use std::time::Duration;

/// Body chunk size requested from libcurl for segment streaming.
const STREAM_BUFFER_BYTES: usize = 50 * 1024;

/// Default transport over libcurl `Easy` handles.
///
/// Every call opens a fresh handle, so the connection is released when the
/// call returns regardless of outcome.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    connect_timeout: Duration,
    probe_timeout: Duration,
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(30),
        }
    }
}

impl CurlTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl super::Transport for CurlTransport {
    fn probe(&self, url: &str) -> Result<RemoteMetadata, FetchError> {
        let mut lines: Vec<String> = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.nobody(true)?; // HEAD request
        easy.follow_location(true)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.probe_timeout)?;

        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    lines.push(s.trim_end().to_string());
                }
                true
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Http(code));
        }

        Ok(parse_headers(&lines))
    }

    fn fetch_range(
        &self,
        url: &str,
        range: ByteRange,
        sink: &mut ChunkSink<'_>,
    ) -> Result<(), FetchError> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.buffer_size(STREAM_BUFFER_BYTES)?;
        easy.range(&format!("{}-{}", range.min, range.max))?;

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                if sink(data) {
                    Ok(data.len())
                } else {
                    Ok(0) // refuse the chunk; libcurl aborts with a write error
                }
            })?;
            if let Err(e) = transfer.perform() {
                if e.is_write_error() {
                    return Err(FetchError::Aborted);
                }
                return Err(FetchError::Curl(e));
            }
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Http(code));
        }
        Ok(())
    }
}

/// Parse collected header lines into metadata. Later occurrences win, which
/// matches libcurl's header stream across redirects.
fn parse_headers(lines: &[String]) -> RemoteMetadata {
    let mut meta = RemoteMetadata::default();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                if let Ok(n) = value.parse::<u64>() {
                    meta.content_length = Some(n);
                }
            }
            if name.eq_ignore_ascii_case("accept-ranges") {
                meta.accept_ranges = value.eq_ignore_ascii_case("bytes");
            }
            if name.eq_ignore_ascii_case("content-disposition") {
                meta.content_disposition = Some(value.to_string());
            }
        }
    }

    meta
}

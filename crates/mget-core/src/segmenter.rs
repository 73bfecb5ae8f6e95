//! Byte-range planning for segmented downloads.

/// A byte range `[min, max]` assigned to one segment worker.
///
/// Ranges are inclusive at both ends. The planner gives the final segment an
/// upper bound equal to the total size so that integer-division remainder is
/// absorbed there; `len()` is the `max - min` span used by the resume check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Start offset (inclusive).
    pub min: u64,
    /// End offset (inclusive).
    pub max: u64,
}

impl ByteRange {
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// Span of this range in bytes.
    pub fn len(&self) -> u64 {
        self.max.saturating_sub(self.min)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// HTTP Range header value: `bytes=min-max`.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.min, self.max)
    }
}

/// Partitions `[0, total_size]` into `connections` contiguous ranges.
///
/// `chunk = total_size / n`; segment `i` (1-based) covers
/// `[chunk*(i-1), chunk*i - 1]`, except the last segment whose upper bound is
/// `total_size` itself. `connections` is clamped to at least 1.
pub fn plan_ranges(total_size: u64, connections: usize) -> Vec<ByteRange> {
    let n = connections.max(1) as u64;
    let chunk = total_size / n;

    (1..=n)
        .map(|i| {
            let min = chunk * (i - 1);
            let max = if i == n {
                total_size
            } else {
                (chunk * i).saturating_sub(1)
            };
            ByteRange { min, max }
        })
        .collect()
}

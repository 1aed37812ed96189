use std::fmt;
use std::time::Duration;

use crate::{AccessPattern, BenchmarkConfig};

/// Names of the fields of the result line, in the order they are emitted.
pub const CSV_HEADER: &str = "size_bytes,stride_bytes,threads,iters,pattern,total_bytes_touched,elapsed_ns,throughput_GBps,huge_pages_used";

/// Logical number of bytes a run touches, independent of access pattern and page backing.
///
/// Every worker is credited with `ceil((element_count / thread_count) / stride_elements)` accesses
/// per pass, each access being worth `stride_bytes`. This measures access volume rather than
/// memory traffic: revisiting a cache line still counts as a touch, and the remainder elements of
/// the last worker are not counted.
#[must_use]
#[expect(
    clippy::integer_division,
    reason = "per-worker share is intentionally rounded down"
)]
#[expect(
    clippy::arithmetic_side_effects,
    reason = "thread_count is nonzero, so the division cannot fail"
)]
pub fn bytes_touched(config: &BenchmarkConfig) -> u64 {
    let per_worker_elements = config.element_count().get() / config.thread_count().get();
    let per_worker_accesses = per_worker_elements.div_ceil(config.stride_elements().get());

    [
        config.thread_count().get(),
        per_worker_accesses,
        config.pass_count(),
        config.stride_bytes().get(),
    ]
    .into_iter()
    .map(|factor| u64::try_from(factor).unwrap_or(u64::MAX))
    .fold(1, u64::saturating_mul)
}

/// Outcome of one benchmark run.
///
/// The [`Display`][fmt::Display] implementation renders the single comma-separated result line
/// whose fields are named by [`CSV_HEADER`].
#[derive(Clone, Debug, PartialEq)]
pub struct BenchmarkResult {
    size_bytes: usize,
    stride_bytes: usize,
    thread_count: usize,
    pass_count: usize,
    pattern: AccessPattern,
    total_bytes_touched: u64,
    elapsed: Duration,
    large_pages_used: bool,
    checksum: u64,
}

impl BenchmarkResult {
    pub(crate) fn new(
        config: &BenchmarkConfig,
        elapsed: Duration,
        large_pages_used: bool,
        checksum: u64,
    ) -> Self {
        Self {
            size_bytes: config.size_bytes(),
            stride_bytes: config.stride_bytes().get(),
            thread_count: config.thread_count().get(),
            pass_count: config.pass_count(),
            pattern: config.pattern(),
            total_bytes_touched: bytes_touched(config),
            elapsed,
            large_pages_used,
            checksum,
        }
    }

    /// Size of the working set in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Distance in bytes between successively visited elements.
    #[must_use]
    pub fn stride_bytes(&self) -> usize {
        self.stride_bytes
    }

    /// Number of worker threads that ran in the timed section.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Number of passes each worker made.
    #[must_use]
    pub fn pass_count(&self) -> usize {
        self.pass_count
    }

    /// The traversal order.
    #[must_use]
    pub fn pattern(&self) -> AccessPattern {
        self.pattern
    }

    /// Logical bytes touched by the timed section, see [`bytes_touched()`].
    #[must_use]
    pub fn total_bytes_touched(&self) -> u64 {
        self.total_bytes_touched
    }

    /// Wall-clock time of the timed section, from before the first worker started to after the
    /// last worker was joined.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// [`elapsed()`][Self::elapsed] in nanoseconds.
    #[must_use]
    pub fn elapsed_ns(&self) -> u128 {
        self.elapsed.as_nanos()
    }

    /// Throughput in gigabytes (10⁹ bytes) per second.
    ///
    /// One byte per nanosecond is one gigabyte per second, so this is bytes over nanoseconds.
    /// A zero duration is treated as one nanosecond.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "throughput is reported with far less precision than f64 offers"
    )]
    pub fn throughput_gbps(&self) -> f64 {
        self.total_bytes_touched as f64 / self.elapsed_ns().max(1) as f64
    }

    /// Whether the working set was backed by large pages.
    #[must_use]
    pub fn large_pages_used(&self) -> bool {
        self.large_pages_used
    }

    /// Combined checksum of all workers. Meaningless except as proof that the reads happened.
    #[must_use]
    pub fn checksum(&self) -> u64 {
        self.checksum
    }
}

impl fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{},{:.6},{}",
            self.size_bytes,
            self.stride_bytes,
            self.thread_count,
            self.pass_count,
            self.pattern,
            self.total_bytes_touched,
            self.elapsed_ns(),
            self.throughput_gbps(),
            u8::from(self.large_pages_used)
        )
    }
}

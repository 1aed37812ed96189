use std::hint::black_box;
use std::panic;
use std::sync::atomic::{self, AtomicU64};
use std::thread;
use std::time::Instant;

use crate::pal::PlatformFacade;
use crate::{Arena, BenchmarkConfig, BenchmarkResult, Error, IndexPlan, partition, walk};

/// A checksum no run can produce: that would take `u64::MAX` reads of the sentinel value.
/// Observing it means the checksum was not computed from the reads at all.
const IMPOSSIBLE_CHECKSUM: u64 = u64::MAX;

/// Runs one benchmark: allocates the working set, plans the traversal, warms up, then times the
/// parallel walk of all workers.
///
/// Only the parallel section is timed. The clock starts right before the first worker thread is
/// spawned and stops right after the last one is joined; allocation, initialization, planning
/// and warm-up happen before that.
///
/// # Examples
///
/// ```
/// use memory_walk::{Benchmark, BenchmarkConfig};
///
/// let config = BenchmarkConfig::builder()
///     .size_bytes(1024 * 1024)
///     .stride_bytes(64)
///     .pass_count(1)
///     .build();
///
/// let result = Benchmark::new(config).run().unwrap();
///
/// assert_eq!(result.total_bytes_touched(), 1024 * 1024);
/// println!("{result}");
/// ```
#[derive(Debug)]
pub struct Benchmark {
    config: BenchmarkConfig,
    platform: PlatformFacade,
}

impl Benchmark {
    /// Prepares a benchmark run. Nothing is allocated until [`run()`][Self::run].
    #[must_use]
    pub fn new(config: BenchmarkConfig) -> Self {
        Self::with_platform(config, PlatformFacade::target())
    }

    pub(crate) fn with_platform(config: BenchmarkConfig, platform: PlatformFacade) -> Self {
        Self { config, platform }
    }

    /// The configuration this benchmark runs with.
    #[must_use]
    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Executes the benchmark and returns its result.
    ///
    /// A failed large page request is not an error: it is logged as a warning and the run
    /// continues on standard pages, which the result reports.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerSpawn`] if the operating system refuses to start a worker thread.
    ///
    /// # Panics
    ///
    /// If a worker panics, the panic is propagated to the caller.
    pub fn run(&self) -> crate::Result<BenchmarkResult> {
        let config = &self.config;

        tracing::debug!(?config, "allocating working set");
        let arena = Arena::acquire_on(
            self.platform.clone(),
            config.size_bytes(),
            config.use_large_pages(),
        );
        let large_pages_used = arena.is_large_page_backed();
        let elements = arena.as_slice();

        tracing::debug!(seed = config.seed(), "planning traversal");
        let plan = IndexPlan::new(
            config,
            partition(arena.element_count(), config.thread_count()),
        );

        tracing::debug!("warming up");
        black_box(walk(elements, &plan.traversal(0), 1));

        // Everything a worker needs is prepared before the clock starts.
        let workers: Vec<_> = (0..plan.worker_count())
            .map(|worker_index| (worker_index, plan.traversal(worker_index)))
            .collect();
        let pass_count = config.pass_count();
        let checksum = AtomicU64::new(0);

        tracing::debug!(workers = workers.len(), "starting timed section");
        let start = Instant::now();

        thread::scope(|scope| -> crate::Result<()> {
            let checksum = &checksum;

            let handles = workers
                .into_iter()
                .map(|(worker_index, traversal)| {
                    thread::Builder::new()
                        .name(format!("memory_walk-{worker_index}"))
                        .spawn_scoped(scope, move || {
                            let local = walk(elements, &traversal, pass_count);
                            checksum.fetch_add(local, atomic::Ordering::Relaxed);
                        })
                        .map_err(|source| Error::WorkerSpawn {
                            worker_index,
                            source,
                        })
                })
                .collect::<crate::Result<Vec<_>>>()?;

            for handle in handles {
                if let Err(payload) = handle.join() {
                    panic::resume_unwind(payload);
                }
            }

            Ok(())
        })?;

        let elapsed = start.elapsed();

        // Joining the workers orders all their additions before this read.
        let checksum = checksum.into_inner();
        tracing::debug!(?elapsed, checksum, "timed section complete");

        if checksum == IMPOSSIBLE_CHECKSUM {
            tracing::error!(
                checksum,
                "impossible checksum observed; the measured reads may have been optimized away"
            );
        }

        drop(plan);
        drop(arena);

        Ok(BenchmarkResult::new(
            config,
            elapsed,
            large_pages_used,
            checksum,
        ))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io;
    use std::num::NonZero;
    use std::ptr::{self, NonNull};

    use super::*;
    use crate::pal::{LargePageMapping, MockPlatform};
    use crate::test_log::capture_warnings;
    use crate::{AccessPattern, ELEMENT_SIZE, ShuffleScope, bytes_touched};

    fn nz(value: usize) -> NonZero<usize> {
        NonZero::new(value).unwrap()
    }

    fn run_on_fallback(config: BenchmarkConfig) -> BenchmarkResult {
        Benchmark::with_platform(config, PlatformFacade::fallback())
            .run()
            .unwrap()
    }

    #[test]
    fn one_mebibyte_sequential_single_pass() {
        let config = BenchmarkConfig::builder()
            .size_bytes(1024 * 1024)
            .stride_bytes(64)
            .thread_count(nz(1))
            .pass_count(1)
            .pattern(AccessPattern::Sequential)
            .build();

        let result = run_on_fallback(config);

        assert_eq!(result.size_bytes(), 1_048_576);
        assert_eq!(result.stride_bytes(), 64);
        assert_eq!(result.thread_count(), 1);
        assert_eq!(result.pass_count(), 1);
        assert_eq!(result.pattern(), AccessPattern::Sequential);
        assert_eq!(result.total_bytes_touched(), 1_048_576);
        assert!(!result.large_pages_used());

        // Every element is 1, so the checksum counts the reads.
        assert_eq!(result.checksum(), 16_384);
    }

    #[test]
    fn every_worker_walks_every_pass() {
        let config = BenchmarkConfig::builder()
            .size_bytes(100 * ELEMENT_SIZE)
            .stride_bytes(ELEMENT_SIZE)
            .thread_count(nz(4))
            .pass_count(3)
            .build();

        let result = run_on_fallback(config);

        assert_eq!(result.checksum(), 300);
    }

    #[test]
    fn random_global_visits_each_offset_once_per_pass() {
        let config = BenchmarkConfig::builder()
            .size_bytes(1000 * ELEMENT_SIZE)
            .stride_bytes(3 * ELEMENT_SIZE)
            .thread_count(nz(3))
            .pass_count(2)
            .pattern(AccessPattern::Random)
            .shuffle_scope(ShuffleScope::Global)
            .seed(5)
            .build();

        let result = run_on_fallback(config);

        // Offsets 0, 3, ..., 999 each belong to exactly one worker.
        assert_eq!(result.checksum(), 2 * 334);
    }

    #[test]
    fn random_per_worker_reads_as_much_as_sequential() {
        let builder = BenchmarkConfig::builder()
            .size_bytes(1000 * ELEMENT_SIZE)
            .stride_bytes(3 * ELEMENT_SIZE)
            .thread_count(nz(3))
            .pass_count(2)
            .seed(5);

        let sequential = builder.clone().pattern(AccessPattern::Sequential).build();
        let sequential = run_on_fallback(sequential);
        let random = run_on_fallback(
            builder
                .pattern(AccessPattern::Random)
                .shuffle_scope(ShuffleScope::PerWorker)
                .build(),
        );

        assert_eq!(sequential.checksum(), random.checksum());
        assert_eq!(
            sequential.total_bytes_touched(),
            random.total_bytes_touched()
        );
    }

    #[test]
    fn bytes_touched_does_not_depend_on_pattern() {
        for pattern in [AccessPattern::Sequential, AccessPattern::Random] {
            let config = BenchmarkConfig::builder()
                .size_bytes(256 * 1024)
                .stride_bytes(128)
                .thread_count(nz(2))
                .pass_count(2)
                .pattern(pattern)
                .seed(1)
                .build();

            let expected = bytes_touched(&config);
            let result = run_on_fallback(config);

            assert_eq!(result.total_bytes_touched(), expected);
            assert_eq!(result.total_bytes_touched(), 2 * 1024 * 2 * 128);
        }
    }

    #[test]
    fn more_threads_than_elements() {
        let config = BenchmarkConfig::builder()
            .size_bytes(2 * ELEMENT_SIZE)
            .stride_bytes(ELEMENT_SIZE)
            .thread_count(nz(4))
            .pass_count(1)
            .build();

        let result = run_on_fallback(config);

        assert_eq!(result.checksum(), 2);
        assert_eq!(result.total_bytes_touched(), 0);
    }

    #[test]
    fn zero_passes_still_time_the_threads() {
        let config = BenchmarkConfig::builder()
            .size_bytes(4096)
            .pass_count(0)
            .build();

        let result = run_on_fallback(config);

        assert_eq!(result.checksum(), 0);
        assert_eq!(result.total_bytes_touched(), 0);
    }

    #[test]
    fn unsupported_large_pages_are_reported_as_unused() {
        let config = BenchmarkConfig::builder()
            .size_bytes(64 * 1024)
            .use_large_pages(true)
            .build();

        let result = run_on_fallback(config);

        assert!(!result.large_pages_used());
        assert!(result.to_string().ends_with(",0"));
    }

    #[test]
    fn refused_large_pages_are_reported_as_unused() {
        let mut platform = MockPlatform::new();
        platform
            .expect_large_page_size()
            .return_const(NonZero::new(2 * 1024 * 1024));
        platform
            .expect_map_large_pages()
            .times(1)
            .returning(|_| Err(io::Error::from(io::ErrorKind::OutOfMemory)));
        platform.expect_unmap_large_pages().never();

        let config = BenchmarkConfig::builder()
            .size_bytes(64 * 1024)
            .use_large_pages(true)
            .pass_count(1)
            .build();

        let benchmark = Benchmark::with_platform(config, PlatformFacade::from_mock(platform));
        let (result, warnings) = capture_warnings(|| benchmark.run());
        let result = result.unwrap();

        assert!(!result.large_pages_used());
        assert_eq!(result.checksum(), 1024);
        assert!(warnings.contains("falling back to standard pages"));
    }

    #[test]
    fn granted_large_pages_are_reported_and_released() {
        const FAKE_PAGE_SIZE: usize = 4096;

        let mut platform = MockPlatform::new();
        platform
            .expect_large_page_size()
            .return_const(NonZero::new(FAKE_PAGE_SIZE));
        platform
            .expect_map_large_pages()
            .times(1)
            .returning(|len_bytes| {
                let buffer = vec![0_u64; len_bytes / ELEMENT_SIZE].into_boxed_slice();
                let ptr = NonNull::new(Box::into_raw(buffer).cast::<u64>()).unwrap();

                // SAFETY: We just leaked a buffer of exactly this size for the mapping to own.
                Ok(unsafe { LargePageMapping::from_raw_parts(ptr, len_bytes) })
            });
        platform
            .expect_unmap_large_pages()
            .times(1)
            .returning(|mapping| {
                let elements = ptr::slice_from_raw_parts_mut(
                    mapping.as_ptr().as_ptr(),
                    mapping.len_bytes() / ELEMENT_SIZE,
                );

                // SAFETY: This is the buffer leaked by the map expectation above.
                drop(unsafe { Box::from_raw(elements) });
            });

        let config = BenchmarkConfig::builder()
            .size_bytes(3 * FAKE_PAGE_SIZE)
            .stride_bytes(64)
            .use_large_pages(true)
            .pass_count(1)
            .build();

        let result = Benchmark::with_platform(config, PlatformFacade::from_mock(platform))
            .run()
            .unwrap();

        assert!(result.large_pages_used());
        assert!(result.to_string().ends_with(",1"));
        assert_eq!(result.checksum(), 192);
    }

    #[test]
    fn real_platform_run_completes() {
        let config = BenchmarkConfig::builder()
            .size_bytes(256 * 1024)
            .thread_count(nz(2))
            .pass_count(2)
            .pattern(AccessPattern::Random)
            .use_large_pages(true)
            .build();

        let result = Benchmark::new(config).run().unwrap();

        assert!(result.elapsed_ns() > 0);
        assert!(result.throughput_gbps() >= 0.0);
    }
}

use std::num::NonZero;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use derive_more::Display;

use crate::Error;

/// Size of one element of the working set. Every access reads one element.
pub const ELEMENT_SIZE: usize = size_of::<u64>();

const DEFAULT_SIZE_BYTES: usize = 32 * 1024 * 1024;
const DEFAULT_STRIDE_BYTES: usize = 64;
const DEFAULT_PASS_COUNT: usize = 4;

/// The order in which a worker visits the elements of its range.
#[derive(Clone, Copy, Debug, Default, Display, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum AccessPattern {
    /// Ascending offsets, `stride` apart.
    #[default]
    #[display("seq")]
    Sequential,

    /// The same set of offsets as [`Sequential`][Self::Sequential], visited in a shuffled order.
    #[display("random")]
    Random,
}

impl FromStr for AccessPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seq" => Ok(Self::Sequential),
            "random" => Ok(Self::Random),
            _ => Err(Error::InvalidPattern {
                invalid_value: s.to_string(),
            }),
        }
    }
}

/// How the shuffled order of the random access pattern is shared between workers.
#[derive(Clone, Copy, Debug, Default, Display, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum ShuffleScope {
    /// One shuffled order over the whole working set, shared by all workers. Each worker scans
    /// the entire order and only visits the offsets inside its own range.
    #[default]
    #[display("global")]
    Global,

    /// One shuffled order per worker, containing exactly the offsets of that worker's range.
    /// Workers do not scan offsets that belong to other workers.
    #[display("per-worker")]
    PerWorker,
}

impl FromStr for ShuffleScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(Self::Global),
            "per-worker" => Ok(Self::PerWorker),
            _ => Err(Error::InvalidShuffleScope {
                invalid_value: s.to_string(),
            }),
        }
    }
}

/// Immutable description of one benchmark run.
///
/// Created via [`BenchmarkConfig::builder()`], which applies the clamping rules:
///
/// * A stride of zero bytes is raised to one byte.
/// * A working set smaller than the stride is raised to the stride.
/// * The working set always contains at least one element.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use memory_walk::{AccessPattern, BenchmarkConfig};
///
/// let config = BenchmarkConfig::builder()
///     .size_bytes(1024 * 1024)
///     .stride_bytes(64)
///     .pattern(AccessPattern::Random)
///     .seed(7)
///     .build();
///
/// assert_eq!(config.element_count().get(), 131_072);
/// assert_eq!(config.stride_elements().get(), 8);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BenchmarkConfig {
    size_bytes: usize,
    stride_bytes: NonZero<usize>,
    thread_count: NonZero<usize>,
    pass_count: usize,
    pattern: AccessPattern,
    shuffle_scope: ShuffleScope,
    use_large_pages: bool,
    seed: u64,
}

impl BenchmarkConfig {
    /// Starts building a configuration, with every setting at its default value.
    #[must_use]
    pub fn builder() -> BenchmarkConfigBuilder {
        BenchmarkConfigBuilder::new()
    }

    /// Size of the working set in bytes, after clamping.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Distance in bytes between successively visited elements, after clamping.
    #[must_use]
    pub fn stride_bytes(&self) -> NonZero<usize> {
        self.stride_bytes
    }

    /// Number of worker threads in the timed section.
    #[must_use]
    pub fn thread_count(&self) -> NonZero<usize> {
        self.thread_count
    }

    /// Number of full passes each worker makes over its range.
    #[must_use]
    pub fn pass_count(&self) -> usize {
        self.pass_count
    }

    /// The traversal order.
    #[must_use]
    pub fn pattern(&self) -> AccessPattern {
        self.pattern
    }

    /// How the shuffled order is shared between workers. Only relevant for
    /// [`AccessPattern::Random`].
    #[must_use]
    pub fn shuffle_scope(&self) -> ShuffleScope {
        self.shuffle_scope
    }

    /// Whether the working set should be backed by large pages if the platform allows it.
    #[must_use]
    pub fn use_large_pages(&self) -> bool {
        self.use_large_pages
    }

    /// Seed of the random number generator used to shuffle the index order.
    ///
    /// If no seed was provided to the builder, this is derived from the wall clock at build time.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of elements in the working set. Never zero.
    #[must_use]
    pub fn element_count(&self) -> NonZero<usize> {
        NonZero::new(self.size_bytes.div_euclid(ELEMENT_SIZE)).unwrap_or(NonZero::<usize>::MIN)
    }

    /// The stride expressed in elements. Strides smaller than one element visit every element.
    #[must_use]
    pub fn stride_elements(&self) -> NonZero<usize> {
        NonZero::new(self.stride_bytes.get().div_euclid(ELEMENT_SIZE))
            .unwrap_or(NonZero::<usize>::MIN)
    }
}

/// Builder for [`BenchmarkConfig`].
///
/// Defaults: 32 MiB working set, 64 byte stride, 1 thread, 4 passes, sequential pattern,
/// global shuffle scope, standard pages and a clock-derived seed.
#[derive(Clone, Debug)]
#[must_use]
pub struct BenchmarkConfigBuilder {
    size_bytes: usize,
    stride_bytes: usize,
    thread_count: NonZero<usize>,
    pass_count: usize,
    pattern: AccessPattern,
    shuffle_scope: ShuffleScope,
    use_large_pages: bool,
    seed: Option<u64>,
}

impl BenchmarkConfigBuilder {
    fn new() -> Self {
        Self {
            size_bytes: DEFAULT_SIZE_BYTES,
            stride_bytes: DEFAULT_STRIDE_BYTES,
            thread_count: NonZero::<usize>::MIN,
            pass_count: DEFAULT_PASS_COUNT,
            pattern: AccessPattern::default(),
            shuffle_scope: ShuffleScope::default(),
            use_large_pages: false,
            seed: None,
        }
    }

    /// Sets the working set size in bytes.
    pub fn size_bytes(mut self, size_bytes: usize) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    /// Sets the distance in bytes between successively visited elements.
    pub fn stride_bytes(mut self, stride_bytes: usize) -> Self {
        self.stride_bytes = stride_bytes;
        self
    }

    /// Sets the number of worker threads.
    pub fn thread_count(mut self, thread_count: NonZero<usize>) -> Self {
        self.thread_count = thread_count;
        self
    }

    /// Sets the number of full passes each worker makes over its range.
    pub fn pass_count(mut self, pass_count: usize) -> Self {
        self.pass_count = pass_count;
        self
    }

    /// Sets the traversal order.
    pub fn pattern(mut self, pattern: AccessPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Sets how the shuffled order is shared between workers.
    pub fn shuffle_scope(mut self, shuffle_scope: ShuffleScope) -> Self {
        self.shuffle_scope = shuffle_scope;
        self
    }

    /// Requests large-page backing for the working set.
    pub fn use_large_pages(mut self, use_large_pages: bool) -> Self {
        self.use_large_pages = use_large_pages;
        self
    }

    /// Fixes the seed of the shuffle, making random runs reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Applies the clamping rules and produces the immutable configuration.
    #[must_use]
    pub fn build(self) -> BenchmarkConfig {
        let stride_bytes = NonZero::new(self.stride_bytes).unwrap_or(NonZero::<usize>::MIN);
        let size_bytes = self.size_bytes.max(stride_bytes.get());

        BenchmarkConfig {
            size_bytes,
            stride_bytes,
            thread_count: self.thread_count,
            pass_count: self.pass_count,
            pattern: self.pattern,
            shuffle_scope: self.shuffle_scope,
            use_large_pages: self.use_large_pages,
            seed: self.seed.unwrap_or_else(clock_seed),
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "only the low bits of the timestamp matter for seeding"
)]
fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos() as u64)
}

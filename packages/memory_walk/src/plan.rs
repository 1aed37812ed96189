use std::num::NonZero;
use std::ops::Range;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::{AccessPattern, BenchmarkConfig, ShuffleScope};

/// Returns the offsets `range.start, range.start + stride, ...` that are below `range.end`.
///
/// This is the set of offsets a sequential walk visits; a random walk visits the same set in a
/// different order.
pub fn sequential_offsets(
    range: Range<usize>,
    stride_elements: NonZero<usize>,
) -> impl Iterator<Item = usize> {
    range.step_by(stride_elements.get())
}

/// Returns [`sequential_offsets()`] in a uniformly random order.
///
/// The order is a Fisher-Yates shuffle driven by `rng`, so the same generator state always
/// produces the same order.
pub fn shuffled_offsets<R>(
    range: Range<usize>,
    stride_elements: NonZero<usize>,
    rng: &mut R,
) -> Box<[usize]>
where
    R: Rng + ?Sized,
{
    let mut offsets: Box<[usize]> = sequential_offsets(range, stride_elements).collect();
    offsets.shuffle(rng);
    offsets
}

/// Describes which elements each worker visits, and in what order.
///
/// The plan is built once, before the timed section, and is only read afterwards. Workers
/// borrow their [`Traversal`] from it.
#[derive(Debug)]
pub struct IndexPlan {
    partitions: Vec<Range<usize>>,
    stride_elements: NonZero<usize>,
    order: Order,
}

#[derive(Debug)]
enum Order {
    // Offsets are computed on the fly.
    Sequential,

    // One shuffled order over the whole working set.
    Global(Box<[usize]>),

    // One shuffled order per partition, same indexes as `partitions`.
    PerWorker(Box<[Box<[usize]>]>),
}

impl IndexPlan {
    /// Plans the traversal of `partitions` (one per worker) according to the pattern, stride,
    /// shuffle scope and seed of `config`.
    #[must_use]
    pub fn new(config: &BenchmarkConfig, partitions: Vec<Range<usize>>) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed());

        Self::with_rng(
            config.pattern(),
            config.shuffle_scope(),
            config.element_count(),
            config.stride_elements(),
            partitions,
            &mut rng,
        )
    }

    fn with_rng<R>(
        pattern: AccessPattern,
        shuffle_scope: ShuffleScope,
        element_count: NonZero<usize>,
        stride_elements: NonZero<usize>,
        partitions: Vec<Range<usize>>,
        rng: &mut R,
    ) -> Self
    where
        R: Rng + ?Sized,
    {
        let order = match (pattern, shuffle_scope) {
            (AccessPattern::Sequential, _) => Order::Sequential,
            (AccessPattern::Random, ShuffleScope::Global) => Order::Global(shuffled_offsets(
                0..element_count.get(),
                stride_elements,
                &mut *rng,
            )),
            (AccessPattern::Random, ShuffleScope::PerWorker) => Order::PerWorker(
                partitions
                    .iter()
                    .map(|range| shuffled_offsets(range.clone(), stride_elements, &mut *rng))
                    .collect(),
            ),
        };

        Self {
            partitions,
            stride_elements,
            order,
        }
    }

    /// Number of workers the plan was made for.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.partitions.len()
    }

    /// The range of elements assigned to a worker.
    ///
    /// # Panics
    ///
    /// Panics if `worker_index` is not less than [`worker_count()`][Self::worker_count].
    #[must_use]
    pub fn range(&self, worker_index: usize) -> Range<usize> {
        self.partitions
            .get(worker_index)
            .cloned()
            .expect("worker index out of bounds")
    }

    /// What a worker has to do in one pass.
    ///
    /// # Panics
    ///
    /// Panics if `worker_index` is not less than [`worker_count()`][Self::worker_count].
    #[must_use]
    pub fn traversal(&self, worker_index: usize) -> Traversal<'_> {
        let range = self.range(worker_index);

        match &self.order {
            Order::Sequential => Traversal::Strided {
                range,
                stride_elements: self.stride_elements,
            },
            Order::Global(order) => Traversal::Filtered { order, range },
            Order::PerWorker(orders) => Traversal::Ordered {
                order: orders
                    .get(worker_index)
                    .expect("one order per partition, checked by range() above"),
            },
        }
    }
}

/// One worker's pass over the working set.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Traversal<'a> {
    /// Walk `range` in ascending order, `stride_elements` apart.
    Strided {
        /// The elements assigned to the worker.
        range: Range<usize>,

        /// Distance between visited elements.
        stride_elements: NonZero<usize>,
    },

    /// Scan a shuffled order of the whole working set and visit only offsets inside `range`.
    Filtered {
        /// Shuffled offsets of the whole working set, shared by all workers.
        order: &'a [usize],

        /// The elements assigned to the worker.
        range: Range<usize>,
    },

    /// Visit every offset of `order`, which only contains offsets of the worker's range.
    Ordered {
        /// Shuffled offsets of the worker's range.
        order: &'a [usize],
    },
}

impl Traversal<'_> {
    /// The offsets visited by one pass, in visiting order.
    ///
    /// The worker does not use this in its timed loop; it exists to inspect a plan.
    pub fn offsets(&self) -> Box<dyn Iterator<Item = usize> + '_> {
        match self {
            Self::Strided {
                range,
                stride_elements,
            } => Box::new(sequential_offsets(range.clone(), *stride_elements)),
            Self::Filtered { order, range } => Box::new(
                order
                    .iter()
                    .copied()
                    .filter(move |offset| range.contains(offset)),
            ),
            Self::Ordered { order } => Box::new(order.iter().copied()),
        }
    }
}

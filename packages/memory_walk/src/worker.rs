use std::hint::black_box;
use std::num::NonZero;
use std::ops::Range;

use crate::Traversal;

/// Makes `pass_count` passes of `traversal` over `elements`, returning the wrapping sum of every
/// element read.
///
/// The sum only exists to keep the reads alive. It is accumulated in a local variable, so nothing
/// is shared with other workers while the passes run.
///
/// # Panics
///
/// Panics if the traversal refers to elements outside `elements`.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use memory_walk::{Traversal, walk};
///
/// let elements = vec![1_u64; 64];
/// let traversal = Traversal::Strided {
///     range: 0..64,
///     stride_elements: NonZero::new(8).unwrap(),
/// };
///
/// // 8 elements per pass, 3 passes, each element is 1.
/// assert_eq!(walk(&elements, &traversal, 3), 24);
/// ```
#[must_use]
pub fn walk(elements: &[u64], traversal: &Traversal<'_>, pass_count: usize) -> u64 {
    // Hide the contents from the optimizer so the reads cannot be folded into a constant.
    let elements = black_box(elements);

    let mut checksum = 0_u64;

    for _ in 0..pass_count {
        checksum = match traversal {
            Traversal::Strided {
                range,
                stride_elements,
            } => walk_strided(elements, range.clone(), *stride_elements, checksum),
            Traversal::Filtered { order, range } => walk_filtered(elements, order, range, checksum),
            Traversal::Ordered { order } => walk_ordered(elements, order, checksum),
        };
    }

    black_box(checksum)
}

fn walk_strided(
    elements: &[u64],
    range: Range<usize>,
    stride_elements: NonZero<usize>,
    checksum: u64,
) -> u64 {
    elements
        .get(range)
        .expect("partition ranges never exceed the working set")
        .iter()
        .step_by(stride_elements.get())
        .fold(checksum, |sum, &element| sum.wrapping_add(element))
}

#[expect(
    clippy::indexing_slicing,
    reason = "offsets are planned below the element count; a bounds failure is a planning bug"
)]
fn walk_filtered(elements: &[u64], order: &[usize], range: &Range<usize>, checksum: u64) -> u64 {
    order
        .iter()
        .filter(|&&offset| range.contains(&offset))
        .fold(checksum, |sum, &offset| sum.wrapping_add(elements[offset]))
}

#[expect(
    clippy::indexing_slicing,
    reason = "offsets are planned below the element count; a bounds failure is a planning bug"
)]
fn walk_ordered(elements: &[u64], order: &[usize], checksum: u64) -> u64 {
    order
        .iter()
        .fold(checksum, |sum, &offset| sum.wrapping_add(elements[offset]))
}

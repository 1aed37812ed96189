use std::num::NonZero;
use std::ops::Range;

/// Splits the elements `0..element_count` into `thread_count` contiguous, non-overlapping
/// ranges, in ascending order.
///
/// Every range except the last has `element_count / thread_count` elements. The last range
/// absorbs the remainder, so it always ends at `element_count` and the union of all ranges is
/// exactly `0..element_count`. If there are more threads than elements, all ranges but the last
/// are empty.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use memory_walk::partition;
///
/// let ranges = partition(NonZero::new(10).unwrap(), NonZero::new(3).unwrap());
///
/// assert_eq!(ranges, vec![0..3, 3..6, 6..10]);
/// ```
#[must_use]
#[expect(
    clippy::integer_division,
    reason = "remainder is assigned to the last range"
)]
#[expect(
    clippy::arithmetic_side_effects,
    reason = "every start and end is bounded by element_count, so nothing can overflow"
)]
pub fn partition(element_count: NonZero<usize>, thread_count: NonZero<usize>) -> Vec<Range<usize>> {
    let element_count = element_count.get();
    let thread_count = thread_count.get();

    let chunk = element_count / thread_count;
    let last = thread_count - 1;

    (0..thread_count)
        .map(|index| {
            let start = index * chunk;
            let end = if index == last {
                element_count
            } else {
                start + chunk
            };

            start..end
        })
        .collect()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn nz(value: usize) -> NonZero<usize> {
        NonZero::new(value).unwrap()
    }

    #[test]
    fn four_even_ranges() {
        assert_eq!(
            partition(nz(100), nz(4)),
            vec![0..25, 25..50, 50..75, 75..100]
        );
    }

    #[test]
    fn single_thread_gets_everything() {
        assert_eq!(partition(nz(131_072), nz(1)), vec![0..131_072]);
    }

    #[test]
    fn last_range_absorbs_remainder() {
        assert_eq!(partition(nz(10), nz(3)), vec![0..3, 3..6, 6..10]);
    }

    #[test]
    fn more_threads_than_elements() {
        assert_eq!(partition(nz(2), nz(4)), vec![0..0, 0..0, 0..0, 0..2]);
    }

    #[test]
    fn ranges_are_contiguous_disjoint_and_complete() {
        for element_count in 1..=70 {
            for thread_count in 1..=12 {
                let ranges = partition(nz(element_count), nz(thread_count));

                assert_eq!(ranges.len(), thread_count);
                assert_eq!(ranges.first().unwrap().start, 0);
                assert_eq!(ranges.last().unwrap().end, element_count);

                for pair in ranges.windows(2) {
                    let [before, after] = pair else {
                        unreachable!("windows(2) always yields pairs");
                    };

                    assert_eq!(before.end, after.start);
                }

                let covered: usize = ranges.iter().map(ExactSizeIterator::len).sum();
                assert_eq!(covered, element_count);
            }
        }
    }
}

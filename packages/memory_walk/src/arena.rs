use std::num::NonZero;
use std::slice;

use crate::ELEMENT_SIZE;
use crate::pal::{LargePageMapping, Platform, PlatformFacade};

/// Value every element of a fresh arena holds. Nonzero so that every read changes the checksum.
pub const SENTINEL: u64 = 1;

// Used to size the mapping when the platform cannot tell us; the request will fail anyway.
const DEFAULT_LARGE_PAGE_SIZE: usize = 2 * 1024 * 1024;

/// Size of one large page on the current platform, or `None` if large pages are unavailable.
///
/// Availability of a page size does not guarantee that a large page allocation will succeed:
/// the operating system may not have enough large pages reserved, or may deny the request.
#[must_use]
pub fn large_page_size() -> Option<NonZero<usize>> {
    PlatformFacade::target().large_page_size()
}

/// The working set of a benchmark run: a contiguous buffer of `u64` elements, each initialized
/// to [`SENTINEL`].
///
/// The buffer is backed either by large pages or by the standard heap. Which one is decided once,
/// at acquisition time, and the arena remembers it so that dropping the arena always releases
/// the memory through the matching path.
///
/// # Examples
///
/// ```
/// use memory_walk::Arena;
///
/// let arena = Arena::acquire(4096, false);
///
/// assert_eq!(arena.as_slice().len(), 512);
/// assert!(arena.as_slice().iter().all(|&x| x == 1));
/// assert!(!arena.is_large_page_backed());
/// ```
#[derive(Debug)]
pub struct Arena {
    backing: Backing,
    element_count: NonZero<usize>,
}

#[derive(Debug)]
enum Backing {
    LargePages(LargePages),
    Heap(Box<[u64]>),
}

impl Arena {
    /// Allocates and initializes a working set that covers `size_bytes` bytes (at least one
    /// element).
    ///
    /// If `use_large_pages` is set, large pages are tried first. If that fails for any reason, a
    /// warning is logged and the standard heap is used instead; check
    /// [`is_large_page_backed()`][Self::is_large_page_backed] to see which backing was obtained.
    #[must_use]
    pub fn acquire(size_bytes: usize, use_large_pages: bool) -> Self {
        Self::acquire_on(PlatformFacade::target(), size_bytes, use_large_pages)
    }

    pub(crate) fn acquire_on(
        platform: PlatformFacade,
        size_bytes: usize,
        use_large_pages: bool,
    ) -> Self {
        let element_count =
            NonZero::new(size_bytes.div_euclid(ELEMENT_SIZE)).unwrap_or(NonZero::<usize>::MIN);

        let backing = use_large_pages
            .then(|| LargePages::map(platform, element_count))
            .flatten()
            .map_or_else(
                || Backing::Heap(vec![SENTINEL; element_count.get()].into_boxed_slice()),
                Backing::LargePages,
            );

        Self {
            backing,
            element_count,
        }
    }

    /// The elements of the working set. Padding beyond the requested size is not included.
    #[must_use]
    pub fn as_slice(&self) -> &[u64] {
        match &self.backing {
            Backing::LargePages(pages) => pages.as_slice(self.element_count),
            Backing::Heap(elements) => elements,
        }
    }

    /// Whether the working set ended up backed by large pages.
    #[must_use]
    pub fn is_large_page_backed(&self) -> bool {
        matches!(self.backing, Backing::LargePages(_))
    }

    /// Number of elements in the working set. Never zero.
    #[must_use]
    pub fn element_count(&self) -> NonZero<usize> {
        self.element_count
    }
}

/// A large-page mapping together with the platform that must release it.
#[derive(Debug)]
struct LargePages {
    // Only `None` during drop.
    mapping: Option<LargePageMapping>,
    platform: PlatformFacade,
}

impl LargePages {
    /// Maps and initializes enough large pages for `element_count` elements, or logs why that
    /// was not possible and returns `None`.
    fn map(platform: PlatformFacade, element_count: NonZero<usize>) -> Option<Self> {
        let page_size = platform
            .large_page_size()
            .map_or(DEFAULT_LARGE_PAGE_SIZE, NonZero::get);

        let Some(len_bytes) = element_count
            .get()
            .checked_mul(ELEMENT_SIZE)
            .and_then(|bytes| bytes.checked_next_multiple_of(page_size))
        else {
            tracing::warn!(
                element_count = element_count.get(),
                "working set too large for huge pages; falling back to standard pages"
            );
            return None;
        };

        match platform.map_large_pages(len_bytes) {
            Ok(mapping) => {
                tracing::debug!(len_bytes, page_size, "working set mapped with huge pages");

                // SAFETY: The mapping is at least `element_count` elements long (we rounded the
                // length up), is aligned and is exclusively owned by us.
                let elements = unsafe {
                    slice::from_raw_parts_mut(mapping.as_ptr().as_ptr(), element_count.get())
                };

                // Writing every element commits physical pages before anything is timed.
                elements.fill(SENTINEL);

                Some(Self {
                    mapping: Some(mapping),
                    platform,
                })
            }
            Err(error) => {
                tracing::warn!(
                    len_bytes,
                    %error,
                    "huge page mapping failed; falling back to standard pages"
                );
                None
            }
        }
    }

    fn as_slice(&self, element_count: NonZero<usize>) -> &[u64] {
        let mapping = self
            .mapping
            .as_ref()
            .expect("mapping is only removed during drop");

        // SAFETY: The mapping holds at least `element_count` initialized elements and lives as
        // long as `self`. Nothing writes to it after initialization.
        unsafe { slice::from_raw_parts(mapping.as_ptr().as_ptr(), element_count.get()) }
    }
}

impl Drop for LargePages {
    #[cfg_attr(test, mutants::skip)] // Skipping the release leaks memory, which tests cannot see.
    fn drop(&mut self) {
        if let Some(mapping) = self.mapping.take() {
            self.platform.unmap_large_pages(mapping);
        }
    }
}

use std::fmt::Debug;
use std::io;
use std::num::NonZero;
use std::ptr::NonNull;

/// Operating system services needed to back a working set with large pages.
///
/// All large-page operations go through this trait, enabling them to be mocked and enabling
/// the fallback path to be exercised on platforms that do support large pages.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Platform: Debug + Send + Sync + 'static {
    /// Size of one large page, or `None` if the platform cannot provide large pages at all.
    fn large_page_size(&self) -> Option<NonZero<usize>>;

    /// Maps `len_bytes` bytes of anonymous, readable and writable memory backed by large pages.
    ///
    /// `len_bytes` must already be a multiple of the large page size.
    fn map_large_pages(&self, len_bytes: usize) -> io::Result<LargePageMapping>;

    /// Returns a mapping created by [`map_large_pages()`][Self::map_large_pages] to the
    /// operating system.
    fn unmap_large_pages(&self, mapping: LargePageMapping);
}

/// Ownership token for a live large-page mapping.
///
/// Only a platform implementation can create one (the constructor is `unsafe`) and only the
/// platform can consume one, which is how a mapping is tied to the matching release path.
#[derive(Debug)]
pub(crate) struct LargePageMapping {
    ptr: NonNull<u64>,
    len_bytes: usize,
}

impl LargePageMapping {
    /// # Safety
    ///
    /// `ptr` must be the start of a mapping of `len_bytes` readable and writable bytes that is
    /// aligned for `u64`, not aliased by any other owner and valid until it is passed back to
    /// [`Platform::unmap_large_pages()`] of the platform that created it.
    pub(crate) unsafe fn from_raw_parts(ptr: NonNull<u64>, len_bytes: usize) -> Self {
        Self { ptr, len_bytes }
    }

    pub(crate) fn as_ptr(&self) -> NonNull<u64> {
        self.ptr
    }

    pub(crate) fn len_bytes(&self) -> usize {
        self.len_bytes
    }
}

// SAFETY: The mapping is exclusively owned memory, equivalent to a `Box<[u64]>`.
unsafe impl Send for LargePageMapping {}

// SAFETY: Shared references to the token only expose the address and length.
unsafe impl Sync for LargePageMapping {}

use std::io;
use std::num::NonZero;

use crate::pal::{LargePageMapping, Platform};

/// Platform implementation for targets where we do not know how to obtain large pages.
///
/// Every large page request fails, which sends the caller down the standard allocation path.
#[derive(Debug)]
pub(crate) struct BuildTargetPlatform;

/// Singleton instance of `BuildTargetPlatform`, used by public API types
/// to hook up to the correct PAL implementation.
pub(crate) static BUILD_TARGET_PLATFORM: BuildTargetPlatform = BuildTargetPlatform;

impl Platform for BuildTargetPlatform {
    fn large_page_size(&self) -> Option<NonZero<usize>> {
        None
    }

    fn map_large_pages(&self, _len_bytes: usize) -> io::Result<LargePageMapping> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "large pages are not supported on this platform",
        ))
    }

    #[cfg_attr(test, mutants::skip)] // Cannot be reached without a mapping, which we never create.
    fn unmap_large_pages(&self, mapping: LargePageMapping) {
        panic!(
            "asked to release {mapping:?} but the fallback platform never maps large pages"
        );
    }
}

use std::io;
use std::num::NonZero;
use std::ptr::{self, NonNull};
use std::sync::OnceLock;

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_HUGETLB, MAP_PRIVATE, PROT_READ, PROT_WRITE};

use crate::pal::linux::{Filesystem, FilesystemFacade};
use crate::pal::{LargePageMapping, Platform};

/// Singleton instance of `BuildTargetPlatform`, used by public API types
/// to hook up to the correct PAL implementation.
pub(crate) static BUILD_TARGET_PLATFORM: BuildTargetPlatform =
    BuildTargetPlatform::new(FilesystemFacade::target());

/// Linux large pages are hugetlb pages, mapped anonymously with `MAP_HUGETLB`.
///
/// Hugetlb pages come from a pool reserved by the administrator (`vm.nr_hugepages`) and are never
/// swapped out. If the pool is empty or too small the mapping fails with `ENOMEM`.
#[derive(Debug)]
pub(crate) struct BuildTargetPlatform {
    fs: FilesystemFacade,

    // The default huge page size never changes while the system is running.
    large_page_size: OnceLock<Option<NonZero<usize>>>,
}

impl BuildTargetPlatform {
    pub(crate) const fn new(fs: FilesystemFacade) -> Self {
        Self {
            fs,
            large_page_size: OnceLock::new(),
        }
    }
}

impl Platform for BuildTargetPlatform {
    fn large_page_size(&self) -> Option<NonZero<usize>> {
        *self.large_page_size.get_or_init(|| {
            self.fs
                .get_meminfo_contents()
                .as_deref()
                .and_then(parse_huge_page_size)
        })
    }

    fn map_large_pages(&self, len_bytes: usize) -> io::Result<LargePageMapping> {
        if self.large_page_size().is_none() {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "the kernel does not report a huge page size",
            ));
        }

        // SAFETY: Anonymous mapping without an address hint. No requirements beyond valid args.
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len_bytes,
                PROT_READ | PROT_WRITE,
                MAP_PRIVATE | MAP_ANONYMOUS | MAP_HUGETLB,
                -1,
                0,
            )
        };

        if ptr == MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        let ptr = NonNull::new(ptr.cast::<u64>())
            .ok_or_else(|| io::Error::other("mmap returned a null mapping"))?;

        // SAFETY: This is a fresh page-aligned mapping of `len_bytes` bytes that nobody else
        // knows about, readable and writable, released only via `unmap_large_pages()`.
        Ok(unsafe { LargePageMapping::from_raw_parts(ptr, len_bytes) })
    }

    #[cfg_attr(test, mutants::skip)] // Skipping the release leaks memory, which tests cannot see.
    fn unmap_large_pages(&self, mapping: LargePageMapping) {
        let addr = mapping.as_ptr().as_ptr().cast::<libc::c_void>();

        // SAFETY: The token guarantees this is a live mapping of exactly this length that was
        // created by `map_large_pages()`. Consuming the token ends all borrows of the memory.
        let result = unsafe { libc::munmap(addr, mapping.len_bytes()) };

        assert!(result == 0, "{}", io::Error::last_os_error());
    }
}

/// Extracts the default huge page size from the contents of /proc/meminfo.
///
/// The relevant line looks like `Hugepagesize:       2048 kB`.
fn parse_huge_page_size(meminfo: &str) -> Option<NonZero<usize>> {
    let value = meminfo
        .lines()
        .find_map(|line| line.strip_prefix("Hugepagesize:"))?;

    let mut parts = value.split_whitespace();
    let count = parts.next()?.parse::<usize>().ok()?;

    let multiplier = match parts.next() {
        Some("kB") => 1024,
        None => 1,
        Some(_) => return None,
    };

    NonZero::new(count.checked_mul(multiplier)?)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::pal::linux::MockFilesystem;

    const MEMINFO_2MB: &str = "MemTotal:       32654312 kB
MemFree:        10054424 kB
HugePages_Total:       0
HugePages_Free:        0
HugePages_Rsvd:        0
HugePages_Surp:        0
Hugepagesize:       2048 kB
Hugetlb:               0 kB
";

    fn platform_with_meminfo(contents: Option<&'static str>) -> BuildTargetPlatform {
        let mut fs = MockFilesystem::new();
        fs.expect_get_meminfo_contents()
            .times(1)
            .return_const(contents.map(str::to_string));

        BuildTargetPlatform::new(FilesystemFacade::from_mock(fs))
    }

    #[test]
    fn huge_page_size_from_meminfo() {
        let platform = platform_with_meminfo(Some(MEMINFO_2MB));

        assert_eq!(
            platform.large_page_size().map(NonZero::get),
            Some(2 * 1024 * 1024)
        );

        // Cached, so the mock is not consulted again.
        assert_eq!(
            platform.large_page_size().map(NonZero::get),
            Some(2 * 1024 * 1024)
        );
    }

    #[test]
    fn gigantic_page_size_from_meminfo() {
        let platform = platform_with_meminfo(Some("Hugepagesize:    1048576 kB\n"));

        assert_eq!(
            platform.large_page_size().map(NonZero::get),
            Some(1024 * 1024 * 1024)
        );
    }

    #[test]
    fn missing_meminfo_means_no_large_pages() {
        let platform = platform_with_meminfo(None);

        assert!(platform.large_page_size().is_none());
        assert_eq!(
            platform.map_large_pages(2 * 1024 * 1024).unwrap_err().kind(),
            io::ErrorKind::Unsupported
        );
    }

    #[test]
    fn meminfo_without_huge_pages_means_no_large_pages() {
        let platform = platform_with_meminfo(Some("MemTotal:       32654312 kB\n"));

        assert!(platform.large_page_size().is_none());
    }

    #[test]
    fn malformed_huge_page_size_is_ignored() {
        assert!(parse_huge_page_size("Hugepagesize:       lots kB\n").is_none());
        assert!(parse_huge_page_size("Hugepagesize:       2048 MB\n").is_none());
        assert!(parse_huge_page_size("Hugepagesize:       0 kB\n").is_none());
        assert!(parse_huge_page_size("Hugepagesize:\n").is_none());
    }

    #[test]
    fn real_platform_maps_or_refuses() {
        // Whether this succeeds depends on the huge page pool of the machine running the test.
        // Either outcome is fine, as long as a successful mapping can be written and released.
        let platform = &BUILD_TARGET_PLATFORM;

        let Some(page_size) = platform.large_page_size() else {
            return;
        };

        match platform.map_large_pages(page_size.get()) {
            Ok(mapping) => {
                assert_eq!(mapping.len_bytes(), page_size.get());

                // SAFETY: The mapping is at least one page long, so the first element exists.
                unsafe {
                    mapping.as_ptr().write(1);
                    assert_eq!(mapping.as_ptr().read(), 1);
                }

                platform.unmap_large_pages(mapping);
            }
            Err(error) => {
                println!("huge page mapping unavailable on this machine: {error}");
            }
        }
    }
}

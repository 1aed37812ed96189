use std::fs;

use crate::pal::linux::Filesystem;

/// The virtual filesystem for the real operating system that the build is targeting.
///
/// You would only use different filesystems in PAL unit tests that need to use a mock filesystem.
#[derive(Debug, Default)]
pub(crate) struct BuildTargetFilesystem;

#[cfg_attr(coverage_nightly, coverage(off))]
impl Filesystem for BuildTargetFilesystem {
    fn get_meminfo_contents(&self) -> Option<String> {
        fs::read_to_string("/proc/meminfo").ok()
    }
}

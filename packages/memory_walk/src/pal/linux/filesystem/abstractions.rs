use std::fmt::Debug;

/// Linux exposes memory management facts through a virtual filesystem. This trait abstracts
/// the parts of that virtual filesystem we read, to allow it to be mocked.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Filesystem: Debug + Send + Sync + 'static {
    /// Get the contents of the /proc/meminfo file or `None` if it cannot be read.
    ///
    /// This is a plaintext file with "Key:     value unit" lines.
    fn get_meminfo_contents(&self) -> Option<String>;
}

//! Platform Abstraction Layer (PAL). Everything the benchmark needs from the operating system to
//! back a working set with large pages goes through here.

mod abstractions;
pub(crate) use abstractions::*;

mod facade;
pub(crate) use facade::*;

#[cfg(all(target_os = "linux", not(miri)))]
mod linux;
#[cfg(all(target_os = "linux", not(miri)))]
pub(crate) use linux::*;

// The fallback module is the primary implementation on platforms without large page support and
// under Miri. In test mode it is also compiled on Linux so the fallback path is exercised
// everywhere, in which case it must be accessed via the explicit path `fallback::`.
#[cfg(any(test, miri, not(target_os = "linux")))]
pub(crate) mod fallback;

#[cfg(any(miri, not(target_os = "linux")))]
pub(crate) use fallback::*;

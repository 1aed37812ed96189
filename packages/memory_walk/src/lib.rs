#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Synthetic memory access benchmark that measures the throughput of a multithreaded read
//! workload under controlled cache and TLB pressure.
//!
//! A run reads a working set of `u64` elements with a configurable size, stride, access pattern
//! (sequential or shuffled), thread count and pass count, optionally backed by large pages. It
//! reports one comma-separated result line with the logical number of bytes touched, the elapsed
//! wall-clock time of the parallel section and the resulting throughput in GB/s.
//!
//! # Example
//!
//! ```
//! use std::num::NonZero;
//!
//! use memory_walk::{AccessPattern, Benchmark, BenchmarkConfig, CSV_HEADER};
//!
//! let config = BenchmarkConfig::builder()
//!     .size_bytes(4 * 1024 * 1024)
//!     .stride_bytes(64)
//!     .thread_count(NonZero::new(2).unwrap())
//!     .pass_count(2)
//!     .pattern(AccessPattern::Random)
//!     .seed(1234)
//!     .build();
//!
//! let result = Benchmark::new(config).run().unwrap();
//!
//! println!("{CSV_HEADER}");
//! println!("{result}");
//! ```
//!
//! # Phases
//!
//! Every run goes through the same phases, in order:
//!
//! 1. The working set ([`Arena`]) is allocated and every element set to [`SENTINEL`], which also
//!    commits the physical pages. Large pages are used if requested and available, otherwise
//!    the standard heap.
//! 2. The elements are [`partition`]ed into one contiguous range per worker and the traversal
//!    of each range is planned ([`IndexPlan`]). Random plans are shuffled with a seeded
//!    generator, so a seed reproduces the order.
//! 3. Worker 0 makes one untimed warm-up pass.
//! 4. The timed section starts fresh worker threads, each of which [`walk`]s its range for the
//!    configured number of passes, and joins them.
//! 5. The working set is released and the [`BenchmarkResult`] returned.
//!
//! # Large pages
//!
//! On Linux, large pages are hugetlb pages, which must be reserved by the administrator
//! beforehand (e.g. `sysctl vm.nr_hugepages=64`). On other platforms large pages are never
//! used. A failed large page request is never fatal: a warning is logged via `tracing` and the
//! run continues on standard pages.

mod arena;
mod config;
mod driver;
mod error;
mod pal;
mod partition;
mod plan;
mod report;
mod size;
#[cfg(test)]
mod test_log;
mod worker;

pub use arena::*;
pub use config::*;
pub use driver::*;
pub use error::*;
pub use partition::*;
pub use plan::*;
pub use report::*;
pub use size::*;
pub use worker::*;

use std::io;

use thiserror::Error;

/// Errors that can occur when configuring or running a memory walk benchmark.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The caller provided a supposed size string but it did not match the expected format.
    #[error("invalid size: '{invalid_value}' is invalid: {problem}")]
    InvalidSize {
        /// The value that was rejected, exactly as provided by the caller.
        invalid_value: String,

        /// A human-readable description of the problem.
        problem: String,
    },

    /// The caller named an access pattern that does not exist.
    #[error("invalid access pattern: '{invalid_value}' (expected 'seq' or 'random')")]
    InvalidPattern {
        /// The value that was rejected.
        invalid_value: String,
    },

    /// The caller named a shuffle scope that does not exist.
    #[error("invalid shuffle scope: '{invalid_value}' (expected 'global' or 'per-worker')")]
    InvalidShuffleScope {
        /// The value that was rejected.
        invalid_value: String,
    },

    /// The operating system refused to start a worker thread.
    #[error("failed to start worker thread {worker_index}")]
    WorkerSpawn {
        /// Index of the worker that could not be started.
        worker_index: usize,

        /// The underlying operating system error.
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn invalid_size(invalid_value: &str, problem: impl Into<String>) -> Self {
        Self::InvalidSize {
            invalid_value: invalid_value.to_string(),
            problem: problem.into(),
        }
    }
}

/// A specialized `Result` type for memory walk operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

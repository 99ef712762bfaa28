//! Error taxonomy for the block pipeline.
//!
//! Four failure classes, all surfaced to the stage caller, none swallowed:
//!
//! - [`PipelineError::Format`]: a container cannot be parsed or maps to no
//!   known sample type. Fatal for any combination including that file.
//! - [`PipelineError::Validation`]: combination members disagree on a header
//!   field. Names the field and the two conflicting values.
//! - [`PipelineError::Transform`]: the pluggable transform failed on a block
//!   tuple. The partially written output for that combination is discarded.
//! - [`PipelineError::Io`]: disk read/write failure. Never retried here;
//!   retry policy belongs to the caller.
//!
//! A stage with zero eligible input files is *not* an error; it completes as
//! a documented no-op.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors produced while planning, streaming, transforming, or writing.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The container cannot be opened or advertises an unsupported layout.
    #[error("format error in '{path}': {reason}")]
    Format {
        /// File that failed to open or parse.
        path: PathBuf,
        /// What the container parser objected to.
        reason: String,
    },

    /// Combination members disagree on one of the four shared header fields.
    #[error(
        "validation failed for '{path}': {field} is {found}, first file in combination has {expected}"
    )]
    Validation {
        /// The file whose header diverged from the baseline.
        path: PathBuf,
        /// Header field that mismatched (`sample_rate`, `frame_count`,
        /// `channel_count`, or `sample_width`).
        field: &'static str,
        /// Value established by the first file of the combination.
        expected: u64,
        /// Conflicting value found in `path`.
        found: u64,
    },

    /// The transform raised while processing one block tuple.
    #[error("transform '{name}' failed on block {index}: {reason}")]
    Transform {
        /// Registered transform name.
        name: String,
        /// Zero-based submission index of the failing block tuple.
        index: u64,
        /// Failure detail reported by the transform.
        reason: String,
    },

    /// Stage or pipeline configuration is invalid (unknown transform,
    /// zero arity, unreadable config file).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Disk read/write failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Map a WAV codec error to the taxonomy: I/O failures stay I/O errors,
    /// everything else is a format problem with the named file.
    pub(crate) fn from_wav(path: &std::path::Path, err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => Self::Io(e),
            other => Self::Format {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        }
    }
}

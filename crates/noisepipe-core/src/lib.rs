//! # noisepipe-core
//!
//! **Streaming block pipeline for candidate entropy signals.**
//!
//! `noisepipe-core` turns directories of raw multi-channel noise recordings
//! (radio noise, random feeds) into transformed output streams ready for
//! statistical evaluation. Inputs are discovered and paired, validated for
//! format agreement, lazily decoded into fixed-size blocks, transformed in
//! parallel by a bounded worker pool, and reassembled in order under a
//! bounded memory budget.
//!
//! ## Quick Start
//!
//! ```no_run
//! use noisepipe_core::{Stage, TransformSpec};
//!
//! // Negate every 1024-frame block of every .wav file in `audio/fm`.
//! let mut stage = Stage::new(
//!     &TransformSpec::Negate,
//!     1,
//!     Some(1024),
//!     "audio/fm",
//!     "audio/fm/negated",
//! )?;
//! let report = stage.execute()?;
//! println!("{} blocks across {} combinations", report.blocks, report.combinations);
//! # Ok::<(), noisepipe_core::PipelineError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Stage → Combinations → Validate → Stream Readers → Dispatcher → Writer
//! ```
//!
//! Per combination, the per-file lazy block sequences are zipped positionally
//! into tuples and fanned out across OS-level workers running the stage's
//! [`Transform`]; output blocks are committed strictly in submission order,
//! so output containers stay positionally meaningful time series no matter
//! how the workers interleave.
//!
//! Transforms are a capability (`k` aligned blocks in, one block out)
//! configured through [`TransformSpec`], a typed schema with no expression
//! evaluation. Acquisition (radio capture, feed scraping) and evaluation
//! (plots, statistical test suites) are external collaborators: they produce
//! the input directory and consume the output directory.

pub mod block;
pub mod combinations;
pub mod config;
pub mod error;
pub mod executor;
pub mod stage;
pub mod stream;
pub mod transform;
pub mod validate;
pub mod writer;

pub use block::{Block, SampleType, Samples};
pub use combinations::combinations;
pub use config::{PipelineConfig, StageConfig, run_pipeline};
pub use error::{PipelineError, Result};
pub use executor::dispatch;
pub use stage::{Stage, StageReport, StageState};
pub use stream::{AudioStream, BlockIter};
pub use transform::{Transform, TransformError, TransformInfo, TransformSpec, known_transforms};
pub use validate::{StreamFormat, validate};
pub use writer::{BlockWriter, BUFFER_THRESHOLD_BYTES};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

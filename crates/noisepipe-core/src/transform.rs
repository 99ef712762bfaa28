//! Pluggable per-block transforms.
//!
//! A transform is a capability: given `k` aligned blocks, produce one output
//! block. Transforms are stateless across block invocations except for fixed
//! parameters bound at construction, so the worker pool can apply them from
//! any thread without locking.
//!
//! Construction goes through [`TransformSpec`], a typed, statically validated
//! configuration schema (name plus typed parameter set). Parameters are plain
//! data deserialized with serde; there is no expression evaluation anywhere
//! on this path.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::block::{Block, Samples};
use crate::error::{PipelineError, Result};

/// Failure inside a transform while processing one block tuple.
///
/// The dispatcher attaches the transform name and block index when it
/// surfaces this as a pipeline error.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransformError(String);

impl TransformError {
    /// Build a transform error from a message.
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// The per-block computation applied to every block tuple of a combination.
///
/// Implementations must be pure with respect to the pipeline: same inputs,
/// same output, no shared mutable state. The output block's sample type must
/// match the inputs' (the writer refuses anything else).
pub trait Transform: Send + Sync {
    /// Stable registered name, used in errors and output naming.
    fn name(&self) -> &str;

    /// Apply the transform to one tuple of `arity` aligned blocks.
    fn apply(&self, inputs: &[Block]) -> std::result::Result<Block, TransformError>;
}

// ---------------------------------------------------------------------------
// Configuration schema and registry
// ---------------------------------------------------------------------------

/// Typed configuration for one transform: a name tag plus its parameter set.
///
/// ```json
/// { "name": "amplify", "gain": 1.5 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum TransformSpec {
    /// Pass blocks through unchanged.
    Identity,
    /// Arithmetic inversion of every sample.
    Negate,
    /// Scale every sample by `gain`, saturating at the type's range.
    Amplify {
        /// Multiplicative gain applied around the sample type's midpoint.
        gain: f64,
    },
    /// Element-wise mean across the k input blocks.
    Mix,
}

impl TransformSpec {
    /// Registered name of the configured transform.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Negate => "negate",
            Self::Amplify { .. } => "amplify",
            Self::Mix => "mix",
        }
    }

    /// Construct the transform, checking that it accepts `arity` inputs.
    pub fn build(&self, arity: usize) -> Result<Box<dyn Transform>> {
        if arity == 0 {
            return Err(PipelineError::Config(
                "stage arity (nr_inputs) must be at least 1".to_string(),
            ));
        }
        match self {
            Self::Identity | Self::Negate | Self::Amplify { .. } if arity != 1 => {
                Err(PipelineError::Config(format!(
                    "transform '{}' takes exactly 1 input, stage has nr_inputs={arity}",
                    self.name()
                )))
            }
            Self::Identity => Ok(Box::new(Identity)),
            Self::Negate => Ok(Box::new(Negate)),
            Self::Amplify { gain } => {
                if !gain.is_finite() {
                    return Err(PipelineError::Config(format!(
                        "amplify gain must be finite, got {gain}"
                    )));
                }
                Ok(Box::new(Amplify { gain: *gain }))
            }
            Self::Mix => Ok(Box::new(Mix { arity })),
        }
    }
}

/// Description of one registered transform, for discovery output.
#[derive(Debug, Clone, Copy)]
pub struct TransformInfo {
    /// Registered name.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Accepted arity.
    pub arity: &'static str,
    /// Parameter schema, human readable.
    pub parameters: &'static str,
}

/// Lookup table of every registered transform.
pub fn known_transforms() -> &'static [TransformInfo] {
    &[
        TransformInfo {
            name: "identity",
            description: "pass blocks through unchanged",
            arity: "1",
            parameters: "none",
        },
        TransformInfo {
            name: "negate",
            description: "arithmetic inversion of every sample",
            arity: "1",
            parameters: "none",
        },
        TransformInfo {
            name: "amplify",
            description: "scale samples around the midpoint, saturating",
            arity: "1",
            parameters: "gain: float",
        },
        TransformInfo {
            name: "mix",
            description: "element-wise mean across the input blocks",
            arity: "1..k",
            parameters: "none",
        },
    ]
}

// ---------------------------------------------------------------------------
// Built-in transforms
// ---------------------------------------------------------------------------

struct Identity;

impl Transform for Identity {
    fn name(&self) -> &str {
        "identity"
    }

    fn apply(&self, inputs: &[Block]) -> std::result::Result<Block, TransformError> {
        inputs
            .first()
            .cloned()
            .ok_or_else(|| TransformError::new("identity received no input block"))
    }
}

struct Negate;

impl Transform for Negate {
    fn name(&self) -> &str {
        "negate"
    }

    fn apply(&self, inputs: &[Block]) -> std::result::Result<Block, TransformError> {
        let input = inputs
            .first()
            .ok_or_else(|| TransformError::new("negate received no input block"))?;
        let samples = match &input.samples {
            // Unsigned samples invert as the bitwise complement, 255 - s.
            Samples::U8(v) => Samples::U8(v.iter().map(|&s| !s).collect()),
            Samples::I16(v) => Samples::I16(v.iter().map(|&s| s.saturating_neg()).collect()),
            Samples::I32(v) => Samples::I32(v.iter().map(|&s| s.saturating_neg()).collect()),
        };
        Ok(Block {
            samples,
            channel_count: input.channel_count,
        })
    }
}

struct Amplify {
    gain: f64,
}

impl Transform for Amplify {
    fn name(&self) -> &str {
        "amplify"
    }

    fn apply(&self, inputs: &[Block]) -> std::result::Result<Block, TransformError> {
        let input = inputs
            .first()
            .ok_or_else(|| TransformError::new("amplify received no input block"))?;
        let gain = self.gain;
        let samples = match &input.samples {
            Samples::U8(v) => Samples::U8(
                v.iter()
                    .map(|&s| {
                        // 8-bit PCM is unsigned with a 128 midpoint.
                        let scaled = (f64::from(s) - 128.0) * gain + 128.0;
                        scaled.round().clamp(0.0, f64::from(u8::MAX)) as u8
                    })
                    .collect(),
            ),
            Samples::I16(v) => Samples::I16(
                v.iter()
                    .map(|&s| {
                        let scaled = f64::from(s) * gain;
                        scaled
                            .round()
                            .clamp(f64::from(i16::MIN), f64::from(i16::MAX))
                            as i16
                    })
                    .collect(),
            ),
            Samples::I32(v) => Samples::I32(
                v.iter()
                    .map(|&s| {
                        let scaled = f64::from(s) * gain;
                        scaled
                            .round()
                            .clamp(f64::from(i32::MIN), f64::from(i32::MAX))
                            as i32
                    })
                    .collect(),
            ),
        };
        Ok(Block {
            samples,
            channel_count: input.channel_count,
        })
    }
}

struct Mix {
    arity: usize,
}

impl Transform for Mix {
    fn name(&self) -> &str {
        "mix"
    }

    fn apply(&self, inputs: &[Block]) -> std::result::Result<Block, TransformError> {
        if inputs.len() != self.arity {
            return Err(TransformError::new(format!(
                "mix expected {} blocks, received {}",
                self.arity,
                inputs.len()
            )));
        }
        let first = &inputs[0];
        for block in &inputs[1..] {
            if block.sample_type() != first.sample_type() {
                return Err(TransformError::new(format!(
                    "mixed sample types in one tuple: {} vs {}",
                    first.sample_type(),
                    block.sample_type()
                )));
            }
            if block.len() != first.len() {
                return Err(TransformError::new(format!(
                    "mixed block lengths in one tuple: {} vs {}",
                    first.len(),
                    block.len()
                )));
            }
        }

        let k = inputs.len() as f64;
        let n = first.len();
        let samples = match first.sample_type() {
            crate::block::SampleType::U8 => {
                let mut out = Vec::with_capacity(n);
                for i in 0..n {
                    let sum: f64 = inputs
                        .iter()
                        .map(|b| match &b.samples {
                            Samples::U8(v) => f64::from(v[i]),
                            _ => unreachable!("types checked above"),
                        })
                        .sum();
                    out.push((sum / k).round() as u8);
                }
                Samples::U8(out)
            }
            crate::block::SampleType::I16 => {
                let mut out = Vec::with_capacity(n);
                for i in 0..n {
                    let sum: f64 = inputs
                        .iter()
                        .map(|b| match &b.samples {
                            Samples::I16(v) => f64::from(v[i]),
                            _ => unreachable!("types checked above"),
                        })
                        .sum();
                    out.push((sum / k).round() as i16);
                }
                Samples::I16(out)
            }
            crate::block::SampleType::I32 => {
                let mut out = Vec::with_capacity(n);
                for i in 0..n {
                    let sum: f64 = inputs
                        .iter()
                        .map(|b| match &b.samples {
                            Samples::I32(v) => f64::from(v[i]),
                            _ => unreachable!("types checked above"),
                        })
                        .sum();
                    out.push((sum / k).round() as i32);
                }
                Samples::I32(out)
            }
        };

        Ok(Block {
            samples,
            channel_count: first.channel_count,
        })
    }
}

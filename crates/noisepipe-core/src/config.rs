//! Pipeline configuration: an ordered chain of stage specs.
//!
//! The schema is plain typed data (serde). Each stage names its transform and
//! parameters through [`TransformSpec`]; nothing in a config file is ever
//! evaluated as code.
//!
//! ```json
//! {
//!   "input_dir": "audio/fm",
//!   "output_root": "audio/fm/whiten",
//!   "block_size": 1024,
//!   "stages": [
//!     { "transform": { "name": "negate" } },
//!     { "transform": { "name": "mix" }, "nr_inputs": 2 }
//!   ]
//! }
//! ```
//!
//! Stages chain: the first reads `input_dir`, every later stage reads its
//! predecessor's output directory. Stage directories are created under
//! `output_root` as `{index}_{transform}`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::stage::{Stage, StageReport};
use crate::transform::TransformSpec;

fn default_nr_inputs() -> usize {
    1
}

/// One stage entry in a pipeline config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Transform name and parameters.
    pub transform: TransformSpec,
    /// Input streams consumed jointly per transform invocation.
    #[serde(default = "default_nr_inputs")]
    pub nr_inputs: usize,
    /// Per-stage block size override in frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_size: Option<usize>,
}

/// A full pipeline: input directory, output root, and the stage chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory scanned for the first stage's input containers.
    pub input_dir: PathBuf,
    /// Root under which per-stage output directories are created.
    pub output_root: PathBuf,
    /// Default block size in frames for stages without an override.
    /// Unset processes each file as a single block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_size: Option<usize>,
    /// Ordered stage chain.
    pub stages: Vec<StageConfig>,
}

impl PipelineConfig {
    /// Load a pipeline config from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| {
            PipelineError::Config(format!("cannot parse '{}': {e}", path.display()))
        })
    }

    /// Build the stage chain, wiring each stage's output to its successor.
    pub fn build_stages(&self) -> Result<Vec<Stage>> {
        if self.stages.is_empty() {
            return Err(PipelineError::Config(
                "pipeline has no stages".to_string(),
            ));
        }

        let mut stages = Vec::with_capacity(self.stages.len());
        let mut input_dir = self.input_dir.clone();
        for (index, stage_config) in self.stages.iter().enumerate() {
            let output_dir = self
                .output_root
                .join(format!("{index}_{}", stage_config.transform.name()));
            let block_size = stage_config.block_size.or(self.block_size);
            let stage = Stage::new(
                &stage_config.transform,
                stage_config.nr_inputs,
                block_size,
                &input_dir,
                &output_dir,
            )?;
            input_dir = output_dir;
            stages.push(stage);
        }
        Ok(stages)
    }
}

/// Execute a pipeline: every stage in order, each feeding the next.
///
/// Fails fast on the first stage error; reports of already-finished stages
/// are dropped with the error (their output files remain on disk).
pub fn run_pipeline(config: &PipelineConfig) -> Result<Vec<StageReport>> {
    let mut stages = config.build_stages()?;
    let mut reports = Vec::with_capacity(stages.len());
    for stage in &mut stages {
        reports.push(stage.execute()?);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Schema tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_minimal_config() {
        let json = r#"{
            "input_dir": "in",
            "output_root": "out",
            "stages": [ { "transform": { "name": "identity" } } ]
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.stages.len(), 1);
        assert_eq!(config.stages[0].nr_inputs, 1);
        assert_eq!(config.stages[0].block_size, None);
        assert_eq!(config.block_size, None);
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "input_dir": "audio/fm",
            "output_root": "audio/fm/run",
            "block_size": 1024,
            "stages": [
                { "transform": { "name": "amplify", "gain": 0.5 } },
                { "transform": { "name": "mix" }, "nr_inputs": 2, "block_size": 64 }
            ]
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.block_size, Some(1024));
        assert_eq!(
            config.stages[0].transform,
            TransformSpec::Amplify { gain: 0.5 }
        );
        assert_eq!(config.stages[1].nr_inputs, 2);
        assert_eq!(config.stages[1].block_size, Some(64));
    }

    #[test]
    fn test_roundtrip_serialization() {
        let config = PipelineConfig {
            input_dir: PathBuf::from("in"),
            output_root: PathBuf::from("out"),
            block_size: Some(256),
            stages: vec![StageConfig {
                transform: TransformSpec::Negate,
                nr_inputs: 1,
                block_size: None,
            }],
        };
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    // -----------------------------------------------------------------------
    // Chain wiring tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_build_stages_chains_directories() {
        let config = PipelineConfig {
            input_dir: PathBuf::from("in"),
            output_root: PathBuf::from("root"),
            block_size: None,
            stages: vec![
                StageConfig {
                    transform: TransformSpec::Negate,
                    nr_inputs: 1,
                    block_size: None,
                },
                StageConfig {
                    transform: TransformSpec::Identity,
                    nr_inputs: 1,
                    block_size: None,
                },
            ],
        };
        let stages = config.build_stages().unwrap();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].output_dir(), Path::new("root/0_negate"));
        assert_eq!(stages[1].output_dir(), Path::new("root/1_identity"));
    }

    #[test]
    fn test_build_stages_rejects_empty_chain() {
        let config = PipelineConfig {
            input_dir: PathBuf::from("in"),
            output_root: PathBuf::from("out"),
            block_size: None,
            stages: Vec::new(),
        };
        assert!(matches!(
            config.build_stages().unwrap_err(),
            PipelineError::Config(_)
        ));
    }

    #[test]
    fn test_build_stages_rejects_bad_arity() {
        let config = PipelineConfig {
            input_dir: PathBuf::from("in"),
            output_root: PathBuf::from("out"),
            block_size: None,
            stages: vec![StageConfig {
                transform: TransformSpec::Negate,
                nr_inputs: 3,
                block_size: None,
            }],
        };
        assert!(config.build_stages().is_err());
    }

    #[test]
    fn test_from_file_missing_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = PipelineConfig::from_file(tmp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)), "got: {err:?}");
    }

    #[test]
    fn test_from_file_invalid_json_is_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        let err = PipelineConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)), "got: {err:?}");
    }
}

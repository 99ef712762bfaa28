//! Stage orchestrator: one transform applied to every eligible combination
//! of input files in a directory.
//!
//! Lifecycle per execution:
//!
//! ```text
//! Idle → Planning → (per combination: Validating → Streaming → Writing) → Done
//!                                          │              │
//!                                          └──── Failed ◀─┘
//! ```
//!
//! The input directory is scanned non-recursively for `.wav` files, sorted
//! lexicographically, and all size-`nr_inputs` combinations are processed
//! sequentially, one fully flushed output file per combination, named by
//! joining the member file names with `-`. Zero eligible files is a no-op:
//! the stage completes in `Done` without creating the output directory.
//!
//! Failure policy: a validation or transform failure on any combination
//! aborts the whole stage (fail-fast). The failing combination's partial
//! output file is removed before the error is surfaced; outputs of
//! combinations that already completed are left in place.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::combinations::combinations;
use crate::error::{PipelineError, Result};
use crate::executor::dispatch;
use crate::stream::AudioStream;
use crate::transform::{Transform, TransformSpec};
use crate::validate::{StreamFormat, validate};
use crate::writer::BlockWriter;

/// Container extension eligible files must carry.
const CONTAINER_EXTENSION: &str = "wav";

/// Separator joining member file names into the output file name.
const OUTPUT_NAME_SEPARATOR: &str = "-";

/// Orchestrator states. Terminal states are `Done` and `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    /// Constructed, not yet executed.
    Idle,
    /// Scanning the input directory and planning combinations.
    Planning,
    /// Checking format agreement for the current combination.
    Validating,
    /// Decoding, transforming, and buffering blocks.
    Streaming,
    /// Final flush and container finalization.
    Writing,
    /// All combinations processed (or zero eligible files).
    Done,
    /// A combination failed; the stage stopped.
    Failed,
}

impl std::fmt::Display for StageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Planning => write!(f, "planning"),
            Self::Validating => write!(f, "validating"),
            Self::Streaming => write!(f, "streaming"),
            Self::Writing => write!(f, "writing"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Summary of one executed stage.
#[derive(Debug, Clone, Default)]
pub struct StageReport {
    /// Combinations processed to completion.
    pub combinations: usize,
    /// Block tuples transformed across all combinations.
    pub blocks: u64,
    /// Frames written across all output containers.
    pub frames: u64,
    /// Paths of the finished output containers.
    pub outputs: Vec<PathBuf>,
}

/// One configured transform invocation over a directory of input files.
///
/// Constructed once, executed exactly once, discarded after execution.
pub struct Stage {
    name: String,
    transform: Box<dyn Transform>,
    nr_inputs: usize,
    block_size: Option<usize>,
    input_dir: PathBuf,
    output_dir: PathBuf,
    state: StageState,
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("nr_inputs", &self.nr_inputs)
            .field("block_size", &self.block_size)
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Stage {
    /// Build a stage from a transform spec and directory pair.
    ///
    /// `block_size` is in frames; `None` (or a value at least as large as a
    /// combination's frame count) processes each file as a single block.
    pub fn new(
        spec: &TransformSpec,
        nr_inputs: usize,
        block_size: Option<usize>,
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        if block_size == Some(0) {
            return Err(PipelineError::Config(
                "block_size must be at least 1 frame".to_string(),
            ));
        }
        let transform = spec.build(nr_inputs)?;
        Ok(Self {
            name: spec.name().to_string(),
            transform,
            nr_inputs,
            block_size,
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            state: StageState::Idle,
        })
    }

    /// Transform name this stage applies.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current orchestrator state.
    pub fn state(&self) -> StageState {
        self.state
    }

    /// Output directory of this stage (input of a chained successor).
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Execute the stage over every combination of eligible input files.
    pub fn execute(&mut self) -> Result<StageReport> {
        self.state = StageState::Planning;
        let names = scan_input_dir(&self.input_dir)?;

        if names.is_empty() {
            info!(
                "stage '{}': no eligible files in '{}', nothing to do",
                self.name,
                self.input_dir.display()
            );
            self.state = StageState::Done;
            return Ok(StageReport::default());
        }

        // Output directory exists only once eligible input is confirmed.
        fs::create_dir_all(&self.output_dir)?;
        info!(
            "stage '{}': {} file(s), arity {}, writing to '{}'",
            self.name,
            names.len(),
            self.nr_inputs,
            self.output_dir.display()
        );

        let mut report = StageReport::default();
        for combo in combinations(names.len(), self.nr_inputs) {
            let members: Vec<String> = combo.iter().map(|&i| names[i].clone()).collect();
            match self.run_combination(&members) {
                Ok((blocks, frames, output)) => {
                    report.combinations += 1;
                    report.blocks += blocks;
                    report.frames += frames;
                    report.outputs.push(output);
                }
                Err(e) => {
                    self.state = StageState::Failed;
                    return Err(e);
                }
            }
        }

        self.state = StageState::Done;
        info!(
            "stage '{}': {} combination(s), {} block(s), {} frame(s)",
            self.name, report.combinations, report.blocks, report.frames
        );
        Ok(report)
    }

    fn run_combination(&mut self, members: &[String]) -> Result<(u64, u64, PathBuf)> {
        self.state = StageState::Validating;
        let mut streams = Vec::with_capacity(members.len());
        for member in members {
            streams.push(AudioStream::open(self.input_dir.join(member))?);
        }
        let format = validate(&streams)?;

        // Effective block size is derived from this combination's validated
        // frame count alone; other combinations in the stage never see it.
        let frames = format.frame_count as usize;
        // `max(1)` keeps the block size legal for zero-frame inputs, which
        // then iterate zero blocks and produce an empty container.
        let block_size = match self.block_size {
            Some(b) if b < frames => b,
            _ => frames.max(1),
        };

        let output_path = self.output_dir.join(members.join(OUTPUT_NAME_SEPARATOR));
        debug!(
            "combination [{}]: {}, block size {} frame(s)",
            members.join(", "),
            format,
            block_size
        );

        self.state = StageState::Streaming;
        match self.stream_combination(&streams, block_size, format, &output_path) {
            Ok((blocks, frames_written)) => Ok((blocks, frames_written, output_path)),
            Err(e) => {
                // Partial output must never look like a finished container.
                if output_path.exists() {
                    match fs::remove_file(&output_path) {
                        Ok(()) => info!("removed partial output '{}'", output_path.display()),
                        Err(rm) => warn!(
                            "could not remove partial output '{}': {rm}",
                            output_path.display()
                        ),
                    }
                }
                Err(e)
            }
        }
    }

    fn stream_combination(
        &mut self,
        streams: &[AudioStream],
        block_size: usize,
        format: StreamFormat,
        output_path: &Path,
    ) -> Result<(u64, u64)> {
        let mut sources = Vec::with_capacity(streams.len());
        for stream in streams {
            sources.push(stream.blocks(block_size)?);
        }

        let mut writer = BlockWriter::create(output_path, format)?;
        let blocks = dispatch(sources, self.transform.as_ref(), |_, block| {
            writer.write(block)
        })?;

        self.state = StageState::Writing;
        let frames_written = writer.close()?;
        Ok((blocks, frames_written))
    }
}

/// Non-recursive scan for container files, sorted lexicographically by name.
///
/// A missing input directory reads as empty: chained stages whose predecessor
/// was a no-op stay a no-op instead of failing.
fn scan_input_dir(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        warn!("input directory '{}' does not exist", dir.display());
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_container = path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext == CONTAINER_EXTENSION);
        if is_container {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(dir: &Path, name: &str, samples: &[i16], sample_rate: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(dir.join(name), spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn read_all(path: &Path) -> Vec<i16> {
        let stream = AudioStream::open(path).unwrap();
        stream
            .blocks(stream.frame_count.max(1) as usize)
            .unwrap()
            .flat_map(|b| match b.unwrap().samples {
                crate::block::Samples::I16(v) => v,
                _ => unreachable!(),
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Directory scan tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_scan_sorts_and_filters() {
        let tmp = tempfile::tempdir().unwrap();
        write_wav(tmp.path(), "b.wav", &[0], 8000);
        write_wav(tmp.path(), "a.wav", &[0], 8000);
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();
        std::fs::create_dir(tmp.path().join("sub.wav")).unwrap();

        let names = scan_input_dir(tmp.path()).unwrap();
        assert_eq!(names, vec!["a.wav", "b.wav"]);
    }

    #[test]
    fn test_scan_missing_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let names = scan_input_dir(&tmp.path().join("nope")).unwrap();
        assert!(names.is_empty());
    }

    // -----------------------------------------------------------------------
    // Stage lifecycle tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_empty_input_is_noop_done() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in");
        std::fs::create_dir(&input).unwrap();
        let output = tmp.path().join("out");

        let mut stage =
            Stage::new(&TransformSpec::Identity, 1, None, &input, &output).unwrap();
        assert_eq!(stage.state(), StageState::Idle);
        let report = stage.execute().unwrap();

        assert_eq!(stage.state(), StageState::Done);
        assert_eq!(report.combinations, 0);
        assert!(!output.exists(), "no-op stage must not create output dir");
    }

    #[test]
    fn test_identity_stage_roundtrips_files() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in");
        std::fs::create_dir(&input).unwrap();
        let samples: Vec<i16> = (0..100).collect();
        write_wav(&input, "x.wav", &samples, 44100);
        let output = tmp.path().join("out");

        let mut stage =
            Stage::new(&TransformSpec::Identity, 1, Some(30), &input, &output).unwrap();
        let report = stage.execute().unwrap();

        assert_eq!(stage.state(), StageState::Done);
        assert_eq!(report.combinations, 1);
        assert_eq!(report.blocks, 4); // ceil(100 / 30)
        assert_eq!(report.frames, 100);
        assert_eq!(read_all(&output.join("x.wav")), samples);
    }

    #[test]
    fn test_arity_two_pairs_files() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in");
        std::fs::create_dir(&input).unwrap();
        for name in ["f1.wav", "f2.wav", "f3.wav"] {
            write_wav(&input, name, &(0..60).collect::<Vec<i16>>(), 8000);
        }
        let output = tmp.path().join("out");

        let mut stage = Stage::new(&TransformSpec::Mix, 2, Some(25), &input, &output).unwrap();
        let report = stage.execute().unwrap();

        assert_eq!(report.combinations, 3); // C(3, 2)
        let produced: Vec<String> = report
            .outputs
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            produced,
            vec!["f1.wav-f2.wav", "f1.wav-f3.wav", "f2.wav-f3.wav"]
        );
    }

    #[test]
    fn test_validation_failure_stops_stage() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in");
        std::fs::create_dir(&input).unwrap();
        write_wav(&input, "a.wav", &(0..100).collect::<Vec<i16>>(), 8000);
        write_wav(&input, "b.wav", &(0..90).collect::<Vec<i16>>(), 8000);
        let output = tmp.path().join("out");

        let mut stage = Stage::new(&TransformSpec::Mix, 2, None, &input, &output).unwrap();
        let err = stage.execute().unwrap_err();

        assert_eq!(stage.state(), StageState::Failed);
        assert!(
            matches!(err, PipelineError::Validation { field: "frame_count", .. }),
            "got: {err:?}"
        );
        assert!(
            !output.join("a.wav-b.wav").exists(),
            "failed combination must not leave an output file"
        );
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Stage::new(
            &TransformSpec::Identity,
            1,
            Some(0),
            tmp.path().join("in"),
            tmp.path().join("out"),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)), "got: {err:?}");
    }

    #[test]
    fn test_zero_frame_input_produces_empty_output() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in");
        std::fs::create_dir(&input).unwrap();
        write_wav(&input, "x.wav", &[], 8000);
        let output = tmp.path().join("out");

        let mut stage = Stage::new(&TransformSpec::Identity, 1, None, &input, &output).unwrap();
        let report = stage.execute().unwrap();

        assert_eq!(stage.state(), StageState::Done);
        assert_eq!(report.combinations, 1);
        assert_eq!(report.frames, 0);
        let out = AudioStream::open(output.join("x.wav")).unwrap();
        assert_eq!(out.frame_count, 0);
    }

    #[test]
    fn test_block_size_larger_than_file_uses_whole_file() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in");
        std::fs::create_dir(&input).unwrap();
        write_wav(&input, "x.wav", &(0..40).collect::<Vec<i16>>(), 8000);
        let output = tmp.path().join("out");

        let mut stage =
            Stage::new(&TransformSpec::Identity, 1, Some(10_000), &input, &output).unwrap();
        let report = stage.execute().unwrap();
        assert_eq!(report.blocks, 1);
        assert_eq!(report.frames, 40);
    }
}

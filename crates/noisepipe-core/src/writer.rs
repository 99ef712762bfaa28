//! Buffered output writer over the WAV container.
//!
//! Transformed blocks accumulate in memory and are flushed to the container
//! whenever the buffered byte count crosses [`BUFFER_THRESHOLD_BYTES`], which
//! bounds peak memory independent of total output size. Correctness never
//! depends on the threshold: [`BlockWriter::close`] performs a final
//! unconditional flush and finalizes the container, fixing up the length
//! headers.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use log::{debug, trace};

use crate::block::{Block, Samples};
use crate::error::{PipelineError, Result};
use crate::validate::StreamFormat;

/// Flush threshold for buffered block bytes (100 MiB, tuning only).
pub const BUFFER_THRESHOLD_BYTES: usize = 100 * 1024 * 1024;

/// Writes transformed blocks to one output container.
///
/// The container inherits sample rate, channel count, and sample width from
/// the validated combination; its frame count is whatever was actually
/// written, fixed up at close.
pub struct BlockWriter {
    writer: hound::WavWriter<BufWriter<File>>,
    path: PathBuf,
    format: StreamFormat,
    threshold: usize,
    buffered: Vec<Block>,
    buffered_bytes: usize,
    frames_written: u64,
}

impl BlockWriter {
    /// Create the output container (and its parent directories) with the
    /// combination's shared format.
    pub fn create(path: impl AsRef<Path>, format: StreamFormat) -> Result<Self> {
        Self::with_threshold(path, format, BUFFER_THRESHOLD_BYTES)
    }

    /// As [`create`](Self::create) with an explicit flush threshold.
    /// Tests use small thresholds; behavior must not change with the value.
    pub fn with_threshold(
        path: impl AsRef<Path>,
        format: StreamFormat,
        threshold: usize,
    ) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let spec = hound::WavSpec {
            channels: format.channel_count,
            sample_rate: format.sample_rate,
            bits_per_sample: format.sample_width * 8,
            sample_format: hound::SampleFormat::Int,
        };
        let writer =
            hound::WavWriter::create(path, spec).map_err(|e| PipelineError::from_wav(path, e))?;
        debug!("opened output container '{}' ({})", path.display(), format);

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            format,
            threshold,
            buffered: Vec::new(),
            buffered_bytes: 0,
            frames_written: 0,
        })
    }

    /// Append one transformed block, flushing if the buffer crossed the
    /// threshold. The block's sample type must match the container's.
    pub fn write(&mut self, block: Block) -> Result<()> {
        if block.sample_type() != self.format.sample_type() {
            return Err(PipelineError::Format {
                path: self.path.clone(),
                reason: format!(
                    "output block sample type {} does not match container type {}",
                    block.sample_type(),
                    self.format.sample_type()
                ),
            });
        }

        self.buffered_bytes += block.byte_len();
        self.frames_written += block.frame_count() as u64;
        self.buffered.push(block);

        if self.buffered_bytes >= self.threshold {
            self.flush_buffer()?;
        }
        Ok(())
    }

    /// Total frames written so far (buffered or flushed).
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Output container path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush_buffer(&mut self) -> Result<()> {
        trace!(
            "flushing {} buffered block(s), {} bytes",
            self.buffered.len(),
            self.buffered_bytes
        );
        for block in self.buffered.drain(..) {
            match &block.samples {
                Samples::U8(v) => {
                    for &s in v {
                        self.writer
                            .write_sample(s as i8)
                            .map_err(|e| PipelineError::from_wav(&self.path, e))?;
                    }
                }
                Samples::I16(v) => {
                    for &s in v {
                        self.writer
                            .write_sample(s)
                            .map_err(|e| PipelineError::from_wav(&self.path, e))?;
                    }
                }
                Samples::I32(v) => {
                    for &s in v {
                        self.writer
                            .write_sample(s)
                            .map_err(|e| PipelineError::from_wav(&self.path, e))?;
                    }
                }
            }
        }
        self.buffered_bytes = 0;
        self.writer
            .flush()
            .map_err(|e| PipelineError::from_wav(&self.path, e))
    }

    /// Final unconditional flush, then finalize the container headers and
    /// release the file handle.
    pub fn close(mut self) -> Result<u64> {
        self.flush_buffer()?;
        let frames = self.frames_written;
        self.writer
            .finalize()
            .map_err(|e| PipelineError::from_wav(&self.path, e))?;
        debug!("closed output container, {frames} frames");
        Ok(frames)
    }
}

//! Stream reader: container metadata plus restartable lazy block decoding.
//!
//! [`AudioStream::open`] parses only the WAV header; no sample data is
//! touched until [`AudioStream::blocks`] is called, and each `blocks` call
//! reopens the file from the start. The file handle lives inside the returned
//! [`BlockIter`] and is released when the iterator is dropped, so abandoning
//! iteration early cannot leak handles.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::block::{Block, SampleType, Samples};
use crate::error::{PipelineError, Result};
use crate::validate::StreamFormat;

/// One opened container file: path plus immutable format metadata.
///
/// Owned exclusively by the reader that opened it; the header fields never
/// change after `open`.
#[derive(Debug, Clone)]
pub struct AudioStream {
    path: PathBuf,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channels per frame.
    pub channel_count: u16,
    /// Bytes per sample.
    pub sample_width: u16,
    /// Frames in the container (samples per channel).
    pub frame_count: u32,
    /// Element type derived from `sample_width`.
    pub sample_type: SampleType,
}

impl AudioStream {
    /// Open a container and extract its format metadata.
    ///
    /// Fails with a format error when the header cannot be parsed, when the
    /// container holds float samples, or when the sample width maps to no
    /// known element type.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader =
            hound::WavReader::open(path).map_err(|e| PipelineError::from_wav(path, e))?;
        let spec = reader.spec();

        if spec.sample_format != hound::SampleFormat::Int {
            return Err(PipelineError::Format {
                path: path.to_path_buf(),
                reason: "float sample format is not supported".to_string(),
            });
        }
        if spec.bits_per_sample % 8 != 0 {
            return Err(PipelineError::Format {
                path: path.to_path_buf(),
                reason: format!("sample width of {} bits is not byte-aligned", spec.bits_per_sample),
            });
        }

        let sample_width = spec.bits_per_sample / 8;
        let sample_type = SampleType::from_sample_width(sample_width).ok_or_else(|| {
            PipelineError::Format {
                path: path.to_path_buf(),
                reason: format!("unsupported sample width: {sample_width} bytes"),
            }
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            sample_rate: spec.sample_rate,
            channel_count: spec.channels,
            sample_width,
            frame_count: reader.duration(),
            sample_type,
        })
    }

    /// Path of the underlying container file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The four shared header fields, as validated across a combination.
    pub fn format(&self) -> StreamFormat {
        StreamFormat {
            sample_rate: self.sample_rate,
            frame_count: self.frame_count,
            channel_count: self.channel_count,
            sample_width: self.sample_width,
        }
    }

    /// Begin lazy block iteration, `block_size` frames per block.
    ///
    /// Restartable: every call reopens the container and decodes from frame
    /// zero. Yields `ceil(frame_count / block_size)` blocks; the last one may
    /// be short when `frame_count` is not a multiple of `block_size`.
    /// A zero `block_size` is rejected as a configuration error.
    pub fn blocks(&self, block_size: usize) -> Result<BlockIter> {
        if block_size == 0 {
            return Err(PipelineError::Config(
                "block size must be at least 1 frame".to_string(),
            ));
        }
        let reader = hound::WavReader::open(&self.path)
            .map_err(|e| PipelineError::from_wav(&self.path, e))?;
        Ok(BlockIter {
            reader,
            path: self.path.clone(),
            block_size,
            channel_count: self.channel_count,
            sample_type: self.sample_type,
            frames_remaining: self.frame_count as u64,
        })
    }
}

/// Lazy, finite sequence of blocks decoded from one container.
///
/// Holds the open file handle for the duration of iteration only.
pub struct BlockIter {
    reader: hound::WavReader<BufReader<File>>,
    path: PathBuf,
    block_size: usize,
    channel_count: u16,
    sample_type: SampleType,
    frames_remaining: u64,
}

impl std::fmt::Debug for BlockIter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockIter")
            .field("path", &self.path)
            .field("block_size", &self.block_size)
            .field("channel_count", &self.channel_count)
            .field("sample_type", &self.sample_type)
            .field("frames_remaining", &self.frames_remaining)
            .finish_non_exhaustive()
    }
}

impl BlockIter {
    fn read_block(&mut self, frames: usize) -> Result<Block> {
        let n = frames * self.channel_count as usize;
        let samples = match self.sample_type {
            SampleType::U8 => {
                let raw = self.collect_samples::<i8>(n)?;
                Samples::U8(raw.into_iter().map(|s| s as u8).collect())
            }
            SampleType::I16 => Samples::I16(self.collect_samples::<i16>(n)?),
            SampleType::I32 => Samples::I32(self.collect_samples::<i32>(n)?),
        };
        Ok(Block {
            samples,
            channel_count: self.channel_count,
        })
    }

    fn collect_samples<S: hound::Sample>(&mut self, n: usize) -> Result<Vec<S>> {
        self.reader
            .samples::<S>()
            .take(n)
            .collect::<std::result::Result<Vec<S>, hound::Error>>()
            .map_err(|e| PipelineError::from_wav(&self.path, e))
    }
}

impl Iterator for BlockIter {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.frames_remaining == 0 {
            return None;
        }
        let frames = (self.block_size as u64).min(self.frames_remaining) as usize;

        match self.read_block(frames) {
            Ok(block) => {
                // A container shorter than its header claims ends the stream
                // at whatever data was actually present.
                let got_frames = block.frame_count() as u64;
                if got_frames < frames as u64 {
                    self.frames_remaining = 0;
                } else {
                    self.frames_remaining -= frames as u64;
                }
                if block.is_empty() {
                    None
                } else {
                    Some(Ok(block))
                }
            }
            Err(e) => {
                self.frames_remaining = 0;
                Some(Err(e))
            }
        }
    }
}

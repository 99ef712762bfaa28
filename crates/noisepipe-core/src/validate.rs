//! Format validator: cross-file header agreement for one combination.
//!
//! All members of a combination must share sample rate, frame count, channel
//! count, and sample width before any block is decoded. Validation is
//! all-or-nothing: the first file sets the baseline and any later mismatch
//! fails the whole set, naming the field and both conflicting values.

use crate::block::SampleType;
use crate::error::{PipelineError, Result};
use crate::stream::AudioStream;

/// The four header fields every member of a combination must agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Frames per stream.
    pub frame_count: u32,
    /// Channels per frame.
    pub channel_count: u16,
    /// Bytes per sample.
    pub sample_width: u16,
}

impl StreamFormat {
    /// Element type for this format. The width was checked at stream open,
    /// so the mapping always exists here.
    pub fn sample_type(&self) -> SampleType {
        SampleType::from_sample_width(self.sample_width)
            .unwrap_or_else(|| unreachable!("width validated at open: {}", self.sample_width))
    }

    /// Samples per full block of `block_size` frames.
    pub fn samples_per_block(&self, block_size: usize) -> usize {
        block_size * self.channel_count as usize
    }
}

impl std::fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} Hz, {} ch, {} B/sample, {} frames",
            self.sample_rate, self.channel_count, self.sample_width, self.frame_count
        )
    }
}

/// Check that all opened streams share one format, returning it.
///
/// Reads metadata only; no sample data is decoded. Fails on the first
/// mismatching field of the first mismatching file.
pub fn validate(streams: &[AudioStream]) -> Result<StreamFormat> {
    let first = streams.first().ok_or_else(|| {
        PipelineError::Config("cannot validate an empty combination".to_string())
    })?;
    let baseline = first.format();

    for stream in &streams[1..] {
        let format = stream.format();
        let mismatch: Option<(&'static str, u64, u64)> = if format.sample_rate
            != baseline.sample_rate
        {
            Some(("sample_rate", baseline.sample_rate.into(), format.sample_rate.into()))
        } else if format.frame_count != baseline.frame_count {
            Some(("frame_count", baseline.frame_count.into(), format.frame_count.into()))
        } else if format.channel_count != baseline.channel_count {
            Some((
                "channel_count",
                baseline.channel_count.into(),
                format.channel_count.into(),
            ))
        } else if format.sample_width != baseline.sample_width {
            Some(("sample_width", baseline.sample_width.into(), format.sample_width.into()))
        } else {
            None
        };

        if let Some((field, expected, found)) = mismatch {
            return Err(PipelineError::Validation {
                path: stream.path().to_path_buf(),
                field,
                expected,
                found,
            });
        }
    }

    Ok(baseline)
}

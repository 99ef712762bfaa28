//! Typed sample blocks, the unit of transform application.
//!
//! A [`Block`] is a bounded run of interleaved samples decoded from one
//! stream. Its element type is fixed by the container's sample width
//! (1 byte → unsigned 8-bit, 2 → signed 16-bit, 4 → signed 32-bit), the same
//! deterministic mapping the rest of the pipeline validates against.

/// Numeric element type, derived from the container's sample width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    /// 1-byte samples, unsigned 8-bit PCM.
    U8,
    /// 2-byte samples, signed 16-bit PCM.
    I16,
    /// 4-byte samples, signed 32-bit PCM.
    I32,
}

impl SampleType {
    /// Map a sample width in bytes to its element type.
    /// Widths outside {1, 2, 4} map to no known type.
    pub fn from_sample_width(width: u16) -> Option<Self> {
        match width {
            1 => Some(Self::U8),
            2 => Some(Self::I16),
            4 => Some(Self::I32),
            _ => None,
        }
    }

    /// Bytes per sample.
    pub fn sample_width(self) -> u16 {
        match self {
            Self::U8 => 1,
            Self::I16 => 2,
            Self::I32 => 4,
        }
    }

    /// Bits per sample, as declared in the container header.
    pub fn bits_per_sample(self) -> u16 {
        self.sample_width() * 8
    }
}

impl std::fmt::Display for SampleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::U8 => write!(f, "u8"),
            Self::I16 => write!(f, "i16"),
            Self::I32 => write!(f, "i32"),
        }
    }
}

/// Sample storage, one variant per element type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Samples {
    U8(Vec<u8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
}

impl Samples {
    /// Number of samples (across all channels).
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::I32(v) => v.len(),
        }
    }

    /// Whether the block holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type of this storage.
    pub fn sample_type(&self) -> SampleType {
        match self {
            Self::U8(_) => SampleType::U8,
            Self::I16(_) => SampleType::I16,
            Self::I32(_) => SampleType::I32,
        }
    }
}

/// One decoded block: interleaved samples plus the channel shape.
///
/// The last block of a stream may be shorter than the configured block size.
/// Blocks are produced lazily by the stream reader and consumed exactly once
/// by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Interleaved sample data (frame-major when `channel_count > 1`).
    pub samples: Samples,
    /// Channels per frame, copied from the source stream.
    pub channel_count: u16,
}

impl Block {
    /// Number of samples in the block (across all channels).
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the block holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Element type of the block.
    pub fn sample_type(&self) -> SampleType {
        self.samples.sample_type()
    }

    /// Number of whole frames in the block.
    pub fn frame_count(&self) -> usize {
        self.len() / self.channel_count.max(1) as usize
    }

    /// Encoded size of the block in bytes.
    pub fn byte_len(&self) -> usize {
        self.len() * self.sample_type().sample_width() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Sample width mapping tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_sample_width_mapping() {
        assert_eq!(SampleType::from_sample_width(1), Some(SampleType::U8));
        assert_eq!(SampleType::from_sample_width(2), Some(SampleType::I16));
        assert_eq!(SampleType::from_sample_width(4), Some(SampleType::I32));
    }

    #[test]
    fn test_sample_width_unknown_widths() {
        assert_eq!(SampleType::from_sample_width(0), None);
        assert_eq!(SampleType::from_sample_width(3), None);
        assert_eq!(SampleType::from_sample_width(8), None);
    }

    #[test]
    fn test_sample_width_roundtrip() {
        for width in [1u16, 2, 4] {
            let ty = SampleType::from_sample_width(width).unwrap();
            assert_eq!(ty.sample_width(), width);
            assert_eq!(ty.bits_per_sample(), width * 8);
        }
    }

    // -----------------------------------------------------------------------
    // Block shape tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_block_len_and_bytes() {
        let block = Block {
            samples: Samples::I16(vec![0, 1, -2, 3]),
            channel_count: 2,
        };
        assert_eq!(block.len(), 4);
        assert_eq!(block.frame_count(), 2);
        assert_eq!(block.byte_len(), 8);
        assert_eq!(block.sample_type(), SampleType::I16);
    }

    #[test]
    fn test_empty_block() {
        let block = Block {
            samples: Samples::U8(Vec::new()),
            channel_count: 1,
        };
        assert!(block.is_empty());
        assert_eq!(block.byte_len(), 0);
    }
}

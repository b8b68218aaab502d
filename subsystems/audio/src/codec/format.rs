//! Sample format and clock selection.

use super::regs::DataFormat;
use crate::error::{AudioError, AudioResult, FormatError};
use crate::wav::StreamDescriptor;

/// Supported rates and their clock source / divider bits
///
/// XTAL1 is 24.576 MHz (CSS clear), XTAL2 16.9344 MHz (CSS set).
const RATE_TABLE: [(u32, DataFormat); 7] = [
    (8000, DataFormat::empty()),
    (11025, DataFormat::CFS0.union(DataFormat::CSS)),
    (16000, DataFormat::CFS0),
    (22050, DataFormat::CFS1.union(DataFormat::CFS0).union(DataFormat::CSS)),
    (32000, DataFormat::CFS1.union(DataFormat::CFS0)),
    (44100, DataFormat::CFS2.union(DataFormat::CFS0).union(DataFormat::CSS)),
    (48000, DataFormat::CFS2.union(DataFormat::CFS1)),
];

/// Look up the clock bits for `rate`
pub fn clock_bits(rate: u32) -> Option<DataFormat> {
    RATE_TABLE
        .iter()
        .find(|(r, _)| *r == rate)
        .map(|(_, bits)| *bits)
}

/// Sample rates the codec can be programmed for
pub fn supported_rates() -> impl Iterator<Item = u32> {
    RATE_TABLE.iter().map(|(rate, _)| *rate)
}

/// A validated playback format
///
/// Constructing one is the only way to reach the codec's format register,
/// so an unsupported stream is rejected before any port is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecFormat {
    sample_rate: u32,
    bit_depth: u16,
    channels: u16,
    clock: DataFormat,
}

impl CodecFormat {
    /// Validate rate, sample width and channel count
    pub fn new(sample_rate: u32, bit_depth: u16, channels: u16) -> AudioResult<Self> {
        let clock = clock_bits(sample_rate)
            .ok_or(FormatError::UnsupportedSampleRate { rate: sample_rate })?;
        if bit_depth != 8 && bit_depth != 16 {
            return Err(FormatError::UnsupportedBitDepth { bits: bit_depth }.into());
        }
        if channels != 1 && channels != 2 {
            return Err(FormatError::UnsupportedChannels { channels }.into());
        }
        Ok(Self {
            sample_rate,
            bit_depth,
            channels,
            clock,
        })
    }

    /// Format of a parsed stream
    pub fn for_stream(stream: &StreamDescriptor) -> AudioResult<Self> {
        Self::new(stream.sample_rate, stream.bit_depth, stream.channels)
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Bits per sample
    pub fn bit_depth(&self) -> u16 {
        self.bit_depth
    }

    /// Channel count
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Bytes per sample frame
    pub fn frame_size(&self) -> usize {
        usize::from(self.bit_depth / 8) * usize::from(self.channels)
    }

    /// Data format register value
    pub fn register(&self) -> DataFormat {
        let mut value = self.clock;
        if self.bit_depth == 16 {
            value |= DataFormat::FMT;
        }
        if self.channels == 2 {
            value |= DataFormat::S_M;
        }
        value
    }

    /// Base count for an interrupt every half of a `buffer_size` buffer
    ///
    /// The codec counts sample frames, zero-based.
    pub fn transfer_count(&self, buffer_size: usize) -> AudioResult<u16> {
        let frames = buffer_size / (self.frame_size() * 2);
        if frames == 0 {
            return Err(AudioError::invalid_argument("buffer smaller than two frames"));
        }
        u16::try_from(frames - 1).map_err(|_| AudioError::invalid_argument("buffer too large"))
    }

    /// Byte value that plays as silence
    pub fn silence(&self) -> u8 {
        silence_for(self.bit_depth)
    }
}

/// Silence byte for a sample width: 8-bit PCM is unsigned
pub const fn silence_for(bit_depth: u16) -> u8 {
    if bit_depth == 8 {
        0x80
    } else {
        0x00
    }
}

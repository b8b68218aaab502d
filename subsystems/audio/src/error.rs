//! # Error Types
//!
//! One error enum for the whole subsystem. Hardware primitives return it,
//! the playback engine passes it through without retrying.

use core::fmt;
use wss_hal::HalError;

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;

/// Errors that can occur in the audio subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AudioError {
    /// The requested track does not exist
    NotFound,

    /// No suitable DMA memory could be allocated
    OutOfMemory,

    /// A parameter to a hardware primitive is out of range
    InvalidArgument {
        /// What was wrong
        what: &'static str,
    },

    /// The stream cannot be played
    InvalidFormat(FormatError),

    /// A read failed or came back short where a full header was required
    Io,

    /// The codec did not become ready within the retry budget
    Timeout,
}

/// Why a stream was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FormatError {
    /// Container tag is not `RIFF`
    NotRiff,
    /// Form tag is not `WAVE`
    NotWave,
    /// Format chunk tag is not `fmt `
    MissingFmtChunk,
    /// Audio format code is not linear PCM
    NotPcm {
        /// Declared format code
        code: u16,
    },
    /// Channel count, rate or sample width is zero or not byte-sized
    BadFmtFields,
    /// No `data` tag within the header scan window
    MissingDataChunk,
    /// The data chunk starts past the declared container size
    BadDataSize,
    /// Sample rate is not in the codec's rate table
    UnsupportedSampleRate {
        /// Requested rate in Hz
        rate: u32,
    },
    /// Sample width the codec cannot play
    UnsupportedBitDepth {
        /// Requested bits per sample
        bits: u16,
    },
    /// Channel count the codec cannot play
    UnsupportedChannels {
        /// Requested channel count
        channels: u16,
    },
}

impl AudioError {
    /// Create an invalid argument error
    pub const fn invalid_argument(what: &'static str) -> Self {
        Self::InvalidArgument { what }
    }
}

impl From<FormatError> for AudioError {
    fn from(err: FormatError) -> Self {
        Self::InvalidFormat(err)
    }
}

impl From<HalError> for AudioError {
    fn from(err: HalError) -> Self {
        match err {
            HalError::OutOfMemory => Self::OutOfMemory,
            HalError::Timeout => Self::Timeout,
            HalError::InvalidParameter => Self::invalid_argument("hardware parameter"),
            HalError::NotSupported => Self::invalid_argument("unsupported on this platform"),
        }
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound,
            _ => Self::Io,
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "file not found"),
            Self::OutOfMemory => write!(f, "out of DMA-capable memory"),
            Self::InvalidArgument { what } => write!(f, "invalid argument: {}", what),
            Self::InvalidFormat(err) => write!(f, "invalid format: {}", err),
            Self::Io => write!(f, "I/O error"),
            Self::Timeout => write!(f, "codec not ready"),
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRiff => write!(f, "missing RIFF tag"),
            Self::NotWave => write!(f, "missing WAVE tag"),
            Self::MissingFmtChunk => write!(f, "missing fmt chunk"),
            Self::NotPcm { code } => write!(f, "audio format {} is not linear PCM", code),
            Self::BadFmtFields => write!(f, "malformed fmt chunk"),
            Self::MissingDataChunk => write!(f, "data chunk not found in header"),
            Self::BadDataSize => write!(f, "data chunk lies outside the container"),
            Self::UnsupportedSampleRate { rate } => write!(f, "unsupported sample rate {} Hz", rate),
            Self::UnsupportedBitDepth { bits } => write!(f, "unsupported sample width {} bits", bits),
            Self::UnsupportedChannels { channels } => write!(f, "unsupported channel count {}", channels),
        }
    }
}

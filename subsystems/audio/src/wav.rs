//! # WAV Container Parser
//!
//! Finds the PCM payload of a RIFF/WAVE file and describes it.
//!
//! The canonical header is 44 bytes with the `data` chunk right behind a
//! 16-byte `fmt ` chunk. Files carrying extension fields or metadata chunks
//! push `data` further back; for those the first `scan_window` bytes are
//! searched for the tag, on the assumption that no header is longer.

use crate::error::{AudioError, AudioResult, FormatError};
use crate::storage::TrackFile;
use alloc::vec;

/// Default number of leading bytes searched for the `data` tag
pub const DEFAULT_SCAN_WINDOW: usize = 512;

/// Size of the canonical header
pub const CANONICAL_HEADER_SIZE: usize = 44;

/// Audio format code of linear PCM
pub const FORMAT_PCM: u16 = 1;

const RIFF_TAG: &[u8; 4] = b"RIFF";
const WAVE_TAG: &[u8; 4] = b"WAVE";
const FMT_TAG: &[u8; 4] = b"fmt ";
const DATA_TAG: &[u8; 4] = b"data";

/// Offset of the `data` tag in a canonical header
const CANONICAL_DATA_TAG: usize = 36;

/// Parsed description of a PCM stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamDescriptor {
    /// Samples per second per channel
    pub sample_rate: u32,
    /// Bits per sample
    pub bit_depth: u16,
    /// Interleaved channels
    pub channels: u16,
    /// PCM bytes per second
    pub byte_rate: u32,
    /// Bytes per sample frame as declared
    pub block_align: u16,
    /// Bytes of PCM data
    pub data_size: u32,
    /// File offset of the first PCM byte
    pub data_offset: u32,
}

impl StreamDescriptor {
    /// Bytes per single-channel sample
    pub fn bytes_per_sample(&self) -> u32 {
        u32::from(self.bit_depth / 8)
    }

    /// Whole seconds of audio in the data chunk
    pub fn duration_secs(&self) -> u32 {
        self.data_size / self.byte_rate
    }
}

fn le16(b: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([b[at], b[at + 1]])
}

fn le32(b: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

/// WAV header parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavReader {
    scan_window: usize,
}

impl Default for WavReader {
    fn default() -> Self {
        Self::new()
    }
}

impl WavReader {
    /// Parser with the default scan window
    pub const fn new() -> Self {
        Self {
            scan_window: DEFAULT_SCAN_WINDOW,
        }
    }

    /// Parser searching `window` bytes for the data chunk
    ///
    /// Windows smaller than the canonical header are widened to it.
    pub fn with_scan_window(window: usize) -> Self {
        Self {
            scan_window: window.max(CANONICAL_HEADER_SIZE),
        }
    }

    /// Bytes searched for the data chunk
    pub fn scan_window(&self) -> usize {
        self.scan_window
    }

    /// Parse the header of `file` and leave the cursor on the first PCM byte
    pub fn parse<F: TrackFile + ?Sized>(&self, file: &mut F) -> AudioResult<StreamDescriptor> {
        let mut header = vec![0u8; self.scan_window];
        file.seek(0)?;
        let len = file.read_full(&mut header)?;
        if len < CANONICAL_HEADER_SIZE {
            return Err(AudioError::Io);
        }
        let header = &header[..len];

        if &header[0..4] != RIFF_TAG {
            return Err(FormatError::NotRiff.into());
        }
        if &header[8..12] != WAVE_TAG {
            return Err(FormatError::NotWave.into());
        }
        if &header[12..16] != FMT_TAG {
            return Err(FormatError::MissingFmtChunk.into());
        }

        let code = le16(header, 20);
        if code != FORMAT_PCM {
            return Err(FormatError::NotPcm { code }.into());
        }

        let channels = le16(header, 22);
        let sample_rate = le32(header, 24);
        let declared_rate = le32(header, 28);
        let block_align = le16(header, 32);
        let bit_depth = le16(header, 34);
        if channels == 0 || sample_rate == 0 || bit_depth == 0 || bit_depth % 8 != 0 {
            return Err(FormatError::BadFmtFields.into());
        }

        let (data_offset, declared_size) = if &header[CANONICAL_DATA_TAG..CANONICAL_DATA_TAG + 4] == DATA_TAG {
            (CANONICAL_HEADER_SIZE as u32, le32(header, CANONICAL_DATA_TAG + 4))
        } else {
            let tag = header[CANONICAL_DATA_TAG..]
                .windows(DATA_TAG.len())
                .position(|w| w == DATA_TAG)
                .map(|pos| pos + CANONICAL_DATA_TAG)
                .ok_or(FormatError::MissingDataChunk)?;
            // Without a trustworthy chunk size the data runs to the end of
            // the container.
            let riff_size = le32(header, 4);
            let size = riff_size
                .checked_sub(tag as u32)
                .ok_or(FormatError::BadDataSize)?;
            log::debug!("wav: data chunk found at offset {} by scan", tag);
            (tag as u32 + 8, size)
        };

        let available = file.size().saturating_sub(u64::from(data_offset));
        let data_size = if u64::from(declared_size) > available {
            log::warn!(
                "wav: data chunk declares {} bytes, file holds {}",
                declared_size,
                available
            );
            available as u32
        } else {
            declared_size
        };

        let byte_rate = sample_rate
            .checked_mul(u32::from(channels))
            .and_then(|rate| rate.checked_mul(u32::from(bit_depth / 8)))
            .ok_or(FormatError::BadFmtFields)?;
        if declared_rate != byte_rate {
            log::warn!(
                "wav: header byte rate {} does not match {} Hz x {} ch x {} bit",
                declared_rate,
                sample_rate,
                channels,
                bit_depth
            );
        }

        file.seek(u64::from(data_offset))?;

        Ok(StreamDescriptor {
            sample_rate,
            bit_depth,
            channels,
            byte_rate,
            block_align,
            data_size,
            data_offset,
        })
    }
}

/// Build a WAV image in memory
#[cfg(any(test, feature = "sim"))]
pub mod fixture {
    use alloc::vec::Vec;

    /// Canonical 44-byte header followed by `pcm`
    pub fn wav(sample_rate: u32, bit_depth: u16, channels: u16, pcm: &[u8]) -> Vec<u8> {
        wav_with_extra_chunk(sample_rate, bit_depth, channels, &[], pcm)
    }

    /// Header with an extra `LIST` chunk of `extra` bytes payload before the data
    pub fn wav_with_extra_chunk(
        sample_rate: u32,
        bit_depth: u16,
        channels: u16,
        extra: &[u8],
        pcm: &[u8],
    ) -> Vec<u8> {
        let block_align = channels * (bit_depth / 8);
        let byte_rate = sample_rate * u32::from(block_align);
        let extra_chunk = if extra.is_empty() { 0 } else { 8 + extra.len() };
        let riff_size = 36 + extra_chunk + pcm.len();

        let mut out = Vec::with_capacity(riff_size + 8);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(riff_size as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&bit_depth.to_le_bytes());
        if !extra.is_empty() {
            out.extend_from_slice(b"LIST");
            out.extend_from_slice(&(extra.len() as u32).to_le_bytes());
            out.extend_from_slice(extra);
        }
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(pcm.len() as u32).to_le_bytes());
        out.extend_from_slice(pcm);
        out
    }

    /// `len` bytes of a recognisable ramp
    pub fn ramp(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }
}

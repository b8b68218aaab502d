//! # WSS Audio Subsystem
//!
//! PCM playback on Windows Sound System compatible ISA cards (AD1848
//! codec), streamed from WAV files with interrupt-driven DMA double
//! buffering.
//!
//! ## Architecture
//!
//! ```text
//! +-----------------------------------------------------------+
//! |                     player::Player                        |
//! |  start / pause / resume / stop / set_volume / poll        |
//! +------------+-------------+-------------+------------------+
//! | wav        | buffer      | dma         | codec            |
//! | WavReader  | DmaBuffer   | 8237 setup  | AD1848 registers |
//! +------------+-------------+-------------+------------------+
//! | storage    |        irq: IrqLine + RefillSignal           |
//! +------------+----------------------------------------------+
//! |            wss-hal: PortIo, InterruptVectors,             |
//! |                     PhysAllocator, pic                    |
//! +-----------------------------------------------------------+
//! ```
//!
//! Everything that touches hardware takes the platform as a parameter, so
//! the same code runs on bare metal and on [`sim::SimMachine`].

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

pub mod buffer;
pub mod codec;
pub mod config;
pub mod dma;
pub mod error;
pub mod irq;
pub mod player;
pub mod storage;
pub mod wav;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

#[cfg(test)]
mod player_tests;

pub use buffer::{BufferHalf, DmaBuffer, BUFFER_SIZE, HALF_SIZE};
pub use codec::{Codec, CodecFormat};
pub use config::{PlayerConfig, WssConfig};
pub use error::{AudioError, AudioResult, FormatError};
pub use irq::{IrqLine, RefillSignal};
pub use player::{Player, PlayerState};
pub use storage::{MemoryStorage, Storage, TrackFile};
pub use wav::{StreamDescriptor, WavReader};

#[cfg(feature = "std")]
pub use storage::HostStorage;

/// Common imports for driver users
pub mod prelude {
    pub use crate::config::{PlayerConfig, WssConfig};
    pub use crate::error::{AudioError, AudioResult};
    pub use crate::player::{Player, PlayerState};
    pub use crate::storage::{MemoryStorage, Storage, TrackFile};
}

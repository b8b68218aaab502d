//! # WSS HAL - Hardware Abstraction Layer
//!
//! This crate defines the traits the audio subsystem uses to touch hardware.
//! Every component that programs a device goes through one of them, so the
//! same driver code runs on bare metal and against a simulated machine.
//!
//! ## Surfaces
//!
//! - [`port::PortIo`]: 8-bit ISA port reads and writes
//! - [`interrupts::InterruptVectors`]: install/restore hardware interrupt handlers
//! - [`memory::PhysAllocator`]: memory blocks with a known physical address
//! - [`pic`]: 8259 mask and end-of-interrupt helpers built on [`port::PortIo`]
//!
//! A type implementing all three traits is a [`Platform`].

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

pub mod arch;
pub mod interrupts;
pub mod memory;
pub mod pic;
pub mod port;

use core::fmt;

pub use interrupts::{
    without_interrupts, InterruptFlag, InterruptHandler, InterruptVector, InterruptVectors, IrqTable,
};
pub use memory::{IdentityAllocator, PhysAllocator, PhysBlock};
pub use port::PortIo;

/// Result type for HAL operations
pub type HalResult<T> = Result<T, HalError>;

/// Errors that can occur in HAL operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// The operation is not supported on this architecture
    NotSupported,
    /// Invalid parameter provided
    InvalidParameter,
    /// Operation timed out
    Timeout,
    /// Memory allocation failed
    OutOfMemory,
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSupported => write!(f, "operation not supported"),
            Self::InvalidParameter => write!(f, "invalid parameter"),
            Self::Timeout => write!(f, "hardware did not become ready"),
            Self::OutOfMemory => write!(f, "out of memory"),
        }
    }
}

/// Everything a driver needs from the machine it runs on
///
/// Blanket-implemented for any type providing port I/O, an interrupt vector
/// table and a physical memory allocator.
pub trait Platform: PortIo + InterruptVectors + PhysAllocator {}

impl<T: PortIo + InterruptVectors + PhysAllocator> Platform for T {}

/// Physical address type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PhysAddr(u64);

impl PhysAddr {
    /// Create a new physical address
    #[inline]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Get the raw address value
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Add an offset to the address
    #[inline]
    pub const fn add(self, offset: u64) -> Self {
        Self(self.0 + offset)
    }

    /// 64 KiB page number, as loaded into an ISA DMA page register
    #[inline]
    pub const fn dma_page(self) -> u64 {
        self.0 >> 16
    }

    /// Offset within the 64 KiB page
    #[inline]
    pub const fn dma_offset(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#07x}", self.0)
    }
}

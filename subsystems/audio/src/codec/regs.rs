//! AD1848 register map (Windows Sound System layout).

use bitflags::bitflags;

/// Offset of the index address register from the base port
pub const INDEX_OFFSET: u16 = 4;
/// Offset of the indexed data register from the base port
pub const DATA_OFFSET: u16 = 5;
/// Offset of the status register from the base port
pub const STATUS_OFFSET: u16 = 6;

/// Indirect (indexed) registers
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    /// Left ADC input control
    LeftAdc = 0x00,
    /// Right ADC input control
    RightAdc = 0x01,
    /// Left auxiliary #1 input control
    LeftAux1 = 0x02,
    /// Right auxiliary #1 input control
    RightAux1 = 0x03,
    /// Left auxiliary #2 input control
    LeftAux2 = 0x04,
    /// Right auxiliary #2 input control
    RightAux2 = 0x05,
    /// Left DAC output control
    LeftDac = 0x06,
    /// Right DAC output control
    RightDac = 0x07,
    /// Clock and data format
    DataFormat = 0x08,
    /// Interface configuration
    InterfaceConfig = 0x09,
    /// Pin control
    PinControl = 0x0A,
    /// Test and initialization
    TestInit = 0x0B,
    /// Miscellaneous information
    Misc = 0x0C,
    /// Digital mix (loopback)
    DigitalMix = 0x0D,
    /// Upper base count
    UpperCount = 0x0E,
    /// Lower base count
    LowerCount = 0x0F,
}

/// Mask of the index bits in the index address register
pub const INDEX_MASK: u8 = 0x0F;

bitflags! {
    /// Index address register flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IndexFlags: u8 {
        /// Codec is initializing and ignores writes
        const INIT = 1 << 7;
        /// Mode change enable
        const MCE = 1 << 6;
        /// Transfer request disable
        const TRD = 1 << 5;
    }
}

bitflags! {
    /// Clock and data format register
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DataFormat: u8 {
        /// 16-bit (with L/C clear) instead of 8-bit
        const FMT = 1 << 6;
        /// Companded (mu-law/A-law) data
        const L_C = 1 << 5;
        /// Stereo
        const S_M = 1 << 4;
        /// Clock frequency divide select, bit 2
        const CFS2 = 1 << 3;
        /// Clock frequency divide select, bit 1
        const CFS1 = 1 << 2;
        /// Clock frequency divide select, bit 0
        const CFS0 = 1 << 1;
        /// Clock source select (16.9344 MHz crystal when set)
        const CSS = 1 << 0;
    }
}

bitflags! {
    /// Interface configuration register
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InterfaceConfig: u8 {
        /// Capture PIO
        const CPIO = 1 << 7;
        /// Playback PIO
        const PPIO = 1 << 6;
        /// Auto-calibrate on the next mode change
        const ACAL = 1 << 3;
        /// Single DMA channel
        const SDC = 1 << 2;
        /// Capture enable
        const CEN = 1 << 1;
        /// Playback enable
        const PEN = 1 << 0;
    }
}

bitflags! {
    /// Pin control register
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PinControl: u8 {
        /// External control line 1
        const XCTL1 = 1 << 7;
        /// External control line 0
        const XCTL0 = 1 << 6;
        /// Interrupt pin enable
        const IEN = 1 << 1;
    }
}

bitflags! {
    /// Test and initialization register
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TestInit: u8 {
        /// Capture overrun
        const COR = 1 << 7;
        /// Playback underrun
        const PUR = 1 << 6;
        /// Auto-calibrate in progress
        const ACI = 1 << 5;
        /// DRQ status
        const DRS = 1 << 4;
    }
}

bitflags! {
    /// Status register
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        /// Interrupt pending
        const INT = 1 << 0;
    }
}

/// Mute bit of the auxiliary input registers
pub const AUX_MUTE: u8 = 1 << 7;

/// Mute bit of the DAC output registers
pub const DAC_MUTE: u8 = 1 << 7;

/// Width of the DAC attenuation field
pub const DAC_ATTEN_BITS: u8 = 6;

/// Largest DAC attenuation (-94.5 dB in 1.5 dB steps)
pub const DAC_ATTEN_MAX: u8 = (1 << DAC_ATTEN_BITS) - 1;

//! # AD1848 Codec Driver
//!
//! Register-level control of Windows Sound System compatible codecs.
//!
//! Three direct registers sit at fixed offsets from the base port (index,
//! data, status). The sixteen indirect registers are reached by writing an
//! index to the index register and then accessing the data register. While
//! the codec initializes or calibrates it sets INIT in the index register
//! and ignores writes, so every indirect access polls that bit first.
//!
//! Mode changes (clock, format, calibration) are only accepted with MCE
//! asserted in the index register.

mod format;
pub mod regs;

pub use format::{clock_bits, silence_for, supported_rates, CodecFormat};

use crate::error::{AudioError, AudioResult};
use regs::{
    IndexFlags, InterfaceConfig, PinControl, Reg, TestInit, AUX_MUTE, DAC_ATTEN_MAX, DAC_MUTE,
    DATA_OFFSET, INDEX_OFFSET, STATUS_OFFSET,
};
use wss_hal::port::{hi_byte, lo_byte, Port, PortIo};

/// Index register polls before giving up on a busy codec
pub const TIMEOUT_LOOPS: u32 = 10_000;

/// Part of the attenuation scale the volume control spans
///
/// The bottom third is too quiet to be useful.
pub const VOLUME_ATTEN_RANGE: u8 = DAC_ATTEN_MAX * 2 / 3;

/// Map a volume percentage onto a DAC output control value
///
/// 100 % is no attenuation, 0 % is the mute bit.
pub fn volume_to_dac(percent: u8) -> AudioResult<u8> {
    if percent > 100 {
        return Err(AudioError::invalid_argument("volume above 100%"));
    }
    if percent == 0 {
        return Ok(DAC_MUTE);
    }
    let atten = u16::from(100 - percent) * u16::from(VOLUME_ATTEN_RANGE) / 100;
    Ok(atten as u8)
}

/// An AD1848-class codec at a base I/O address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    base: Port,
    timeout_loops: u32,
}

impl Codec {
    /// Codec at `base`
    pub const fn new(base: Port) -> Self {
        Self {
            base,
            timeout_loops: TIMEOUT_LOOPS,
        }
    }

    /// Override the busy-poll budget
    pub const fn with_timeout_loops(mut self, loops: u32) -> Self {
        self.timeout_loops = loops;
        self
    }

    /// Base I/O address
    pub fn base(&self) -> Port {
        self.base
    }

    /// Index address register port
    pub fn index_port(&self) -> Port {
        self.base + INDEX_OFFSET
    }

    /// Indexed data register port
    pub fn data_port(&self) -> Port {
        self.base + DATA_OFFSET
    }

    /// Status register port
    pub fn status_port(&self) -> Port {
        self.base + STATUS_OFFSET
    }

    /// Raw read of a direct register
    pub fn read_direct<P: PortIo + ?Sized>(&self, io: &mut P, port: Port) -> u8 {
        io.read_u8(port)
    }

    /// Raw write of a direct register
    pub fn write_direct<P: PortIo + ?Sized>(&self, io: &mut P, port: Port, value: u8) {
        io.write_u8(port, value);
    }

    /// Poll INIT until the codec accepts accesses
    fn wait_ready<P: PortIo + ?Sized>(&self, io: &mut P) -> AudioResult<()> {
        let mut remaining = self.timeout_loops;
        while IndexFlags::from_bits_retain(io.read_u8(self.index_port())).contains(IndexFlags::INIT) {
            if remaining == 0 {
                log::warn!("codec at {:#x} stuck busy", self.base);
                return Err(AudioError::Timeout);
            }
            remaining -= 1;
        }
        Ok(())
    }

    fn select<P: PortIo + ?Sized>(&self, io: &mut P, reg: Reg, flags: IndexFlags) -> AudioResult<()> {
        io.write_u8(self.index_port(), reg as u8 | flags.bits());
        self.wait_ready(io)
    }

    /// Read an indirect register
    pub fn read_indirect<P: PortIo + ?Sized>(&self, io: &mut P, reg: Reg) -> AudioResult<u8> {
        self.wait_ready(io)?;
        self.select(io, reg, IndexFlags::empty())?;
        Ok(io.read_u8(self.data_port()))
    }

    /// Write an indirect register
    pub fn write_indirect<P: PortIo + ?Sized>(&self, io: &mut P, reg: Reg, value: u8) -> AudioResult<()> {
        self.write_indexed(io, reg, IndexFlags::empty(), value)
    }

    fn write_indexed<P: PortIo + ?Sized>(
        &self,
        io: &mut P,
        reg: Reg,
        flags: IndexFlags,
        value: u8,
    ) -> AudioResult<()> {
        self.select(io, reg, flags)?;
        io.write_u8(self.data_port(), value);
        self.wait_ready(io)
    }

    /// Configure and start playback
    ///
    /// Sets a silent mixer baseline, enables the interrupt pin, programs an
    /// interrupt every half of `buffer_size`, selects the format and runs
    /// auto-calibration. Returns once calibration is done.
    pub fn playback_start<P: PortIo + ?Sized>(
        &self,
        io: &mut P,
        format: &CodecFormat,
        buffer_size: usize,
    ) -> AudioResult<()> {
        let count = format.transfer_count(buffer_size)?;

        // Inputs: line source, 0 dB, no mic boost; aux paths muted
        self.write_indirect(io, Reg::LeftAdc, 0x00)?;
        self.write_indirect(io, Reg::RightAdc, 0x00)?;
        self.write_indirect(io, Reg::LeftAux1, AUX_MUTE)?;
        self.write_indirect(io, Reg::RightAux1, AUX_MUTE)?;
        self.write_indirect(io, Reg::LeftAux2, AUX_MUTE)?;
        self.write_indirect(io, Reg::RightAux2, AUX_MUTE)?;

        // DAC outputs: 0 dB, unmuted
        self.write_indirect(io, Reg::LeftDac, 0x00)?;
        self.write_indirect(io, Reg::RightDac, 0x00)?;

        // No loopback
        self.write_indirect(io, Reg::DigitalMix, 0x00)?;

        self.write_indirect(io, Reg::PinControl, PinControl::IEN.bits())?;

        self.write_indirect(io, Reg::LowerCount, lo_byte(count))?;
        self.write_indirect(io, Reg::UpperCount, hi_byte(count))?;

        self.write_indexed(io, Reg::DataFormat, IndexFlags::MCE, format.register().bits())?;
        self.write_indexed(
            io,
            Reg::InterfaceConfig,
            IndexFlags::MCE,
            (InterfaceConfig::PEN | InterfaceConfig::ACAL).bits(),
        )?;

        // Dropping MCE starts calibration; the codec finishes in a few
        // hundred sample periods.
        io.write_u8(self.index_port(), Reg::TestInit as u8);
        while TestInit::from_bits_retain(io.read_u8(self.data_port())).contains(TestInit::ACI) {
            core::hint::spin_loop();
        }

        log::info!(
            "codec: {} Hz, {} bit, {} ch, interrupt every {} frames",
            format.sample_rate(),
            format.bit_depth(),
            format.channels(),
            u32::from(count) + 1
        );
        Ok(())
    }

    fn update_config<P: PortIo + ?Sized>(
        &self,
        io: &mut P,
        f: impl FnOnce(InterfaceConfig) -> InterfaceConfig,
    ) -> AudioResult<()> {
        let current = InterfaceConfig::from_bits_retain(self.read_indirect(io, Reg::InterfaceConfig)?);
        self.write_indirect(io, Reg::InterfaceConfig, f(current).bits())
    }

    /// Clear the playback enable bit, keeping the rest of the configuration
    pub fn playback_stop<P: PortIo + ?Sized>(&self, io: &mut P) -> AudioResult<()> {
        self.update_config(io, |config| config - InterfaceConfig::PEN)
    }

    /// Set the playback enable bit again after [`Codec::playback_stop`]
    pub fn playback_continue<P: PortIo + ?Sized>(&self, io: &mut P) -> AudioResult<()> {
        self.update_config(io, |config| config | InterfaceConfig::PEN)
    }

    /// Set both DAC outputs to `percent`
    pub fn set_volume<P: PortIo + ?Sized>(&self, io: &mut P, percent: u8) -> AudioResult<()> {
        let value = volume_to_dac(percent)?;
        self.write_indirect(io, Reg::LeftDac, value)?;
        self.write_indirect(io, Reg::RightDac, value)?;
        log::debug!("codec: volume {}% (DAC {:#04x})", percent, value);
        Ok(())
    }

    /// Acknowledge a pending codec interrupt
    ///
    /// A single port write; safe in interrupt context.
    pub fn clear_interrupt<P: PortIo + ?Sized>(&self, io: &mut P) {
        self.write_direct(io, self.status_port(), 0x00);
    }
}

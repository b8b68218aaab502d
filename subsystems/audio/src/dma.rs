//! # ISA DMA Channel Controller
//!
//! Programs the 8-bit 8237 (channels 0-3) for auto-initialized transfers:
//! once started, the channel walks the buffer from memory to the device and
//! wraps back to the start on its own until it is released.

use crate::error::{AudioError, AudioResult};
use wss_hal::port::{hi_byte, lo_byte, Port, PortIo};

/// 8237 registers
pub mod ports {
    use wss_hal::port::Port;

    /// Single channel mask register
    pub const MASK: Port = 0x0A;
    /// Mode register
    pub const MODE: Port = 0x0B;
    /// Clear byte pointer flip-flop
    pub const CLEAR_FLIP_FLOP: Port = 0x0C;

    /// Page register per channel
    pub const PAGE: [Port; 4] = [0x87, 0x83, 0x81, 0x82];
    /// Base/current address register per channel
    pub const ADDRESS: [Port; 4] = [0x00, 0x02, 0x04, 0x06];
    /// Base/current count register per channel
    pub const COUNT: [Port; 4] = [0x01, 0x03, 0x05, 0x07];
}

/// Mask bit in the single mask register
pub const MASK_SET: u8 = 1 << 2;

/// Mode: single transfer, address increment, auto-init, read from memory
pub const MODE_AUTOINIT_READ: u8 = 0x58;

/// Mode register bit selecting auto-initialization
pub const MODE_AUTOINIT: u8 = 1 << 4;

/// Longest transfer a channel can be programmed for
pub const MAX_TRANSFER: u32 = 0x1_0000;

fn check_channel(channel: u8) -> AudioResult<usize> {
    if (channel as usize) < ports::PAGE.len() {
        Ok(channel as usize)
    } else {
        Err(AudioError::invalid_argument("dma channel"))
    }
}

fn write_word<P: PortIo + ?Sized>(io: &mut P, port: Port, value: u16) {
    io.write_u8(port, lo_byte(value));
    io.write_u8(port, hi_byte(value));
}

/// Start a continuous auto-init transfer of `length` bytes at `page:offset`
pub fn autoinit_start<P: PortIo + ?Sized>(
    io: &mut P,
    channel: u8,
    page: u8,
    offset: u16,
    length: u32,
) -> AudioResult<()> {
    let ch = check_channel(channel)?;
    if length == 0 || length > MAX_TRANSFER {
        return Err(AudioError::invalid_argument("dma transfer length"));
    }
    if u32::from(offset) + length > MAX_TRANSFER {
        return Err(AudioError::invalid_argument("dma transfer crosses a page"));
    }

    io.write_u8(ports::MASK, MASK_SET | channel);
    io.write_u8(ports::CLEAR_FLIP_FLOP, 0x00);
    io.write_u8(ports::MODE, MODE_AUTOINIT_READ | channel);

    write_word(io, ports::ADDRESS[ch], offset);
    io.write_u8(ports::PAGE[ch], page);
    write_word(io, ports::COUNT[ch], (length - 1) as u16);

    io.write_u8(ports::MASK, channel);

    log::debug!(
        "DMA{}: auto-init {} bytes at {:02x}:{:04x}",
        channel,
        length,
        page,
        offset
    );
    Ok(())
}

/// Stop the channel and leave it masked
pub fn release<P: PortIo + ?Sized>(io: &mut P, channel: u8) -> AudioResult<()> {
    check_channel(channel)?;

    io.write_u8(ports::MASK, MASK_SET | channel);
    io.write_u8(ports::CLEAR_FLIP_FLOP, 0x00);

    log::debug!("DMA{}: released", channel);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimMachine;
    use wss_hal::PhysAddr;

    #[test]
    fn start_writes_the_documented_sequence() {
        let mut sim = SimMachine::new();
        autoinit_start(&mut sim, 1, 0x02, 0x4000, 32768).unwrap();

        assert_eq!(
            sim.port_writes(),
            [
                (0x0A, 0x05),
                (0x0C, 0x00),
                (0x0B, 0x59),
                (0x02, 0x00),
                (0x02, 0x40),
                (0x83, 0x02),
                (0x03, 0xFF),
                (0x03, 0x7F),
                (0x0A, 0x01),
            ]
        );

        let ch = sim.dma_channel(1);
        assert!(!ch.masked);
        assert!(ch.autoinit());
        assert_eq!(ch.base_address(), PhysAddr::new(0x2_4000));
        assert_eq!(ch.transfer_len(), 32768);
    }

    #[test]
    fn release_masks_the_channel() {
        let mut sim = SimMachine::new();
        autoinit_start(&mut sim, 3, 0x01, 0, 1024).unwrap();
        release(&mut sim, 3).unwrap();
        assert!(sim.dma_channel(3).masked);
        assert_eq!(sim.port_writes().last(), Some(&(0x0C, 0x00)));
    }

    #[test]
    fn channels_above_three_are_rejected() {
        let mut sim = SimMachine::new();
        assert!(matches!(
            autoinit_start(&mut sim, 4, 0, 0, 16),
            Err(AudioError::InvalidArgument { .. })
        ));
        assert!(matches!(release(&mut sim, 5), Err(AudioError::InvalidArgument { .. })));
        assert!(sim.port_writes().is_empty());
    }

    #[test]
    fn transfers_must_fit_the_page() {
        let mut sim = SimMachine::new();
        assert!(autoinit_start(&mut sim, 1, 0, 0x8001, 0x8000).is_err());
        assert!(autoinit_start(&mut sim, 1, 0, 0, 0).is_err());
        assert!(autoinit_start(&mut sim, 1, 0, 0, MAX_TRANSFER).is_ok());
    }
}

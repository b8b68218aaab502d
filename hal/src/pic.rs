//! # 8259 Programmable Interrupt Controller (PIC)
//!
//! The legacy dual PIC system (master + slave) for handling hardware interrupts.
//! IRQs 0-7 are on the master, IRQs 8-15 are on the slave, which cascades
//! into master IRQ2.
//!
//! The controllers are assumed to be initialized by firmware; only the mask
//! registers and end-of-interrupt commands are touched here.

use crate::port::{Port, PortIo};
use crate::{HalError, HalResult};

/// PIC I/O ports
pub mod ports {
    use crate::port::Port;

    /// Master PIC command port
    pub const MASTER_CMD: Port = 0x20;
    /// Master PIC data port (interrupt mask register)
    pub const MASTER_DATA: Port = 0x21;
    /// Slave PIC command port
    pub const SLAVE_CMD: Port = 0xA0;
    /// Slave PIC data port (interrupt mask register)
    pub const SLAVE_DATA: Port = 0xA1;
}

/// Non-specific End of Interrupt command
pub const EOI: u8 = 0x20;

/// Master IRQ line the slave is wired to
pub const CASCADE_IRQ: u8 = 2;

fn line(irq: u8) -> HalResult<(Port, u8)> {
    match irq {
        CASCADE_IRQ => Err(HalError::InvalidParameter),
        0..=7 => Ok((ports::MASTER_DATA, irq)),
        8..=15 => Ok((ports::SLAVE_DATA, irq - 8)),
        _ => Err(HalError::InvalidParameter),
    }
}

/// Unmask (enable) a hardware IRQ line
///
/// Slave lines also get the cascade line on the master unmasked.
pub fn unmask<P: PortIo + ?Sized>(io: &mut P, irq: u8) -> HalResult<()> {
    let (port, bit) = line(irq)?;

    let mask = io.read_u8(port);
    io.write_u8(port, mask & !(1 << bit));

    if port == ports::SLAVE_DATA {
        let master = io.read_u8(ports::MASTER_DATA);
        io.write_u8(ports::MASTER_DATA, master & !(1 << CASCADE_IRQ));
    }

    log::debug!("IRQ{} unmasked", irq);
    Ok(())
}

/// Mask (disable) a hardware IRQ line
pub fn mask<P: PortIo + ?Sized>(io: &mut P, irq: u8) -> HalResult<()> {
    let (port, bit) = line(irq)?;

    let mask = io.read_u8(port);
    io.write_u8(port, mask | (1 << bit));

    log::debug!("IRQ{} masked", irq);
    Ok(())
}

/// Check whether a line is currently masked
pub fn is_masked<P: PortIo + ?Sized>(io: &mut P, irq: u8) -> HalResult<bool> {
    let (port, bit) = line(irq)?;
    Ok(io.read_u8(port) & (1 << bit) != 0)
}

/// Send End of Interrupt signal
///
/// Must be called at the end of every IRQ handler. Safe in interrupt context.
pub fn end_of_interrupt<P: PortIo + ?Sized>(io: &mut P, irq: u8) {
    if irq >= 8 {
        // Send EOI to both slave and master
        io.write_u8(ports::SLAVE_CMD, EOI);
    }
    io.write_u8(ports::MASTER_CMD, EOI);
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    struct MaskRegs {
        master: u8,
        slave: u8,
        commands: Vec<(Port, u8)>,
    }

    impl PortIo for MaskRegs {
        fn read_u8(&mut self, port: Port) -> u8 {
            match port {
                ports::MASTER_DATA => self.master,
                ports::SLAVE_DATA => self.slave,
                _ => 0xFF,
            }
        }

        fn write_u8(&mut self, port: Port, value: u8) {
            match port {
                ports::MASTER_DATA => self.master = value,
                ports::SLAVE_DATA => self.slave = value,
                _ => self.commands.push((port, value)),
            }
        }
    }

    fn all_masked() -> MaskRegs {
        MaskRegs { master: 0xFF, slave: 0xFF, commands: Vec::new() }
    }

    #[test]
    fn master_line_round_trip() {
        let mut regs = all_masked();
        unmask(&mut regs, 5).unwrap();
        assert_eq!(regs.master, 0xDF);
        assert!(!is_masked(&mut regs, 5).unwrap());

        mask(&mut regs, 5).unwrap();
        assert_eq!(regs.master, 0xFF);
    }

    #[test]
    fn slave_line_opens_cascade() {
        let mut regs = all_masked();
        unmask(&mut regs, 10).unwrap();
        assert_eq!(regs.slave, 0xFB);
        assert_eq!(regs.master, 0xFB);
    }

    #[test]
    fn cascade_and_out_of_range_lines_are_rejected() {
        let mut regs = all_masked();
        assert_eq!(unmask(&mut regs, CASCADE_IRQ), Err(HalError::InvalidParameter));
        assert_eq!(mask(&mut regs, 16), Err(HalError::InvalidParameter));
    }

    #[test]
    fn slave_eoi_goes_to_both_controllers() {
        let mut regs = all_masked();
        end_of_interrupt(&mut regs, 11);
        end_of_interrupt(&mut regs, 5);
        assert_eq!(
            regs.commands,
            [(ports::SLAVE_CMD, EOI), (ports::MASTER_CMD, EOI), (ports::MASTER_CMD, EOI)]
        );
    }
}

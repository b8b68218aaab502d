//! 8259 pair model: mask registers and EOI accounting only.

use wss_hal::pic::{ports, CASCADE_IRQ, EOI};
use wss_hal::port::Port;

/// Master and slave controllers
#[derive(Debug, Clone)]
pub struct SimPic {
    master_mask: u8,
    slave_mask: u8,
    master_eoi: u32,
    slave_eoi: u32,
}

impl Default for SimPic {
    fn default() -> Self {
        Self {
            master_mask: 0xFF,
            slave_mask: 0xFF,
            master_eoi: 0,
            slave_eoi: 0,
        }
    }
}

impl SimPic {
    /// Whether `port` belongs to the pair
    pub fn decodes(port: Port) -> bool {
        matches!(
            port,
            ports::MASTER_CMD | ports::MASTER_DATA | ports::SLAVE_CMD | ports::SLAVE_DATA
        )
    }

    /// Whether `irq` is masked, counting the cascade line for slave IRQs
    pub fn is_masked(&self, irq: u8) -> bool {
        match irq {
            0..=7 => self.master_mask & (1 << irq) != 0,
            8..=15 => {
                self.slave_mask & (1 << (irq - 8)) != 0 || self.master_mask & (1 << CASCADE_IRQ) != 0
            }
            _ => true,
        }
    }

    /// End-of-interrupt commands received as `(master, slave)`
    pub fn eoi_count(&self) -> (u32, u32) {
        (self.master_eoi, self.slave_eoi)
    }

    pub(super) fn read(&self, port: Port) -> u8 {
        match port {
            ports::MASTER_DATA => self.master_mask,
            ports::SLAVE_DATA => self.slave_mask,
            _ => 0x00,
        }
    }

    pub(super) fn write(&mut self, port: Port, value: u8) {
        match port {
            ports::MASTER_DATA => self.master_mask = value,
            ports::SLAVE_DATA => self.slave_mask = value,
            ports::MASTER_CMD if value == EOI => self.master_eoi += 1,
            ports::SLAVE_CMD if value == EOI => self.slave_eoi += 1,
            _ => {}
        }
    }
}

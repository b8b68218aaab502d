//! AD1848 register-file model.
//!
//! Covers what the driver relies on: the INIT busy bit, mode change enable,
//! auto-calibration started by dropping MCE, the playback period counter
//! and the interrupt status bit.

use crate::codec::regs::{
    DataFormat, IndexFlags, InterfaceConfig, Reg, Status, TestInit, DATA_OFFSET, INDEX_MASK,
    INDEX_OFFSET, STATUS_OFFSET,
};
use wss_hal::port::Port;

/// ACI polls a calibration lasts unless configured otherwise
pub const DEFAULT_CALIBRATION_POLLS: u32 = 3;

/// Simulated codec at a base port
#[derive(Debug, Clone)]
pub struct SimCodec {
    base: Port,
    regs: [u8; 16],
    index: u8,
    mce: bool,
    status: Status,
    busy_polls: u32,
    stuck_busy: bool,
    calibration_polls: u32,
    calibrating: u32,
    calibrations: u32,
}

impl SimCodec {
    /// Codec decoding ports `base..base + 8`
    pub fn new(base: Port) -> Self {
        Self {
            base,
            regs: [0; 16],
            index: 0,
            mce: false,
            status: Status::empty(),
            busy_polls: 0,
            stuck_busy: false,
            calibration_polls: DEFAULT_CALIBRATION_POLLS,
            calibrating: 0,
            calibrations: 0,
        }
    }

    /// Base port
    pub fn base(&self) -> Port {
        self.base
    }

    /// Whether `port` belongs to the codec
    pub fn decodes(&self, port: Port) -> bool {
        (self.base..self.base + 8).contains(&port)
    }

    /// Current value of an indirect register
    pub fn reg(&self, reg: Reg) -> u8 {
        self.regs[reg as usize]
    }

    /// PEN set in the interface configuration
    pub fn playback_enabled(&self) -> bool {
        self.config().contains(InterfaceConfig::PEN)
    }

    /// MCE held in the index register
    pub fn mode_change_enabled(&self) -> bool {
        self.mce
    }

    /// Auto-calibration still running
    pub fn calibrating(&self) -> bool {
        self.calibrating > 0
    }

    /// Auto-calibrations run so far
    pub fn calibrations(&self) -> u32 {
        self.calibrations
    }

    /// INT set in the status register
    pub fn interrupt_pending(&self) -> bool {
        self.status.contains(Status::INT)
    }

    /// Report INIT for the next `polls` reads of the index register
    pub fn set_busy_polls(&mut self, polls: u32) {
        self.busy_polls = polls;
    }

    /// Report INIT forever and ignore writes
    pub fn set_stuck_busy(&mut self, stuck: bool) {
        self.stuck_busy = stuck;
    }

    /// Number of TestInit reads that report ACI after a calibration starts
    pub fn set_calibration_polls(&mut self, polls: u32) {
        self.calibration_polls = polls;
    }

    /// Frames per interrupt, from the base count registers
    pub fn period_frames(&self) -> u32 {
        let count = u32::from(self.reg(Reg::UpperCount)) << 8 | u32::from(self.reg(Reg::LowerCount));
        count + 1
    }

    /// Bytes per frame, from the data format register
    pub fn frame_size(&self) -> u32 {
        let format = DataFormat::from_bits_retain(self.reg(Reg::DataFormat));
        let width = if format.contains(DataFormat::FMT) { 2 } else { 1 };
        let channels = if format.contains(DataFormat::S_M) { 2 } else { 1 };
        width * channels
    }

    /// Latch INT in the status register
    pub fn raise_interrupt(&mut self) {
        self.status |= Status::INT;
    }

    fn config(&self) -> InterfaceConfig {
        InterfaceConfig::from_bits_retain(self.reg(Reg::InterfaceConfig))
    }

    fn busy(&mut self) -> bool {
        if self.stuck_busy {
            return true;
        }
        if self.busy_polls > 0 {
            self.busy_polls -= 1;
            return true;
        }
        false
    }

    pub(super) fn read(&mut self, port: Port) -> u8 {
        match port - self.base {
            INDEX_OFFSET => {
                let mut flags = IndexFlags::empty();
                flags.set(IndexFlags::INIT, self.busy());
                flags.set(IndexFlags::MCE, self.mce);
                flags.bits() | self.index
            }
            DATA_OFFSET => {
                let value = self.regs[usize::from(self.index)];
                if self.index == Reg::TestInit as u8 && self.calibrating > 0 {
                    self.calibrating -= 1;
                    value | TestInit::ACI.bits()
                } else {
                    value
                }
            }
            STATUS_OFFSET => self.status.bits(),
            _ => 0xFF,
        }
    }

    pub(super) fn write(&mut self, port: Port, value: u8) {
        if self.stuck_busy {
            return;
        }
        match port - self.base {
            INDEX_OFFSET => {
                let mce = IndexFlags::from_bits_retain(value).contains(IndexFlags::MCE);
                if self.mce && !mce && self.config().contains(InterfaceConfig::ACAL) {
                    self.calibrating = self.calibration_polls;
                    self.calibrations += 1;
                }
                self.mce = mce;
                self.index = value & INDEX_MASK;
            }
            DATA_OFFSET => self.regs[usize::from(self.index)] = value,
            STATUS_OFFSET => self.status = Status::empty(),
            _ => {}
        }
    }
}

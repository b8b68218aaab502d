//! 8237 DMA controller model (channels 0-3).

use crate::dma::{ports, MASK_SET, MODE_AUTOINIT};
use wss_hal::port::Port;
use wss_hal::PhysAddr;

/// Programmed state of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaChannel {
    /// Channel mask bit
    pub masked: bool,
    /// Last mode register value
    pub mode: u8,
    /// Page register
    pub page: u8,
    /// Base address within the page
    pub address: u16,
    /// Base count (transfer length minus one)
    pub count: u16,
    /// Bytes transferred since the last (re)initialization
    pub position: u32,
}

impl Default for DmaChannel {
    fn default() -> Self {
        Self {
            masked: true,
            mode: 0,
            page: 0,
            address: 0,
            count: 0,
            position: 0,
        }
    }
}

impl DmaChannel {
    /// Auto-initialization selected in the mode register
    pub fn autoinit(&self) -> bool {
        self.mode & MODE_AUTOINIT != 0
    }

    /// Physical address of the first byte of the transfer
    pub fn base_address(&self) -> PhysAddr {
        PhysAddr::new(u64::from(self.page) << 16 | u64::from(self.address))
    }

    /// Programmed transfer length in bytes
    pub fn transfer_len(&self) -> u32 {
        u32::from(self.count) + 1
    }

    /// Physical address of the next byte to transfer
    pub fn current_address(&self) -> PhysAddr {
        self.base_address().add(u64::from(self.position))
    }

    /// Account for `bytes` transferred; returns false once a single-cycle
    /// transfer has run out
    pub(super) fn advance(&mut self, bytes: u32) -> bool {
        let len = self.transfer_len();
        let next = self.position + bytes;
        if next < len {
            self.position = next;
            true
        } else if self.autoinit() {
            self.position = next % len;
            true
        } else {
            self.position = len;
            self.masked = true;
            false
        }
    }
}

/// The four 8-bit channels behind one byte-pointer flip-flop
#[derive(Debug, Default, Clone)]
pub struct SimDma {
    channels: [DmaChannel; 4],
    high_byte: bool,
}

impl SimDma {
    /// Channel `n`
    pub fn channel(&self, n: u8) -> &DmaChannel {
        &self.channels[usize::from(n & 3)]
    }

    pub(super) fn channel_mut(&mut self, n: u8) -> &mut DmaChannel {
        &mut self.channels[usize::from(n & 3)]
    }

    /// Whether `port` belongs to the controller
    pub fn decodes(port: Port) -> bool {
        port <= 0x07
            || port == ports::MASK
            || port == ports::MODE
            || port == ports::CLEAR_FLIP_FLOP
            || ports::PAGE.contains(&port)
    }

    fn load_word(&mut self, word: &mut u16, value: u8) {
        *word = if self.high_byte {
            (*word & 0x00FF) | u16::from(value) << 8
        } else {
            (*word & 0xFF00) | u16::from(value)
        };
        self.high_byte = !self.high_byte;
    }

    pub(super) fn write(&mut self, port: Port, value: u8) {
        match port {
            ports::MASK => self.channels[usize::from(value & 3)].masked = value & MASK_SET != 0,
            ports::MODE => self.channels[usize::from(value & 3)].mode = value,
            ports::CLEAR_FLIP_FLOP => self.high_byte = false,
            0x00..=0x07 => {
                let ch = usize::from(port / 2);
                let mut channel = self.channels[ch];
                if port % 2 == 0 {
                    self.load_word(&mut channel.address, value);
                } else {
                    self.load_word(&mut channel.count, value);
                }
                channel.position = 0;
                self.channels[ch] = channel;
            }
            _ => {
                if let Some(ch) = ports::PAGE.iter().position(|&p| p == port) {
                    self.channels[ch].page = value;
                }
            }
        }
    }
}

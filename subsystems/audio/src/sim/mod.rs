//! # Simulated ISA Machine
//!
//! A [`Platform`](wss_hal::Platform) with an 8259 pair, an 8237 DMA
//! controller, an AD1848 codec and a patch of physical memory, all reached
//! through one logged port space. Tests drive it one codec period at a time
//! with [`SimMachine::complete_period`].

mod codec;
mod dma;
mod memory;
mod pic;

pub use codec::{SimCodec, DEFAULT_CALIBRATION_POLLS};
pub use dma::{DmaChannel, SimDma};
pub use memory::SimMemory;
pub use pic::SimPic;

use crate::buffer::BufferHalf;
use crate::config::WssConfig;
use alloc::vec::Vec;
use wss_hal::interrupts::{
    irq_vector, HandlerRef, InterruptHandler, InterruptVector, InterruptVectors, IrqTable,
};
use wss_hal::port::{Port, PortIo};
use wss_hal::{PhysAddr, PhysAllocator, PhysBlock};

/// Physical base of the default memory arena
pub const DEFAULT_MEMORY_BASE: u64 = 0x2_0000;
/// Size of the default memory arena
pub const DEFAULT_MEMORY_SIZE: usize = 0x4_0000;

/// Simulated machine
#[derive(Debug)]
pub struct SimMachine {
    config: WssConfig,
    writes: Vec<(Port, u8)>,
    pic: SimPic,
    dma: SimDma,
    codec: SimCodec,
    vectors: IrqTable,
    memory: SimMemory,
    played: Vec<u8>,
}

impl Default for SimMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimMachine {
    /// Codec at the default resources, memory at [`DEFAULT_MEMORY_BASE`]
    pub fn new() -> Self {
        Self::with_config(WssConfig::default())
    }

    /// Codec wired to the given base, IRQ and DMA channel
    pub fn with_config(config: WssConfig) -> Self {
        Self::with_memory(
            config,
            SimMemory::new(PhysAddr::new(DEFAULT_MEMORY_BASE), DEFAULT_MEMORY_SIZE),
        )
    }

    /// Machine with a custom memory arena
    pub fn with_memory(config: WssConfig, memory: SimMemory) -> Self {
        Self {
            config,
            writes: Vec::new(),
            pic: SimPic::default(),
            dma: SimDma::default(),
            codec: SimCodec::new(config.base),
            vectors: IrqTable::new(),
            memory,
            played: Vec::new(),
        }
    }

    /// Resources the codec is wired to
    pub fn config(&self) -> WssConfig {
        self.config
    }

    /// Every port write so far, in order
    pub fn port_writes(&self) -> &[(Port, u8)] {
        &self.writes
    }

    /// Forget the port write log
    pub fn clear_port_writes(&mut self) {
        self.writes.clear();
    }

    /// Codec model
    pub fn codec(&self) -> &SimCodec {
        &self.codec
    }

    /// Mutable codec model, for fault injection
    pub fn codec_mut(&mut self) -> &mut SimCodec {
        &mut self.codec
    }

    /// DMA channel `n`
    pub fn dma_channel(&self, n: u8) -> &DmaChannel {
        self.dma.channel(n)
    }

    /// Memory arena
    pub fn memory(&self) -> &SimMemory {
        &self.memory
    }

    /// Whether `irq` is masked at the PIC
    pub fn irq_masked(&self, irq: u8) -> bool {
        self.pic.is_masked(irq)
    }

    /// End-of-interrupt commands received as `(master, slave)`
    pub fn eoi_count(&self) -> (u32, u32) {
        self.pic.eoi_count()
    }

    /// Bytes the codec has consumed, in playback order
    pub fn played(&self) -> &[u8] {
        &self.played
    }

    /// Buffer half the codec's DMA channel is transferring
    pub fn current_half(&self) -> BufferHalf {
        let channel = self.dma.channel(self.config.dma);
        BufferHalf::containing(channel.position as usize)
    }

    /// Let the codec play one interrupt period
    ///
    /// Moves a period's worth of bytes from memory to [`SimMachine::played`]
    /// through the codec's DMA channel, raises the codec interrupt and
    /// delivers it if the line is unmasked. Returns false, doing nothing,
    /// when playback is disabled or the channel is masked.
    pub fn complete_period(&mut self) -> bool {
        let channel = *self.dma.channel(self.config.dma);
        if !self.codec.playback_enabled() || channel.masked {
            return false;
        }

        let period = self.codec.period_frames() * self.codec.frame_size();
        let len = channel.transfer_len();
        let base = channel.base_address();
        for i in 0..period {
            let offset = (channel.position + i) % len;
            let byte = self.memory.read_byte(base.add(u64::from(offset))).unwrap_or(0xFF);
            self.played.push(byte);
        }
        self.dma.channel_mut(self.config.dma).advance(period);

        self.codec.raise_interrupt();
        if !self.pic.is_masked(self.config.irq) {
            if let Some(vector) = irq_vector(self.config.irq) {
                if let Some(handler) = self.vectors.get(vector) {
                    InterruptHandler::handle(&*handler, vector, self);
                }
            }
        }
        true
    }
}

impl PortIo for SimMachine {
    fn read_u8(&mut self, port: Port) -> u8 {
        if SimPic::decodes(port) {
            self.pic.read(port)
        } else if self.codec.decodes(port) {
            self.codec.read(port)
        } else {
            0xFF
        }
    }

    fn write_u8(&mut self, port: Port, value: u8) {
        self.writes.push((port, value));
        if SimPic::decodes(port) {
            self.pic.write(port, value);
        } else if SimDma::decodes(port) {
            self.dma.write(port, value);
        } else if self.codec.decodes(port) {
            self.codec.write(port, value);
        }
    }
}

impl InterruptVectors for SimMachine {
    fn handler(&self, vector: InterruptVector) -> Option<HandlerRef> {
        self.vectors.get(vector)
    }

    fn set_handler(&mut self, vector: InterruptVector, handler: Option<HandlerRef>) {
        self.vectors.replace(vector, handler);
    }
}

// SAFETY: delegates to SimMemory.
unsafe impl PhysAllocator for SimMachine {
    fn allocate(&mut self, size: usize) -> Option<PhysBlock> {
        self.memory.allocate(size)
    }

    fn deallocate(&mut self, block: PhysBlock) {
        self.memory.deallocate(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::regs::Reg;
    use crate::codec::{Codec, CodecFormat};
    use crate::dma;

    #[test]
    fn idle_codec_plays_nothing() {
        let mut sim = SimMachine::new();
        assert!(!sim.complete_period());
        assert!(sim.played().is_empty());
    }

    #[test]
    fn period_moves_bytes_and_raises_int() {
        let mut sim = SimMachine::new();
        let mut block = sim.allocate(64).unwrap();
        for (i, byte) in block.as_mut_slice().iter_mut().enumerate() {
            *byte = i as u8;
        }
        let phys = block.phys_addr();

        dma::autoinit_start(&mut sim, 1, phys.dma_page() as u8, phys.dma_offset(), 64).unwrap();
        let codec = Codec::new(0x530);
        codec
            .playback_start(&mut sim, &CodecFormat::new(8000, 8, 1).unwrap(), 64)
            .unwrap();
        assert_eq!(sim.codec().reg(Reg::LowerCount), 31);

        assert!(sim.complete_period());
        assert!(sim.complete_period());
        assert!(sim.complete_period());
        assert_eq!(sim.played().len(), 96);
        assert_eq!(sim.played()[..64], block.as_slice()[..]);
        assert_eq!(sim.played()[64..], block.as_slice()[..32]);
        assert_eq!(sim.dma_channel(1).position, 32);
        // nothing installed, line masked: the status bit stays up
        assert!(sim.codec().interrupt_pending());

        sim.deallocate(block);
    }
}

//! # DMA Buffer
//!
//! The transfer buffer shared by the CPU and the ISA DMA controller. The
//! controller cannot carry an address across a 64 KiB page, so the whole
//! buffer must sit inside one page.
//!
//! ## Allocation strategy
//!
//! Allocate once; if the block straddles a page, allocate a second block
//! while still holding the first (heap locality puts it right behind the
//! first one, past the boundary) and give the first one back. The result is
//! re-checked: a second straddle is reported as out of memory rather than
//! trusted.

use crate::error::{AudioError, AudioResult};
use core::ops::Range;
use static_assertions::const_assert;
use wss_hal::{PhysAddr, PhysAllocator, PhysBlock};

/// Size of the double buffer in bytes
pub const BUFFER_SIZE: usize = 32768;

/// Size of one half in bytes
pub const HALF_SIZE: usize = BUFFER_SIZE / 2;

const_assert!(BUFFER_SIZE % 2 == 0);
const_assert!(BUFFER_SIZE <= 0x1_0000);

/// Highest page reachable through an 8-bit page register
const MAX_DMA_PAGE: u64 = 0xFF;

/// One half of the double buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferHalf {
    /// Bytes `0..HALF_SIZE`
    First,
    /// Bytes `HALF_SIZE..BUFFER_SIZE`
    Second,
}

impl BufferHalf {
    /// The half that is not `self`
    pub const fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }

    /// Byte range of this half within the buffer
    pub const fn range(self) -> Range<usize> {
        match self {
            Self::First => 0..HALF_SIZE,
            Self::Second => HALF_SIZE..BUFFER_SIZE,
        }
    }

    /// Half that contains byte `offset` of the buffer
    pub const fn containing(offset: usize) -> Self {
        if offset % BUFFER_SIZE < HALF_SIZE {
            Self::First
        } else {
            Self::Second
        }
    }
}

/// Page-safe DMA transfer buffer
///
/// Allocated once at driver init and released once at teardown.
#[derive(Debug)]
pub struct DmaBuffer {
    block: Option<PhysBlock>,
    page: u8,
    offset: u16,
}

impl DmaBuffer {
    /// Allocate a buffer that does not cross a 64 KiB physical page
    pub fn allocate<A: PhysAllocator + ?Sized>(alloc: &mut A) -> AudioResult<Self> {
        let first = alloc.allocate(BUFFER_SIZE).ok_or(AudioError::OutOfMemory)?;

        let block = if first.within_dma_page() {
            first
        } else {
            log::warn!(
                "DMA buffer at {} crosses a 64K page, reallocating",
                first.phys_addr()
            );
            let second = alloc.allocate(BUFFER_SIZE);
            alloc.deallocate(first);
            let second = second.ok_or(AudioError::OutOfMemory)?;

            if !second.within_dma_page() {
                log::warn!("DMA buffer at {} still crosses a page", second.phys_addr());
                alloc.deallocate(second);
                return Err(AudioError::OutOfMemory);
            }
            second
        };

        let phys = block.phys_addr();
        if phys.dma_page() > MAX_DMA_PAGE {
            log::warn!("DMA buffer at {} is out of ISA DMA reach", phys);
            alloc.deallocate(block);
            return Err(AudioError::OutOfMemory);
        }

        log::debug!(
            "DMA buffer: {} bytes at page {:#x} offset {:#06x}",
            BUFFER_SIZE,
            phys.dma_page(),
            phys.dma_offset()
        );

        Ok(Self {
            page: phys.dma_page() as u8,
            offset: phys.dma_offset(),
            block: Some(block),
        })
    }

    /// Give the memory back; does nothing if already released
    pub fn release<A: PhysAllocator + ?Sized>(&mut self, alloc: &mut A) {
        if let Some(block) = self.block.take() {
            alloc.deallocate(block);
        }
    }

    /// Whether the buffer still owns its memory
    pub fn is_allocated(&self) -> bool {
        self.block.is_some()
    }

    /// DMA page register value
    pub fn page(&self) -> u8 {
        self.page
    }

    /// Offset within the DMA page
    pub fn offset(&self) -> u16 {
        self.offset
    }

    /// Physical address of the first byte
    pub fn phys_addr(&self) -> Option<PhysAddr> {
        self.block.as_ref().map(PhysBlock::phys_addr)
    }

    /// Length in bytes (zero once released)
    pub fn len(&self) -> usize {
        self.block.as_ref().map_or(0, PhysBlock::len)
    }

    /// Returns true once released
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The whole buffer
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self.block.as_mut() {
            Some(block) => block.as_mut_slice(),
            None => &mut [],
        }
    }

    /// Contents of one half
    pub fn half(&self, half: BufferHalf) -> &[u8] {
        match self.block.as_ref() {
            Some(block) => &block.as_slice()[half.range()],
            None => &[],
        }
    }

    /// One half of the buffer
    pub fn half_mut(&mut self, half: BufferHalf) -> &mut [u8] {
        match self.block.as_mut() {
            Some(block) => &mut block.as_mut_slice()[half.range()],
            None => &mut [],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimMemory;

    #[test]
    fn aligned_block_is_used_directly() {
        let mut mem = SimMemory::new(PhysAddr::new(0x2_0000), 0x4_0000);
        let buffer = DmaBuffer::allocate(&mut mem).unwrap();

        assert_eq!(buffer.page(), 0x2);
        assert_eq!(buffer.offset(), 0x0000);
        assert_eq!(mem.live_blocks(), 1);
    }

    #[test]
    fn straddling_block_is_replaced_by_its_neighbour() {
        let mut mem = SimMemory::new(PhysAddr::new(0x1_C000), 0x4_0000);
        let buffer = DmaBuffer::allocate(&mut mem).unwrap();

        // first block 0x1C000..0x24000 straddles, the second starts behind it
        assert_eq!(buffer.phys_addr(), Some(PhysAddr::new(0x2_4000)));
        assert_eq!(buffer.page(), 0x2);
        assert_eq!(buffer.offset(), 0x4000);
        assert_eq!(mem.live_blocks(), 1);
    }

    #[test]
    fn every_successful_allocation_stays_in_one_page() {
        for start in (0x1_0000u64..0x3_0000).step_by(0x0C40) {
            let mut mem = SimMemory::new(PhysAddr::new(start), 0x4_0000);
            if let Ok(buffer) = DmaBuffer::allocate(&mut mem) {
                let first = buffer.phys_addr().unwrap();
                let last = first.add(BUFFER_SIZE as u64 - 1);
                assert_eq!(first.dma_page(), last.dma_page(), "start {:#x}", start);
            }
        }
    }

    #[test]
    fn exhausted_memory_is_reported() {
        let mut mem = SimMemory::new(PhysAddr::new(0x1_0000), BUFFER_SIZE - 1);
        assert_eq!(DmaBuffer::allocate(&mut mem).unwrap_err(), AudioError::OutOfMemory);

        // room for the straddling first block only
        let mut mem = SimMemory::new(PhysAddr::new(0x1_C000), BUFFER_SIZE + 0x100);
        assert_eq!(DmaBuffer::allocate(&mut mem).unwrap_err(), AudioError::OutOfMemory);
        assert_eq!(mem.live_blocks(), 0);
    }

    #[test]
    fn release_is_idempotent() {
        let mut mem = SimMemory::new(PhysAddr::new(0x2_0000), 0x1_0000);
        let mut buffer = DmaBuffer::allocate(&mut mem).unwrap();

        buffer.release(&mut mem);
        buffer.release(&mut mem);
        assert!(!buffer.is_allocated());
        assert!(buffer.half_mut(BufferHalf::First).is_empty());
        assert_eq!(mem.live_blocks(), 0);
    }

    #[test]
    fn halves_split_the_buffer_evenly() {
        assert_eq!(BufferHalf::First.range(), 0..HALF_SIZE);
        assert_eq!(BufferHalf::Second.range(), HALF_SIZE..BUFFER_SIZE);
        assert_eq!(BufferHalf::containing(HALF_SIZE - 1), BufferHalf::First);
        assert_eq!(BufferHalf::containing(BUFFER_SIZE), BufferHalf::First);
        assert_eq!(BufferHalf::First.other(), BufferHalf::Second);
    }
}

//! Simulated physical memory.
//!
//! One zeroed arena mapped at a chosen physical base, carved up first-fit.
//! Placing the base just below a 64 KiB boundary reproduces the page
//! straddle the buffer allocator has to work around.

use alloc::alloc::{alloc_zeroed, dealloc, handle_alloc_error};
use alloc::vec::Vec;
use core::alloc::Layout;
use core::ptr::NonNull;
use wss_hal::{PhysAddr, PhysAllocator, PhysBlock};

const ALIGN: usize = 16;

/// First-fit allocator over a simulated physical range
pub struct SimMemory {
    arena: NonNull<u8>,
    layout: Layout,
    base: PhysAddr,
    /// Live blocks as `(offset, len)`, sorted by offset
    live: Vec<(usize, usize)>,
}

// SAFETY: the arena is owned exclusively by this value.
unsafe impl Send for SimMemory {}

impl SimMemory {
    /// `size` bytes of memory starting at physical address `base`
    ///
    /// # Panics
    /// If the host cannot provide the arena.
    pub fn new(base: PhysAddr, size: usize) -> Self {
        let layout = match Layout::from_size_align(size.max(1), ALIGN) {
            Ok(layout) => layout,
            Err(_) => panic!("simulated memory of {} bytes", size),
        };
        // SAFETY: layout has non-zero size.
        let arena = match NonNull::new(unsafe { alloc_zeroed(layout) }) {
            Some(arena) => arena,
            None => handle_alloc_error(layout),
        };
        Self {
            arena,
            layout,
            base,
            live: Vec::new(),
        }
    }

    /// Physical address of the first arena byte
    pub fn base(&self) -> PhysAddr {
        self.base
    }

    /// Arena size in bytes
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// Blocks handed out and not yet returned
    pub fn live_blocks(&self) -> usize {
        self.live.len()
    }

    fn offset_of(&self, addr: PhysAddr) -> Option<usize> {
        let offset = addr.as_u64().checked_sub(self.base.as_u64())?;
        let offset = usize::try_from(offset).ok()?;
        (offset < self.size()).then_some(offset)
    }

    /// Byte at physical address `addr`, as a bus master would see it
    pub fn read_byte(&self, addr: PhysAddr) -> Option<u8> {
        let offset = self.offset_of(addr)?;
        // SAFETY: offset is inside the arena.
        Some(unsafe { self.arena.as_ptr().add(offset).read_volatile() })
    }

    fn find_gap(&self, len: usize) -> Option<usize> {
        let mut cursor = 0usize;
        for &(offset, size) in &self.live {
            if offset - cursor >= len {
                return Some(cursor);
            }
            cursor = (offset + size).next_multiple_of(ALIGN);
        }
        (self.size().saturating_sub(cursor) >= len).then_some(cursor)
    }
}

// SAFETY: blocks are disjoint ranges of the arena, which outlives them as
// long as they are returned before the SimMemory is dropped.
unsafe impl PhysAllocator for SimMemory {
    fn allocate(&mut self, size: usize) -> Option<PhysBlock> {
        let len = size.max(1);
        let offset = self.find_gap(len)?;
        let at = self.live.partition_point(|&(o, _)| o < offset);
        self.live.insert(at, (offset, len));

        // SAFETY: offset + len is inside the arena.
        let virt = unsafe { NonNull::new_unchecked(self.arena.as_ptr().add(offset)) };
        let phys = self.base.add(offset as u64);
        // SAFETY: the range is reserved for this block until deallocated.
        Some(unsafe { PhysBlock::from_raw_parts(virt, phys, size) })
    }

    fn deallocate(&mut self, block: PhysBlock) {
        if let Some(offset) = self.offset_of(block.phys_addr()) {
            self.live.retain(|&(o, _)| o != offset);
        }
    }
}

impl Drop for SimMemory {
    fn drop(&mut self) {
        // SAFETY: allocated in `new` with this layout.
        unsafe { dealloc(self.arena.as_ptr(), self.layout) };
    }
}

impl core::fmt::Debug for SimMemory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimMemory")
            .field("base", &self.base)
            .field("size", &self.size())
            .field("live", &self.live)
            .finish()
    }
}

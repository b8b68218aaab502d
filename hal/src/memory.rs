//! # Physical Memory for DMA
//!
//! ISA DMA addresses memory physically: a 4-bit page register plus a 16-bit
//! offset. Drivers need blocks whose physical address they know, so the
//! allocator hands out [`PhysBlock`]s instead of plain pointers.

use crate::PhysAddr;
use core::alloc::Layout;
use core::ptr::NonNull;
use core::slice;

/// A contiguous block of memory with a known physical address
///
/// Owned by whoever allocated it; returned to the same allocator with
/// [`PhysAllocator::deallocate`].
#[derive(Debug)]
pub struct PhysBlock {
    virt: NonNull<u8>,
    phys: PhysAddr,
    len: usize,
}

// SAFETY: a PhysBlock is the unique owner of its memory range.
unsafe impl Send for PhysBlock {}

impl PhysBlock {
    /// Wrap a raw block
    ///
    /// # Safety
    /// `virt` must be valid for reads and writes of `len` bytes and be the
    /// CPU mapping of physical address `phys` for as long as the block lives.
    pub unsafe fn from_raw_parts(virt: NonNull<u8>, phys: PhysAddr, len: usize) -> Self {
        Self { virt, phys, len }
    }

    /// Physical address of the first byte
    pub fn phys_addr(&self) -> PhysAddr {
        self.phys
    }

    /// Physical address of the last byte
    pub fn phys_end(&self) -> PhysAddr {
        self.phys.add(self.len.saturating_sub(1) as u64)
    }

    /// CPU pointer to the first byte
    pub fn as_ptr(&self) -> *const u8 {
        self.virt.as_ptr()
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the block has zero length
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True if the block lies entirely within one 64 KiB DMA page
    pub fn within_dma_page(&self) -> bool {
        self.phys.dma_page() == self.phys_end().dma_page()
    }

    /// Block contents
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: guaranteed by the `from_raw_parts` contract.
        unsafe { slice::from_raw_parts(self.virt.as_ptr(), self.len) }
    }

    /// Mutable block contents
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: guaranteed by the `from_raw_parts` contract; `&mut self`
        // makes this the only CPU-side view.
        unsafe { slice::from_raw_parts_mut(self.virt.as_ptr(), self.len) }
    }
}

/// Allocator of physically addressed blocks
///
/// # Safety
/// Implementations must return blocks satisfying the
/// [`PhysBlock::from_raw_parts`] contract until they are deallocated.
pub unsafe trait PhysAllocator {
    /// Allocate `size` bytes, `None` when memory is exhausted
    fn allocate(&mut self, size: usize) -> Option<PhysBlock>;

    /// Return a block obtained from [`PhysAllocator::allocate`]
    fn deallocate(&mut self, block: PhysBlock);
}

/// Allocator for identity-mapped environments (virtual == physical)
///
/// Blocks come from the global allocator; their pointer value is taken as
/// the physical address.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityAllocator;

impl IdentityAllocator {
    const ALIGN: usize = 16;

    /// Create the allocator
    pub const fn new() -> Self {
        Self
    }
}

// SAFETY: blocks are fresh global allocations of exactly `len` bytes, and
// the identity mapping makes the pointer value the physical address.
unsafe impl PhysAllocator for IdentityAllocator {
    fn allocate(&mut self, size: usize) -> Option<PhysBlock> {
        let layout = Layout::from_size_align(size.max(1), Self::ALIGN).ok()?;
        // SAFETY: layout has non-zero size.
        let ptr = NonNull::new(unsafe { alloc::alloc::alloc_zeroed(layout) })?;
        let phys = PhysAddr::new(ptr.as_ptr() as usize as u64);
        // SAFETY: freshly allocated, valid for `size` bytes.
        Some(unsafe { PhysBlock::from_raw_parts(ptr, phys, size) })
    }

    fn deallocate(&mut self, block: PhysBlock) {
        if let Ok(layout) = Layout::from_size_align(block.len.max(1), Self::ALIGN) {
            // SAFETY: allocated by `allocate` with this layout.
            unsafe { alloc::alloc::dealloc(block.virt.as_ptr(), layout) };
        }
    }
}

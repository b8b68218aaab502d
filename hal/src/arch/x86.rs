//! # x86 Port I/O Back-end
//!
//! Real hardware access through `in`/`out` instructions, plus a static vector
//! table that the kernel's IRQ entry stubs dispatch through.

use crate::interrupts::{
    without_interrupts, HandlerRef, InterruptFlag, InterruptVector, InterruptVectors, IrqTable,
};
use crate::memory::{IdentityAllocator, PhysAllocator, PhysBlock};
use crate::port::{Port, PortIo};

/// Vector table consulted by [`dispatch_irq`]
pub static IRQ_TABLE: IrqTable = IrqTable::new();

/// Called by the IRQ entry stub of `vector` with interrupts disabled
pub fn dispatch_irq(vector: InterruptVector) -> bool {
    // SAFETY: we are in the IRQ path of a machine with an ISA bus.
    let mut io = unsafe { X86PortIo::new() };
    IRQ_TABLE.dispatch(vector, &mut io)
}

/// Direct port I/O
#[derive(Debug)]
pub struct X86PortIo {
    _private: (),
}

impl X86PortIo {
    /// Create a port accessor
    ///
    /// # Safety
    /// Port I/O must be permitted (ring 0 or IOPL) and the caller must own
    /// the devices it talks to.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl PortIo for X86PortIo {
    #[inline]
    fn read_u8(&mut self, port: Port) -> u8 {
        let value: u8;
        // SAFETY: guaranteed by the constructor contract.
        unsafe {
            core::arch::asm!(
                "in al, dx",
                in("dx") port,
                out("al") value,
                options(nomem, nostack, preserves_flags)
            );
        }
        value
    }

    #[inline]
    fn write_u8(&mut self, port: Port, value: u8) {
        // SAFETY: guaranteed by the constructor contract.
        unsafe {
            core::arch::asm!(
                "out dx, al",
                in("dx") port,
                in("al") value,
                options(nomem, nostack, preserves_flags)
            );
        }
    }
}

/// Interrupt flag of the executing CPU
#[derive(Debug)]
pub struct X86Cpu {
    _private: (),
}

impl X86Cpu {
    /// Create an accessor for the interrupt flag
    ///
    /// # Safety
    /// Must run in ring 0; `cli`/`sti` fault anywhere else.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl InterruptFlag for X86Cpu {
    #[inline]
    fn are_enabled(&self) -> bool {
        let flags: usize;
        // SAFETY: reading EFLAGS has no side effects.
        unsafe {
            #[cfg(target_arch = "x86_64")]
            core::arch::asm!("pushfq", "pop {}", out(reg) flags, options(nomem, preserves_flags));
            #[cfg(target_arch = "x86")]
            core::arch::asm!("pushfd", "pop {}", out(reg) flags, options(nomem, preserves_flags));
        }
        flags & (1 << 9) != 0 // IF
    }

    #[inline]
    fn disable(&self) {
        // SAFETY: guaranteed by the constructor contract.
        unsafe {
            core::arch::asm!("cli", options(nomem, nostack));
        }
    }

    #[inline]
    fn enable(&self) {
        // SAFETY: guaranteed by the constructor contract.
        unsafe {
            core::arch::asm!("sti", options(nomem, nostack));
        }
    }
}

/// Bare-metal platform: port I/O, the static vector table and identity-mapped
/// DMA memory
#[derive(Debug)]
pub struct BareMetal {
    io: X86PortIo,
    cpu: X86Cpu,
    memory: IdentityAllocator,
}

impl BareMetal {
    /// Create the platform
    ///
    /// # Safety
    /// Same requirements as [`X86PortIo::new`] and [`X86Cpu::new`]; memory
    /// must be identity mapped below 16 MiB for ISA DMA to reach it.
    pub unsafe fn new() -> Self {
        Self {
            // SAFETY: forwarded to the caller.
            io: unsafe { X86PortIo::new() },
            // SAFETY: forwarded to the caller.
            cpu: unsafe { X86Cpu::new() },
            memory: IdentityAllocator::new(),
        }
    }
}

impl PortIo for BareMetal {
    fn read_u8(&mut self, port: Port) -> u8 {
        self.io.read_u8(port)
    }

    fn write_u8(&mut self, port: Port, value: u8) {
        self.io.write_u8(port, value);
    }
}

// IRQ entry stubs lock IRQ_TABLE too, so interrupts stay off while we hold it.
impl InterruptVectors for BareMetal {
    fn handler(&self, vector: InterruptVector) -> Option<HandlerRef> {
        without_interrupts(&self.cpu, || IRQ_TABLE.get(vector))
    }

    fn set_handler(&mut self, vector: InterruptVector, handler: Option<HandlerRef>) {
        without_interrupts(&self.cpu, || IRQ_TABLE.replace(vector, handler));
    }
}

// SAFETY: delegates to IdentityAllocator.
unsafe impl PhysAllocator for BareMetal {
    fn allocate(&mut self, size: usize) -> Option<PhysBlock> {
        self.memory.allocate(size)
    }

    fn deallocate(&mut self, block: PhysBlock) {
        self.memory.deallocate(block);
    }
}

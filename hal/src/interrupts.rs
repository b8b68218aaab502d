//! # Interrupt Vector Abstraction
//!
//! Hardware IRQ lines are routed through the 8259 pair to CPU vectors. A
//! driver installs an [`InterruptHandler`] on a vector, remembers what was
//! there before, and puts it back on teardown.
//!
//! Handlers run in interrupt context: they get a port bus and nothing else.
//! No allocation, no blocking, no logging.

use crate::port::PortIo;
use alloc::sync::Arc;
use spin::Mutex;

/// Interrupt vector number
pub type InterruptVector = u8;

/// Vector of IRQ0 on the master PIC (PC/AT BIOS layout)
pub const MASTER_VECTOR_BASE: InterruptVector = 0x08;

/// Vector of IRQ8 on the slave PIC (PC/AT BIOS layout)
pub const SLAVE_VECTOR_BASE: InterruptVector = 0x70;

/// Number of hardware IRQ lines on a cascaded 8259 pair
pub const IRQ_LINES: u8 = 16;

/// Map a hardware IRQ line to its CPU vector
///
/// IRQ 0-7 land on vectors 0x08-0x0F, IRQ 8-15 on 0x70-0x77.
pub const fn irq_vector(irq: u8) -> Option<InterruptVector> {
    match irq {
        0..=7 => Some(MASTER_VECTOR_BASE + irq),
        8..=15 => Some(SLAVE_VECTOR_BASE + irq - 8),
        _ => None,
    }
}

/// Interrupt-context entry point
pub trait InterruptHandler: Send + Sync {
    /// Service the interrupt raised on `vector`
    fn handle(&self, vector: InterruptVector, io: &mut dyn PortIo);
}

/// A handler slot as stored in a vector table
pub type HandlerRef = Arc<dyn InterruptHandler>;

/// Interrupt vector table access
pub trait InterruptVectors {
    /// Handler currently installed on `vector`
    fn handler(&self, vector: InterruptVector) -> Option<HandlerRef>;

    /// Install `handler` on `vector` (or clear it with `None`)
    fn set_handler(&mut self, vector: InterruptVector, handler: Option<HandlerRef>);
}

/// CPU maskable-interrupt enable flag
pub trait InterruptFlag {
    /// Whether maskable interrupts are currently delivered
    fn are_enabled(&self) -> bool;

    /// Stop delivering maskable interrupts
    fn disable(&self);

    /// Deliver maskable interrupts again
    fn enable(&self);
}

/// Execute without interrupts
///
/// Disables interrupts, executes the closure, and restores the previous
/// state. A table that interrupt context also locks must only be touched
/// from ordinary code through this, otherwise an IRQ arriving while the
/// lock is held spins forever on the same CPU.
pub fn without_interrupts<C, F, R>(cpu: &C, f: F) -> R
where
    C: InterruptFlag + ?Sized,
    F: FnOnce() -> R,
{
    let enabled = cpu.are_enabled();
    if enabled {
        cpu.disable();
    }

    let result = f();

    if enabled {
        cpu.enable();
    }

    result
}

const EMPTY_SLOT: Option<HandlerRef> = None;

// Back-ends keep the table in a `static`.
static_assertions::assert_impl_all!(IrqTable: Sync, Send);

/// Software vector table
///
/// Real back-ends keep one in a `static` and have their IRQ entry stubs call
/// [`IrqTable::dispatch`]; the simulator owns one per machine. On a real CPU
/// [`get`](Self::get) and [`replace`](Self::replace) must run inside
/// [`without_interrupts`] when called outside interrupt context.
pub struct IrqTable {
    slots: Mutex<[Option<HandlerRef>; 256]>,
}

impl IrqTable {
    /// Create an empty table
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new([EMPTY_SLOT; 256]),
        }
    }

    /// Handler installed on `vector`
    pub fn get(&self, vector: InterruptVector) -> Option<HandlerRef> {
        self.slots.lock()[vector as usize].clone()
    }

    /// Replace the handler on `vector`, returning the previous one
    pub fn replace(&self, vector: InterruptVector, handler: Option<HandlerRef>) -> Option<HandlerRef> {
        core::mem::replace(&mut self.slots.lock()[vector as usize], handler)
    }

    /// Run the handler installed on `vector`
    ///
    /// The table lock is released before the handler runs. Returns `false`
    /// for a spurious vector with nothing installed.
    pub fn dispatch(&self, vector: InterruptVector, io: &mut dyn PortIo) -> bool {
        let handler = self.get(vector);
        match handler {
            Some(handler) => {
                handler.handle(vector, io);
                true
            }
            None => false,
        }
    }
}

impl Default for IrqTable {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for IrqTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let installed = self.slots.lock().iter().filter(|s| s.is_some()).count();
        f.debug_struct("IrqTable").field("installed", &installed).finish()
    }
}

impl InterruptVectors for IrqTable {
    fn handler(&self, vector: InterruptVector) -> Option<HandlerRef> {
        self.get(vector)
    }

    fn set_handler(&mut self, vector: InterruptVector, handler: Option<HandlerRef>) {
        self.replace(vector, handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use core::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);

    impl InterruptHandler for Counter {
        fn handle(&self, _vector: InterruptVector, _io: &mut dyn PortIo) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    struct NullBus;

    impl PortIo for NullBus {
        fn read_u8(&mut self, _port: u16) -> u8 {
            0xFF
        }

        fn write_u8(&mut self, _port: u16, _value: u8) {}
    }

    struct FakeCpu {
        enabled: Cell<bool>,
        toggles: Cell<u32>,
    }

    impl FakeCpu {
        fn new(enabled: bool) -> Self {
            Self {
                enabled: Cell::new(enabled),
                toggles: Cell::new(0),
            }
        }
    }

    impl InterruptFlag for FakeCpu {
        fn are_enabled(&self) -> bool {
            self.enabled.get()
        }

        fn disable(&self) {
            self.enabled.set(false);
            self.toggles.set(self.toggles.get() + 1);
        }

        fn enable(&self) {
            self.enabled.set(true);
            self.toggles.set(self.toggles.get() + 1);
        }
    }

    #[test]
    fn without_interrupts_masks_for_the_closure_and_restores() {
        let cpu = FakeCpu::new(true);
        let table = IrqTable::new();
        let counter: HandlerRef = Arc::new(Counter(AtomicUsize::new(0)));

        let previous = without_interrupts(&cpu, || {
            assert!(!cpu.are_enabled());
            table.replace(0x0D, Some(counter.clone()))
        });

        assert!(previous.is_none());
        assert!(cpu.are_enabled());
        assert_eq!(cpu.toggles.get(), 2);
        assert!(table.get(0x0D).is_some());
    }

    #[test]
    fn without_interrupts_leaves_disabled_cpu_alone() {
        let cpu = FakeCpu::new(false);

        let seen = without_interrupts(&cpu, || cpu.are_enabled());

        assert!(!seen);
        assert!(!cpu.are_enabled());
        assert_eq!(cpu.toggles.get(), 0);
    }

    #[test]
    fn irq_vectors_follow_bios_layout() {
        assert_eq!(irq_vector(0), Some(0x08));
        assert_eq!(irq_vector(5), Some(0x0D));
        assert_eq!(irq_vector(10), Some(0x72));
        assert_eq!(irq_vector(16), None);
    }

    #[test]
    fn dispatch_runs_installed_handler_and_replace_returns_previous() {
        let table = IrqTable::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));

        assert!(!table.dispatch(0x0D, &mut NullBus));
        assert!(table.replace(0x0D, Some(counter.clone())).is_none());
        assert!(table.dispatch(0x0D, &mut NullBus));
        assert_eq!(counter.0.load(Ordering::Relaxed), 1);

        let previous = table.replace(0x0D, None);
        assert!(previous.is_some());
        assert!(table.get(0x0D).is_none());
    }
}

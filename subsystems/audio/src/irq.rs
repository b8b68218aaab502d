//! # Interrupt Dispatcher
//!
//! Binds the codec's IRQ line to a handler and undoes the binding on
//! teardown. The handler itself ([`RefillSignal`]) only raises a flag for
//! the main loop; all real work happens in [`crate::Player::poll`].

use crate::codec::Codec;
use crate::error::{AudioError, AudioResult};
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use wss_hal::interrupts::{irq_vector, HandlerRef, InterruptHandler, InterruptVector, InterruptVectors};
use wss_hal::pic::{self, CASCADE_IRQ};
use wss_hal::port::{Port, PortIo};

/// Half-buffer-complete notification shared with interrupt context
///
/// The flag is boolean: a second interrupt before the main loop consumed the
/// first is merged into it and only counted.
#[derive(Debug)]
pub struct RefillSignal {
    pending: AtomicBool,
    coalesced: AtomicU32,
    status_port: Port,
    irq: u8,
}

impl RefillSignal {
    /// Signal acknowledging interrupts of `codec` on `irq`
    pub fn new(codec: &Codec, irq: u8) -> Self {
        Self {
            pending: AtomicBool::new(false),
            coalesced: AtomicU32::new(0),
            status_port: codec.status_port(),
            irq,
        }
    }

    /// Consume the pending flag
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Whether an interrupt is waiting to be serviced
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Drop a pending notification
    pub fn clear(&self) {
        self.pending.store(false, Ordering::Release);
    }

    /// Interrupts merged into an already pending one
    pub fn coalesced(&self) -> u32 {
        self.coalesced.load(Ordering::Relaxed)
    }
}

impl InterruptHandler for RefillSignal {
    fn handle(&self, _vector: InterruptVector, io: &mut dyn PortIo) {
        if self.pending.swap(true, Ordering::AcqRel) {
            self.coalesced.fetch_add(1, Ordering::Relaxed);
        }
        io.write_u8(self.status_port, 0x00);
        pic::end_of_interrupt(io, self.irq);
    }
}

/// An IRQ line bound to a handler
///
/// Holds whatever was installed on the vector before so [`IrqLine::detach`]
/// can put it back. Dropping a line without detaching it leaves the handler
/// installed and the line unmasked, and logs a warning.
pub struct IrqLine {
    irq: u8,
    vector: InterruptVector,
    previous: Option<HandlerRef>,
}

impl core::fmt::Debug for IrqLine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IrqLine")
            .field("irq", &self.irq)
            .field("vector", &self.vector)
            .field("had_previous", &self.previous.is_some())
            .finish()
    }
}

impl IrqLine {
    /// Install `handler` on `irq` and unmask the line
    pub fn attach<H>(hal: &mut H, irq: u8, handler: HandlerRef) -> AudioResult<Self>
    where
        H: InterruptVectors + PortIo + ?Sized,
    {
        let vector = match irq_vector(irq) {
            Some(vector) if irq != CASCADE_IRQ => vector,
            _ => return Err(AudioError::invalid_argument("irq line")),
        };

        let previous = hal.handler(vector);
        hal.set_handler(vector, Some(handler));
        if let Err(err) = pic::unmask(hal, irq) {
            hal.set_handler(vector, previous);
            return Err(err.into());
        }

        log::debug!("IRQ{}: handler installed on vector {:#04x}", irq, vector);
        Ok(Self {
            irq,
            vector,
            previous,
        })
    }

    /// IRQ line number
    pub fn irq(&self) -> u8 {
        self.irq
    }

    /// CPU vector the line is delivered on
    pub fn vector(&self) -> InterruptVector {
        self.vector
    }

    /// Mask the line and restore the previous handler
    pub fn detach<H>(mut self, hal: &mut H) -> AudioResult<()>
    where
        H: InterruptVectors + PortIo + ?Sized,
    {
        let masked = pic::mask(hal, self.irq);
        hal.set_handler(self.vector, self.previous.take());
        log::debug!("IRQ{}: handler removed", self.irq);
        // Only plain data is left; skip the unbound-line report in Drop.
        core::mem::forget(self);
        masked.map_err(AudioError::from)
    }
}

impl Drop for IrqLine {
    fn drop(&mut self) {
        log::warn!(
            "IRQ{}: dropped without detach, handler left on vector {:#04x}",
            self.irq,
            self.vector
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimMachine;
    use alloc::sync::Arc;
    use wss_hal::pic::ports;

    struct Marker;

    impl InterruptHandler for Marker {
        fn handle(&self, _vector: InterruptVector, _io: &mut dyn PortIo) {}
    }

    #[test]
    fn handler_sets_flag_and_acknowledges() {
        let mut sim = SimMachine::new();
        let signal = RefillSignal::new(&Codec::new(0x530), 5);

        signal.handle(0x0D, &mut sim);

        assert!(signal.is_pending());
        assert_eq!(sim.port_writes(), [(0x536, 0x00), (ports::MASTER_CMD, pic::EOI)]);
        assert!(signal.take());
        assert!(!signal.take());
        assert_eq!(signal.coalesced(), 0);
    }

    #[test]
    fn unserviced_interrupts_are_coalesced() {
        let mut sim = SimMachine::new();
        let signal = RefillSignal::new(&Codec::new(0x530), 10);

        signal.handle(0x72, &mut sim);
        signal.handle(0x72, &mut sim);
        signal.handle(0x72, &mut sim);

        assert!(signal.take());
        assert_eq!(signal.coalesced(), 2);
        assert_eq!(sim.eoi_count(), (3, 3));
    }

    #[test]
    fn attach_and_detach_restore_the_vector() {
        let mut sim = SimMachine::new();
        let old: HandlerRef = Arc::new(Marker);
        sim.set_handler(0x0D, Some(old.clone()));

        let signal = Arc::new(RefillSignal::new(&Codec::new(0x530), 5));
        let line = IrqLine::attach(&mut sim, 5, signal.clone()).unwrap();
        assert_eq!(line.vector(), 0x0D);
        assert!(!sim.irq_masked(5));
        let installed = sim.handler(0x0D).unwrap();
        let expected: HandlerRef = signal;
        assert!(Arc::ptr_eq(&installed, &expected));

        line.detach(&mut sim).unwrap();
        assert!(sim.irq_masked(5));
        assert!(Arc::ptr_eq(&sim.handler(0x0D).unwrap(), &old));
    }

    #[test]
    fn dropped_line_stays_bound_until_detached() {
        let mut sim = SimMachine::new();
        let signal: HandlerRef = Arc::new(RefillSignal::new(&Codec::new(0x530), 5));

        drop(IrqLine::attach(&mut sim, 5, signal.clone()).unwrap());
        assert!(!sim.irq_masked(5));
        assert!(Arc::ptr_eq(&sim.handler(0x0D).unwrap(), &signal));

        // a fresh binding saves the stale handler and hands it back
        let line = IrqLine::attach(&mut sim, 5, Arc::new(Marker)).unwrap();
        line.detach(&mut sim).unwrap();
        assert!(sim.irq_masked(5));
        assert!(Arc::ptr_eq(&sim.handler(0x0D).unwrap(), &signal));
    }

    #[test]
    fn cascade_line_cannot_be_attached() {
        let mut sim = SimMachine::new();
        let result = IrqLine::attach(&mut sim, CASCADE_IRQ, Arc::new(Marker));
        assert!(matches!(result, Err(AudioError::InvalidArgument { .. })));
        assert!(sim.handler(0x0A).is_none());
    }
}

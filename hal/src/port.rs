//! # Port I/O Abstraction
//!
//! ISA devices are driven through 8-bit reads and writes in the I/O port
//! space. Drivers never issue `in`/`out` themselves; they hold a `PortIo`.

/// An I/O port number
pub type Port = u16;

/// 8-bit port access
pub trait PortIo {
    /// Read a byte from `port`
    fn read_u8(&mut self, port: Port) -> u8;

    /// Write a byte to `port`
    fn write_u8(&mut self, port: Port, value: u8);
}

impl<T: PortIo + ?Sized> PortIo for &mut T {
    fn read_u8(&mut self, port: Port) -> u8 {
        (**self).read_u8(port)
    }

    fn write_u8(&mut self, port: Port, value: u8) {
        (**self).write_u8(port, value);
    }
}

/// Low byte of a 16-bit register value
#[inline]
pub const fn lo_byte(value: u16) -> u8 {
    (value & 0xFF) as u8
}

/// High byte of a 16-bit register value
#[inline]
pub const fn hi_byte(value: u16) -> u8 {
    (value >> 8) as u8
}

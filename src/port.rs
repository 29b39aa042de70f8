//! Data bus on four bits of an 8-bit output port register.

use core::convert::Infallible;
use core::ptr;

use crate::Bus;

/// An 8-bit output register.
pub trait Port {
    type Error;

    fn read(&mut self) -> Result<u8, Self::Error>;

    fn write(&mut self, value: u8) -> Result<(), Self::Error>;

    /// Clears the `clear` bits, then sets the `set` bits, in one write.
    fn modify(&mut self, clear: u8, set: u8) -> Result<(), Self::Error> {
        let value = self.read()?;
        self.write((value & !clear) | set)
    }
}

impl<P: Port + ?Sized> Port for &mut P {
    type Error = P::Error;

    fn read(&mut self) -> Result<u8, Self::Error> {
        P::read(self)
    }

    fn write(&mut self, value: u8) -> Result<(), Self::Error> {
        P::write(self, value)
    }

    fn modify(&mut self, clear: u8, set: u8) -> Result<(), Self::Error> {
        P::modify(self, clear, set)
    }
}

/// Memory mapped output register, eg. `PORTC` on AVR (0x28).
#[derive(Debug)]
pub struct RegisterPort {
    register: *mut u8,
}

impl RegisterPort {
    /// # Safety
    ///
    /// `register` must point to a readable and writable byte for as long as the port lives.
    /// Nothing else may write the register concurrently, the bus update is a plain
    /// read-modify-write and would race.
    pub unsafe fn new(register: *mut u8) -> Self {
        Self { register }
    }
}

impl Port for RegisterPort {
    type Error = Infallible;

    fn read(&mut self) -> Result<u8, Infallible> {
        // SAFETY: validity and exclusivity are guaranteed by the caller of `new`
        Ok(unsafe { ptr::read_volatile(self.register) })
    }

    fn write(&mut self, value: u8) -> Result<(), Infallible> {
        // SAFETY: see `read`
        unsafe { ptr::write_volatile(self.register, value) };
        Ok(())
    }
}

/// D4..D7 wired to bits `SHIFT..SHIFT + 4` of `P`. Other bits of the port are left as they are.
#[derive(Debug)]
pub struct PortBus<P, const SHIFT: u8> {
    port: P,
}

impl<P, const SHIFT: u8> PortBus<P, SHIFT> {
    pub const MASK: u8 = {
        assert!(SHIFT <= 4, "data bus must fit in an 8-bit port");
        0x0F << SHIFT
    };

    pub fn new(port: P) -> Self {
        let _ = Self::MASK;
        Self { port }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn release(self) -> P {
        self.port
    }
}

impl<P: Port, const SHIFT: u8, E: From<P::Error>> Bus<E> for PortBus<P, SHIFT> {
    fn put(&mut self, nybble: u8) -> Result<(), E> {
        self.port.modify(Self::MASK, (nybble & 0x0F) << SHIFT)?;
        Ok(())
    }
}

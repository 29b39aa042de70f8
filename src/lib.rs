#![no_std]

//! embedded-hal driver for HD44780 character LCDs wired in 4-bit mode.
//!
//! The data lines D4..D7 sit on four contiguous bits of one output port register
//! ([`PortBus`]), or on four separate pins ([`HalfWidthBus`]). RS and EN are plain output pins.
//!
//! currently only works in write-only mode:
//! the busy flag is never read, every instruction waits a fixed datasheet delay instead
//! doesn't track the current position, the controller keeps it
//!
//! example
//! ```ignore
//! // PORTC bits 2..=5 carry D4..D7
//! let port = unsafe { RegisterPort::new(0x28 as *mut u8) };
//! let mut lcd = blocking::Lcd::<_, _, _, _, Infallible>::new(
//!     LcdPinConfiguration {
//!         en: pins.d7.into_output(),
//!         rs: pins.d6.into_output(),
//!         bus: PortBus::<_, 2>::new(port),
//!     },
//!     delay,
//!     LcdConfig::default(),
//! ).unwrap();
//!
//! lcd.print("temp").unwrap();
//! lcd.set_cursor(0x40).unwrap(); //second line starts at 0x40
//! lcd.print_float(21.5).unwrap();
//! ```

use core::fmt::{Debug, Formatter, Write as _};
use embedded_hal::digital::{OutputPin, PinState};
use embedded_io::{Error, ErrorKind};
use log::warn;

pub mod blocking;
pub mod config;
pub mod nonblocking;
pub mod port;

#[cfg(test)]
mod sim;

pub use config::{LcdConfig, Timing};
pub use port::{Port, PortBus, RegisterPort};

#[repr(u8)]
#[allow(dead_code)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    ClearDisplay   = 0b00000001,
    ReturnHome     = 0b00000010,
    EntryModeSet   = 0b00000100,
    DisplayControl = 0b00001000,
    CursorShift    = 0b00010000,
    FunctionSet    = 0b00100000,
    SetCGramAddr   = 0b01000000,
    SetDDRAMAddr   = 0b10000000
}

/// Nybble sent three times to force the controller into a known 8-bit state.
const WAKE_UP: u8 = 0b0011;
/// Nybble that switches the controller to the 4-bit interface.
const FOUR_BIT: u8 = 0b0010;

const FULL_WIDTH_BUS: u8 = 0b00010000;

/// Room for `{:5.2}` of any value that fits the width, plus slack.
pub const FLOAT_BUFFER: usize = 10;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ShiftDirection {
    Left  = 0b0000,
    Right = 0b0100
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IncrementMode {
    Decremental = 0b00,
    Incremental = 0b10,
}

/// Line count and font. Four-line modules use [`Lines::TwoLines`].
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Lines {
    TwoLines    = 0b1000,
    OneLine5x10 = 0b0100,
    OneLine5x8  = 0b0000
}

impl Default for Lines {
    fn default() -> Self {
        Self::OneLine5x8
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayControl(u8);

impl DisplayControl {
    const DISPLAY: u8 = 0b100;
    const CURSOR: u8 = 0b010;
    const BLINK: u8 = 0b001;

    pub const fn new(display_on: bool, cursor: bool, blink: bool) -> Self {
        let mut v = 0;
        if display_on {
            v |= Self::DISPLAY;
        }
        if cursor {
            v |= Self::CURSOR;
        }
        if blink {
            v |= Self::BLINK;
        }
        Self(v)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn set_display_on(&mut self, v: bool) {
        self.0 &= !Self::DISPLAY;
        if v {
            self.0 |= Self::DISPLAY;
        }
    }

    pub fn set_cursor(&mut self, v: bool) {
        self.0 &= !Self::CURSOR;
        if v {
            self.0 |= Self::CURSOR;
        }
    }

    pub fn set_blink(&mut self, v: bool) {
        self.0 &= !Self::BLINK;
        if v {
            self.0 |= Self::BLINK;
        }
    }
}

impl Default for DisplayControl {
    fn default() -> Self {
        Self::new(true, false, false)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EntryMode(u8);

impl EntryMode {
    const SCROLL: u8 = 0b001;

    pub const fn new(increment_mode: IncrementMode, scroll: bool) -> Self {
        let mut v = increment_mode as u8;
        if scroll {
            v |= Self::SCROLL;
        }
        Self(v)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn set_increment_mode(&mut self, increment_mode: IncrementMode) {
        self.0 &= !(IncrementMode::Incremental as u8);
        self.0 |= increment_mode as u8;
    }

    pub fn set_scroll(&mut self, v: bool) {
        self.0 &= !Self::SCROLL;
        if v {
            self.0 |= Self::SCROLL;
        }
    }
}

impl Default for EntryMode {
    fn default() -> Self {
        Self::new(IncrementMode::Incremental, false)
    }
}

fn function_set(lines: Lines) -> u8 {
    Command::FunctionSet as u8 | (lines as u8 & !FULL_WIDTH_BUS)
}

/// Renders `value` the way `dtostrf(value, 5, 2, buf)` does: right aligned, 5 wide, 2 decimals.
///
/// Output that does not fit [`FLOAT_BUFFER`] is cut short without an error.
pub(crate) fn format_float(value: f32) -> heapless::String<FLOAT_BUFFER> {
    let mut buf = heapless::String::new();
    if write!(buf, "{:5.2}", value).is_err() {
        warn!("lcd: {} does not fit {} characters, output truncated", value, FLOAT_BUFFER);
    }
    buf
}

/// Places one nybble on D4..D7. Only the low 4 bits of `nybble` are meaningful.
pub trait Bus<E> {
    fn put(&mut self, nybble: u8) -> Result<(), E>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalfWidthBus<
    D4: OutputPin,
    D5: OutputPin,
    D6: OutputPin,
    D7: OutputPin
> {
    pub d4: D4,
    pub d5: D5,
    pub d6: D6,
    pub d7: D7
}

impl<
    D4: OutputPin,
    D5: OutputPin,
    D6: OutputPin,
    D7: OutputPin,
    E: From<D4::Error> + From<D5::Error> + From<D6::Error> + From<D7::Error>
> Bus<E> for HalfWidthBus<D4, D5, D6, D7> {
    fn put(&mut self, mut nybble: u8) -> Result<(), E> {
        self.d4.set_state(pin_state(nybble & 1 == 1))?;
        nybble >>= 1;
        self.d5.set_state(pin_state(nybble & 1 == 1))?;
        nybble >>= 1;
        self.d6.set_state(pin_state(nybble & 1 == 1))?;
        nybble >>= 1;
        self.d7.set_state(pin_state(nybble & 1 == 1))?;
        Ok(())
    }
}

pub(crate) fn pin_state(v: bool) -> PinState {
    match v {
        true => PinState::High,
        false => PinState::Low
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LcdPinConfiguration<
    EN: OutputPin,
    RS: OutputPin,
    B
> {
    pub en: EN,
    pub rs: RS,
    pub bus: B
}

impl<
    EN: OutputPin,
    RS: OutputPin,
    B
> LcdPinConfiguration<EN, RS, B> {
    /// EN low, high, low. The controller latches the bus on the falling edge.
    fn pulse<E: From<EN::Error>>(&mut self) -> Result<(), E> {
        self.en.set_low()?;
        self.en.set_high()?;
        self.en.set_low()?;
        Ok(())
    }

    /// RS low selects the instruction register, RS high the data register.
    fn select<E: From<RS::Error>>(&mut self, data: bool) -> Result<(), E> {
        self.rs.set_state(pin_state(data))?;
        Ok(())
    }
}

pub struct LcdIOError<T>(pub Option<T>, pub ErrorKind);

impl<T> Error for LcdIOError<T> {
    fn kind(&self) -> ErrorKind {
        self.1
    }
}

impl<T> Debug for LcdIOError<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        (self.1).fmt(f)
    }
}

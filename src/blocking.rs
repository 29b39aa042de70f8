use core::fmt;
use core::marker::PhantomData;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_io::{ErrorKind, ErrorType, Write};
use log::{debug, trace};
use crate::{format_float, function_set, Bus, Command, DisplayControl, EntryMode, LcdConfig, LcdIOError, LcdPinConfiguration, ShiftDirection, FOUR_BIT, WAKE_UP};

/// Driver that busy-waits through `DELAY` after every transfer.
pub struct Lcd<
    EN: OutputPin,
    RS: OutputPin,
    B: Bus<E>,
    DELAY: DelayNs,
    E
> {
    pins: LcdPinConfiguration<EN, RS, B>,
    delay: DELAY,
    config: LcdConfig,
    _error: PhantomData<E>
}

impl<
    EN: OutputPin,
    RS: OutputPin,
    B: Bus<E>,
    DELAY: DelayNs,
    E: From<EN::Error> + From<RS::Error>
> Lcd<EN, RS, B, DELAY, E> {
    /// Takes the pins and runs [`Lcd::init`].
    ///
    /// Timings shorter than the datasheet minimums are raised to them.
    pub fn new(pins: LcdPinConfiguration<EN, RS, B>, delay: DELAY, mut config: LcdConfig) -> Result<Self, E> {
        config.timing = config.timing.at_least_datasheet();
        let mut v = Self {
            pins,
            delay,
            config,
            _error: PhantomData
        };
        v.init()?;
        Ok(v)
    }

    pub fn release(self) -> (LcdPinConfiguration<EN, RS, B>, DELAY) {
        (self.pins, self.delay)
    }

    pub fn config(&self) -> &LcdConfig {
        &self.config
    }

    fn pulse_enable(&mut self) -> Result<(), E> {
        self.pins.pulse::<E>()?;
        self.delay.delay_us(self.config.timing.send);
        Ok(())
    }

    /// RS has to be set by the caller.
    fn send_nybble(&mut self, nybble: u8) -> Result<(), E> {
        self.pins.bus.put(nybble & 0x0F)?;
        self.pulse_enable()
    }

    fn send_byte(&mut self, byte: u8) -> Result<(), E> {
        trace!("lcd: {:08b}", byte);
        self.send_nybble(byte >> 4)?;
        self.send_nybble(byte & 0x0F)
    }

    fn command(&mut self, byte: u8) -> Result<(), E> {
        self.pins.select::<E>(false)?;
        self.send_byte(byte)
    }

    fn data(&mut self, bytes: &[u8]) -> Result<(), E> {
        self.pins.select::<E>(true)?;
        for &c in bytes {
            self.send_byte(c)?;
        }
        Ok(())
    }

    /// Forces the controller into 4-bit mode whatever state it was in, then applies the
    /// configured lines, display control and entry mode, clears and homes.
    ///
    /// Safe to call again at any time.
    pub fn init(&mut self) -> Result<(), E> {
        debug!("lcd: init {:?}", self.config);
        let timing = self.config.timing;
        self.pins.rs.set_low()?;
        self.pins.en.set_low()?;
        self.delay.delay_us(timing.power_on);

        self.send_nybble(WAKE_UP)?;
        self.delay.delay_us(timing.mode_switch);
        self.send_nybble(WAKE_UP)?;
        self.delay.delay_us(timing.mode_switch);
        self.send_nybble(WAKE_UP)?;
        self.delay.delay_us(timing.mode_switch_final);
        self.send_nybble(FOUR_BIT)?;

        self.command(function_set(self.config.lines))?;
        self.set_display_control(self.config.display)?;
        self.set_entry_mode(self.config.entry)?;
        self.clear()?;
        self.home()
    }

    pub fn set_display_control(&mut self, control: DisplayControl) -> Result<(), E> {
        self.config.display = control;
        self.command(Command::DisplayControl as u8 | control.bits())
    }

    pub fn set_entry_mode(&mut self, entry: EntryMode) -> Result<(), E> {
        self.config.entry = entry;
        self.command(Command::EntryModeSet as u8 | entry.bits())
    }

    pub fn clear(&mut self) -> Result<(), E> {
        self.command(Command::ClearDisplay as u8)?;
        self.delay.delay_us(self.config.timing.clear);
        Ok(())
    }

    pub fn home(&mut self) -> Result<(), E> {
        self.command(Command::ReturnHome as u8)?;
        self.delay.delay_us(self.config.timing.command);
        Ok(())
    }

    /// Moves the cursor to a raw DDRAM address. Rows start at 0x00, 0x40, 0x14, 0x54 on most
    /// modules; the address is not checked.
    pub fn set_cursor(&mut self, addr: u8) -> Result<(), E> {
        self.command(Command::SetDDRAMAddr as u8 | addr)
    }

    pub fn cursor_left(&mut self) -> Result<(), E> {
        self.command(Command::CursorShift as u8 | ShiftDirection::Left as u8)
    }

    /// Shifts the cursor right one full row span, which lands on the same column of the next row.
    pub fn cursor_down(&mut self) -> Result<(), E> {
        self.pins.select::<E>(false)?;
        for _ in 0..self.config.row_span {
            self.send_byte(Command::CursorShift as u8 | ShiftDirection::Right as u8)?;
        }
        Ok(())
    }

    pub fn put_char(&mut self, c: u8) -> Result<(), E> {
        self.data(&[c])
    }

    /// Writes the bytes of `s` up to the first NUL, if any.
    pub fn print(&mut self, s: &str) -> Result<(), E> {
        let bytes = s.as_bytes();
        let end = bytes.iter().position(|&c| c == 0).unwrap_or(bytes.len());
        self.data(&bytes[..end])
    }

    /// Prints `f` five characters wide with two decimals, eg. `" 3.14"`.
    pub fn print_float(&mut self, f: f32) -> Result<(), E> {
        let buf = format_float(f);
        self.print(&buf)
    }
}

impl<
    EN: OutputPin,
    RS: OutputPin,
    B: Bus<E>,
    DELAY: DelayNs,
    E: From<EN::Error> + From<RS::Error>
> fmt::Write for Lcd<EN, RS, B, DELAY, E> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.print(s).map_err(|_| fmt::Error)
    }
}

impl<
    EN: OutputPin,
    RS: OutputPin,
    B: Bus<E>,
    DELAY: DelayNs,
    E: From<EN::Error> + From<RS::Error>
> ErrorType for Lcd<EN, RS, B, DELAY, E> {
    type Error = LcdIOError<E>;
}

impl<
    EN: OutputPin,
    RS: OutputPin,
    B: Bus<E>,
    DELAY: DelayNs,
    E: From<EN::Error> + From<RS::Error>
> Write for Lcd<EN, RS, B, DELAY, E> {
    /// Every byte goes to DDRAM, NUL included (it's CGRAM character 0).
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.data(buf).map_err(|e| LcdIOError(Some(e), ErrorKind::Other))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

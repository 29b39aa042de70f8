use core::marker::PhantomData;
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{ErrorKind, ErrorType, Write};
use log::{debug, trace};
use crate::{format_float, function_set, Bus, Command, DisplayControl, EntryMode, LcdConfig, LcdIOError, LcdPinConfiguration, ShiftDirection, FOUR_BIT, WAKE_UP};

/// Same sequence as [`crate::blocking::Lcd`], waits are awaited instead of spun.
///
/// Pin and bus writes are still immediate, so the driver yields only while waiting.
///
/// example
/// ```ignore
/// pub struct EmbassyDelayNs;
///
/// impl DelayNs for EmbassyDelayNs {
///     async fn delay_ns(&mut self, ns: u32) {
///         embassy_time::Timer::after_micros(ns.div_ceil(1000) as u64).await;
///     }
/// }
///     let mut lcd = Lcd::<_, _, _, _, Infallible>::new(
///         LcdPinConfiguration {
///             en: pins.d7.into_output(),
///             rs: pins.d6.into_output(),
///             bus: HalfWidthBus {
///                 d4: pins.d8.into_output(),
///                 d5: pins.d9.into_output(),
///                 d6: pins.d10.into_output(),
///                 d7: pins.d11.into_output()
///             }
///         },
///         EmbassyDelayNs,
///         LcdConfig::default()
///     ).await.unwrap();
///
///     lcd.write_all("first line".as_bytes()).await.unwrap();
///     lcd.set_cursor(0x40).await.unwrap(); //second line
///     lcd.write_all("second line".as_bytes()).await.unwrap();
/// ```
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
    pub async fn new(pins: LcdPinConfiguration<EN, RS, B>, delay: DELAY, mut config: LcdConfig) -> Result<Self, E> {
        config.timing = config.timing.at_least_datasheet();
        let mut v = Self {
            pins,
            delay,
            config,
            _error: PhantomData
        };
        v.init().await?;
        Ok(v)
    }

    pub fn release(self) -> (LcdPinConfiguration<EN, RS, B>, DELAY) {
        (self.pins, self.delay)
    }

    pub fn config(&self) -> &LcdConfig {
        &self.config
    }

    async fn pulse_enable(&mut self) -> Result<(), E> {
        self.pins.pulse::<E>()?;
        self.delay.delay_us(self.config.timing.send).await;
        Ok(())
    }

    async fn send_nybble(&mut self, nybble: u8) -> Result<(), E> {
        self.pins.bus.put(nybble & 0x0F)?;
        self.pulse_enable().await
    }

    async fn send_byte(&mut self, byte: u8) -> Result<(), E> {
        trace!("lcd: {:08b}", byte);
        self.send_nybble(byte >> 4).await?;
        self.send_nybble(byte & 0x0F).await
    }

    async fn command(&mut self, byte: u8) -> Result<(), E> {
        self.pins.select::<E>(false)?;
        self.send_byte(byte).await
    }

    async fn data(&mut self, bytes: &[u8]) -> Result<(), E> {
        self.pins.select::<E>(true)?;
        for &c in bytes {
            self.send_byte(c).await?;
        }
        Ok(())
    }

    pub async fn init(&mut self) -> Result<(), E> {
        debug!("lcd: init {:?}", self.config);
        let timing = self.config.timing;
        self.pins.rs.set_low()?;
        self.pins.en.set_low()?;
        self.delay.delay_us(timing.power_on).await;

        self.send_nybble(WAKE_UP).await?;
        self.delay.delay_us(timing.mode_switch).await;
        self.send_nybble(WAKE_UP).await?;
        self.delay.delay_us(timing.mode_switch).await; //datasheet asks 100us here, slow clones need more
        self.send_nybble(WAKE_UP).await?;
        self.delay.delay_us(timing.mode_switch_final).await;
        self.send_nybble(FOUR_BIT).await?;

        self.command(function_set(self.config.lines)).await?;
        self.set_display_control(self.config.display).await?;
        self.set_entry_mode(self.config.entry).await?;
        self.clear().await?;
        self.home().await
    }

    pub async fn set_display_control(&mut self, control: DisplayControl) -> Result<(), E> {
        self.config.display = control;
        self.command(Command::DisplayControl as u8 | control.bits()).await
    }

    pub async fn set_entry_mode(&mut self, entry: EntryMode) -> Result<(), E> {
        self.config.entry = entry;
        self.command(Command::EntryModeSet as u8 | entry.bits()).await
    }

    pub async fn clear(&mut self) -> Result<(), E> {
        self.command(Command::ClearDisplay as u8).await?;
        self.delay.delay_us(self.config.timing.clear).await;
        Ok(())
    }

    pub async fn home(&mut self) -> Result<(), E> {
        self.command(Command::ReturnHome as u8).await?;
        self.delay.delay_us(self.config.timing.command).await;
        Ok(())
    }

    pub async fn set_cursor(&mut self, addr: u8) -> Result<(), E> {
        self.command(Command::SetDDRAMAddr as u8 | addr).await
    }

    pub async fn cursor_left(&mut self) -> Result<(), E> {
        self.command(Command::CursorShift as u8 | ShiftDirection::Left as u8).await
    }

    pub async fn cursor_down(&mut self) -> Result<(), E> {
        self.pins.select::<E>(false)?;
        for _ in 0..self.config.row_span {
            self.send_byte(Command::CursorShift as u8 | ShiftDirection::Right as u8).await?;
        }
        Ok(())
    }

    pub async fn put_char(&mut self, c: u8) -> Result<(), E> {
        self.data(&[c]).await
    }

    pub async fn print(&mut self, s: &str) -> Result<(), E> {
        let bytes = s.as_bytes();
        let end = bytes.iter().position(|&c| c == 0).unwrap_or(bytes.len());
        self.data(&bytes[..end]).await
    }

    pub async fn print_float(&mut self, f: f32) -> Result<(), E> {
        let buf = format_float(f);
        self.print(&buf).await
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
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.data(buf).await.map_err(|e| LcdIOError(Some(e), ErrorKind::Other))?;
        Ok(buf.len())
    }
}

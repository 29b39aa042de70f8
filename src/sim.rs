//! Simulated port, pins and delay for driver tests.
//!
//! Everything the driver does is recorded in one ordered event log so tests can decode the
//! nybbles the controller would have latched and the waits between them.

extern crate std;

use core::cell::RefCell;
use core::convert::Infallible;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::digital::{ErrorType, OutputPin};

use crate::port::{Port, PortBus};
use crate::LcdPinConfiguration;

/// Bus position used by every simulated rig, same as the data lines on PORTC2..5.
pub const SHIFT: u8 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Rs(bool),
    En(bool),
    Port(u8),
    /// nanoseconds
    Delay(u64),
}

#[derive(Default)]
struct State {
    events: Vec<Event>,
    port: u8,
}

#[derive(Clone, Default)]
pub struct Recorder(Rc<RefCell<State>>);

impl Recorder {
    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().events.clone()
    }

    pub fn reset_events(&self) {
        self.0.borrow_mut().events.clear();
    }

    pub fn port(&self) -> u8 {
        self.0.borrow().port
    }

    /// Changes the register without recording, like another peripheral owning the other bits.
    pub fn set_port(&self, value: u8) {
        self.0.borrow_mut().port = value;
    }

    fn push(&self, event: Event) {
        self.0.borrow_mut().events.push(event);
    }
}

#[derive(Clone, Copy)]
enum Line {
    Rs,
    En,
}

pub struct SimPin {
    line: Line,
    recorder: Recorder,
}

impl SimPin {
    fn record(&mut self, high: bool) {
        self.recorder.push(match self.line {
            Line::Rs => Event::Rs(high),
            Line::En => Event::En(high),
        });
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.record(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.record(true);
        Ok(())
    }
}

pub struct SimPort(Recorder);

impl Port for SimPort {
    type Error = Infallible;

    fn read(&mut self) -> Result<u8, Infallible> {
        Ok(self.0.port())
    }

    fn write(&mut self, value: u8) -> Result<(), Infallible> {
        let mut state = self.0 .0.borrow_mut();
        state.port = value;
        state.events.push(Event::Port(value));
        Ok(())
    }
}

pub struct SimDelay(Recorder);

impl embedded_hal::delay::DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.push(Event::Delay(ns as u64));
    }

    fn delay_us(&mut self, us: u32) {
        self.0.push(Event::Delay(us as u64 * 1_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.push(Event::Delay(ms as u64 * 1_000_000));
    }
}

impl embedded_hal_async::delay::DelayNs for SimDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.0.push(Event::Delay(ns as u64));
    }

    async fn delay_us(&mut self, us: u32) {
        self.0.push(Event::Delay(us as u64 * 1_000));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.0.push(Event::Delay(ms as u64 * 1_000_000));
    }
}

pub type SimPins = LcdPinConfiguration<SimPin, SimPin, PortBus<SimPort, SHIFT>>;

pub fn rig() -> (Recorder, SimPins, SimDelay) {
    let recorder = Recorder::default();
    let pins = LcdPinConfiguration {
        en: SimPin { line: Line::En, recorder: recorder.clone() },
        rs: SimPin { line: Line::Rs, recorder: recorder.clone() },
        bus: PortBus::new(SimPort(recorder.clone())),
    };
    let delay = SimDelay(recorder.clone());
    (recorder, pins, delay)
}

/// One nybble as the controller sees it on the falling edge of EN.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Latched {
    pub data: bool,
    pub nybble: u8,
    /// Total wait until the next latch, in nanoseconds.
    pub wait: u64,
}

pub fn latches(events: &[Event]) -> Vec<Latched> {
    let mut out: Vec<Latched> = Vec::new();
    let (mut rs, mut en, mut port) = (false, false, 0u8);
    for event in events {
        match *event {
            Event::Rs(v) => rs = v,
            Event::Port(v) => port = v,
            Event::En(v) => {
                if en && !v {
                    out.push(Latched { data: rs, nybble: (port >> SHIFT) & 0x0F, wait: 0 });
                }
                en = v;
            }
            Event::Delay(ns) => {
                if let Some(last) = out.last_mut() {
                    last.wait += ns;
                }
            }
        }
    }
    out
}

/// Pairs latched nybbles into `(RS, byte)`, high nybble first.
pub fn bytes(latched: &[Latched]) -> Vec<(bool, u8)> {
    assert_eq!(latched.len() % 2, 0, "odd number of nybbles");
    latched
        .chunks_exact(2)
        .map(|pair| {
            assert_eq!(pair[0].data, pair[1].data, "RS changed inside a byte");
            (pair[0].data, pair[0].nybble << 4 | pair[1].nybble)
        })
        .collect()
}

/// Every RS level written, in order.
pub fn rs_writes(events: &[Event]) -> Vec<bool> {
    events
        .iter()
        .filter_map(|event| match *event {
            Event::Rs(v) => Some(v),
            _ => None,
        })
        .collect()
}

use core::cmp::max;

use crate::{DisplayControl, EntryMode, IncrementMode, Lines};

/// DDRAM addresses per row on 16x2 / 20x4 modules.
pub const DEFAULT_ROW_SPAN: u8 = 40;

/// Wait times in microseconds.
///
/// These are minimums taken from the HD44780 datasheet. Slow or compatible controllers
/// (eg. ks0066) may need longer values, shorter values are raised back to the datasheet ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    /// After power on, before the first nybble.
    pub power_on: u32,
    /// After each of the first two wake up nybbles.
    pub mode_switch: u32,
    /// After the third wake up nybble, before switching to 4-bit.
    pub mode_switch_final: u32,
    /// After every enable pulse.
    pub send: u32,
    /// After return home.
    pub command: u32,
    /// After clear display.
    pub clear: u32,
}

impl Timing {
    pub const DATASHEET: Self = Self {
        power_on: 15_000,
        mode_switch: 4_100,
        mode_switch_final: 100,
        send: 50,
        command: 1_520,
        clear: 2_000,
    };

    /// Every field raised to at least its [`Timing::DATASHEET`] value.
    pub fn at_least_datasheet(self) -> Self {
        let min = Self::DATASHEET;
        Self {
            power_on: max(self.power_on, min.power_on),
            mode_switch: max(self.mode_switch, min.mode_switch),
            mode_switch_final: max(self.mode_switch_final, min.mode_switch_final),
            send: max(self.send, min.send),
            command: max(self.command, min.command),
            clear: max(self.clear, min.clear),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::DATASHEET
    }
}

/// Everything [`init`](crate::blocking::Lcd::init) sends, plus the timing and row layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LcdConfig {
    pub timing: Timing,
    pub lines: Lines,
    pub display: DisplayControl,
    pub entry: EntryMode,
    /// How many cursor shifts `cursor_down` issues to reach the next row.
    pub row_span: u8,
}

impl LcdConfig {
    /// Two lines, display, cursor and blink on, cursor moving right without scrolling.
    pub const fn new() -> Self {
        Self {
            timing: Timing::DATASHEET,
            lines: Lines::TwoLines,
            display: DisplayControl::new(true, true, true),
            entry: EntryMode::new(IncrementMode::Incremental, false),
            row_span: DEFAULT_ROW_SPAN,
        }
    }
}

impl Default for LcdConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_timings_are_raised_to_datasheet() {
        let timing = Timing {
            power_on: 0,
            mode_switch: 10,
            mode_switch_final: 0,
            send: 1,
            command: 0,
            clear: 0,
        };
        assert_eq!(timing.at_least_datasheet(), Timing::DATASHEET);
    }

    #[test]
    fn long_timings_are_kept() {
        let timing = Timing {
            power_on: 50_000,
            clear: 5_000,
            ..Timing::DATASHEET
        };
        let clamped = timing.at_least_datasheet();
        assert_eq!(clamped.power_on, 50_000);
        assert_eq!(clamped.clear, 5_000);
        assert_eq!(clamped.send, Timing::DATASHEET.send);
    }

    #[test]
    fn datasheet_ordering_holds() {
        let t = Timing::DATASHEET;
        assert!(t.mode_switch >= t.mode_switch_final);
        assert!(t.clear >= t.command);
    }

    #[test]
    fn default_config_matches_two_line_cursor_blink_setup() {
        let config = LcdConfig::default();
        assert_eq!(config.lines, Lines::TwoLines);
        assert_eq!(config.display.bits(), 0b111);
        assert_eq!(config.entry.bits(), 0b010);
        assert_eq!(config.row_span, 40);
    }
}

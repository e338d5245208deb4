//! What goes on the two LCD rows.
//!
//! Six views over the latest measurement, selected by hand or rotated every
//! couple of seconds. Rendering produces plain text rows; getting them onto
//! glass is up to a [`CharDisplay`].

use ufmt::uwrite;

use crate::config::{AUTO_CYCLE_INTERVAL_MS, LCD_COLUMNS, REFERENCE_MILLIVOLTS};
use crate::mapping::{map_range, FrequencyRange};
use crate::monitor::Measurement;
use crate::telemetry::Fixed;

pub const NUM_DISPLAYS: usize = 6;

/// One LCD row.
pub type Line = heapless::String<LCD_COLUMNS>;

pub const BANNER: &str = "Signal Monitor  Initializing...";
pub const READ_ERROR: &str = "ADC read error  check wiring";
pub const NOT_FOUND: &str = "ADC not found!  System halted";
pub const CALIBRATING: &str = "Calibrating...  Enter ref mV";

const BAR_CELL: char = '#';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayMode {
    RawSample,
    VoltageVolts,
    VoltageMillivolts,
    Frequency,
    VoltageBar,
    FrequencyBar,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; NUM_DISPLAYS] = [
        DisplayMode::RawSample,
        DisplayMode::VoltageVolts,
        DisplayMode::VoltageMillivolts,
        DisplayMode::Frequency,
        DisplayMode::VoltageBar,
        DisplayMode::FrequencyBar,
    ];

    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % NUM_DISPLAYS]
    }

    pub fn name(self) -> &'static str {
        match self {
            DisplayMode::RawSample => "raw",
            DisplayMode::VoltageVolts => "volts",
            DisplayMode::VoltageMillivolts => "millivolts",
            DisplayMode::Frequency => "frequency",
            DisplayMode::VoltageBar => "voltage bar",
            DisplayMode::FrequencyBar => "frequency bar",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayIndexError;

impl ufmt::uDisplay for DisplayIndexError {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        uwrite!(f, "display index must be 0 to {}", NUM_DISPLAYS - 1)
    }
}

/// Selected view and the auto-cycle timer.
///
/// Picking a view by hand switches auto-cycling off, so only one of the two
/// decides the view at any time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayState {
    mode: DisplayMode,
    auto_cycle: bool,
    last_rotation_ms: u32,
    interval_ms: u32,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self::new(AUTO_CYCLE_INTERVAL_MS)
    }
}

impl DisplayState {
    pub fn new(interval_ms: u32) -> Self {
        Self {
            mode: DisplayMode::RawSample,
            auto_cycle: false,
            last_rotation_ms: 0,
            interval_ms,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn auto_cycle(&self) -> bool {
        self.auto_cycle
    }

    pub fn select(&mut self, index: i32) -> Result<DisplayMode, DisplayIndexError> {
        let mode = DisplayMode::from_index(index).ok_or(DisplayIndexError)?;
        self.mode = mode;
        self.auto_cycle = false;
        Ok(mode)
    }

    /// Flip auto-cycling. Switching it on restarts the interval at `now_ms`,
    /// so the first rotation comes one full interval later.
    pub fn toggle_auto_cycle(&mut self, now_ms: u32) -> bool {
        self.auto_cycle = !self.auto_cycle;
        if self.auto_cycle {
            self.last_rotation_ms = now_ms;
        }
        self.auto_cycle
    }

    /// Advance to the next view once the interval has passed.
    pub fn tick(&mut self, now_ms: u32) {
        if !self.auto_cycle || now_ms.wrapping_sub(self.last_rotation_ms) < self.interval_ms {
            return;
        }
        self.mode = self.mode.next();
        self.last_rotation_ms = now_ms;
    }
}

/// Split a message at the display width, dropping anything past two rows.
pub fn split_message(msg: &str) -> (Line, Line) {
    let mut top = Line::new();
    let mut bottom = Line::new();
    let mut chars = msg.chars();
    for c in chars.by_ref().take(LCD_COLUMNS) {
        top.push(c).ok();
    }
    for c in chars.take(LCD_COLUMNS) {
        bottom.push(c).ok();
    }
    (top, bottom)
}

fn line(s: &str) -> Line {
    let mut l = Line::new();
    l.push_str(s).ok();
    l
}

/// `cells` filled cells; anything past the row width is lost.
fn bar(cells: i32) -> Line {
    let mut l = Line::new();
    for _ in 0..cells.max(0) {
        if l.push(BAR_CELL).is_err() {
            break;
        }
    }
    l
}

/// Rows for `mode`. Write errors only mean the row was full.
pub fn render_view(mode: DisplayMode, m: &Measurement, range: FrequencyRange) -> (Line, Line) {
    let mut top = Line::new();
    let mut bottom = Line::new();
    match mode {
        DisplayMode::RawSample => {
            top = line("ADC Value:");
            uwrite!(&mut bottom, "{}", m.sample).ok();
        }
        DisplayMode::VoltageVolts => {
            top = line("Voltage:");
            uwrite!(&mut bottom, "{} V", Fixed::new(m.voltage, 4)).ok();
        }
        DisplayMode::VoltageMillivolts => {
            top = line("Voltage (mV):");
            uwrite!(&mut bottom, "{} mV", Fixed::new(m.voltage * 1000.0, 2)).ok();
        }
        DisplayMode::Frequency => {
            top = line("Frequency:");
            uwrite!(&mut bottom, "{} Hz", m.frequency).ok();
        }
        DisplayMode::VoltageBar => {
            uwrite!(&mut top, "V: {} V", Fixed::new(m.voltage, 2)).ok();
            let mv = (m.voltage * 1000.0) as i32;
            bottom = bar(map_range(mv, 0, REFERENCE_MILLIVOLTS as i32, 0, LCD_COLUMNS as i32));
        }
        DisplayMode::FrequencyBar => {
            uwrite!(&mut top, "F: {} Hz", m.frequency).ok();
            bottom = bar(map_range(
                m.frequency,
                range.min(),
                range.max(),
                0,
                LCD_COLUMNS as i32,
            ));
        }
    }
    (top, bottom)
}

/// A two row character surface.
pub trait CharDisplay {
    type Error;

    /// Replace both rows.
    fn render(&mut self, top: &str, bottom: &str) -> Result<(), Self::Error>;

    /// Show a message longer than one row, wrapped at the display width.
    fn show_message(&mut self, msg: &str) -> Result<(), Self::Error> {
        let (top, bottom) = split_message(msg);
        self.render(&top, &bottom)
    }

    fn blank(&mut self) -> Result<(), Self::Error> {
        self.render("", "")
    }
}

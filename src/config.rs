//! Fixed parameters of the board and the runtime settings the serial
//! commands are allowed to change.

use crate::mapping::{FrequencyRange, RangeError};

/// PCF8591 with A0..A2 tied low.
pub const ADC_ADDRESS: u8 = 0x48;
pub const ADC_CHANNEL: u8 = 0;

/// PCF8574 LCD backpack, the common 0x27 variant.
pub const LCD_ADDRESS: u8 = 0x27;
pub const LCD_COLUMNS: usize = 16;
pub const LCD_ROWS: usize = 2;

pub const SERIAL_BAUD: u32 = 57600;
/// Longest accepted command line, without the terminator.
pub const LINE_CAPACITY: usize = 32;

/// Full scale of the converter.
pub const SAMPLE_MAX: u8 = 255;
pub const REFERENCE_VOLTS: f32 = 3.3;
pub const REFERENCE_MILLIVOLTS: f32 = 3300.0;

pub const DEFAULT_MIN_FREQUENCY: i32 = 50;
pub const DEFAULT_MAX_FREQUENCY: i32 = 1400;

/// Moving average window, in samples.
pub const SMOOTHING_WINDOW: usize = 10;

pub const CYCLE_DELAY_MS: u32 = 200;
pub const AUTO_CYCLE_INTERVAL_MS: u32 = 2000;
pub const BANNER_MS: u32 = 3000;
pub const CALIBRATION_TIMEOUT_MS: u32 = 30_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Toggles {
    pub lcd: bool,
    pub tone: bool,
    pub smoothing: bool,
}

impl Default for Toggles {
    fn default() -> Self {
        Self {
            lcd: true,
            tone: false,
            smoothing: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GainError;

impl ufmt::uDisplay for GainError {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        f.write_str("gain must be greater than 0")
    }
}

/// Everything the control loop computes with, apart from the display
/// state machine and the smoothing history.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Settings {
    range: FrequencyRange,
    gain: f32,
    calibration_scale: f32,
    pub toggles: Toggles,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            range: FrequencyRange::DEFAULT,
            gain: 1.0,
            calibration_scale: 1.0,
            toggles: Toggles::default(),
        }
    }
}

impl Settings {
    pub fn range(&self) -> FrequencyRange {
        self.range
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn calibration_scale(&self) -> f32 {
        self.calibration_scale
    }

    /// Replace the frequency band. A rejected band leaves the old one in place.
    pub fn set_range(&mut self, min: i32, max: i32) -> Result<FrequencyRange, RangeError> {
        self.range = FrequencyRange::new(min, max)?;
        Ok(self.range)
    }

    /// NaN is rejected along with everything not strictly positive.
    pub fn set_gain(&mut self, gain: f32) -> Result<f32, GainError> {
        if !(gain.is_finite() && gain > 0.0) {
            return Err(GainError);
        }
        self.gain = gain;
        Ok(gain)
    }

    /// Only the calibration stage produces scales, and it validates them.
    pub(crate) fn set_calibration_scale(&mut self, scale: f32) {
        self.calibration_scale = scale;
    }
}

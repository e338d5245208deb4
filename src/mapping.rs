//! Linear range mapping with integer truncation.

use crate::config::{DEFAULT_MAX_FREQUENCY, DEFAULT_MIN_FREQUENCY, SAMPLE_MAX};

/// Re-map `x` from `[in_min, in_max]` onto `[out_min, out_max]`.
///
/// The arithmetic is integer and truncates toward zero, so the result is
/// only exact at the two ends of the input range. Inputs outside the input
/// range are extrapolated, not clamped. A degenerate input range maps
/// everything to `out_min`.
pub fn map_range(x: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    let span = in_max as i64 - in_min as i64;
    if span == 0 {
        return out_min;
    }
    let scaled = (x as i64 - in_min as i64) * (out_max as i64 - out_min as i64) / span;
    (scaled + out_min as i64) as i32
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeError {
    /// The lower bound must be above zero.
    MinNotPositive,
    /// The upper bound must be above the lower one.
    MaxNotAboveMin,
}

impl ufmt::uDisplay for RangeError {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        match self {
            RangeError::MinNotPositive => f.write_str("min frequency must be greater than 0"),
            RangeError::MaxNotAboveMin => f.write_str("max frequency must be greater than min"),
        }
    }
}

/// Output band of the mapper, in Hz. Always `0 < min < max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrequencyRange {
    min: i32,
    max: i32,
}

impl Default for FrequencyRange {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FrequencyRange {
    pub const DEFAULT: FrequencyRange = FrequencyRange {
        min: DEFAULT_MIN_FREQUENCY,
        max: DEFAULT_MAX_FREQUENCY,
    };

    pub fn new(min: i32, max: i32) -> Result<Self, RangeError> {
        if min <= 0 {
            return Err(RangeError::MinNotPositive);
        }
        if max <= min {
            return Err(RangeError::MaxNotAboveMin);
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    /// Frequency for a converter reading, `0 -> min` and `255 -> max`.
    pub fn map_sample(&self, sample: u8) -> i32 {
        map_range(sample as i32, 0, SAMPLE_MAX as i32, self.min, self.max)
    }
}

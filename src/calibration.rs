//! Raw sample to volts, and the operator driven calibration of the scale.

use crate::config::{REFERENCE_MILLIVOLTS, REFERENCE_VOLTS, SAMPLE_MAX};

/// `(sample / 255) * 3.3 V * scale * gain`
pub fn compute_voltage(sample: u8, calibration_scale: f32, gain: f32) -> f32 {
    (sample as f32 / SAMPLE_MAX as f32) * REFERENCE_VOLTS * calibration_scale * gain
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationError {
    /// Nothing has been read from the converter yet.
    NoSample,
    /// The last reading was zero, so it cannot be scaled to the reference.
    ZeroSample,
    /// The reference must be a positive number of millivolts.
    InvalidReference,
    /// The operator did not answer in time.
    TimedOut,
}

impl ufmt::uDisplay for CalibrationError {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        match self {
            CalibrationError::NoSample => f.write_str("no sample to calibrate against"),
            CalibrationError::ZeroSample => f.write_str("cannot calibrate against a zero reading"),
            CalibrationError::InvalidReference => {
                f.write_str("reference must be a positive number of mV")
            }
            CalibrationError::TimedOut => f.write_str("calibration timed out"),
        }
    }
}

/// Scale that makes `last_sample` read as `reference_mv`.
pub fn calibration_scale(reference_mv: f32, last_sample: Option<u8>) -> Result<f32, CalibrationError> {
    if !(reference_mv.is_finite() && reference_mv > 0.0) {
        return Err(CalibrationError::InvalidReference);
    }
    let sample = last_sample.ok_or(CalibrationError::NoSample)?;
    if sample == 0 {
        return Err(CalibrationError::ZeroSample);
    }
    let measured_mv = (sample as f32 / SAMPLE_MAX as f32) * REFERENCE_MILLIVOLTS;
    Ok(reference_mv / measured_mv)
}

/// What the operator typed while a calibration was pending.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CalibrationInput {
    Reference(f32),
    Cancel,
}

impl CalibrationInput {
    pub fn parse(line: &str) -> Result<Self, CalibrationError> {
        let line = line.trim();
        if line.eq_ignore_ascii_case("cancel") {
            return Ok(CalibrationInput::Cancel);
        }
        line.parse::<f32>()
            .map(CalibrationInput::Reference)
            .map_err(|_| CalibrationError::InvalidReference)
    }
}

/// A pending calibration. The loop keeps running while one exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalibrationSession {
    started_ms: u32,
    timeout_ms: u32,
}

impl CalibrationSession {
    pub fn new(started_ms: u32, timeout_ms: u32) -> Self {
        Self {
            started_ms,
            timeout_ms,
        }
    }

    /// Survives wraparound of the millisecond counter.
    pub fn expired(&self, now_ms: u32) -> bool {
        now_ms.wrapping_sub(self.started_ms) >= self.timeout_ms
    }
}

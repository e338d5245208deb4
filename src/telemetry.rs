//! The per-cycle acquisition line, plus decimal printing for ufmt.
//!
//! ufmt has no float support. [`Fixed`] prints through integer arithmetic
//! instead, rounding half away from zero at the last requested digit.

use ufmt::{uDisplay, uWrite, Formatter};

/// `value` printed with `decimals` digits after the point.
#[derive(Clone, Copy, Debug)]
pub struct Fixed {
    pub value: f32,
    pub decimals: u8,
}

impl Fixed {
    pub fn new(value: f32, decimals: u8) -> Self {
        Self { value, decimals }
    }
}

const POW10: [u64; 7] = [1, 10, 100, 1_000, 10_000, 100_000, 1_000_000];

impl uDisplay for Fixed {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        let v = self.value;
        if v.is_nan() {
            return f.write_str("nan");
        }
        if v.is_infinite() {
            return f.write_str(if v < 0.0 { "-inf" } else { "inf" });
        }

        let decimals = (self.decimals as usize).min(POW10.len() - 1);
        let scale = POW10[decimals];
        let magnitude = if v < 0.0 { -v } else { v };
        // f32 -> u64 saturates on overflow
        let scaled = (magnitude * scale as f32 + 0.5) as u64;
        if v < 0.0 && scaled != 0 {
            f.write_str("-")?;
        }

        uDisplay::fmt(&(scaled / scale), f)?;
        if decimals == 0 {
            return Ok(());
        }
        f.write_str(".")?;
        let frac = scaled % scale;
        for pad in (1..decimals).rev() {
            if frac < POW10[pad] {
                f.write_str("0")?;
            }
        }
        uDisplay::fmt(&frac, f)
    }
}

/// One successful acquisition, as written to the serial port.
///
/// `ADC:<int>,Voltage:<4dp>,Voltage_mV:<2dp>,Frequency:<int>`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Telemetry {
    pub sample: u8,
    pub voltage: f32,
    pub frequency: i32,
}

impl uDisplay for Telemetry {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        ufmt::uwrite!(
            f,
            "ADC:{},Voltage:{},Voltage_mV:{},Frequency:{}",
            self.sample,
            Fixed::new(self.voltage, 4),
            Fixed::new(self.voltage * 1000.0, 2),
            self.frequency
        )
    }
}

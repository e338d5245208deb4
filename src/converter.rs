//! Access to the analog-to-digital converter on the I2C bus.

use embedded_hal::i2c::{Error as _, ErrorKind, I2c};

use crate::config::ADC_ADDRESS;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConverterError {
    /// The bus transaction failed.
    Bus(ErrorKind),
    /// The chip answered with something that is not a sample.
    InvalidData,
}

impl ufmt::uDisplay for ConverterError {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        match self {
            ConverterError::Bus(ErrorKind::NoAcknowledge(_)) => f.write_str("converter not responding"),
            ConverterError::Bus(ErrorKind::ArbitrationLoss) => f.write_str("bus arbitration lost"),
            ConverterError::Bus(_) => f.write_str("bus error"),
            ConverterError::InvalidData => f.write_str("invalid converter data"),
        }
    }
}

/// One reading per call, `0..=255`.
pub trait Converter {
    /// Check that the chip is present on the bus.
    fn probe(&mut self) -> Result<(), ConverterError>;

    fn read(&mut self, channel: u8) -> Result<u8, ConverterError>;
}

impl<C: Converter + ?Sized> Converter for &mut C {
    fn probe(&mut self) -> Result<(), ConverterError> {
        (**self).probe()
    }

    fn read(&mut self, channel: u8) -> Result<u8, ConverterError> {
        (**self).read(channel)
    }
}

/// Analog output enable. Keeping the DAC running keeps the internal
/// oscillator on, which shortens conversion.
const PCF8591_OUTPUT_ENABLE: u8 = 0x40;
const PCF8591_CHANNEL_MASK: u8 = 0x03;

/// NXP PCF8591, 4 channel 8-bit ADC.
pub struct Pcf8591<I2C> {
    i2c: I2C,
    addr: u8,
    channel: u8,
}

impl<I2C: I2c> Pcf8591<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, ADC_ADDRESS)
    }

    pub fn with_address(i2c: I2C, addr: u8) -> Self {
        Self { i2c, addr, channel: 0 }
    }

    fn control(channel: u8) -> u8 {
        PCF8591_OUTPUT_ENABLE | (channel & PCF8591_CHANNEL_MASK)
    }
}

impl<I2C: I2c> Converter for Pcf8591<I2C> {
    fn probe(&mut self) -> Result<(), ConverterError> {
        self.i2c
            .write(self.addr, &[Self::control(self.channel)])
            .map_err(|e| ConverterError::Bus(e.kind()))
    }

    fn read(&mut self, channel: u8) -> Result<u8, ConverterError> {
        let control = Self::control(channel);
        self.i2c
            .write(self.addr, &[control])
            .map_err(|e| ConverterError::Bus(e.kind()))?;
        self.channel = channel & PCF8591_CHANNEL_MASK;

        // first byte is the result of the previous conversion
        let mut buf = [0u8; 2];
        self.i2c
            .read(self.addr, &mut buf)
            .map_err(|e| ConverterError::Bus(e.kind()))?;
        Ok(buf[1])
    }
}

#[cfg(feature = "ads1015")]
pub use self::ads::Ads1015;

#[cfg(feature = "ads1015")]
mod ads {
    use ads1x1x::{
        channel, ic, mode, Ads1x1x, Error as AdsError, FullScaleRange, TargetAddr,
    };
    use embedded_hal::i2c::I2c;
    use nb::block;

    use super::{Converter, ConverterError};

    type Device<I2C> = Ads1x1x<I2C, ic::Ads1015, ic::Resolution12Bit, mode::OneShot>;

    /// TI ADS1015 read single ended, reduced to the 8-bit sample range.
    pub struct Ads1015<I2C> {
        adc: Device<I2C>,
    }

    fn bus_error<E: embedded_hal::i2c::Error>(e: AdsError<E>) -> ConverterError {
        match e {
            AdsError::I2C(e) => ConverterError::Bus(e.kind()),
            _ => ConverterError::InvalidData,
        }
    }

    /// 12-bit signed result to 0..=255, negative readings clamp to zero.
    pub(super) fn reduce(raw: i16) -> u8 {
        let positive = raw.max(0) as u16 >> 3;
        positive.min(u8::MAX as u16) as u8
    }

    impl<I2C: I2c> Ads1015<I2C> {
        pub fn new(i2c: I2C) -> Self {
            Self {
                adc: Ads1x1x::new_ads1015(i2c, TargetAddr::default()),
            }
        }
    }

    impl<I2C: I2c> Converter for Ads1015<I2C> {
        fn probe(&mut self) -> Result<(), ConverterError> {
            self.adc
                .set_full_scale_range(FullScaleRange::Within4_096V)
                .map_err(bus_error)
        }

        fn read(&mut self, ch: u8) -> Result<u8, ConverterError> {
            let raw = match ch {
                0 => block!(self.adc.read(channel::SingleA0)),
                1 => block!(self.adc.read(channel::SingleA1)),
                2 => block!(self.adc.read(channel::SingleA2)),
                _ => block!(self.adc.read(channel::SingleA3)),
            }
            .map_err(bus_error)?;
            Ok(reduce(raw))
        }
    }

}

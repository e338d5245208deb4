//! Single channel sampling and display loop.
//!
//! An 8-bit converter on the I2C bus is read every cycle, the reading is
//! optionally smoothed, scaled into volts and mapped into a frequency band.
//! The result drives a tone output, a 16x2 character LCD and a telemetry line
//! on the serial port, while one-line serial commands reconfigure the loop.

#![cfg_attr(not(test), no_std)]

pub mod calibration;
pub mod command;
pub mod config;
pub mod converter;
pub mod display;
pub mod lcd;
pub mod line;
pub mod mapping;
pub mod monitor;
pub mod schedule;
pub mod smoothing;
pub mod telemetry;
pub mod tone;

pub use command::{Command, CommandError};
pub use config::{Settings, Toggles};
pub use converter::{Converter, ConverterError, Pcf8591};
pub use display::{CharDisplay, DisplayMode, DisplayState};
pub use mapping::FrequencyRange;
pub use monitor::{CycleReport, Measurement, Monitor, StartupError};
pub use schedule::{Clock, Pacing};
pub use tone::ToneOutput;

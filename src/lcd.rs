//! HD44780 16x2 LCD behind a PCF8574 I2C backpack, driven in 4-bit mode.
//!
//! Backpack wiring: P0 = RS, P1 = RW, P2 = EN, P3 = backlight, P4..P7 = D4..D7.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::config::{LCD_ADDRESS, LCD_COLUMNS};
use crate::display::CharDisplay;

const RS: u8 = 0x01;
const EN: u8 = 0x04;
const BACKLIGHT: u8 = 0x08;

const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_MODE: u8 = 0x06; // increment, no shift
const CMD_DISPLAY_ON: u8 = 0x0C; // cursor and blink off
const CMD_FUNCTION_SET: u8 = 0x28; // 4-bit, 2 lines, 5x8
const CMD_SET_DDRAM: u8 = 0x80;

const ROW_OFFSETS: [u8; 2] = [0x00, 0x40];

pub struct Lcd<I2C, D> {
    i2c: I2C,
    delay: D,
    addr: u8,
    backlight: u8,
}

impl<I2C: I2c, D: DelayNs> Lcd<I2C, D> {
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self::with_address(i2c, delay, LCD_ADDRESS)
    }

    pub fn with_address(i2c: I2C, delay: D, addr: u8) -> Self {
        Self {
            i2c,
            delay,
            addr,
            backlight: BACKLIGHT,
        }
    }

    /// Power-on reset sequence into 4-bit mode, then clear.
    pub fn init(&mut self) -> Result<(), I2C::Error> {
        self.delay.delay_ms(50);
        self.i2c.write(self.addr, &[self.backlight])?;
        for _ in 0..3 {
            self.write4(0x30)?;
            self.delay.delay_ms(5);
        }
        self.write4(0x20)?;

        self.command(CMD_FUNCTION_SET)?;
        self.command(CMD_DISPLAY_ON)?;
        self.command(CMD_ENTRY_MODE)?;
        self.clear()
    }

    pub fn clear(&mut self) -> Result<(), I2C::Error> {
        self.command(CMD_CLEAR)?;
        self.delay.delay_ms(2);
        Ok(())
    }

    pub fn set_cursor(&mut self, row: u8, col: u8) -> Result<(), I2C::Error> {
        let offset = ROW_OFFSETS[row as usize % ROW_OFFSETS.len()];
        self.command(CMD_SET_DDRAM | (offset + col))
    }

    pub fn write_str(&mut self, s: &str) -> Result<(), I2C::Error> {
        for b in s.bytes() {
            self.send(b, true)?;
        }
        Ok(())
    }

    pub fn command(&mut self, cmd: u8) -> Result<(), I2C::Error> {
        self.send(cmd, false)
    }

    fn send(&mut self, data: u8, rs: bool) -> Result<(), I2C::Error> {
        let rs = if rs { RS } else { 0 };
        self.write4((data & 0xF0) | rs)?;
        self.write4(((data << 4) & 0xF0) | rs)
    }

    fn write4(&mut self, nibble: u8) -> Result<(), I2C::Error> {
        self.i2c.write(self.addr, &[nibble | self.backlight | EN])?;
        self.delay.delay_us(1);
        self.i2c.write(self.addr, &[nibble | self.backlight])?;
        self.delay.delay_us(50);
        Ok(())
    }

    /// Write `text` and fill the rest of the row with blanks.
    fn write_row(&mut self, row: u8, text: &str) -> Result<(), I2C::Error> {
        self.set_cursor(row, 0)?;
        let mut written = 0;
        for b in text.bytes().take(LCD_COLUMNS) {
            self.send(b, true)?;
            written += 1;
        }
        for _ in written..LCD_COLUMNS {
            self.send(b' ', true)?;
        }
        Ok(())
    }
}

impl<I2C: I2c, D: DelayNs> CharDisplay for Lcd<I2C, D> {
    type Error = I2C::Error;

    fn render(&mut self, top: &str, bottom: &str) -> Result<(), Self::Error> {
        self.write_row(0, top)?;
        self.write_row(1, bottom)
    }
}

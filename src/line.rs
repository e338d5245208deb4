//! Command lines from the serial port.

use embedded_hal_nb::serial::{Error as _, ErrorKind, Read};

use crate::config::LINE_CAPACITY;

pub type CommandLine = heapless::String<LINE_CAPACITY>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineError {
    /// The line did not fit and was thrown away.
    Overflow,
    NotUtf8,
    Serial(ErrorKind),
}

impl ufmt::uDisplay for LineError {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        match self {
            LineError::Overflow => f.write_str("command line too long"),
            LineError::NotUtf8 => f.write_str("command line is not text"),
            LineError::Serial(ErrorKind::Overrun) => f.write_str("serial overrun"),
            LineError::Serial(_) => f.write_str("serial receive error"),
        }
    }
}

/// Yields at most one complete line per call, never blocks.
pub trait LineSource {
    fn poll_line(&mut self) -> Option<Result<CommandLine, LineError>>;
}

/// Assembles newline terminated lines from a byte reader.
///
/// Reading stops at the first newline, so further lines stay queued in the
/// receiver until the next poll. `\r` is dropped.
pub struct LineReader<R> {
    rx: R,
    buf: heapless::Vec<u8, LINE_CAPACITY>,
    overflowed: bool,
}

impl<R: Read<u8>> LineReader<R> {
    pub fn new(rx: R) -> Self {
        Self {
            rx,
            buf: heapless::Vec::new(),
            overflowed: false,
        }
    }

    fn finish(&mut self) -> Result<CommandLine, LineError> {
        let overflowed = core::mem::replace(&mut self.overflowed, false);
        let result = if overflowed {
            Err(LineError::Overflow)
        } else {
            core::str::from_utf8(&self.buf)
                .map_err(|_| LineError::NotUtf8)
                .map(|s| {
                    let mut line = CommandLine::new();
                    // buffer and line have the same capacity
                    line.push_str(s).ok();
                    line
                })
        };
        self.buf.clear();
        result
    }
}

impl<R: Read<u8>> LineSource for LineReader<R> {
    fn poll_line(&mut self) -> Option<Result<CommandLine, LineError>> {
        loop {
            match self.rx.read() {
                Ok(b'\n') => return Some(self.finish()),
                Ok(b'\r') => {}
                Ok(b) => {
                    if self.buf.push(b).is_err() {
                        self.overflowed = true;
                    }
                }
                Err(nb::Error::WouldBlock) => return None,
                Err(nb::Error::Other(e)) => {
                    self.buf.clear();
                    self.overflowed = false;
                    return Some(Err(LineError::Serial(e.kind())));
                }
            }
        }
    }
}

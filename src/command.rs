//! One-line serial commands.
//!
//! Parsing only checks syntax. Whether a value is acceptable is decided by
//! the setter that applies it, so a rejected command never half-applies.

use ufmt::{uDisplay, uWrite, Formatter};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// `setRange <min>,<max>`
    SetRange { min: i32, max: i32 },
    /// `setGain <g>`
    SetGain(f32),
    ToggleLcd,
    ToggleLowpass,
    ToggleTone,
    Calibrate,
    AutoCycle,
    /// `display <i>`
    Display(i32),
    Cancel,
    Status,
    Help,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandError {
    Unknown,
    /// The command exists but its argument could not be read.
    BadArgument(&'static str),
}

impl uDisplay for CommandError {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        match self {
            CommandError::Unknown => f.write_str("unknown command, try help"),
            CommandError::BadArgument(usage) => {
                f.write_str("usage: ")?;
                f.write_str(usage)
            }
        }
    }
}

const USAGE_RANGE: &str = "setRange <min>,<max>";
const USAGE_GAIN: &str = "setGain <gain>";
const USAGE_DISPLAY: &str = "display <0-5>";

pub const HELP: &str = "setRange <min>,<max> | setGain <g> | toggleLCD | toggleLowpass | \
toggleTone | calibrate | cancel | autoCycle | display <0-5> | status | help";

impl Command {
    /// Parse a trimmed line. Keywords are case sensitive.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let (keyword, arg) = match line.split_once(char::is_whitespace) {
            Some((k, a)) => (k, a.trim()),
            None => (line, ""),
        };

        match keyword {
            "setRange" => {
                let (min, max) = arg
                    .split_once(',')
                    .ok_or(CommandError::BadArgument(USAGE_RANGE))?;
                let min = min.trim().parse().map_err(|_| CommandError::BadArgument(USAGE_RANGE))?;
                let max = max.trim().parse().map_err(|_| CommandError::BadArgument(USAGE_RANGE))?;
                Ok(Command::SetRange { min, max })
            }
            "setGain" => arg
                .parse()
                .map(Command::SetGain)
                .map_err(|_| CommandError::BadArgument(USAGE_GAIN)),
            "display" => arg
                .parse()
                .map(Command::Display)
                .map_err(|_| CommandError::BadArgument(USAGE_DISPLAY)),
            _ if !arg.is_empty() => Err(CommandError::Unknown),
            "toggleLCD" => Ok(Command::ToggleLcd),
            "toggleLowpass" => Ok(Command::ToggleLowpass),
            "toggleTone" => Ok(Command::ToggleTone),
            "calibrate" => Ok(Command::Calibrate),
            "autoCycle" => Ok(Command::AutoCycle),
            "cancel" => Ok(Command::Cancel),
            "status" => Ok(Command::Status),
            "help" => Ok(Command::Help),
            _ => Err(CommandError::Unknown),
        }
    }
}

//! Square wave tone output.

/// Something that can play a tone.
pub trait ToneOutput {
    /// Start or retune the tone. Frequencies the hardware cannot produce
    /// silence it instead.
    fn play(&mut self, hz: u32);

    fn stop(&mut self);
}

impl<T: ToneOutput + ?Sized> ToneOutput for &mut T {
    fn play(&mut self, hz: u32) {
        (**self).play(hz)
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

/// Clock select of a 16-bit AVR timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prescaler {
    Direct,
    Div8,
    Div64,
    Div256,
    Div1024,
}

impl Prescaler {
    const ALL: [Prescaler; 5] = [
        Prescaler::Direct,
        Prescaler::Div8,
        Prescaler::Div64,
        Prescaler::Div256,
        Prescaler::Div1024,
    ];

    pub fn divisor(self) -> u32 {
        match self {
            Prescaler::Direct => 1,
            Prescaler::Div8 => 8,
            Prescaler::Div64 => 64,
            Prescaler::Div256 => 256,
            Prescaler::Div1024 => 1024,
        }
    }
}

/// Timer setup for CTC mode with the compare output toggling each match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerSetting {
    pub prescaler: Prescaler,
    pub top: u16,
}

/// Pick the finest prescaler whose compare value fits 16 bits.
///
/// Output frequency is `cpu_hz / (2 * divisor * (top + 1))`.
pub fn timer_setting(hz: u32, cpu_hz: u32) -> Option<TimerSetting> {
    if hz == 0 {
        return None;
    }
    Prescaler::ALL.iter().find_map(|&prescaler| {
        let ticks = cpu_hz as u64 / (2 * prescaler.divisor() as u64 * hz as u64);
        if ticks == 0 {
            return None;
        }
        u16::try_from(ticks - 1)
            .ok()
            .map(|top| TimerSetting { prescaler, top })
    })
}

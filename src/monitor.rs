//! The control loop.
//!
//! [`Monitor`] owns every piece of mutable state and the four collaborators
//! (converter, display, tone, serial sink). One [`Monitor::cycle`] call is one
//! pass of the loop: take at most one command line, sample, smooth, scale,
//! map, then drive the tone, the LCD and the telemetry line. Nothing in here
//! blocks; a pending calibration is a state of the loop, not a wait.

use embedded_hal::delay::DelayNs;
use ufmt::{uDisplay, uWrite, uwrite};

use crate::calibration::{
    calibration_scale, compute_voltage, CalibrationError, CalibrationInput, CalibrationSession,
};
use crate::command::{Command, HELP};
use crate::config::{
    Settings, ADC_CHANNEL, BANNER_MS, CALIBRATION_TIMEOUT_MS, SMOOTHING_WINDOW,
};
use crate::converter::{Converter, ConverterError};
use crate::display::{
    render_view, CharDisplay, DisplayState, BANNER, CALIBRATING, NOT_FOUND, READ_ERROR,
};
use crate::line::LineSource;
use crate::smoothing::MovingAverage;
use crate::telemetry::{Fixed, Telemetry};
use crate::tone::ToneOutput;

/// Result of one successful acquisition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measurement {
    /// Sample after smoothing, when smoothing is on.
    pub sample: u8,
    pub voltage: f32,
    pub frequency: i32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CycleReport {
    Sampled(Measurement),
    /// Nothing past the read ran this cycle.
    ReadFailed(ConverterError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartupError {
    ConverterNotFound(ConverterError),
}

impl uDisplay for StartupError {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        match self {
            StartupError::ConverterNotFound(e) => uwrite!(f, "converter not found ({})", e),
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

pub struct Monitor<A, D, T, W> {
    adc: A,
    display: D,
    tone: T,
    serial: W,
    settings: Settings,
    view: DisplayState,
    history: MovingAverage<SMOOTHING_WINDOW>,
    last_sample: Option<u8>,
    last_frequency: i32,
    calibration: Option<CalibrationSession>,
    display_fault: bool,
}

impl<A, D, T, W> Monitor<A, D, T, W>
where
    A: Converter,
    D: CharDisplay,
    T: ToneOutput,
    W: uWrite,
{
    pub fn new(adc: A, display: D, tone: T, serial: W) -> Self {
        Self {
            adc,
            display,
            tone,
            serial,
            settings: Settings::default(),
            view: DisplayState::default(),
            history: MovingAverage::new(),
            last_sample: None,
            last_frequency: 0,
            calibration: None,
            display_fault: false,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn display_state(&self) -> &DisplayState {
        &self.view
    }

    /// Last sample that made it through the pipeline.
    pub fn last_sample(&self) -> Option<u8> {
        self.last_sample
    }

    pub fn calibrating(&self) -> bool {
        self.calibration.is_some()
    }

    pub fn converter_mut(&mut self) -> &mut A {
        &mut self.adc
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn tone(&self) -> &T {
        &self.tone
    }

    pub fn serial(&self) -> &W {
        &self.serial
    }

    pub fn serial_mut(&mut self) -> &mut W {
        &mut self.serial
    }

    /// Banner, then make sure the converter answers.
    ///
    /// On error the halt message is already on the LCD and the serial port;
    /// the caller is expected to stop there.
    pub fn start<DL: DelayNs>(&mut self, delay: &mut DL) -> Result<(), StartupError> {
        uwrite!(&mut self.serial, "Signal monitor\r\n").ok();
        self.draw(|d| d.show_message(BANNER));
        delay.delay_ms(BANNER_MS);

        if let Err(e) = self.adc.probe() {
            let e = StartupError::ConverterNotFound(e);
            self.draw(|d| d.show_message(NOT_FOUND));
            uwrite!(&mut self.serial, "Error: {}, halted\r\n", e).ok();
            return Err(e);
        }
        uwrite!(&mut self.serial, "Ready, type help for commands\r\n").ok();
        Ok(())
    }

    /// One pass of the loop. `now_ms` comes from the loop's clock.
    pub fn cycle<L: LineSource + ?Sized>(&mut self, lines: &mut L, now_ms: u32) -> CycleReport {
        match lines.poll_line() {
            Some(Ok(line)) => self.handle_line(&line, now_ms),
            Some(Err(e)) => self.report_error(&e),
            None => {}
        }
        if let Some(session) = self.calibration {
            if session.expired(now_ms) {
                self.calibration = None;
                self.report_error(&CalibrationError::TimedOut);
            }
        }
        self.view.tick(now_ms);

        let raw = match self.adc.read(ADC_CHANNEL) {
            Ok(raw) => raw,
            Err(e) => {
                self.report_error(&e);
                if self.settings.toggles.lcd {
                    self.draw(|d| d.show_message(READ_ERROR));
                }
                return CycleReport::ReadFailed(e);
            }
        };

        let sample = if self.settings.toggles.smoothing {
            // mean of u8 values, always within 0..=255
            self.history.smooth(raw) as u8
        } else {
            raw
        };
        #[cfg(feature = "debug")]
        uwrite!(&mut self.serial, "# raw={} smoothed={}\r\n", raw, sample).ok();

        self.last_sample = Some(sample);
        let m = Measurement {
            sample,
            voltage: compute_voltage(
                sample,
                self.settings.calibration_scale(),
                self.settings.gain(),
            ),
            frequency: self.settings.range().map_sample(sample),
        };
        self.last_frequency = m.frequency;

        if self.settings.toggles.tone {
            self.tone.play(m.frequency.max(0) as u32);
        }
        if self.settings.toggles.lcd {
            if self.calibration.is_some() {
                self.draw(|d| d.show_message(CALIBRATING));
            } else {
                let (mode, range) = (self.view.mode(), self.settings.range());
                let (top, bottom) = render_view(mode, &m, range);
                self.draw(|d| d.render(&top, &bottom));
            }
        }

        let t = Telemetry {
            sample: m.sample,
            voltage: m.voltage,
            frequency: m.frequency,
        };
        uwrite!(&mut self.serial, "{}\r\n", t).ok();

        CycleReport::Sampled(m)
    }

    /// Interpret one line from the operator.
    pub fn handle_line(&mut self, line: &str, now_ms: u32) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        if self.calibration.is_some() {
            self.calibration_input(line);
            return;
        }
        match Command::parse(line) {
            Ok(cmd) => self.apply(cmd, now_ms),
            Err(e) => self.report_error(&e),
        }
    }

    fn apply(&mut self, cmd: Command, now_ms: u32) {
        match cmd {
            Command::SetRange { min, max } => match self.settings.set_range(min, max) {
                Ok(r) => self.report(|w| {
                    uwrite!(w, "Frequency range set to {}-{} Hz", r.min(), r.max())
                }),
                Err(e) => self.report_error(&e),
            },
            Command::SetGain(g) => match self.settings.set_gain(g) {
                Ok(g) => self.report(|w| uwrite!(w, "Gain set to {}", Fixed::new(g, 4))),
                Err(e) => self.report_error(&e),
            },
            Command::ToggleLcd => {
                self.settings.toggles.lcd = !self.settings.toggles.lcd;
                let on = self.settings.toggles.lcd;
                if !on {
                    self.draw(|d| d.blank());
                }
                self.report(|w| uwrite!(w, "LCD {}", on_off(on)));
            }
            Command::ToggleLowpass => {
                self.settings.toggles.smoothing = !self.settings.toggles.smoothing;
                let on = self.settings.toggles.smoothing;
                self.report(|w| uwrite!(w, "Low-pass filter {}", on_off(on)));
            }
            Command::ToggleTone => {
                self.settings.toggles.tone = !self.settings.toggles.tone;
                let on = self.settings.toggles.tone;
                if on {
                    self.tone.play(self.last_frequency.max(0) as u32);
                } else {
                    self.tone.stop();
                }
                self.report(|w| uwrite!(w, "Tone {}", on_off(on)));
            }
            Command::Calibrate => {
                self.calibration = Some(CalibrationSession::new(now_ms, CALIBRATION_TIMEOUT_MS));
                if self.settings.toggles.lcd {
                    self.draw(|d| d.show_message(CALIBRATING));
                }
                self.report(|w| {
                    uwrite!(w, "Calibrating: enter reference voltage in mV, or cancel")
                });
            }
            Command::AutoCycle => {
                let on = self.view.toggle_auto_cycle(now_ms);
                self.report(|w| uwrite!(w, "Auto-cycle {}", on_off(on)));
            }
            Command::Display(index) => match self.view.select(index) {
                Ok(mode) => {
                    self.report(|w| uwrite!(w, "Display {}: {}", mode.index(), mode.name()))
                }
                Err(e) => self.report_error(&e),
            },
            Command::Cancel => self.report(|w| uwrite!(w, "Error: nothing to cancel")),
            Command::Status => {
                let s = self.settings;
                let view = self.view;
                self.report(|w| {
                    uwrite!(
                        w,
                        "Range:{}-{}Hz Gain:{} Cal:{} LCD:{} Tone:{} Lowpass:{} Display:{} Auto:{}",
                        s.range().min(),
                        s.range().max(),
                        Fixed::new(s.gain(), 4),
                        Fixed::new(s.calibration_scale(), 4),
                        on_off(s.toggles.lcd),
                        on_off(s.toggles.tone),
                        on_off(s.toggles.smoothing),
                        view.mode().index(),
                        on_off(view.auto_cycle())
                    )
                });
            }
            Command::Help => self.report(|w| uwrite!(w, "{}", HELP)),
        }
    }

    fn calibration_input(&mut self, line: &str) {
        let reference = match CalibrationInput::parse(line) {
            Ok(CalibrationInput::Cancel) => {
                self.calibration = None;
                self.report(|w| uwrite!(w, "Calibration cancelled"));
                return;
            }
            Ok(CalibrationInput::Reference(mv)) => mv,
            Err(e) => {
                // keep waiting for a usable number
                self.report_error(&e);
                return;
            }
        };
        match calibration_scale(reference, self.last_sample) {
            Ok(scale) => {
                self.calibration = None;
                self.settings.set_calibration_scale(scale);
                self.report(|w| uwrite!(w, "Calibration scale set to {}", Fixed::new(scale, 4)));
            }
            Err(CalibrationError::InvalidReference) => {
                self.report_error(&CalibrationError::InvalidReference)
            }
            Err(e) => {
                self.calibration = None;
                self.report_error(&e);
            }
        }
    }

    /// Write one line to the serial port.
    fn report<F>(&mut self, f: F)
    where
        F: FnOnce(&mut W) -> Result<(), W::Error>,
    {
        if f(&mut self.serial).is_ok() {
            uwrite!(&mut self.serial, "\r\n").ok();
        }
    }

    fn report_error<E: uDisplay>(&mut self, e: &E) {
        uwrite!(&mut self.serial, "Error: {}\r\n", e).ok();
    }

    /// Run a display operation, reporting only the first of a run of failures.
    fn draw<F>(&mut self, f: F)
    where
        F: FnOnce(&mut D) -> Result<(), D::Error>,
    {
        match f(&mut self.display) {
            Ok(()) => self.display_fault = false,
            Err(_) if self.display_fault => {}
            Err(_) => {
                self.display_fault = true;
                uwrite!(&mut self.serial, "Error: display write failed\r\n").ok();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DisplayMode;
    use crate::mapping::FrequencyRange;
    use crate::line::{CommandLine, LineError};
    use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use std::collections::VecDeque;

    const NACK: ConverterError =
        ConverterError::Bus(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));

    struct FakeAdc {
        present: bool,
        readings: VecDeque<Result<u8, ConverterError>>,
        idle: Result<u8, ConverterError>,
    }

    impl FakeAdc {
        fn steady(v: u8) -> Self {
            Self {
                present: true,
                readings: VecDeque::new(),
                idle: Ok(v),
            }
        }
    }

    impl Converter for FakeAdc {
        fn probe(&mut self) -> Result<(), ConverterError> {
            if self.present {
                Ok(())
            } else {
                Err(NACK)
            }
        }

        fn read(&mut self, _channel: u8) -> Result<u8, ConverterError> {
            self.readings.pop_front().unwrap_or(self.idle)
        }
    }

    #[derive(Default)]
    struct Screen {
        frames: Vec<(String, String)>,
        broken: bool,
    }

    impl Screen {
        fn last(&self) -> (&str, &str) {
            let (a, b) = self.frames.last().expect("nothing rendered");
            (a.as_str(), b.as_str())
        }
    }

    impl CharDisplay for Screen {
        type Error = ();

        fn render(&mut self, top: &str, bottom: &str) -> Result<(), ()> {
            if self.broken {
                return Err(());
            }
            self.frames.push((top.to_owned(), bottom.to_owned()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct Buzzer {
        playing: Option<u32>,
    }

    impl ToneOutput for Buzzer {
        fn play(&mut self, hz: u32) {
            self.playing = if hz == 0 { None } else { Some(hz) };
        }

        fn stop(&mut self) {
            self.playing = None;
        }
    }

    #[derive(Default)]
    struct Log(String);

    impl uWrite for Log {
        type Error = core::convert::Infallible;

        fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
            self.0.push_str(s);
            Ok(())
        }
    }

    impl Log {
        /// Output lines, minus `#` trace lines.
        fn lines(&self) -> Vec<&str> {
            self.0.lines().filter(|l| !l.starts_with('#')).collect()
        }

        fn take(&mut self) -> String {
            core::mem::take(&mut self.0)
        }
    }

    #[derive(Default)]
    struct Lines(VecDeque<&'static str>);

    impl Lines {
        fn push(&mut self, s: &'static str) {
            self.0.push_back(s);
        }
    }

    impl LineSource for Lines {
        fn poll_line(&mut self) -> Option<Result<CommandLine, LineError>> {
            self.0.pop_front().map(|s| {
                let mut l = CommandLine::new();
                l.push_str(s).map_err(|_| LineError::Overflow)?;
                Ok(l)
            })
        }
    }

    type TestMonitor = Monitor<FakeAdc, Screen, Buzzer, Log>;

    fn monitor(adc: FakeAdc) -> TestMonitor {
        Monitor::new(adc, Screen::default(), Buzzer::default(), Log::default())
    }

    fn sampled(r: CycleReport) -> Measurement {
        match r {
            CycleReport::Sampled(m) => m,
            other => panic!("expected a sample, got {:?}", other),
        }
    }

    fn run(m: &mut TestMonitor, lines: &mut Lines, cmd: &'static str) -> CycleReport {
        lines.push(cmd);
        m.cycle(lines, 0)
    }

    #[test]
    fn startup_shows_banner_and_probes() {
        let mut m = monitor(FakeAdc::steady(0));
        assert_eq!(m.start(&mut NoopDelay::new()), Ok(()));
        assert_eq!(m.display().last(), ("Signal Monitor  ", "Initializing..."));
        assert!(m.serial().0.contains("Ready"));
    }

    #[test]
    fn startup_halts_without_converter() {
        let mut adc = FakeAdc::steady(0);
        adc.present = false;
        let mut m = monitor(adc);
        assert_eq!(
            m.start(&mut NoopDelay::new()),
            Err(StartupError::ConverterNotFound(NACK))
        );
        assert_eq!(m.display().last(), ("ADC not found!  ", "System halted"));
        assert!(m.serial().0.contains("Error: converter not found"));
    }

    #[test]
    fn default_mid_scale_cycle() {
        let mut m = monitor(FakeAdc::steady(128));
        let r = sampled(m.cycle(&mut Lines::default(), 0));
        assert_eq!(r.sample, 128);
        assert!((r.voltage - 1.6565).abs() < 1e-4);
        assert_eq!(r.frequency, 727);
        assert_eq!(
            m.serial().lines(),
            ["ADC:128,Voltage:1.6565,Voltage_mV:1656.47,Frequency:727"]
        );
        assert_eq!(m.display().last(), ("ADC Value:", "128"));
        assert_eq!(m.tone().playing, None);
    }

    #[test]
    fn set_range_then_map_ends() {
        let mut m = monitor(FakeAdc::steady(0));
        let mut lines = Lines::default();
        let r = sampled(run(&mut m, &mut lines, "setRange 100,200"));
        assert_eq!(r.frequency, 100);
        m.converter_mut().idle = Ok(255);
        let r = sampled(m.cycle(&mut lines, 200));
        assert_eq!(r.frequency, 200);
        assert!(m.serial().0.contains("Frequency range set to 100-200 Hz"));
    }

    #[test]
    fn rejected_range_is_reported() {
        let mut m = monitor(FakeAdc::steady(0));
        let mut lines = Lines::default();
        for cmd in ["setRange 0,100", "setRange 300,200", "setRange 5,5"] {
            run(&mut m, &mut lines, cmd);
            let out = m.serial_mut().take();
            assert!(out.starts_with("Error: "), "{}", out);
            assert!(out.contains("Frequency:50\r\n"));
            assert_eq!(m.settings().range(), FrequencyRange::DEFAULT);
        }
    }

    #[test]
    fn negative_gain_is_rejected() {
        let mut m = monitor(FakeAdc::steady(255));
        let mut lines = Lines::default();
        run(&mut m, &mut lines, "setGain 2");
        m.serial_mut().take();
        let r = sampled(run(&mut m, &mut lines, "setGain -1"));
        assert_eq!(m.settings().gain(), 2.0);
        assert!((r.voltage - 6.6).abs() < 1e-4);
        assert_eq!(
            m.serial().lines()[0],
            "Error: gain must be greater than 0"
        );
    }

    #[test]
    fn display_selection() {
        let mut m = monitor(FakeAdc::steady(128));
        let mut lines = Lines::default();
        run(&mut m, &mut lines, "autoCycle");
        assert!(m.display_state().auto_cycle());
        run(&mut m, &mut lines, "display 3");
        assert_eq!(m.display_state().mode(), DisplayMode::Frequency);
        assert!(!m.display_state().auto_cycle());
        assert_eq!(m.display().last(), ("Frequency:", "727 Hz"));

        m.serial_mut().take();
        run(&mut m, &mut lines, "display 6");
        assert_eq!(m.display_state().mode(), DisplayMode::Frequency);
        assert_eq!(m.serial().lines()[0], "Error: display index must be 0 to 5");
    }

    #[test]
    fn auto_cycle_rotates_views() {
        let mut m = monitor(FakeAdc::steady(10));
        let mut lines = Lines::default();
        lines.push("autoCycle");
        m.cycle(&mut lines, 1000);
        assert_eq!(m.display_state().mode(), DisplayMode::RawSample);
        // first rotation one interval after the command
        m.cycle(&mut lines, 2999);
        assert_eq!(m.display_state().mode(), DisplayMode::RawSample);
        m.cycle(&mut lines, 3000);
        assert_eq!(m.display_state().mode(), DisplayMode::VoltageVolts);
        m.cycle(&mut lines, 4000);
        assert_eq!(m.display_state().mode(), DisplayMode::VoltageVolts);
        m.cycle(&mut lines, 5000);
        assert_eq!(m.display_state().mode(), DisplayMode::VoltageMillivolts);
    }

    #[test]
    fn auto_cycle_switched_on_late_keeps_view() {
        let mut m = monitor(FakeAdc::steady(10));
        let mut lines = Lines::default();
        m.cycle(&mut lines, 10_000);
        lines.push("autoCycle");
        m.cycle(&mut lines, 10_200);
        assert!(m.display_state().auto_cycle());
        assert_eq!(m.display_state().mode(), DisplayMode::RawSample);
        assert_eq!(m.display().last(), ("ADC Value:", "10"));
        m.cycle(&mut lines, 12_200);
        assert_eq!(m.display_state().mode(), DisplayMode::VoltageVolts);
    }

    #[test]
    fn read_failure_skips_cycle() {
        let mut adc = FakeAdc::steady(100);
        adc.readings.push_back(Err(NACK));
        let mut m = monitor(adc);
        assert_eq!(m.cycle(&mut Lines::default(), 0), CycleReport::ReadFailed(NACK));
        assert_eq!(m.last_sample(), None);
        assert!(!m.serial().0.contains("ADC:"));
        assert_eq!(m.serial().lines(), ["Error: converter not responding"]);
        assert_eq!(m.display().last(), ("ADC read error  ", "check wiring"));

        sampled(m.cycle(&mut Lines::default(), 200));
        assert_eq!(m.last_sample(), Some(100));
    }

    #[test]
    fn read_failure_keeps_previous_sample() {
        let mut adc = FakeAdc::steady(0);
        adc.readings.push_back(Ok(42));
        adc.readings.push_back(Err(NACK));
        let mut m = monitor(adc);
        let mut lines = Lines::default();
        m.cycle(&mut lines, 0);
        m.cycle(&mut lines, 200);
        assert_eq!(m.last_sample(), Some(42));
    }

    #[test]
    fn smoothing_settles_on_constant_input() {
        let mut m = monitor(FakeAdc::steady(200));
        let mut lines = Lines::default();
        let first = sampled(run(&mut m, &mut lines, "toggleLowpass"));
        assert_eq!(first.sample, 20);
        let mut last = first;
        for _ in 1..SMOOTHING_WINDOW {
            last = sampled(m.cycle(&mut lines, 0));
        }
        assert_eq!(last.sample, 200);
        assert_eq!(last.frequency, FrequencyRange::DEFAULT.map_sample(200));
    }

    #[test]
    fn smoothing_history_survives_toggle() {
        let mut m = monitor(FakeAdc::steady(100));
        let mut lines = Lines::default();
        run(&mut m, &mut lines, "toggleLowpass");
        run(&mut m, &mut lines, "toggleLowpass");
        m.converter_mut().idle = Ok(0);
        let r = sampled(m.cycle(&mut lines, 0));
        assert_eq!(r.sample, 0);
        // the 100 from before is still in the window
        let r = sampled(run(&mut m, &mut lines, "toggleLowpass"));
        assert_eq!(r.sample, 10);
    }

    #[test]
    fn tone_follows_frequency() {
        let mut m = monitor(FakeAdc::steady(0));
        let mut lines = Lines::default();
        m.cycle(&mut lines, 0);
        // the read fails, so only the toggle itself can start the tone
        m.converter_mut().readings.push_back(Err(NACK));
        lines.push("toggleTone");
        assert_eq!(m.cycle(&mut lines, 0), CycleReport::ReadFailed(NACK));
        assert_eq!(m.tone().playing, Some(50));
        m.cycle(&mut lines, 0);
        assert_eq!(m.tone().playing, Some(50));
        m.converter_mut().idle = Ok(255);
        m.cycle(&mut lines, 0);
        assert_eq!(m.tone().playing, Some(1400));
        run(&mut m, &mut lines, "toggleTone");
        assert_eq!(m.tone().playing, None);
    }

    #[test]
    fn one_command_per_cycle() {
        let mut m = monitor(FakeAdc::steady(0));
        let mut lines = Lines::default();
        lines.push("toggleLowpass");
        lines.push("toggleTone");
        m.cycle(&mut lines, 0);
        assert!(m.settings().toggles.smoothing);
        assert!(!m.settings().toggles.tone);
        m.cycle(&mut lines, 0);
        assert!(m.settings().toggles.tone);
    }

    #[test]
    fn lcd_toggle_blanks_and_stops_rendering() {
        let mut m = monitor(FakeAdc::steady(0));
        let mut lines = Lines::default();
        run(&mut m, &mut lines, "toggleLCD");
        assert_eq!(m.display().last(), ("", ""));
        let rendered = m.display().frames.len();
        m.cycle(&mut lines, 0);
        assert_eq!(m.display().frames.len(), rendered);
        run(&mut m, &mut lines, "toggleLCD");
        assert_eq!(m.display().last(), ("ADC Value:", "0"));
    }

    #[test]
    fn display_fault_reported_once() {
        let mut m = monitor(FakeAdc::steady(0));
        let mut screen = Screen::default();
        screen.broken = true;
        m.display = screen;
        let mut lines = Lines::default();
        m.cycle(&mut lines, 0);
        m.cycle(&mut lines, 0);
        let faults = m
            .serial()
            .lines()
            .into_iter()
            .filter(|l| *l == "Error: display write failed")
            .count();
        assert_eq!(faults, 1);
    }

    #[test]
    fn unknown_and_empty_lines() {
        let mut m = monitor(FakeAdc::steady(0));
        let mut lines = Lines::default();
        run(&mut m, &mut lines, "launch");
        assert_eq!(m.serial().lines()[0], "Error: unknown command, try help");
        m.serial_mut().take();
        run(&mut m, &mut lines, "   ");
        assert_eq!(m.serial().lines().len(), 1);
    }

    #[test]
    fn calibration_keeps_loop_running() {
        let mut m = monitor(FakeAdc::steady(128));
        let mut lines = Lines::default();
        run(&mut m, &mut lines, "calibrate");
        assert!(m.calibrating());
        assert_eq!(m.display().last(), ("Calibrating...  ", "Enter ref mV"));
        // sampling and telemetry go on while waiting
        sampled(m.cycle(&mut lines, 1000));
        assert!(m.serial().0.contains("ADC:128"));

        run(&mut m, &mut lines, "abc");
        assert!(m.calibrating());
        let r = sampled(run(&mut m, &mut lines, "1700"));
        assert!(!m.calibrating());
        assert!((r.voltage - 1.7).abs() < 1e-3);
        assert!((m.settings().calibration_scale() - 1.0263).abs() < 1e-3);
        assert_eq!(m.display().last(), ("ADC Value:", "128"));
    }

    #[test]
    fn calibration_without_sample_is_refused() {
        let mut adc = FakeAdc::steady(0);
        adc.idle = Err(NACK);
        let mut m = monitor(adc);
        let mut lines = Lines::default();
        run(&mut m, &mut lines, "calibrate");
        m.serial_mut().take();
        run(&mut m, &mut lines, "1000");
        assert!(!m.calibrating());
        assert_eq!(m.settings().calibration_scale(), 1.0);
        assert_eq!(m.serial().lines()[0], "Error: no sample to calibrate against");
    }

    #[test]
    fn calibration_against_zero_is_refused() {
        let mut m = monitor(FakeAdc::steady(0));
        let mut lines = Lines::default();
        run(&mut m, &mut lines, "calibrate");
        run(&mut m, &mut lines, "1000");
        assert!(!m.calibrating());
        assert_eq!(m.settings().calibration_scale(), 1.0);
    }

    #[test]
    fn calibration_cancel_and_timeout() {
        let mut m = monitor(FakeAdc::steady(50));
        let mut lines = Lines::default();
        run(&mut m, &mut lines, "cancel");
        assert!(m.serial().0.contains("Error: nothing to cancel"));

        run(&mut m, &mut lines, "calibrate");
        run(&mut m, &mut lines, "cancel");
        assert!(!m.calibrating());
        assert!(m.serial().0.contains("Calibration cancelled"));

        lines.push("calibrate");
        m.cycle(&mut lines, 5000);
        m.cycle(&mut lines, 5000 + CALIBRATION_TIMEOUT_MS - 1);
        assert!(m.calibrating());
        m.cycle(&mut lines, 5000 + CALIBRATION_TIMEOUT_MS);
        assert!(!m.calibrating());
        assert!(m.serial().0.contains("Error: calibration timed out"));
        assert_eq!(m.settings().calibration_scale(), 1.0);
    }

    #[test]
    fn status_line() {
        let mut m = monitor(FakeAdc::steady(0));
        let mut lines = Lines::default();
        run(&mut m, &mut lines, "status");
        assert_eq!(
            m.serial().lines()[0],
            "Range:50-1400Hz Gain:1.0000 Cal:1.0000 LCD:on Tone:off Lowpass:off Display:0 Auto:off"
        );
    }

    #[test]
    fn bar_view_through_loop() {
        let mut m = monitor(FakeAdc::steady(255));
        let mut lines = Lines::default();
        run(&mut m, &mut lines, "display 5");
        let (top, bottom) = m.display().last();
        assert_eq!(top, "F: 1400 Hz");
        assert_eq!(bottom, "################");
    }
}

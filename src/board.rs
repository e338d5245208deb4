//! ATmega328P glue: millisecond clock on Timer0, tone on Timer1, serial receive.

use core::cell::Cell;
use core::convert::Infallible;

use arduino_hal::hal::port::PB1;
use arduino_hal::pac::{TC0, TC1};
use arduino_hal::port::{mode::Output, Pin};
use avr_device::interrupt::Mutex;

use signal_monitor::tone::{timer_setting, Prescaler};
use signal_monitor::{Clock, ToneOutput};

const CPU_HZ: u32 = 16_000_000;

// 16 MHz / 64 / 250 = 1 kHz
const MILLIS_PRESCALER: u32 = 64;
const MILLIS_TIMER_COUNTS: u32 = 250;
const MILLIS_INCREMENT: u32 = MILLIS_PRESCALER * MILLIS_TIMER_COUNTS / (CPU_HZ / 1000);

static MILLIS_COUNTER: Mutex<Cell<u32>> = Mutex::new(Cell::new(0));

pub fn millis_init(tc0: TC0) {
    tc0.tccr0a().write(|w| w.wgm0().ctc());
    tc0.ocr0a().write(|w| w.set((MILLIS_TIMER_COUNTS - 1) as u8));
    tc0.tccr0b().write(|w| w.cs0().prescale_64());
    tc0.timsk0().write(|w| w.ocie0a().set_bit());

    avr_device::interrupt::free(|cs| MILLIS_COUNTER.borrow(cs).set(0));
}

#[avr_device::interrupt(atmega328p)]
fn TIMER0_COMPA() {
    avr_device::interrupt::free(|cs| {
        let counter = MILLIS_COUNTER.borrow(cs);
        counter.set(counter.get().wrapping_add(MILLIS_INCREMENT));
    })
}

pub struct Millis;

impl Clock for Millis {
    fn now_ms(&self) -> u32 {
        avr_device::interrupt::free(|cs| MILLIS_COUNTER.borrow(cs).get())
    }
}

/// Square wave on OC1A (d9), Timer1 in CTC mode toggling the pin on match.
pub struct Timer1Tone {
    tc1: TC1,
    _pin: Pin<Output, PB1>,
    playing: Option<u32>,
}

impl Timer1Tone {
    pub fn new(tc1: TC1, pin: Pin<Output, PB1>) -> Self {
        tc1.tccr1b().write(|w| w.cs1().no_clock());
        tc1.tccr1a().write(|w| w.com1a().disconnected());
        Self {
            tc1,
            _pin: pin,
            playing: None,
        }
    }
}

impl ToneOutput for Timer1Tone {
    fn play(&mut self, hz: u32) {
        if self.playing == Some(hz) {
            return;
        }
        let Some(setting) = timer_setting(hz, CPU_HZ) else {
            self.stop();
            return;
        };

        self.tc1.tccr1b().write(|w| w.cs1().no_clock());
        self.tc1
            .tccr1a()
            .write(|w| w.wgm1().set(0b00).com1a().match_toggle());
        self.tc1.ocr1a().write(|w| w.set(setting.top));
        self.tc1.tcnt1().write(|w| w.set(0));
        self.tc1.tccr1b().write(|w| {
            let w = w.wgm1().set(0b01);
            match setting.prescaler {
                Prescaler::Direct => w.cs1().direct(),
                Prescaler::Div8 => w.cs1().prescale_8(),
                Prescaler::Div64 => w.cs1().prescale_64(),
                Prescaler::Div256 => w.cs1().prescale_256(),
                Prescaler::Div1024 => w.cs1().prescale_1024(),
            }
        });
        self.playing = Some(hz);
    }

    fn stop(&mut self) {
        self.tc1.tccr1b().write(|w| w.cs1().no_clock());
        self.tc1.tccr1a().write(|w| w.com1a().disconnected());
        self.playing = None;
    }
}

/// Byte reader over a non-blocking poll function, for [`LineReader`].
///
/// [`LineReader`]: signal_monitor::line::LineReader
pub struct PollRx<F>(pub F);

impl<F> embedded_hal_nb::serial::ErrorType for PollRx<F> {
    type Error = Infallible;
}

impl<F> embedded_hal_nb::serial::Read<u8> for PollRx<F>
where
    F: FnMut() -> nb::Result<u8, Infallible>,
{
    fn read(&mut self) -> nb::Result<u8, Infallible> {
        (self.0)()
    }
}

#![cfg_attr(target_arch = "avr", no_std)]
#![cfg_attr(target_arch = "avr", no_main)]
#![cfg_attr(target_arch = "avr", feature(abi_avr_interrupt))]

#[cfg(target_arch = "avr")]
mod board;

#[cfg(target_arch = "avr")]
mod firmware {
    use panic_halt as _;

    use core::cell::RefCell;

    use arduino_hal::{hal::wdt, prelude::*};
    use embedded_hal_bus::i2c::RefCellDevice;
    use signal_monitor::{config::*, lcd::Lcd, line::LineReader, Clock, Monitor, Pacing};

    use crate::board::{millis_init, Millis, PollRx, Timer1Tone};

    const PACING: Pacing = Pacing::FixedPause(CYCLE_DELAY_MS);

    #[arduino_hal::entry]
    fn main() -> ! {
        let dp = arduino_hal::Peripherals::take().unwrap();
        let mut watchdog = wdt::Wdt::new(dp.WDT, &dp.CPU.mcusr);
        let pins = arduino_hal::pins!(dp);

        let serial = arduino_hal::default_serial!(dp, pins, SERIAL_BAUD);
        let (mut rx, tx) = serial.split();

        millis_init(dp.TC0);
        // SAFETY: the millisecond counter is the only interrupt user
        unsafe { avr_device::interrupt::enable() };

        // SDA = a4, SCL = a5, shared by the converter and the LCD backpack
        let i2c = arduino_hal::I2c::new(
            dp.TWI,
            pins.a4.into_pull_up_input(),
            pins.a5.into_pull_up_input(),
            100_000,
        );
        let bus = RefCell::new(i2c);

        let mut lcd = Lcd::new(RefCellDevice::new(&bus), arduino_hal::Delay::new());
        // no error channel for the display, a dead LCD just stays blank
        lcd.init().ok();

        #[cfg(not(feature = "ads1015"))]
        let adc = signal_monitor::Pcf8591::new(RefCellDevice::new(&bus));
        #[cfg(feature = "ads1015")]
        let adc = signal_monitor::converter::Ads1015::new(RefCellDevice::new(&bus));

        // tone out on d9 (OC1A)
        let tone = Timer1Tone::new(dp.TC1, pins.d9.into_output());

        let mut monitor = Monitor::new(adc, lcd, tone, tx);
        let mut delay = arduino_hal::Delay::new();
        if monitor.start(&mut delay).is_err() {
            loop {
                arduino_hal::delay_ms(1000);
            }
        }

        watchdog.start(wdt::Timeout::Ms2000).unwrap();

        let clock = Millis;
        let mut lines = LineReader::new(PollRx(move || rx.read()));
        loop {
            let started = clock.now_ms();
            monitor.cycle(&mut lines, started);
            watchdog.feed();
            arduino_hal::delay_ms(PACING.pause_ms(started, clock.now_ms()));
        }
    }
}

#[cfg(not(target_arch = "avr"))]
fn main() {
    println!("signal_monitor is firmware for the Arduino Nano, build it for avr-atmega328p");
}

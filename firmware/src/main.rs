//! Apple M0110/M0110A to USB converter firmware for ATmega32U4 (Teensy 2.0).
//!
//! - Keyboard link on PB0 (CLOCK) and PB1 (DATA), driven by the `m0110` crate
//! - Two-layer keymap with momentary Fn layer
//! - USB HID keyboard reports (6KRO), LED output report for Caps Lock

#![no_std]
#![no_main]
#![feature(asm_experimental_arch)]

mod delay;
mod gpio;
mod hid;

use avr_device::atmega32u4::Peripherals;
use m0110::{Config, Converter, SelfTest, Transport};
use m0110_keymap::resolve_layer;

use delay::BusyDelay;
use gpio::PortBLine;
use hid::UsbKeyboard;

const CONFIG: Config = Config {
    locking_caps: cfg!(feature = "locking-caps"),
    ghost_detection: cfg!(feature = "ghost-filter"),
};

/// Teensy on-board LED.
const LED_MASK: u8 = 1 << 6;

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

#[no_mangle]
pub extern "C" fn main() -> ! {
    // SAFETY: sole owner of the peripherals, taken once at reset.
    let dp = unsafe { Peripherals::steal() };

    // full 16MHz: unlock the prescaler, then divide by one
    dp.CPU.clkpr.write(|w| w.clkpce().set_bit());
    dp.CPU.clkpr.write(|w| unsafe { w.bits(0) });

    let clock = PortBLine::new(&dp.PORTB, gpio::CLOCK_MASK);
    let data = PortBLine::new(&dp.PORTB, gpio::DATA_MASK);
    let mut converter = Converter::new(Transport::new(clock, data, BusyDelay), CONFIG);

    // Keyboard first: power-up, model and self test take over a second and
    // must not stall enumeration.
    let diag = converter.init();

    // LED lit: the keyboard passed its self test
    dp.PORTD.ddrd.modify(|r, w| unsafe { w.bits(r.bits() | LED_MASK) });
    if diag.self_test == Ok(SelfTest::Ack) {
        dp.PORTD
            .portd
            .modify(|r, w| unsafe { w.bits(r.bits() | LED_MASK) });
    }

    let mut usb = UsbKeyboard::new();
    usb.init(&dp);

    loop {
        usb.poll(&dp);
        if !usb.is_configured() {
            continue;
        }

        // One inquiry; the keyboard may hold it for a while
        converter.scan(usb.leds());

        let matrix = converter.matrix();
        if !matrix.was_modified_this_cycle() || converter.has_ghost() {
            continue;
        }

        let report = hid::build_report(matrix, resolve_layer(matrix));
        usb.send_report(&dp, &report);
    }
}

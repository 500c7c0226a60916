//! The keyboard's CLOCK and DATA lines on PORTB.
//!
//! Pin mapping on Teensy 2.0 (ATmega32U4):
//!   CLOCK: PB0
//!   DATA:  PB1
//! Both are open-collector on the keyboard side. "High" is either driven
//! or the input pull-up, never both at once with the keyboard pulling low.

use avr_device::atmega32u4::PORTB;
use m0110::Line;

pub const CLOCK_MASK: u8 = 1 << 0;
pub const DATA_MASK: u8 = 1 << 1;

/// One PORTB pin as a [`Line`].
pub struct PortBLine<'a> {
    port: &'a PORTB,
    mask: u8,
}

impl<'a> PortBLine<'a> {
    pub fn new(port: &'a PORTB, mask: u8) -> Self {
        Self { port, mask }
    }
}

impl Line for PortBLine<'_> {
    fn drive_low(&mut self) {
        let mask = self.mask;
        self.port.portb.modify(|r, w| unsafe { w.bits(r.bits() & !mask) });
        self.port.ddrb.modify(|r, w| unsafe { w.bits(r.bits() | mask) });
    }

    fn drive_high(&mut self) {
        let mask = self.mask;
        self.port.portb.modify(|r, w| unsafe { w.bits(r.bits() | mask) });
        self.port.ddrb.modify(|r, w| unsafe { w.bits(r.bits() | mask) });
    }

    fn release_and_read(&mut self) -> bool {
        let mask = self.mask;
        // input with pull-up
        self.port.ddrb.modify(|r, w| unsafe { w.bits(r.bits() & !mask) });
        self.port.portb.modify(|r, w| unsafe { w.bits(r.bits() | mask) });
        settle();
        self.port.pinb.read().bits() & mask != 0
    }
}

/// ~1us for the pin to follow a direction change (16 cycles at 16MHz).
#[inline(always)]
fn settle() {
    for _ in 0..4u8 {
        unsafe { core::arch::asm!("nop") };
    }
}

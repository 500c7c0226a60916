//! Boot keyboard on the ATmega32U4 USB controller.
//!
//! Polled from the main loop, no USB interrupt is enabled. The LED byte of
//! the host's output report is kept so the converter can follow Caps Lock.

use avr_device::atmega32u4::{Peripherals, USB_DEVICE};

use m0110::matrix::{COLS, ROWS};
use m0110::{HostLeds, Matrix};
use m0110_keymap::lookup;

/// Boot protocol input report: modifier bits, a reserved byte, six keys.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct KeyboardReport {
    pub modifiers: u8,
    pub keys: [u8; 6],
}

impl KeyboardReport {
    pub const fn empty() -> Self {
        Self {
            modifiers: 0,
            keys: [0; 6],
        }
    }

    fn to_bytes(self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[0] = self.modifiers;
        bytes[2..].copy_from_slice(&self.keys);
        bytes
    }
}

/// The report for everything held in `matrix`, looked up on `layer`.
/// Keys past the sixth are left out.
pub fn build_report(matrix: &Matrix, layer: usize) -> KeyboardReport {
    let mut report = KeyboardReport::empty();
    let mut slots = report.keys.iter_mut();

    let held = (0..ROWS)
        .flat_map(|row| (0..COLS).map(move |col| (row, col)))
        .filter(|&(row, col)| matrix.is_pressed(row, col));

    for (row, col) in held {
        let kc = lookup(layer, row, col);
        if kc.is_transparent() || kc.is_layer() {
            continue;
        }
        if kc.is_modifier() {
            report.modifiers |= kc.modifier_bit();
        } else if let Some(slot) = slots.next() {
            *slot = kc as u8;
        }
    }

    report
}

const CONTROL_SIZE: u8 = 64;
const REPORT_SIZE: u8 = 8;

const VENDOR_ID: [u8; 2] = 0xFEED_u16.to_le_bytes();
const PRODUCT_ID: [u8; 2] = 0x0110_u16.to_le_bytes();

#[rustfmt::skip]
static REPORT_DESCRIPTOR: [u8; 64] = [
    0x05, 0x01, 0x09, 0x06, 0xA1, 0x01,             // generic desktop, keyboard, application
    0x05, 0x07, 0x19, 0xE0, 0x29, 0xE7,             // modifiers E0..E7
    0x15, 0x00, 0x25, 0x01, 0x75, 0x01, 0x95, 0x08,
    0x81, 0x02,                                     //   8 x 1 bit input
    0x95, 0x01, 0x75, 0x08, 0x81, 0x01,             // reserved byte
    0x05, 0x08, 0x19, 0x01, 0x29, 0x05,             // LEDs 1..5
    0x95, 0x05, 0x75, 0x01, 0x91, 0x02,             //   5 x 1 bit output
    0x95, 0x01, 0x75, 0x03, 0x91, 0x01,             //   padding
    0x05, 0x07, 0x19, 0x00, 0x29, 0xFF,             // key array
    0x15, 0x00, 0x26, 0xFF, 0x00, 0x95, 0x06, 0x75, 0x08,
    0x81, 0x00,                                     //   6 x 8 bit input
    0xC0,
];

#[rustfmt::skip]
static DEVICE_DESCRIPTOR: [u8; 18] = [
    18, 0x01, 0x00, 0x02,                   // device, USB 2.0
    0, 0, 0, CONTROL_SIZE,                  // class per interface
    VENDOR_ID[0], VENDOR_ID[1],
    PRODUCT_ID[0], PRODUCT_ID[1],
    0x00, 0x01,                             // release 1.00
    1, 2, 0,                                // manufacturer, product, no serial
    1,                                      // configurations
];

#[rustfmt::skip]
static CONFIG_DESCRIPTOR: [u8; 34] = [
    9, 0x02, 34, 0, 1, 1, 0, 0x80, 50,      // one interface, bus powered, 100mA
    9, 0x04, 0, 0, 1, 0x03, 0x01, 0x01, 0,  // HID, boot subclass, keyboard
    9, 0x21, 0x11, 0x01, 0, 1, 0x22,        // HID 1.11, one report descriptor
    REPORT_DESCRIPTOR.len() as u8, 0,
    7, 0x05, 0x81, 0x03, REPORT_SIZE, 0, 10, // EP1 IN, interrupt, 10ms
];

static LANGUAGES: [u8; 4] = [4, 0x03, 0x09, 0x04];
static MANUFACTURER: [u8; 14] = string_descriptor(b"t.m.k.");
static PRODUCT: [u8; 50] = string_descriptor(b"M0110 keyboard converter");

/// ASCII to a UTF-16LE string descriptor. `N` must be `2 + 2 * text.len()`.
const fn string_descriptor<const N: usize>(text: &[u8]) -> [u8; N] {
    let mut desc = [0u8; N];
    desc[0] = N as u8;
    desc[1] = 0x03;
    let mut i = 0;
    while i < text.len() {
        desc[2 + 2 * i] = text[i];
        i += 1;
    }
    desc
}

// (bmRequestType, bRequest)
const GET_DESCRIPTOR: (u8, u8) = (0x80, 0x06);
const SET_ADDRESS: (u8, u8) = (0x00, 0x05);
const GET_CONFIGURATION: (u8, u8) = (0x80, 0x08);
const SET_CONFIGURATION: (u8, u8) = (0x00, 0x09);
const GET_INTERFACE_DESCRIPTOR: (u8, u8) = (0x81, 0x06);
const GET_REPORT: (u8, u8) = (0xA1, 0x01);
const GET_IDLE: (u8, u8) = (0xA1, 0x02);
const GET_PROTOCOL: (u8, u8) = (0xA1, 0x03);
const SET_REPORT: (u8, u8) = (0x21, 0x09);
const SET_IDLE: (u8, u8) = (0x21, 0x0A);
const SET_PROTOCOL: (u8, u8) = (0x21, 0x0B);

/// A SETUP packet, read out of the EP0 bank.
struct Setup {
    kind: (u8, u8),
    value: [u8; 2],
    length: u16,
}

impl Setup {
    fn read(usb: &USB_DEVICE) -> Self {
        let mut raw = [0u8; 8];
        for byte in raw.iter_mut() {
            *byte = usb.uedatx.read().bits();
        }
        Self {
            kind: (raw[0], raw[1]),
            value: [raw[2], raw[3]],
            length: u16::from_le_bytes([raw[6], raw[7]]),
        }
    }

    fn value_low(&self) -> u8 {
        self.value[0]
    }

    fn value_high(&self) -> u8 {
        self.value[1]
    }
}

#[derive(Clone, Copy)]
enum Endpoint {
    Control = 0,
    Report = 1,
}

pub struct UsbKeyboard {
    configured: bool,
    last_report: KeyboardReport,
    leds: HostLeds,
    idle: u8,
    protocol: u8,
}

impl UsbKeyboard {
    pub const fn new() -> Self {
        Self {
            configured: false,
            last_report: KeyboardReport::empty(),
            leds: HostLeds(0),
            idle: 0,
            // report protocol until the host says otherwise
            protocol: 1,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// LED byte from the host's last output report.
    pub fn leds(&self) -> HostLeds {
        self.leds
    }

    /// Power the pads, lock the 48MHz PLL off the 16MHz crystal and attach.
    pub fn init(&mut self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        usb.uhwcon.write(|w| w.uvrege().set_bit());
        usb.usbcon.write(|w| w.usbe().set_bit().otgpade().set_bit());

        dp.PLL.pllcsr.write(|w| w.pindiv().set_bit().plle().set_bit());
        while dp.PLL.pllcsr.read().plock().bit_is_clear() {}

        usb.usbcon.modify(|_, w| w.frzclk().clear_bit());
        usb.udcon.modify(|_, w| w.detach().clear_bit());
        usb.udien.write(|w| w.eorste().set_bit());

        self.configured = false;
    }

    /// Handle bus reset and any pending control request.
    pub fn poll(&mut self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        if usb.udint.read().eorsti().bit_is_set() {
            usb.udint.modify(|_, w| w.eorsti().clear_bit());
            configure(usb, Endpoint::Control);
            self.configured = false;
        }

        select(usb, Endpoint::Control);
        if usb.ueintx.read().rxstpi().bit_is_set() {
            self.control(usb);
        }
    }

    /// Queue `report` on EP1 unless it repeats the last one sent. Gives up
    /// quietly if the bank stays busy.
    pub fn send_report(&mut self, dp: &Peripherals, report: &KeyboardReport) {
        if !self.configured || *report == self.last_report {
            return;
        }

        let usb = &dp.USB_DEVICE;
        select(usb, Endpoint::Report);
        if !(0..u16::MAX).any(|_| usb.ueintx.read().rwal().bit_is_set()) {
            return;
        }

        for byte in report.to_bytes() {
            usb.uedatx.write(|w| w.bits(byte));
        }
        usb.ueintx
            .modify(|_, w| w.fifocon().clear_bit().txini().clear_bit());

        self.last_report = *report;
    }

    fn control(&mut self, usb: &USB_DEVICE) {
        let setup = Setup::read(usb);
        usb.ueintx.modify(|_, w| w.rxstpi().clear_bit());

        match setup.kind {
            GET_DESCRIPTOR => {
                let desc: &[u8] = match (setup.value_high(), setup.value_low()) {
                    (0x01, _) => &DEVICE_DESCRIPTOR,
                    (0x02, _) => &CONFIG_DESCRIPTOR,
                    (0x03, 0) => &LANGUAGES,
                    (0x03, 1) => &MANUFACTURER,
                    (0x03, 2) => &PRODUCT,
                    _ => return stall(usb),
                };
                send_in(usb, desc, setup.length);
            }
            GET_INTERFACE_DESCRIPTOR if setup.value_high() == 0x22 => {
                send_in(usb, &REPORT_DESCRIPTOR, setup.length);
            }
            SET_ADDRESS => {
                // status stage goes out before the address takes effect
                release_in(usb);
                wait_in(usb);
                usb.udaddr
                    .write(|w| w.uadd().bits(setup.value_low() & 0x7F).adden().set_bit());
            }
            SET_CONFIGURATION => {
                release_in(usb);
                configure(usb, Endpoint::Report);
                self.configured = true;
            }
            GET_CONFIGURATION => {
                wait_in(usb);
                usb.uedatx.write(|w| w.bits(u8::from(self.configured)));
                release_in(usb);
            }
            GET_REPORT => send_in(usb, &self.last_report.to_bytes(), setup.length),
            GET_IDLE => send_in(usb, &[self.idle], setup.length),
            GET_PROTOCOL => send_in(usb, &[self.protocol], setup.length),
            SET_REPORT => {
                while usb.ueintx.read().rxouti().bit_is_clear() {}
                self.leds = HostLeds(usb.uedatx.read().bits());
                usb.ueintx.modify(|_, w| w.rxouti().clear_bit());
                release_in(usb);
            }
            SET_IDLE => {
                self.idle = setup.value_high();
                release_in(usb);
            }
            SET_PROTOCOL => {
                self.protocol = setup.value_low();
                release_in(usb);
            }
            _ => stall(usb),
        }
    }
}

fn select(usb: &USB_DEVICE, ep: Endpoint) {
    usb.uenum.write(|w| w.bits(ep as u8));
}

fn configure(usb: &USB_DEVICE, ep: Endpoint) {
    select(usb, ep);
    usb.ueconx.write(|w| w.epen().set_bit());
    match ep {
        // control, 64 bytes
        Endpoint::Control => {
            usb.uecfg0x.write(|w| w.eptype().bits(0b00));
            usb.uecfg1x.write(|w| w.epsize().bits(0b011).alloc().set_bit());
        }
        // interrupt IN, 8 bytes
        Endpoint::Report => {
            usb.uecfg0x.write(|w| w.eptype().bits(0b11).epdir().set_bit());
            usb.uecfg1x.write(|w| w.epsize().bits(0b000).alloc().set_bit());
        }
    }
}

fn wait_in(usb: &USB_DEVICE) {
    while usb.ueintx.read().txini().bit_is_clear() {}
}

/// Hand the IN bank to the host; empty, this is a zero-length status stage.
fn release_in(usb: &USB_DEVICE) {
    usb.ueintx.modify(|_, w| w.txini().clear_bit());
}

/// IN data stage in `CONTROL_SIZE` chunks, cut to what the host asked
/// for, then the host's status stage.
fn send_in(usb: &USB_DEVICE, data: &[u8], requested: u16) {
    let len = data.len().min(usize::from(requested));
    for chunk in data[..len].chunks(usize::from(CONTROL_SIZE)) {
        wait_in(usb);
        for &byte in chunk {
            usb.uedatx.write(|w| w.bits(byte));
        }
        release_in(usb);
    }

    while usb.ueintx.read().rxouti().bit_is_clear() {}
    usb.ueintx.modify(|_, w| w.rxouti().clear_bit());
}

fn stall(usb: &USB_DEVICE) {
    usb.ueconx.modify(|_, w| w.stallrq().set_bit());
}

//! Byte transport over the CLOCK/DATA pair.
//!
//! Signaling (CLOCK always comes from the keyboard, MSB first):
//!
//! ```text
//! idle:             CLOCK ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
//!                   DATA  ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
//!
//! keyboard -> host: CLOCK ~~~~|__|~~~|__|~~~ ... |__|~~~~~~
//!                   DATA  ~~~~X777777X666666 ... X000000X~~
//!                   host samples on the rising edge, ~160us low / ~180us high
//!
//! host -> keyboard: CLOCK ~~~~~~~~~|__|~~~|__|~~~ ... |__|~~~~~~~
//!                   DATA  ~~~|_____X777777X666666 ... X000000X~~~
//!                   request: DATA low >= 840us, host sets each bit on the
//!                   falling edge, ~180us low / ~220us high, last bit held 80us
//! ```
//!
//! Nothing is persisted between calls except the last error for diagnostics.
//! A timeout returns the lines to idle, pauses, and fails the call; it is
//! never retried here.

use core::ops::{Deref, DerefMut};

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use crate::error::Error;
use crate::line::Line;
use crate::timing::{
    wait_until_high, wait_until_low, wait_until_low_ms, DATA_HOLD_US, POWER_UP_MS,
    RECOVERY_PAUSE_MS, RECV_CLOCK_HIGH_US, RECV_CLOCK_LOW_US, SEND_CLOCK_HIGH_US,
    SEND_CLOCK_LOW_US, START_TIMEOUT_MS,
};

/// Something that can exchange single bytes with the keyboard.
pub trait Port {
    /// Send one byte to the keyboard.
    fn send(&mut self, byte: u8) -> Result<(), Error>;

    /// Receive one byte from the keyboard.
    fn receive(&mut self) -> Result<u8, Error>;

    /// Bring the link up after power-on. Called once before the first command.
    fn power_up(&mut self) {}
}

/// The wire implementation of [`Port`].
pub struct Transport<C, D, T> {
    clock: C,
    data: D,
    delay: T,
    last_error: Option<Error>,
}

impl<C: Line, D: Line, T: DelayNs> Transport<C, D, T> {
    /// Take ownership of the lines and put them in the idle state.
    pub fn new(clock: C, data: D, delay: T) -> Self {
        let mut transport = Self {
            clock,
            data,
            delay,
            last_error: None,
        };
        transport.idle();
        transport
    }

    /// Failure of the most recent send/receive, if it failed.
    pub fn last_error(&self) -> Option<Error> {
        self.last_error
    }

    /// Give the lines and delay back.
    pub fn release(self) -> (C, D, T) {
        (self.clock, self.data, self.delay)
    }

    /// Both lines high.
    pub fn idle(&mut self) {
        self.clock.drive_high();
        self.data.drive_high();
    }

    /// CLOCK high, DATA low: asks the keyboard to clock a command in.
    fn request(&mut self) {
        self.clock.drive_high();
        self.data.drive_low();
    }

    fn clock_low(&mut self, us: u16) -> bool {
        wait_until_low(&mut self.clock, &mut self.delay, us) > 0
    }

    fn clock_high(&mut self, us: u16) -> bool {
        wait_until_high(&mut self.clock, &mut self.delay, us) > 0
    }

    fn send_bits(&mut self, byte: u8) -> Result<(), Error> {
        if !wait_until_low_ms(&mut self.clock, &mut self.delay, START_TIMEOUT_MS) {
            return Err(Error::SendStart);
        }
        for bit in (0..8).rev() {
            if !self.clock_low(SEND_CLOCK_LOW_US) {
                return Err(Error::SendClockLow { bit });
            }
            if byte & (1 << bit) != 0 {
                self.data.drive_high();
            } else {
                self.data.drive_low();
            }
            if !self.clock_high(SEND_CLOCK_HIGH_US) {
                return Err(Error::SendClockHigh { bit });
            }
        }
        self.delay.delay_us(DATA_HOLD_US);
        Ok(())
    }

    fn receive_bits(&mut self) -> Result<u8, Error> {
        if !wait_until_low_ms(&mut self.clock, &mut self.delay, START_TIMEOUT_MS) {
            return Err(Error::ReceiveStart);
        }
        let mut byte = 0u8;
        for bit in (0..8).rev() {
            if !self.clock_low(RECV_CLOCK_LOW_US) {
                return Err(Error::ReceiveClockLow { bit });
            }
            if !self.clock_high(RECV_CLOCK_HIGH_US) {
                return Err(Error::ReceiveClockHigh { bit });
            }
            byte <<= 1;
            if self.data.release_and_read() {
                byte |= 1;
            }
        }
        Ok(byte)
    }

    /// Record a failure and give the keyboard time to go quiet.
    fn conclude<R>(&mut self, op: &str, result: Result<R, Error>) -> Result<R, Error> {
        if let Err(err) = result {
            warn!("m0110 {op} err: {err} (code {})", err.code());
            self.last_error = Some(err);
            self.delay.delay_ms(RECOVERY_PAUSE_MS);
        }
        result
    }
}

impl<C: Line, D: Line, T: DelayNs> Port for Transport<C, D, T> {
    fn send(&mut self, byte: u8) -> Result<(), Error> {
        self.last_error = None;
        let result = Transfer::request(self).send_bits(byte);
        if result.is_ok() {
            debug!("m0110 send: {byte:02X}");
        }
        self.conclude("send", result)
    }

    fn receive(&mut self) -> Result<u8, Error> {
        self.last_error = None;
        let result = Transfer::listen(self).receive_bits();
        if let Ok(byte) = result {
            debug!("m0110 recv: {byte:02X}");
        }
        self.conclude("recv", result)
    }

    fn power_up(&mut self) {
        self.idle();
        self.delay.delay_ms(POWER_UP_MS);
    }
}

/// The lines, borrowed for one transfer. Dropping it returns them to idle,
/// whichever way the transfer ended.
struct Transfer<'a, C: Line, D: Line, T: DelayNs> {
    transport: &'a mut Transport<C, D, T>,
}

impl<'a, C: Line, D: Line, T: DelayNs> Transfer<'a, C, D, T> {
    fn request(transport: &'a mut Transport<C, D, T>) -> Self {
        transport.request();
        Self { transport }
    }

    fn listen(transport: &'a mut Transport<C, D, T>) -> Self {
        Self { transport }
    }
}

impl<C: Line, D: Line, T: DelayNs> Deref for Transfer<'_, C, D, T> {
    type Target = Transport<C, D, T>;

    fn deref(&self) -> &Self::Target {
        self.transport
    }
}

impl<C: Line, D: Line, T: DelayNs> DerefMut for Transfer<'_, C, D, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.transport
    }
}

impl<C: Line, D: Line, T: DelayNs> Drop for Transfer<'_, C, D, T> {
    fn drop(&mut self) {
        self.transport.idle();
    }
}

//! Bounded busy-waits on a line, and the timing budgets of the protocol.
//!
//! Every wait polls at roughly 1µs granularity and returns whatever budget
//! was left when the line reached the wanted level. Zero means it never did.

use embedded_hal::delay::DelayNs;

use crate::line::Line;

/// How long the keyboard may take to start clocking, both after a request to
/// send and before a response. Inquiry answers can take most of this.
pub const START_TIMEOUT_MS: u16 = 250;

/// Host to keyboard: wait for the falling edge that asks for the next bit.
pub const SEND_CLOCK_LOW_US: u16 = 250;
/// Host to keyboard: wait for the rising edge that latches the bit.
pub const SEND_CLOCK_HIGH_US: u16 = 200;
/// Keyboard to host: wait for the falling edge of a bit cell.
pub const RECV_CLOCK_LOW_US: u16 = 200;
/// Keyboard to host: wait for the rising edge, where DATA is sampled.
pub const RECV_CLOCK_HIGH_US: u16 = 200;

/// Time DATA is held after the last bit of a command. The keyboard needs 80µs.
pub const DATA_HOLD_US: u32 = 100;
/// Quiet time after a failed transfer before the lines are used again.
pub const RECOVERY_PAUSE_MS: u32 = 500;
/// Settling time for the keyboard after power-up, before the first command.
pub const POWER_UP_MS: u32 = 1000;

/// Wait up to `us` microseconds for `line` to go low.
pub fn wait_until_low<L, D>(line: &mut L, delay: &mut D, mut us: u16) -> u16
where
    L: Line,
    D: DelayNs,
{
    while us > 0 && line.release_and_read() {
        delay.delay_us(1);
        us -= 1;
    }
    us
}

/// Wait up to `us` microseconds for `line` to go high.
pub fn wait_until_high<L, D>(line: &mut L, delay: &mut D, mut us: u16) -> u16
where
    L: Line,
    D: DelayNs,
{
    while us > 0 && !line.release_and_read() {
        delay.delay_us(1);
        us -= 1;
    }
    us
}

/// Millisecond-scale variant of [`wait_until_low`], built from 1ms slices so
/// the microsecond counter never overflows. Returns `true` if the line fell.
pub fn wait_until_low_ms<L, D>(line: &mut L, delay: &mut D, ms: u16) -> bool
where
    L: Line,
    D: DelayNs,
{
    (0..ms).any(|_| wait_until_low(line, delay, 1000) > 0)
}

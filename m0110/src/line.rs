//! The CLOCK and DATA lines as seen from the host.
//!
//! Both lines are open-collector with pull-ups on the keyboard side. The
//! host either drives a line or releases it and samples what the keyboard
//! is doing with it. Direction switching has to settle within about a
//! microsecond, so implementations should keep `release_and_read` cheap.

/// One bidirectional digital line.
pub trait Line {
    /// Switch to output and drive the line low.
    fn drive_low(&mut self);

    /// Switch to output and drive the line high.
    fn drive_high(&mut self);

    /// Switch to input with pull-up, let it settle, and sample the level.
    /// Returns `true` for high.
    fn release_and_read(&mut self) -> bool;
}

impl<L: Line + ?Sized> Line for &mut L {
    fn drive_low(&mut self) {
        (**self).drive_low()
    }

    fn drive_high(&mut self) {
        (**self).drive_high()
    }

    fn release_and_read(&mut self) -> bool {
        (**self).release_and_read()
    }
}

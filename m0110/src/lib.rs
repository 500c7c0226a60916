//! Host side of the Apple M0110/M0110A keyboard protocol.
//!
//! The keyboard owns the CLOCK line and answers one-byte commands from the
//! host over a two-wire synchronous link. This crate drives that link,
//! turns the keyboard's event bytes (including the keypad prefix and the
//! virtual Shift wrapped around the calc keys) into plain key transitions,
//! and keeps the resulting key matrix for a keymap/HID layer to read.
//!
//! Layering, bottom up:
//! - [`line`]: the two GPIO lines as a capability
//! - [`timing`]: bounded busy-waits for a level change
//! - [`transport`]: byte send/receive with the fixed edge timings
//! - [`command`]: Inquiry / Instant / Model / Test exchanges
//! - [`event`] and [`resolver`]: event byte decoding and disambiguation
//! - [`matrix`]: the pressed-key bitmap
//! - [`converter`]: one scan cycle, tying all of the above together
//!
//! The crate is `no_std` and never allocates.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod command;
pub mod converter;
pub mod error;
pub mod event;
pub mod line;
pub mod matrix;
pub mod replay;
pub mod resolver;
pub mod timing;
pub mod transport;

pub use command::{Command, Keyboard, Model, SelfTest};
pub use converter::{Config, Converter, Diagnostics, HostLeds, Transitions};
pub use error::Error;
pub use event::KeyEvent;
pub use line::Line;
pub use matrix::Matrix;
pub use replay::ReplayPort;
pub use transport::{Port, Transport};

//! Turning keyboard replies into key events.
//!
//! The M0110A sends keypad and arrow keys as two bytes, [`PREFIX`] and then
//! the key, and wraps the four calc keys in a virtual Shift on top of that:
//! keypad 5 is `79 2F`, keypad `+` is `71 79 0D`. The two entry points here
//! follow the prefix; telling a calc key from an arrow needs the Shift
//! context and is only done by [`Keyboard::inst_key`].

use log::debug;

use crate::command::{Command, Keyboard};
use crate::error::Error;
use crate::event::{KeyEvent, FAILED, NULL, PREFIX};
use crate::transport::Port;

impl<P: Port> Keyboard<P> {
    /// Inquire for the next key event.
    ///
    /// `None` if nothing happened or the exchange failed; a failure never
    /// turns into a key.
    pub fn recv_key(&mut self) -> Option<KeyEvent> {
        let raw = usable(self.query(Command::Inquiry))?;
        let key = if raw == PREFIX {
            KeyEvent::decode_keypad(usable(self.inst_recv())?)
        } else {
            KeyEvent::decode(raw)
        };
        debug!("m0110 key: {key:?}");
        Some(key)
    }

    /// Instant read of the key that followed a Shift event.
    ///
    /// Same as [`recv_key`](Self::recv_key) except that a keypad byte with
    /// one of the calc scan codes is decoded with the calc offset.
    pub fn inst_key(&mut self) -> Option<KeyEvent> {
        let raw = usable(self.inst_recv())?;
        let key = if raw == PREFIX {
            KeyEvent::decode_keypad_after_shift(usable(self.inst_recv())?)
        } else {
            KeyEvent::decode(raw)
        };
        debug!("m0110 inst key: {key:?}");
        Some(key)
    }
}

/// A reply that may carry a key: not a failure, not null.
fn usable(reply: Result<u8, Error>) -> Option<u8> {
    match reply {
        Ok(NULL) | Ok(FAILED) | Err(_) => None,
        Ok(raw) => Some(raw),
    }
}

//! Key event bytes and logical key codes.
//!
//! On the wire an event byte is `S CCCCCC 1`: bit 7 is the key state
//! (0 = press, 1 = release), bits 6-1 the scan code, bit 0 a framing bit
//! that is always set. The logical code drops the framing bit:
//! `(byte & 0x80) | ((byte & 0x7F) >> 1)`.
//!
//! The M0110A keypad and arrow keys reuse the main block's scan codes behind
//! the [`PREFIX`] byte, so their logical codes get [`KEYPAD_OFFSET`]. Four of
//! those (keypad `=`, `/`, `*`, `+`) additionally alias the arrow keys and
//! arrive wrapped in a virtual Shift; they get [`CALC_OFFSET`]. The two
//! offsets differ only in bit 5.
//!
//! Matrix address: `row = code >> 3 & 0x0F`, `col = code & 0x07`.

use core::fmt;

/// State bit of an event byte and of a logical code. Set = release.
pub const RELEASE: u8 = 0x80;

/// Raw byte announcing that the next instant read carries a keypad/arrow key.
pub const PREFIX: u8 = 0x79;
/// Raw byte meaning "no key event".
pub const NULL: u8 = 0x7B;
/// What a failed receive looks like on the wire. Never a key.
pub const FAILED: u8 = 0xFF;

/// Added to keypad and arrow keys.
pub const KEYPAD_OFFSET: u8 = 0x40;
/// Added to the calc keys instead of [`KEYPAD_OFFSET`].
pub const CALC_OFFSET: u8 = 0x60;
/// The bit that separates a calc code from the arrow it aliases.
const CALC_BIT: u8 = CALC_OFFSET ^ KEYPAD_OFFSET;

/// Shift press, as a logical code (0x71 on the wire).
pub const SHIFT: KeyEvent = KeyEvent(0x38);
/// Shift release, as a logical code (0xF1 on the wire).
pub const SHIFT_UP: KeyEvent = KeyEvent(0x38 | RELEASE);
/// Caps Lock press, as a logical code.
pub const CAPS: KeyEvent = KeyEvent(0x39);
/// Caps Lock release, as a logical code.
pub const CAPS_UP: KeyEvent = KeyEvent(0x39 | RELEASE);

/// Raw scan fields (framing bit included, state bit excluded) of the calc
/// keys `*`, `+`, `=`, `/`.
const CALC_SCANS: [u8; 4] = [0x05, 0x0D, 0x11, 0x1B];

/// A decoded key transition: state bit plus 7-bit logical code.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent(u8);

impl KeyEvent {
    /// Wrap a logical code.
    pub const fn from_code(code: u8) -> Self {
        Self(code)
    }

    /// Decode a main-block event byte.
    pub const fn decode(raw: u8) -> Self {
        Self((raw & RELEASE) | ((raw & 0x7F) >> 1))
    }

    /// Decode the byte that followed a [`PREFIX`].
    pub const fn decode_keypad(raw: u8) -> Self {
        Self(Self::decode(raw).0 | KEYPAD_OFFSET)
    }

    /// Like [`decode_keypad`](Self::decode_keypad), but the calc keys get
    /// [`CALC_OFFSET`]. Only valid for a keypad byte read after a Shift event.
    pub const fn decode_keypad_after_shift(raw: u8) -> Self {
        if is_calc_scan(raw) {
            Self(Self::decode(raw).0 | CALC_OFFSET)
        } else {
            Self::decode_keypad(raw)
        }
    }

    /// Logical code including the state bit.
    pub const fn code(self) -> u8 {
        self.0
    }

    pub const fn is_release(self) -> bool {
        self.0 & RELEASE != 0
    }

    pub const fn is_press(self) -> bool {
        !self.is_release()
    }

    pub const fn row(self) -> usize {
        ((self.0 >> 3) & 0x0F) as usize
    }

    pub const fn col(self) -> usize {
        (self.0 & 0x07) as usize
    }

    /// Main-block key: neither offset applied. Main-block codes stop at
    /// 0x3F, so bit 5 alone says nothing.
    pub const fn is_plain(self) -> bool {
        self.0 & KEYPAD_OFFSET == 0
    }

    /// Keypad or arrow key, not a calc key.
    pub const fn is_keypad(self) -> bool {
        self.0 & CALC_OFFSET == KEYPAD_OFFSET
    }

    /// Calc key (`=`, `/`, `*`, `+`).
    pub const fn is_calc(self) -> bool {
        self.0 & CALC_OFFSET == CALC_OFFSET
    }

    /// Same key and state, addressed as the keypad/arrow code it aliases.
    pub const fn as_keypad(self) -> Self {
        Self(self.0 & !CALC_BIT)
    }

    /// Same key and state, addressed as the calc code it aliases.
    pub const fn as_calc(self) -> Self {
        Self(self.0 | CALC_BIT)
    }

    /// Same key, pressed.
    pub const fn pressed(self) -> Self {
        Self(self.0 & !RELEASE)
    }

    pub const fn same_state(self, other: Self) -> bool {
        (self.0 ^ other.0) & RELEASE == 0
    }
}

impl fmt::Debug for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_release() { "up" } else { "down" };
        write!(f, "KeyEvent({:02X} {} r{} c{})", self.0, state, self.row(), self.col())
    }
}

/// Raw byte is one of the four keypad keys that alias the arrows.
pub const fn is_calc_scan(raw: u8) -> bool {
    let scan = raw & 0x7F;
    scan == CALC_SCANS[0] || scan == CALC_SCANS[1] || scan == CALC_SCANS[2] || scan == CALC_SCANS[3]
}

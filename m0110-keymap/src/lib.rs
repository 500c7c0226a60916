//! Keymap for the M0110 / M0110A converter.
//!
//! Positions are the converter's logical key codes laid out as the 14×8
//! matrix of the `m0110` crate (`row = code >> 3`, `col = code & 7`). The
//! M0110 has no keypad and simply never produces those rows.
//!
//! This crate is `no_std` so both the AVR firmware and the host tool can use it.

#![no_std]

use m0110::matrix::{COLS, ROWS};
use m0110::{KeyEvent, Matrix};

/// HID usages from the Keyboard/Keypad page (0x07), plus layer keys.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Keycode {
    /// Unmapped here; lower layers decide
    Trans = 0x00,

    // Letters
    A = 0x04,
    B = 0x05,
    C = 0x06,
    D = 0x07,
    E = 0x08,
    F = 0x09,
    G = 0x0A,
    H = 0x0B,
    I = 0x0C,
    J = 0x0D,
    K = 0x0E,
    L = 0x0F,
    M = 0x10,
    N = 0x11,
    O = 0x12,
    P = 0x13,
    Q = 0x14,
    R = 0x15,
    S = 0x16,
    T = 0x17,
    U = 0x18,
    V = 0x19,
    W = 0x1A,
    X = 0x1B,
    Y = 0x1C,
    Z = 0x1D,

    // Numbers
    N1 = 0x1E,
    N2 = 0x1F,
    N3 = 0x20,
    N4 = 0x21,
    N5 = 0x22,
    N6 = 0x23,
    N7 = 0x24,
    N8 = 0x25,
    N9 = 0x26,
    N0 = 0x27,

    // Control keys
    Enter = 0x28,
    Escape = 0x29,
    Backspace = 0x2A,
    Tab = 0x2B,
    Space = 0x2C,
    Minus = 0x2D,
    Equal = 0x2E,
    LBracket = 0x2F,
    RBracket = 0x30,
    Backslash = 0x31,
    Semicolon = 0x33,
    Quote = 0x34,
    Grave = 0x35,
    Comma = 0x36,
    Dot = 0x37,
    Slash = 0x38,
    CapsLock = 0x39,

    // Function keys
    F1 = 0x3A,
    F2 = 0x3B,
    F3 = 0x3C,
    F4 = 0x3D,
    F5 = 0x3E,
    F6 = 0x3F,
    F7 = 0x40,
    F8 = 0x41,
    F9 = 0x42,
    F10 = 0x43,
    F11 = 0x44,
    F12 = 0x45,
    F13 = 0x68,

    // Navigation
    Insert = 0x49,
    Home = 0x4A,
    PageUp = 0x4B,
    Delete = 0x4C,
    End = 0x4D,
    PageDown = 0x4E,
    Right = 0x4F,
    Left = 0x50,
    Down = 0x51,
    Up = 0x52,

    // Keypad
    NumLock = 0x53,
    KpSlash = 0x54,
    KpAsterisk = 0x55,
    KpMinus = 0x56,
    KpPlus = 0x57,
    KpEnter = 0x58,
    Kp1 = 0x59,
    Kp2 = 0x5A,
    Kp3 = 0x5B,
    Kp4 = 0x5C,
    Kp5 = 0x5D,
    Kp6 = 0x5E,
    Kp7 = 0x5F,
    Kp8 = 0x60,
    Kp9 = 0x61,
    Kp0 = 0x62,
    KpDot = 0x63,
    KpEqual = 0x67,

    // Modifiers go in the report's modifier byte
    LCtrl = 0xE0,
    LShift = 0xE1,
    LAlt = 0xE2,
    LGui = 0xE3,
    RCtrl = 0xE4,
    RShift = 0xE5,
    RAlt = 0xE6,
    RGui = 0xE7,

    // Momentary layer keys, 0xF0 + layer. Never sent to the host.
    Layer1 = 0xF1,
}

impl Keycode {
    /// LCtrl through RGui.
    pub fn is_modifier(self) -> bool {
        let v = self as u8;
        (0xE0..=0xE7).contains(&v)
    }

    /// Bit in the report's modifier byte, LCtrl = bit 0.
    pub fn modifier_bit(self) -> u8 {
        if self.is_modifier() {
            1 << (self as u8 - 0xE0)
        } else {
            0
        }
    }

    pub fn is_layer(self) -> bool {
        let v = self as u8;
        (0xF0..=0xFF).contains(&v)
    }

    /// Target layer of a layer key.
    pub fn layer_number(self) -> usize {
        (self as u8 - 0xF0) as usize
    }

    pub fn is_transparent(self) -> bool {
        self == Keycode::Trans
    }

    /// Short label for tables and traces.
    pub fn display_name(self) -> &'static str {
        match self {
            Keycode::Trans => "",
            Keycode::A => "A",
            Keycode::B => "B",
            Keycode::C => "C",
            Keycode::D => "D",
            Keycode::E => "E",
            Keycode::F => "F",
            Keycode::G => "G",
            Keycode::H => "H",
            Keycode::I => "I",
            Keycode::J => "J",
            Keycode::K => "K",
            Keycode::L => "L",
            Keycode::M => "M",
            Keycode::N => "N",
            Keycode::O => "O",
            Keycode::P => "P",
            Keycode::Q => "Q",
            Keycode::R => "R",
            Keycode::S => "S",
            Keycode::T => "T",
            Keycode::U => "U",
            Keycode::V => "V",
            Keycode::W => "W",
            Keycode::X => "X",
            Keycode::Y => "Y",
            Keycode::Z => "Z",
            Keycode::N1 => "1",
            Keycode::N2 => "2",
            Keycode::N3 => "3",
            Keycode::N4 => "4",
            Keycode::N5 => "5",
            Keycode::N6 => "6",
            Keycode::N7 => "7",
            Keycode::N8 => "8",
            Keycode::N9 => "9",
            Keycode::N0 => "0",
            Keycode::Enter => "Ret",
            Keycode::Escape => "Esc",
            Keycode::Backspace => "Bksp",
            Keycode::Tab => "Tab",
            Keycode::Space => "Spc",
            Keycode::Minus => "-",
            Keycode::Equal => "=",
            Keycode::LBracket => "[",
            Keycode::RBracket => "]",
            Keycode::Backslash => "\\",
            Keycode::Semicolon => ";",
            Keycode::Quote => "'",
            Keycode::Grave => "`",
            Keycode::Comma => ",",
            Keycode::Dot => ".",
            Keycode::Slash => "/",
            Keycode::CapsLock => "Caps",
            Keycode::F1 => "F1",
            Keycode::F2 => "F2",
            Keycode::F3 => "F3",
            Keycode::F4 => "F4",
            Keycode::F5 => "F5",
            Keycode::F6 => "F6",
            Keycode::F7 => "F7",
            Keycode::F8 => "F8",
            Keycode::F9 => "F9",
            Keycode::F10 => "F10",
            Keycode::F11 => "F11",
            Keycode::F12 => "F12",
            Keycode::F13 => "F13",
            Keycode::Insert => "Ins",
            Keycode::Home => "Home",
            Keycode::PageUp => "PgUp",
            Keycode::Delete => "Clr",
            Keycode::End => "End",
            Keycode::PageDown => "PgDn",
            Keycode::Right => "\u{2192}",
            Keycode::Left => "\u{2190}",
            Keycode::Down => "\u{2193}",
            Keycode::Up => "\u{2191}",
            Keycode::NumLock => "NLck",
            Keycode::KpSlash => "P/",
            Keycode::KpAsterisk => "P*",
            Keycode::KpMinus => "P-",
            Keycode::KpPlus => "P+",
            Keycode::KpEnter => "PEnt",
            Keycode::Kp1 => "P1",
            Keycode::Kp2 => "P2",
            Keycode::Kp3 => "P3",
            Keycode::Kp4 => "P4",
            Keycode::Kp5 => "P5",
            Keycode::Kp6 => "P6",
            Keycode::Kp7 => "P7",
            Keycode::Kp8 => "P8",
            Keycode::Kp9 => "P9",
            Keycode::Kp0 => "P0",
            Keycode::KpDot => "P.",
            Keycode::KpEqual => "P=",
            Keycode::LCtrl => "Ctrl",
            Keycode::LShift => "Shft",
            Keycode::LAlt => "Alt",
            Keycode::LGui => "Cmd",
            Keycode::RCtrl => "RCtl",
            Keycode::RShift => "RSft",
            Keycode::RAlt => "Opt",
            Keycode::RGui => "RGui",
            Keycode::Layer1 => "Fn",
        }
    }
}

/// Number of layers.
pub const NUM_LAYERS: usize = 2;

/// No key at this matrix position, or transparent on upper layers.
const ___: Keycode = Keycode::Trans;

const ENT: Keycode = Keycode::Enter;
const ESC: Keycode = Keycode::Escape;
const BSP: Keycode = Keycode::Backspace;
const TAB: Keycode = Keycode::Tab;
const SPC: Keycode = Keycode::Space;
const CAPS: Keycode = Keycode::CapsLock;
const GRV: Keycode = Keycode::Grave;
const MINS: Keycode = Keycode::Minus;
const EQL: Keycode = Keycode::Equal;
const LBRC: Keycode = Keycode::LBracket;
const RBRC: Keycode = Keycode::RBracket;
const BSLS: Keycode = Keycode::Backslash;
const SCLN: Keycode = Keycode::Semicolon;
const QUOT: Keycode = Keycode::Quote;
const COMM: Keycode = Keycode::Comma;
const DOT: Keycode = Keycode::Dot;
const SLSH: Keycode = Keycode::Slash;
const LCTL: Keycode = Keycode::LCtrl;
const LSFT: Keycode = Keycode::LShift;
const LGUI: Keycode = Keycode::LGui;
const RALT: Keycode = Keycode::RAlt;
const LY1: Keycode = Keycode::Layer1;

/// The Caps Lock position is Fn, unless the key latches and has to reach
/// the host as Caps Lock. The Fn layer is then out of reach.
const CAPS_KEY: Keycode = if cfg!(feature = "locking-caps") {
    CAPS
} else {
    LY1
};

const LEFT: Keycode = Keycode::Left;
const RGHT: Keycode = Keycode::Right;
const UP: Keycode = Keycode::Up;
const DOWN: Keycode = Keycode::Down;
const HOME: Keycode = Keycode::Home;
const END: Keycode = Keycode::End;
const INS: Keycode = Keycode::Insert;
const PGUP: Keycode = Keycode::PageUp;
const PGDN: Keycode = Keycode::PageDown;
const CLR: Keycode = Keycode::Delete;

const NLCK: Keycode = Keycode::NumLock;
const PSLS: Keycode = Keycode::KpSlash;
const PAST: Keycode = Keycode::KpAsterisk;
const PMNS: Keycode = Keycode::KpMinus;
const PPLS: Keycode = Keycode::KpPlus;
const PENT: Keycode = Keycode::KpEnter;
const PEQL: Keycode = Keycode::KpEqual;
const PDOT: Keycode = Keycode::KpDot;

/// Keymap layers, indexed `[layer][row][col]` by logical key code.
///
/// ```text
/// ,---------------------------------------------------------. ,---------------.
/// |  `|  1|  2|  3|  4|  5|  6|  7|  8|  9|  0|  -|  =|Bcksp| |Clr|  =|  /|  *|
/// |---------------------------------------------------------| |---------------|
/// |Tab  |  Q|  W|  E|  R|  T|  Y|  U|  I|  O|  P|  [|  ]|   | |  7|  8|  9|  -|
/// |-----------------------------------------------------'   | |---------------|
/// |Fn    |  A|  S|  D|  F|  G|  H|  J|  K|  L|  ;|  '|Return| |  4|  5|  6|  +|
/// |---------------------------------------------------------| |---------------|
/// |Shift   |  Z|  X|  C|  V|  B|  N|  M|  ,|  .|  /|Shft|Up | |  1|  2|  3|   |
/// |---------------------------------------------------------' |-----------|Ent|
/// |Ctrl |Cmd    |         Space             |  \|Lft|Rgt|Dn | |      0|  .|   |
/// `---------------------------------------------------------' `---------------'
/// ```
///
/// Layer 0: the keys as printed, Caps Lock position is Fn.
/// Layer 1: F-keys on the number row, Esc/Caps/F13, navigation on the keypad.
pub static LAYERS: [[[Keycode; COLS]; ROWS]; NUM_LAYERS] = [
    // Layer 0
    [
        // 0x00: A S D F H G Z X
        [Keycode::A, Keycode::S, Keycode::D, Keycode::F,
         Keycode::H, Keycode::G, Keycode::Z, Keycode::X],
        // 0x08: C V - B Q W E R
        [Keycode::C, Keycode::V, ___, Keycode::B,
         Keycode::Q, Keycode::W, Keycode::E, Keycode::R],
        // 0x10: Y T 1 2 3 4 6 5
        [Keycode::Y, Keycode::T, Keycode::N1, Keycode::N2,
         Keycode::N3, Keycode::N4, Keycode::N6, Keycode::N5],
        // 0x18: = 9 7 - 8 0 ] O
        [EQL, Keycode::N9, Keycode::N7, MINS,
         Keycode::N8, Keycode::N0, RBRC, Keycode::O],
        // 0x20: U [ I P Return L J '
        [Keycode::U, LBRC, Keycode::I, Keycode::P,
         ENT, Keycode::L, Keycode::J, QUOT],
        // 0x28: K ; \ , / N M .
        [Keycode::K, SCLN, BSLS, COMM,
         SLSH, Keycode::N, Keycode::M, DOT],
        // 0x30: Tab Space ` Backspace Enter - - Command
        [TAB, SPC, GRV, BSP, RALT, ___, ___, LGUI],
        // 0x38: Shift CapsLock(Fn or Caps) Option
        [LSFT, CAPS_KEY, LCTL, ___, ___, ___, ___, ___],
        // 0x40: - P. Right - - - Left Clear
        [___, PDOT, RGHT, ___, ___, ___, LEFT, CLR],
        // 0x48: Down - - - PEnter Up P- -
        [DOWN, ___, ___, ___, PENT, UP, PMNS, ___],
        // 0x50: - - P0 P1 P2 P3 P4 P5
        [___, ___, Keycode::Kp0, Keycode::Kp1,
         Keycode::Kp2, Keycode::Kp3, Keycode::Kp4, Keycode::Kp5],
        // 0x58: P6 P7 - P8 P9
        [Keycode::Kp6, Keycode::Kp7, ___, Keycode::Kp8,
         Keycode::Kp9, ___, ___, ___],
        // 0x60: calc keys, shifted keypad codes
        [___, ___, PAST, ___, ___, ___, PPLS, ___],
        // 0x68
        [PEQL, ___, ___, ___, ___, PSLS, ___, ___],
    ],

    // Layer 1: Fn
    [
        [___, ___, ___, ___, ___, ___, ___, ___],
        [___, ___, ___, ___, ___, ___, ___, ___],
        [___, ___, Keycode::F1, Keycode::F2,
         Keycode::F3, Keycode::F4, Keycode::F6, Keycode::F5],
        [Keycode::F12, Keycode::F9, Keycode::F7, Keycode::F11,
         Keycode::F8, Keycode::F10, ___, ___],
        [___, ___, ___, ___, ___, ___, ___, ___],
        [___, ___, ___, ___, ___, ___, ___, ___],
        [CAPS, ___, ESC, Keycode::F13, ___, ___, ___, ___],
        [___, ___, ___, ___, ___, ___, ___, ___],
        [___, ___, ___, ___, ___, ___, ___, ___],
        [___, ___, ___, ___, ___, ___, ___, ___],
        // P1 P2 P3 -> Left Down Right, P4 P5 -> End Up
        [___, ___, ___, LEFT, DOWN, RGHT, END, UP],
        // P6 -> PgDn, P7 P8 P9 -> Home Ins PgUp
        [PGDN, HOME, ___, INS, PGUP, ___, ___, ___],
        [___, ___, ___, ___, ___, ___, ___, ___],
        [NLCK, ___, ___, ___, ___, ___, ___, ___],
    ],
];

/// Highest layer whose layer key is held. Layer keys only live on the
/// base layer.
pub fn resolve_layer(matrix: &Matrix) -> usize {
    (0..ROWS)
        .flat_map(|row| (0..COLS).map(move |col| (row, col)))
        .filter(|&(row, col)| matrix.is_pressed(row, col))
        .map(|(row, col)| LAYERS[0][row][col])
        .filter(|kc| kc.is_layer())
        .map(Keycode::layer_number)
        .filter(|&layer| layer < NUM_LAYERS)
        .max()
        .unwrap_or(0)
}

/// Keycode at a matrix position on `layer`, falling back to lower layers
/// while the entry is `Trans`. Layers past the last are clamped.
pub fn lookup(layer: usize, row: usize, col: usize) -> Keycode {
    let top = layer.min(NUM_LAYERS - 1);
    (0..=top)
        .rev()
        .map(|l| LAYERS[l][row][col])
        .find(|kc| !kc.is_transparent())
        .unwrap_or(Keycode::Trans)
}

/// Keycode of the key `event` refers to, or `Trans` for codes outside the
/// matrix.
pub fn keycode(layer: usize, event: KeyEvent) -> Keycode {
    if event.row() < ROWS && event.col() < COLS {
        lookup(layer, event.row(), event.col())
    } else {
        Keycode::Trans
    }
}

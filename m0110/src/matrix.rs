//! Pressed-key matrix.
//!
//! One bit per logical key code, 14 rows by 8 columns. Bits only change by
//! applying a decoded transition; there is no periodic resync from the
//! keyboard, which has no way to report its full state anyway.

use core::fmt;

use log::warn;

use crate::event::KeyEvent;

/// Number of rows in the matrix.
pub const ROWS: usize = 14;
/// Number of columns in the matrix.
pub const COLS: usize = 8;

/// Pressed keys, `1` = held.
#[derive(Clone, PartialEq, Eq)]
pub struct Matrix {
    rows: [u8; ROWS],
    modified: bool,
}

impl Matrix {
    /// All keys released.
    pub const fn new() -> Self {
        Self {
            rows: [0; ROWS],
            modified: false,
        }
    }

    pub const fn row_count(&self) -> usize {
        ROWS
    }

    pub const fn col_count(&self) -> usize {
        COLS
    }

    /// Release everything.
    pub fn clear(&mut self) {
        self.rows = [0; ROWS];
    }

    pub fn is_pressed(&self, row: usize, col: usize) -> bool {
        row < ROWS && col < COLS && self.rows[row] & (1 << col) != 0
    }

    /// State of the key that `event` refers to, ignoring its press/release bit.
    pub fn is_held(&self, event: KeyEvent) -> bool {
        self.is_pressed(event.row(), event.col())
    }

    /// Column bits of `row`, bit 0 = column 0.
    pub fn row_bits(&self, row: usize) -> u8 {
        self.rows.get(row).copied().unwrap_or(0)
    }

    pub fn pressed_count(&self) -> u32 {
        self.rows.iter().map(|r| r.count_ones()).sum()
    }

    /// Whether any transition was applied since [`begin_cycle`](Self::begin_cycle).
    pub fn was_modified_this_cycle(&self) -> bool {
        self.modified
    }

    /// Start a new scan cycle.
    pub fn begin_cycle(&mut self) {
        self.modified = false;
    }

    /// Set (press) or clear (release) the bit of `event`.
    ///
    /// Returns `false`, changing nothing, if the code addresses a row past the
    /// end of the matrix.
    pub fn apply(&mut self, event: KeyEvent) -> bool {
        let (row, col) = (event.row(), event.col());
        let Some(bits) = self.rows.get_mut(row) else {
            warn!("m0110 matrix: {event:?} is outside the matrix");
            return false;
        };
        if event.is_release() {
            *bits &= !(1 << col);
        } else {
            *bits |= 1 << col;
        }
        self.modified = true;
        true
    }

    /// Any row looks like a ghost: it has two or more keys held and another
    /// row holds at least the same columns. Without diodes, pressing three
    /// corners of a rectangle makes the fourth read as pressed too.
    pub fn has_ghost(&self) -> bool {
        (0..ROWS).any(|row| self.has_ghost_in_row(row))
    }

    fn has_ghost_in_row(&self, row: usize) -> bool {
        let bits = self.rows[row];
        if bits.count_ones() < 2 {
            return false;
        }
        self.rows
            .iter()
            .enumerate()
            .any(|(other, &o)| other != row && o & bits == bits)
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::new()
    }
}

/// Dump in the converter's debug format, column 0 leftmost.
impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "r/c 01234567")?;
        for (row, bits) in self.rows.iter().enumerate() {
            write!(f, "{row:02X}: ")?;
            for col in 0..COLS {
                f.write_str(if bits & (1 << col) != 0 { "1" } else { "0" })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matrix")
            .field("rows", &self.rows)
            .field("modified", &self.modified)
            .finish()
    }
}

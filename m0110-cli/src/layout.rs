//! Text rendering of a keymap layer as the converter's 14×8 matrix.

use std::fmt;

use m0110::matrix::{COLS, ROWS};
use m0110_keymap::{Keycode, LAYERS};

/// Cell width, wide enough for the longest key name.
const CELL: usize = 6;

/// One layer, printable as a row × column table. Rows are labelled with
/// the first key code of the row.
pub struct LayerTable(pub usize);

impl LayerTable {
    fn name(&self) -> &'static str {
        match self.0 {
            0 => "base",
            1 => "fn",
            _ => "",
        }
    }
}

impl fmt::Display for LayerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layer = &LAYERS[self.0];
        writeln!(f, "layer {} ({})", self.0, self.name())?;

        let mut header = String::from("    ");
        for col in 0..COLS {
            header.push_str(&format!("{:<width$}", col, width = CELL));
        }
        writeln!(f, "{}", header.trim_end())?;

        for (row, keys) in layer.iter().enumerate().take(ROWS) {
            let mut line = format!("{:02X}: ", row << 3);
            for &kc in keys {
                line.push_str(&format!("{:<width$}", label(kc), width = CELL));
            }
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}

fn label(kc: Keycode) -> &'static str {
    if kc.is_transparent() {
        "-"
    } else {
        kc.display_name()
    }
}

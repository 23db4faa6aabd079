//! Matrix keymaps and the DTMF tone set.
//!
//! Keymaps are described the way matrix keypads are: a `rows`x`columns` geometry plus a list of
//! entries packing `row << 24 | column << 16 | keycode`. The scan code of a key is
//! `row << row_shift | column`, with `row_shift` the number of bits needed for a column index.

use std::fmt::{Debug, Formatter};
use log::{debug, error};
use crate::ConfigError;
use crate::decode::ScanCode;
use crate::of::{DeviceNode, PROP_NUM_COLUMNS, PROP_NUM_ROWS};

/// A key symbol, numbered like the Linux input subsystem numbers keys.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct KeyCode(pub u16);

impl KeyCode {
    /// Marks a scan code without a key. Still reported, as a tap of the reserved key.
    pub const RESERVED: KeyCode = KeyCode(0);

    pub const NUMERIC_0: KeyCode = KeyCode(0x200);
    pub const NUMERIC_1: KeyCode = KeyCode(0x201);
    pub const NUMERIC_2: KeyCode = KeyCode(0x202);
    pub const NUMERIC_3: KeyCode = KeyCode(0x203);
    pub const NUMERIC_4: KeyCode = KeyCode(0x204);
    pub const NUMERIC_5: KeyCode = KeyCode(0x205);
    pub const NUMERIC_6: KeyCode = KeyCode(0x206);
    pub const NUMERIC_7: KeyCode = KeyCode(0x207);
    pub const NUMERIC_8: KeyCode = KeyCode(0x208);
    pub const NUMERIC_9: KeyCode = KeyCode(0x209);
    pub const NUMERIC_STAR: KeyCode = KeyCode(0x20a);
    pub const NUMERIC_POUND: KeyCode = KeyCode(0x20b);
    pub const NUMERIC_A: KeyCode = KeyCode(0x20c);
    pub const NUMERIC_B: KeyCode = KeyCode(0x20d);
    pub const NUMERIC_C: KeyCode = KeyCode(0x20e);
    pub const NUMERIC_D: KeyCode = KeyCode(0x20f);

    pub fn is_reserved(&self) -> bool {
        *self == KeyCode::RESERVED
    }
}

/// Packs a matrix keymap entry.
pub const fn key(row: u32, col: u32, code: KeyCode) -> u32 {
    ((row & 0xff) << 24) | ((col & 0xff) << 16) | code.0 as u32
}

const fn key_row(entry: u32) -> u32 {
    (entry >> 24) & 0xff
}

const fn key_col(entry: u32) -> u32 {
    (entry >> 16) & 0xff
}

const fn key_val(entry: u32) -> u16 {
    (entry & 0xffff) as u16
}

/// The keypad geometry a keymap is laid out on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MatrixGeometry {
    pub rows: u32,
    pub cols: u32,
}

impl MatrixGeometry {
    /// Creates a geometry, checking it fits in the 16 scan codes of the data bus.
    pub fn new(rows: u32, cols: u32) -> Result<Self, ConfigError> {
        let invalid = |reason: &'static str| ConfigError::InvalidGeometry { rows, cols, reason };

        if rows == 0 || cols == 0 {
            return Err(invalid("rows and columns must be non-zero"));
        }
        if rows as usize > ScanCode::COUNT || cols as usize > ScanCode::COUNT {
            return Err(invalid("exceeds the 4-bit scan code space"));
        }

        let geometry = MatrixGeometry { rows, cols };
        if geometry.max_keys() > ScanCode::COUNT {
            return Err(invalid("exceeds the 4-bit scan code space"));
        }
        Ok(geometry)
    }

    /// Number of bits a column index takes in a scan code.
    pub fn row_shift(&self) -> u32 {
        self.cols.next_power_of_two().trailing_zeros()
    }

    pub fn max_keys(&self) -> usize {
        (self.rows as usize) << self.row_shift()
    }

    pub fn scan_code(&self, row: u32, col: u32) -> usize {
        ((row << self.row_shift()) | col) as usize
    }
}

/// Reads the keypad geometry from the `keypad,num-rows` and `keypad,num-columns` properties.
pub fn parse_matrix_geometry(node: &DeviceNode) -> Result<MatrixGeometry, ConfigError> {
    let rows = node.u32_property(PROP_NUM_ROWS);
    let cols = node.u32_property(PROP_NUM_COLUMNS);

    match (rows, cols) {
        (Some(rows), Some(cols)) => MatrixGeometry::new(rows, cols).inspect_err(|e| {
            error!("Invalid keypad geometry: {}", e);
        }),
        (None, _) => {
            error!("Number of keypad rows not specified");
            Err(ConfigError::MissingProperty(PROP_NUM_ROWS))
        }
        (_, None) => {
            error!("Number of keypad columns not specified");
            Err(ConfigError::MissingProperty(PROP_NUM_COLUMNS))
        }
    }
}

/// A full code-to-key table for the 16 scan codes of the data bus.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Keymap {
    codes: [KeyCode; ScanCode::COUNT],
}

impl Keymap {
    /// Builds a keymap from packed matrix entries.
    ///
    /// Codes no entry maps to hold [KeyCode::RESERVED].
    pub fn build(entries: &[u32], geometry: MatrixGeometry) -> Result<Self, ConfigError> {
        let max_keys = geometry.max_keys();
        if entries.len() > max_keys {
            error!("Keymap size overflow ({} vs max {})", entries.len(), max_keys);
            return Err(ConfigError::KeymapOverflow {
                size: entries.len(),
                max: max_keys,
            });
        }

        let mut codes = [KeyCode::RESERVED; ScanCode::COUNT];
        for &entry in entries {
            let row = key_row(entry);
            let col = key_col(entry);

            if row >= geometry.rows || col >= geometry.cols {
                error!(
                    "Failed to set ({}, {}) ({} vs {})",
                    row, col, geometry.rows, geometry.cols,
                );
                return Err(ConfigError::KeyOutOfRange {
                    row,
                    col,
                    rows: geometry.rows,
                    cols: geometry.cols,
                });
            }

            codes[geometry.scan_code(row, col)] = KeyCode(key_val(entry));
        }

        let keymap = Keymap { codes };
        debug!("Built {:?}", keymap);
        Ok(keymap)
    }

    /// Gets the key a scan code maps to.
    pub fn lookup(&self, code: ScanCode) -> KeyCode {
        self.codes[code.index()]
    }

    /// Iterates over the keys the keymap declares, without the reserved key.
    pub fn keys(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.codes.iter().copied().filter(|code| !code.is_reserved())
    }
}

impl Debug for Keymap {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Keymap(")?;
        for (i, code) in self.codes.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:#x}", code.0)?;
        }
        write!(f, ")")
    }
}

/// Represents the 16 tones of the DTMF keypad.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DtmfTone {
    /// The `1` key.
    Key1,
    /// The `2` key.
    Key2,
    /// The `3` key.
    Key3,
    /// The `4` key.
    Key4,
    /// The `5` key.
    Key5,
    /// The `6` key.
    Key6,
    /// The `7` key.
    Key7,
    /// The `8` key.
    Key8,
    /// The `9` key.
    Key9,
    /// The `0` key.
    Key0,
    /// The `*` key.
    KeyAsterisk,
    /// The `#` key.
    KeyHash,
    /// The `A` key.
    KeyA,
    /// The `B` key.
    KeyB,
    /// The `C` key.
    KeyC,
    /// The `D` key.
    KeyD,
}

impl DtmfTone {
    /// Tones in the order the receiver encodes them, starting at code 0.
    const BY_CODE: [DtmfTone; ScanCode::COUNT] = {
        use DtmfTone::*;
        [
            KeyD, Key1, Key2, Key3,
            Key4, Key5, Key6, Key7,
            Key8, Key9, Key0, KeyAsterisk,
            KeyHash, KeyA, KeyB, KeyC,
        ]
    };

    /// Converts the code presented on Q1..Q4 to the tone that produced it.
    pub fn from_code(code: ScanCode) -> DtmfTone {
        Self::BY_CODE[code.index()]
    }

    /// Converts the [DtmfTone] to its corresponding character.
    pub fn to_char(self) -> char {
        use DtmfTone::*;

        match self {
            Key1 => '1',
            Key2 => '2',
            Key3 => '3',
            Key4 => '4',
            Key5 => '5',
            Key6 => '6',
            Key7 => '7',
            Key8 => '8',
            Key9 => '9',
            Key0 => '0',
            KeyAsterisk => '*',
            KeyHash => '#',
            KeyA => 'A',
            KeyB => 'B',
            KeyC => 'C',
            KeyD => 'D',
        }
    }

    /// Gets the numeric keypad key for the tone.
    pub fn keycode(self) -> KeyCode {
        use DtmfTone::*;

        match self {
            Key1 => KeyCode::NUMERIC_1,
            Key2 => KeyCode::NUMERIC_2,
            Key3 => KeyCode::NUMERIC_3,
            Key4 => KeyCode::NUMERIC_4,
            Key5 => KeyCode::NUMERIC_5,
            Key6 => KeyCode::NUMERIC_6,
            Key7 => KeyCode::NUMERIC_7,
            Key8 => KeyCode::NUMERIC_8,
            Key9 => KeyCode::NUMERIC_9,
            Key0 => KeyCode::NUMERIC_0,
            KeyAsterisk => KeyCode::NUMERIC_STAR,
            KeyHash => KeyCode::NUMERIC_POUND,
            KeyA => KeyCode::NUMERIC_A,
            KeyB => KeyCode::NUMERIC_B,
            KeyC => KeyCode::NUMERIC_C,
            KeyD => KeyCode::NUMERIC_D,
        }
    }

    /// Entries of a 4x4 keymap sending every code to the key of its tone.
    pub fn default_keymap_entries() -> Vec<u32> {
        ScanCode::all()
            .map(|code| {
                let index = code.index() as u32;
                key(index >> 2, index & 0b11, DtmfTone::from_code(code).keycode())
            })
            .collect()
    }
}

//! Hardware description of a device, in the shape of a device tree node.
//!
//! ```json
//! {
//!     "compatible": ["microsemi,mt88l70"],
//!     "std-gpios": [{ "line": 17 }],
//!     "q-gpios": [{ "line": 5 }, { "line": 6 }, null, { "line": 13, "active-low": true }],
//!     "keypad,num-rows": 4,
//!     "keypad,num-columns": 4,
//!     "linux,keymap": [16777218, 33554435],
//!     "wakeup-source": true
//! }
//! ```

use serde::{Deserialize, Serialize};

pub const PROP_STROBE_GPIOS: &str = "std-gpios";
pub const PROP_DATA_GPIOS: &str = "q-gpios";
pub const PROP_KEYMAP: &str = "linux,keymap";
pub const PROP_NUM_ROWS: &str = "keypad,num-rows";
pub const PROP_NUM_COLUMNS: &str = "keypad,num-columns";

/// A single GPIO specifier: the line on the chip and its polarity.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GpioSpec {
    pub line: u32,
    #[serde(rename = "active-low", default)]
    pub active_low: bool,
}

impl GpioSpec {
    pub fn new(line: u32) -> Self {
        GpioSpec { line, active_low: false }
    }

    pub fn active_low(line: u32) -> Self {
        GpioSpec { line, active_low: true }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct DeviceNode {
    #[serde(default)]
    pub compatible: Vec<String>,
    #[serde(rename = "std-gpios", default, skip_serializing_if = "Vec::is_empty")]
    pub strobe_gpios: Vec<Option<GpioSpec>>,
    #[serde(rename = "q-gpios", default, skip_serializing_if = "Vec::is_empty")]
    pub data_gpios: Vec<Option<GpioSpec>>,
    #[serde(rename = "linux,keymap", default, skip_serializing_if = "Option::is_none")]
    pub keymap: Option<Vec<u32>>,
    #[serde(rename = "keypad,num-rows", default, skip_serializing_if = "Option::is_none")]
    pub num_rows: Option<u32>,
    #[serde(rename = "keypad,num-columns", default, skip_serializing_if = "Option::is_none")]
    pub num_columns: Option<u32>,
    #[serde(rename = "wakeup-source", default)]
    pub wakeup_source: bool,
}

impl DeviceNode {
    pub fn is_compatible(&self, compatible: &str) -> bool {
        self.compatible.iter().any(|c| c == compatible)
    }

    fn gpios(&self, name: &str) -> Option<&[Option<GpioSpec>]> {
        match name {
            PROP_STROBE_GPIOS => Some(self.strobe_gpios.as_slice()),
            PROP_DATA_GPIOS => Some(self.data_gpios.as_slice()),
            _ => None,
        }
    }

    /// Counts the specifiers of a named gpio property, holes included.
    pub fn named_gpio_count(&self, name: &str) -> usize {
        self.gpios(name).map_or(0, |gpios| gpios.len())
    }

    /// Gets the `index`-th specifier of a named gpio property.
    ///
    /// Returns `None` for a hole or a missing entry.
    pub fn named_gpio(&self, name: &str, index: usize) -> Option<GpioSpec> {
        self.gpios(name)?.get(index).copied().flatten()
    }

    pub fn u32_property(&self, name: &str) -> Option<u32> {
        match name {
            PROP_NUM_ROWS => self.num_rows,
            PROP_NUM_COLUMNS => self.num_columns,
            _ => None,
        }
    }
}

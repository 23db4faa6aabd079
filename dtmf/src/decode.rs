//! Sampling the Q1..Q4 data bus into a scan code.

use std::fmt::{Debug, Formatter};
use log::warn;
use mt88l70_gpio::{GpioActiveLevel, GpioInput};

/// The 4-bit code sampled from the data bus, Q1 being the least significant bit.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ScanCode(u8);

impl ScanCode {
    /// Number of data lines.
    pub const BITS: usize = 4;
    /// Number of distinct codes.
    pub const COUNT: usize = 1 << Self::BITS;

    pub fn new(value: u8) -> Option<Self> {
        if (value as usize) < Self::COUNT {
            Some(ScanCode(value))
        } else {
            None
        }
    }

    /// Assembles a code from logical bit values, LSb first. Missing bits read as 0.
    pub fn from_bits(bits: [Option<bool>; Self::BITS]) -> Self {
        let mut code = 0u8;
        for (i, bit) in bits.iter().enumerate() {
            if bit.unwrap_or(false) {
                code |= 1 << i;
            }
        }
        ScanCode(code)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Iterates over all codes, in ascending order.
    pub fn all() -> impl Iterator<Item = ScanCode> {
        (0..Self::COUNT as u8).map(ScanCode)
    }
}

/// A resolved data line.
pub struct DataLine {
    input: Box<dyn GpioInput>,
    active_level: GpioActiveLevel,
}

impl DataLine {
    pub fn new(input: Box<dyn GpioInput>, active_level: GpioActiveLevel) -> Self {
        DataLine { input, active_level }
    }

    /// Reads the logical value of the line. A line that cannot be read counts as inactive.
    pub fn sample(&self) -> bool {
        match self.input.read() {
            Ok(level) => self.active_level.get_state(level),
            Err(e) => {
                warn!("Failed to read {:?}: {}", self.input, e);
                false
            }
        }
    }
}

impl Debug for DataLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({:?})", self.input, self.active_level)
    }
}

/// The four data lines of the receiver. Lines that failed to resolve stay `None`.
#[derive(Debug)]
pub struct DataBus {
    lines: [Option<DataLine>; ScanCode::BITS],
}

impl DataBus {
    pub fn new(lines: [Option<DataLine>; ScanCode::BITS]) -> Self {
        DataBus { lines }
    }

    /// Number of lines that resolved.
    pub fn available(&self) -> usize {
        self.lines.iter().filter(|line| line.is_some()).count()
    }

    pub fn sample(&self) -> ScanCode {
        let mut bits = [None; ScanCode::BITS];
        for (bit, line) in bits.iter_mut().zip(&self.lines) {
            *bit = line.as_ref().map(DataLine::sample);
        }
        ScanCode::from_bits(bits)
    }
}

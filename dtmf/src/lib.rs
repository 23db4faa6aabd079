//! Driver for the MT88L70 DTMF receiver.
//!
//! The receiver raises its strobe (StD) line whenever a tone pair has been decoded and presents
//! the tone as a 4-bit code on Q1..Q4. This crate samples that code on every strobe edge, maps it
//! through a keymap and reports it as a key tap to an input event sink.
//!
//! The hardware is reached through the traits of [mt88l70_gpio] and [input], so the driver runs
//! on any backend implementing them.

pub mod decode;
pub mod driver;
pub mod input;
pub mod keymap;
pub mod of;
pub mod platform;

use mt88l70_gpio::GpioError;
use thiserror::Error;
use crate::input::InputError;

/// Problems with the hardware description of a device.
#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum ConfigError {
    #[error("no device description")]
    NoDevice,
    #[error("property {property} must contain {expected} gpios, found {found}")]
    GpioCount {
        property: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("property {0} not found")]
    MissingProperty(&'static str),
    #[error("property {0} is empty")]
    EmptyProperty(&'static str),
    #[error("invalid keypad geometry {rows}x{cols}: {reason}")]
    InvalidGeometry {
        rows: u32,
        cols: u32,
        reason: &'static str,
    },
    #[error("keymap size overflow ({size} vs max {max})")]
    KeymapOverflow { size: usize, max: usize },
    #[error("keymap entry ({row}, {col}) outside of {rows}x{cols} matrix")]
    KeyOutOfRange {
        row: u32,
        col: u32,
        rows: u32,
        cols: u32,
    },
}

/// A collaborator failed to hand out or register a resource.
#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum ResourceError {
    #[error("{what}: {source}")]
    Gpio {
        what: String,
        #[source]
        source: GpioError,
    },
    #[error("irq {name}: {source}")]
    Irq {
        name: &'static str,
        #[source]
        source: GpioError,
    },
    #[error("input device: {0}")]
    Input(#[from] InputError),
}

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum DtmfError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),
}

impl From<InputError> for DtmfError {
    fn from(err: InputError) -> Self {
        DtmfError::Resource(ResourceError::Input(err))
    }
}

pub type DtmfResult<T> = Result<T, DtmfError>;

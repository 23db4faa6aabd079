pub mod gpiod;
pub mod irq;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported on this backend")]
    NotSupported,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
    #[error("error: {0}")]
    Other(String),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

/// A source of GPIO lines.
///
/// Lines are handed out as owned handles, so they can be moved into an interrupt handler running
/// on another thread. A line stays reserved until every handle derived from it is dropped.
pub trait GpioDriver: Debug + Send + Sync {
    /// Gets the amount of GPIO pins available.
    fn count(&self) -> GpioResult<usize>;

    /// Gets the GPIO pin at the given index.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the index is out of range.
    /// - `GpioError::AlreadyInUse` if the pin is held by another handle.
    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin>>;
}

/// Specifies the active level of the GPIO pin.
///
/// By default, the active level is high.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioActiveLevel {
    #[default] High,
    Low,
}

impl GpioActiveLevel {
    /// Maps the `active-low` flag of a line specifier to an active level.
    pub fn from_active_low(active_low: bool) -> Self {
        if active_low {
            GpioActiveLevel::Low
        } else {
            GpioActiveLevel::High
        }
    }

    /// Converts between the physical level of a pin and its logical value.
    ///
    /// The mapping is its own inverse, so the same call turns a physical level into a logical one
    /// and a logical value back into the level seen on the pin.
    pub fn get_state(&self, value: bool) -> bool {
        match self {
            GpioActiveLevel::High => value,
            GpioActiveLevel::Low => !value,
        }
    }
}

pub trait GpioPin: Debug + Send {
    /// Gets the index of the pin on its driver.
    fn index(&self) -> usize;

    /// Sets the GPIO pin function to input, allowing reading its state.
    ///
    /// The returned input keeps the pin reserved.
    fn into_input(self: Box<Self>) -> GpioResult<Box<dyn GpioInput>>;
}

pub trait GpioInput: Debug + Send {
    /// Reads the physical level of the GPIO pin, `true` being high.
    fn read(&self) -> GpioResult<bool>;
}

//! Interrupt abstractions.
//!
//! An interrupt chip turns edges on a GPIO line into calls to a registered handler. The
//! registration handle returned by [IrqChip::request_irq] controls delivery and frees the
//! interrupt when dropped.

mod polled;

use std::fmt::Debug;
use crate::{GpioActiveLevel, GpioInput, GpioResult};
pub use polled::*;

/// The edge an interrupt line fires on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IrqTrigger {
    /// Fires when the line goes from low to high.
    EdgeRising,
    /// Fires when the line goes from high to low.
    EdgeFalling,
}

impl IrqTrigger {
    /// Gets the edge on which a line with the given active level becomes active.
    pub fn for_active_level(level: GpioActiveLevel) -> Self {
        match level {
            GpioActiveLevel::High => IrqTrigger::EdgeRising,
            GpioActiveLevel::Low => IrqTrigger::EdgeFalling,
        }
    }

    /// Checks whether going from `previous` to `current` (physical levels) is this edge.
    pub fn is_edge(&self, previous: bool, current: bool) -> bool {
        match self {
            IrqTrigger::EdgeRising => !previous && current,
            IrqTrigger::EdgeFalling => previous && !current,
        }
    }
}

/// The return value of an interrupt handler.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IrqReturn {
    /// The interrupt was not from this device.
    None,
    /// The interrupt was handled.
    Handled,
}

/// A callback run once per qualifying edge.
///
/// Calls for one registration never overlap. Implementations must not block.
pub trait IrqHandler: Send {
    fn handle(&mut self) -> IrqReturn;
}

impl<F> IrqHandler for F
where
    F: FnMut() -> IrqReturn + Send,
{
    fn handle(&mut self) -> IrqReturn {
        self()
    }
}

pub trait IrqChip: Debug + Send + Sync {
    /// Registers `handler` for edges of type `trigger` on `line`.
    ///
    /// The chip owns the line and the handler until the returned registration is dropped. The
    /// registration starts enabled and not armed as a wake source.
    fn request_irq(
        &self,
        line: Box<dyn GpioInput>,
        trigger: IrqTrigger,
        name: &str,
        handler: Box<dyn IrqHandler>,
    ) -> GpioResult<Box<dyn IrqRegistration>>;
}

/// A live interrupt registration. Dropping it frees the interrupt.
pub trait IrqRegistration: Debug + Send {
    /// Gets the edge the interrupt was registered with.
    fn trigger(&self) -> IrqTrigger;

    /// Resumes handler delivery.
    fn enable(&self) -> GpioResult<()>;
    /// Stops handler delivery. Edges seen while disabled are not replayed.
    fn disable(&self) -> GpioResult<()>;
    fn is_enabled(&self) -> bool;

    /// Keeps the line watched as a wake source while the host is suspended.
    fn enable_wake(&self) -> GpioResult<()>;
    fn disable_wake(&self) -> GpioResult<()>;
    fn is_wake_armed(&self) -> bool;
}

//! GpiodDriver implementation for managing GPIO pins using the gpiod library.
//!
//! Lines are requested through the GPIO character device, so this backend works on any Linux
//! board exposing `/dev/gpiochipN`.
use crate::{GpioDriver, GpioError, GpioInput, GpioPin, GpioResult};
use bitvec::vec::BitVec;
use log::debug;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::AtomicU8;
use std::sync::Arc;

struct GpiodChip {
    chip: gpiod::Chip,
    used_pins: BitVec<AtomicU8>,
}

impl GpiodChip {
    fn release(&self, index: usize) {
        self.used_pins.set_aliased(index, false);
        debug!("Released line {} on {}", index, self.chip.name());
    }
}

/// GpiodDriver is a GPIO driver that uses the gpiod library to manage GPIO pins.
#[derive(Clone)]
pub struct GpiodDriver {
    inner: Arc<GpiodChip>,
}

impl GpiodDriver {
    pub fn new(chip: gpiod::Chip) -> Self {
        let n = chip.num_lines() as usize;
        let bits = BitVec::repeat(false, n);
        Self {
            inner: Arc::new(GpiodChip {
                chip,
                used_pins: bits,
            }),
        }
    }

    /// Opens the chip at the given path, e.g. `/dev/gpiochip0`.
    pub fn open(path: &str) -> GpioResult<Self> {
        let chip = gpiod::Chip::new(path)?;
        Ok(Self::new(chip))
    }
}

impl Debug for GpiodDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpiodDriver({})", self.inner.chip.name())
    }
}

impl GpioDriver for GpiodDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.inner.chip.num_lines() as usize)
    }

    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin>> {
        if index >= self.count()? {
            return Err(GpioError::InvalidArgument);
        }

        if self.inner.used_pins[index] {
            return Err(GpioError::AlreadyInUse);
        }

        self.inner.used_pins.set_aliased(index, true);
        debug!("Reserved line {} on {}", index, self.inner.chip.name());

        Ok(Box::new(GpiodPin {
            chip: Arc::clone(&self.inner),
            pin_index: index,
        }))
    }
}

struct GpiodPin {
    chip: Arc<GpiodChip>,
    pin_index: usize,
}

impl Debug for GpiodPin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpiodDriver({})[{}]", self.chip.chip.name(), self.pin_index)
    }
}

impl GpioPin for GpiodPin {
    fn index(&self) -> usize {
        self.pin_index
    }

    fn into_input(self: Box<Self>) -> GpioResult<Box<dyn GpioInput>> {
        // Polarity is left to the consumer, the line always reports its physical level.
        let line = self.chip.chip.request_lines(
            gpiod::Options::input([self.pin_index as u32])
                .consumer(env!("CARGO_PKG_NAME"))
                .active(gpiod::Active::High)
                .bias(gpiod::Bias::Disable),
        )?;
        Ok(Box::new(GpiodInput { pin: *self, line }))
    }
}

impl Drop for GpiodPin {
    fn drop(&mut self) {
        self.chip.release(self.pin_index);
    }
}

struct GpiodInput {
    pin: GpiodPin,
    line: gpiod::Lines<gpiod::Input>,
}

impl Debug for GpiodInput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[input]", self.pin)
    }
}

impl GpioInput for GpiodInput {
    fn read(&self) -> GpioResult<bool> {
        let values = self.line.get_values([false])?;
        Ok(values[0])
    }
}

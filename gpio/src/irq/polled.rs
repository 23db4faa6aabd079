use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use log::{debug, error, info, trace, warn};
use crate::irq::{IrqChip, IrqHandler, IrqRegistration, IrqReturn, IrqTrigger};
use crate::{GpioInput, GpioResult};

/// An interrupt chip that detects edges by sampling the line on a worker thread.
///
/// Meant for hosts where edge events are not delivered to userspace. Each registration gets its
/// own thread, which samples the line every [PolledIrqChip::poll_interval] and is joined when the
/// registration is dropped.
#[derive(Debug, Clone)]
pub struct PolledIrqChip {
    pub poll_interval: Duration,
}

impl PolledIrqChip {
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_micros(500),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl Default for PolledIrqChip {
    fn default() -> Self {
        Self::new()
    }
}

struct PolledState {
    enabled: AtomicBool,
    wake: AtomicBool,
    stop: AtomicBool,
}

impl IrqChip for PolledIrqChip {
    fn request_irq(
        &self,
        line: Box<dyn GpioInput>,
        trigger: IrqTrigger,
        name: &str,
        handler: Box<dyn IrqHandler>,
    ) -> GpioResult<Box<dyn IrqRegistration>> {
        // Edges are found against this sample, so a line that cannot be read is refused here.
        let initial = line.read().inspect_err(|e| {
            error!("Cannot sample {:?} for irq {}: {}", line, name, e);
        })?;

        let state = Arc::new(PolledState {
            enabled: AtomicBool::new(true),
            wake: AtomicBool::new(false),
            stop: AtomicBool::new(false),
        });

        let worker = PolledWorker {
            line,
            trigger,
            handler,
            state: Arc::clone(&state),
            poll_interval: self.poll_interval,
            name: name.to_string(),
        };

        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker.run(initial))?;

        debug!("Requested {:?} irq {} polling every {:?}", trigger, name, self.poll_interval);

        Ok(Box::new(PolledIrqRegistration {
            name: name.to_string(),
            trigger,
            state,
            worker: Some(worker),
        }))
    }
}

struct PolledWorker {
    line: Box<dyn GpioInput>,
    trigger: IrqTrigger,
    handler: Box<dyn IrqHandler>,
    state: Arc<PolledState>,
    poll_interval: Duration,
    name: String,
}

impl PolledWorker {
    fn run(mut self, mut previous: bool) {
        let mut failing = false;

        while !self.state.stop.load(Ordering::Acquire) {
            thread::sleep(self.poll_interval);

            let current = match self.line.read() {
                Ok(level) => {
                    failing = false;
                    level
                }
                Err(e) => {
                    if !failing {
                        warn!("Failed to sample {:?} for irq {}: {}", self.line, self.name, e);
                        failing = true;
                    }
                    continue;
                }
            };

            if self.trigger.is_edge(previous, current) {
                if self.state.enabled.load(Ordering::Acquire) {
                    if self.handler.handle() == IrqReturn::None {
                        trace!("Irq {} not handled", self.name);
                    }
                } else if self.state.wake.load(Ordering::Acquire) {
                    info!("Wake event on irq {}", self.name);
                }
            }
            previous = current;
        }
    }
}

struct PolledIrqRegistration {
    name: String,
    trigger: IrqTrigger,
    state: Arc<PolledState>,
    worker: Option<JoinHandle<()>>,
}

impl Debug for PolledIrqRegistration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "PolledIrq({}, {:?})", self.name, self.trigger)
    }
}

impl IrqRegistration for PolledIrqRegistration {
    fn trigger(&self) -> IrqTrigger {
        self.trigger
    }

    fn enable(&self) -> GpioResult<()> {
        self.state.enabled.store(true, Ordering::Release);
        Ok(())
    }

    fn disable(&self) -> GpioResult<()> {
        self.state.enabled.store(false, Ordering::Release);
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.state.enabled.load(Ordering::Acquire)
    }

    fn enable_wake(&self) -> GpioResult<()> {
        self.state.wake.store(true, Ordering::Release);
        Ok(())
    }

    fn disable_wake(&self) -> GpioResult<()> {
        self.state.wake.store(false, Ordering::Release);
        Ok(())
    }

    fn is_wake_armed(&self) -> bool {
        self.state.wake.load(Ordering::Acquire)
    }
}

impl Drop for PolledIrqRegistration {
    fn drop(&mut self) {
        self.state.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Irq {} worker panicked", self.name);
            }
        }
        debug!("Freed irq {}", self.name);
    }
}

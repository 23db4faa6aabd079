//! Mock collaborators recording every resource they hand out.
#![allow(dead_code)]

use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use mt88l70::input::{
    EventType, InputBackend, InputDevice, InputError, InputEvent, InputId, InputRegistration,
    InputReporter, InputResult,
};
use mt88l70::keymap::DtmfTone;
use mt88l70::of::{DeviceNode, GpioSpec};
use mt88l70::platform::Platform;
use mt88l70_gpio::irq::{IrqChip, IrqHandler, IrqRegistration, IrqReturn, IrqTrigger};
use mt88l70_gpio::{GpioDriver, GpioError, GpioInput, GpioPin, GpioResult};

#[derive(Default)]
struct LedgerState {
    held: Vec<String>,
    log: Vec<String>,
}

/// Tracks held resources and the order calls happened in.
#[derive(Clone, Default)]
pub struct Ledger(Arc<Mutex<LedgerState>>);

impl Ledger {
    pub fn acquire(&self, resource: &str) {
        let mut state = self.0.lock().unwrap();
        assert!(
            !state.held.iter().any(|held| held == resource),
            "{} acquired twice",
            resource,
        );
        state.held.push(resource.to_string());
        state.log.push(format!("acquire {}", resource));
    }

    pub fn release(&self, resource: &str) {
        let mut state = self.0.lock().unwrap();
        let position = state.held.iter().position(|held| held == resource);
        let Some(position) = position else {
            panic!("{} released without being held", resource);
        };
        state.held.remove(position);
        state.log.push(format!("release {}", resource));
    }

    pub fn record(&self, call: &str) {
        self.0.lock().unwrap().log.push(call.to_string());
    }

    pub fn is_held(&self, resource: &str) -> bool {
        self.0.lock().unwrap().held.iter().any(|held| held == resource)
    }

    pub fn held(&self) -> Vec<String> {
        self.0.lock().unwrap().held.clone()
    }

    pub fn log(&self) -> Vec<String> {
        self.0.lock().unwrap().log.clone()
    }

    /// Log entries that are calls rather than acquisitions or releases.
    pub fn calls(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter(|entry| !entry.starts_with("acquire ") && !entry.starts_with("release "))
            .collect()
    }

    pub fn clear_log(&self) {
        self.0.lock().unwrap().log.clear();
    }
}

pub const MOCK_LINES: usize = 32;

pub struct MockGpio {
    ledger: Ledger,
    levels: Arc<Vec<AtomicBool>>,
    pub failing_pins: HashSet<usize>,
    pub failing_direction: HashSet<usize>,
}

impl MockGpio {
    pub fn new(ledger: Ledger) -> Self {
        MockGpio {
            ledger,
            levels: Arc::new((0..MOCK_LINES).map(|_| AtomicBool::new(false)).collect()),
            failing_pins: HashSet::new(),
            failing_direction: HashSet::new(),
        }
    }

    pub fn set_level(&self, index: usize, high: bool) {
        self.levels[index].store(high, Ordering::SeqCst);
    }
}

impl Debug for MockGpio {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockGpio")
    }
}

impl GpioDriver for MockGpio {
    fn count(&self) -> GpioResult<usize> {
        Ok(MOCK_LINES)
    }

    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin>> {
        if index >= MOCK_LINES {
            return Err(GpioError::InvalidArgument);
        }
        if self.failing_pins.contains(&index) {
            return Err(GpioError::Other("injected failure".to_string()));
        }
        let resource = format!("gpio{}", index);
        if self.ledger.is_held(&resource) {
            return Err(GpioError::AlreadyInUse);
        }
        self.ledger.acquire(&resource);

        Ok(Box::new(MockPin {
            ledger: self.ledger.clone(),
            levels: Arc::clone(&self.levels),
            index,
            fail_direction: self.failing_direction.contains(&index),
        }))
    }
}

struct MockPin {
    ledger: Ledger,
    levels: Arc<Vec<AtomicBool>>,
    index: usize,
    fail_direction: bool,
}

impl Debug for MockPin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockGpio[{}]", self.index)
    }
}

impl GpioPin for MockPin {
    fn index(&self) -> usize {
        self.index
    }

    fn into_input(self: Box<Self>) -> GpioResult<Box<dyn GpioInput>> {
        if self.fail_direction {
            return Err(GpioError::NotSupported);
        }
        Ok(Box::new(MockInput { pin: *self }))
    }
}

impl Drop for MockPin {
    fn drop(&mut self) {
        self.ledger.release(&format!("gpio{}", self.index));
    }
}

struct MockInput {
    pin: MockPin,
}

impl Debug for MockInput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[input]", self.pin)
    }
}

impl GpioInput for MockInput {
    fn read(&self) -> GpioResult<bool> {
        Ok(self.pin.levels[self.pin.index].load(Ordering::SeqCst))
    }
}

struct Requested {
    _line: Box<dyn GpioInput>,
    handler: Box<dyn IrqHandler>,
}

#[derive(Default)]
struct IrqState {
    enabled: AtomicBool,
    wake: AtomicBool,
}

/// An interrupt chip whose interrupt fires when the test says so.
pub struct MockIrqChip {
    ledger: Ledger,
    pub fail: bool,
    requested: Arc<Mutex<Option<Requested>>>,
    state: Arc<IrqState>,
    trigger: Mutex<Option<IrqTrigger>>,
}

impl MockIrqChip {
    pub fn new(ledger: Ledger) -> Self {
        MockIrqChip {
            ledger,
            fail: false,
            requested: Arc::new(Mutex::new(None)),
            state: Arc::new(IrqState::default()),
            trigger: Mutex::new(None),
        }
    }

    /// Delivers one strobe edge. Returns whether a handler ran.
    pub fn fire(&self) -> bool {
        let mut requested = self.requested.lock().unwrap();
        match requested.as_mut() {
            Some(requested) if self.state.enabled.load(Ordering::SeqCst) => {
                assert_eq!(requested.handler.handle(), IrqReturn::Handled);
                true
            }
            _ => false,
        }
    }

    pub fn trigger(&self) -> Option<IrqTrigger> {
        *self.trigger.lock().unwrap()
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled.load(Ordering::SeqCst)
    }

    pub fn is_wake_armed(&self) -> bool {
        self.state.wake.load(Ordering::SeqCst)
    }
}

impl Debug for MockIrqChip {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockIrqChip")
    }
}

impl IrqChip for MockIrqChip {
    fn request_irq(
        &self,
        line: Box<dyn GpioInput>,
        trigger: IrqTrigger,
        name: &str,
        handler: Box<dyn IrqHandler>,
    ) -> GpioResult<Box<dyn IrqRegistration>> {
        if self.fail {
            return Err(GpioError::Other("injected failure".to_string()));
        }

        let resource = format!("irq {}", name);
        self.ledger.acquire(&resource);
        *self.requested.lock().unwrap() = Some(Requested { _line: line, handler });
        *self.trigger.lock().unwrap() = Some(trigger);
        self.state.enabled.store(true, Ordering::SeqCst);
        self.state.wake.store(false, Ordering::SeqCst);

        Ok(Box::new(MockIrqRegistration {
            ledger: self.ledger.clone(),
            resource,
            trigger,
            requested: Arc::clone(&self.requested),
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockIrqRegistration {
    ledger: Ledger,
    resource: String,
    trigger: IrqTrigger,
    requested: Arc<Mutex<Option<Requested>>>,
    state: Arc<IrqState>,
}

impl Debug for MockIrqRegistration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockIrq({})", self.resource)
    }
}

impl IrqRegistration for MockIrqRegistration {
    fn trigger(&self) -> IrqTrigger {
        self.trigger
    }

    fn enable(&self) -> GpioResult<()> {
        self.ledger.record("irq enable");
        self.state.enabled.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disable(&self) -> GpioResult<()> {
        self.ledger.record("irq disable");
        self.state.enabled.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.state.enabled.load(Ordering::SeqCst)
    }

    fn enable_wake(&self) -> GpioResult<()> {
        self.ledger.record("irq enable_wake");
        self.state.wake.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disable_wake(&self) -> GpioResult<()> {
        self.ledger.record("irq disable_wake");
        self.state.wake.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_wake_armed(&self) -> bool {
        self.state.wake.load(Ordering::SeqCst)
    }
}

impl Drop for MockIrqRegistration {
    fn drop(&mut self) {
        let requested = self.requested.lock().unwrap().take();
        drop(requested);
        self.ledger.release(&self.resource);
    }
}

#[derive(Clone, Debug, Default)]
pub struct DeviceInfo {
    pub name: String,
    pub id: InputId,
    pub capabilities: Vec<(EventType, u16)>,
    pub registered: bool,
}

/// An input backend keeping every synced batch.
pub struct MockInputBackend {
    ledger: Ledger,
    pub fail_allocate: bool,
    pub fail_register: bool,
    pub info: Arc<Mutex<DeviceInfo>>,
    batches: Arc<Mutex<Vec<Vec<InputEvent>>>>,
}

impl MockInputBackend {
    pub fn new(ledger: Ledger) -> Self {
        MockInputBackend {
            ledger,
            fail_allocate: false,
            fail_register: false,
            info: Arc::new(Mutex::new(DeviceInfo::default())),
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn batches(&self) -> Vec<Vec<InputEvent>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn info(&self) -> DeviceInfo {
        self.info.lock().unwrap().clone()
    }
}

impl Debug for MockInputBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockInputBackend")
    }
}

impl InputBackend for MockInputBackend {
    fn allocate(&self) -> InputResult<Box<dyn InputDevice>> {
        if self.fail_allocate {
            return Err(InputError::Allocation);
        }
        self.ledger.acquire("input");
        Ok(Box::new(MockInputDevice {
            ledger: self.ledger.clone(),
            fail_register: self.fail_register,
            info: Arc::clone(&self.info),
            batches: Arc::clone(&self.batches),
        }))
    }
}

struct MockInputDevice {
    ledger: Ledger,
    fail_register: bool,
    info: Arc<Mutex<DeviceInfo>>,
    batches: Arc<Mutex<Vec<Vec<InputEvent>>>>,
}

impl Debug for MockInputDevice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockInputDevice")
    }
}

impl InputDevice for MockInputDevice {
    fn set_name(&mut self, name: &str) {
        self.info.lock().unwrap().name = name.to_string();
    }

    fn set_id(&mut self, id: InputId) {
        self.info.lock().unwrap().id = id;
    }

    fn set_capability(&mut self, kind: EventType, code: u16) {
        self.info.lock().unwrap().capabilities.push((kind, code));
    }

    fn reporter(&mut self) -> InputResult<Box<dyn InputReporter>> {
        Ok(Box::new(MockReporter {
            pending: Vec::with_capacity(8),
            batches: Arc::clone(&self.batches),
        }))
    }

    fn register(&mut self) -> InputResult<Box<dyn InputRegistration>> {
        if self.fail_register {
            return Err(InputError::Registration("injected failure".to_string()));
        }
        self.ledger.acquire("input registration");
        self.info.lock().unwrap().registered = true;
        Ok(Box::new(MockInputRegistration {
            ledger: self.ledger.clone(),
            info: Arc::clone(&self.info),
        }))
    }
}

impl Drop for MockInputDevice {
    fn drop(&mut self) {
        self.ledger.release("input");
    }
}

struct MockReporter {
    pending: Vec<InputEvent>,
    batches: Arc<Mutex<Vec<Vec<InputEvent>>>>,
}

impl Debug for MockReporter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockReporter")
    }
}

impl InputReporter for MockReporter {
    fn event(&mut self, event: InputEvent) {
        if event.kind == EventType::Syn {
            let batch = std::mem::take(&mut self.pending);
            self.batches.lock().unwrap().push(batch);
        } else {
            self.pending.push(event);
        }
    }
}

struct MockInputRegistration {
    ledger: Ledger,
    info: Arc<Mutex<DeviceInfo>>,
}

impl Debug for MockInputRegistration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockInputRegistration")
    }
}

impl InputRegistration for MockInputRegistration {}

impl Drop for MockInputRegistration {
    fn drop(&mut self) {
        self.info.lock().unwrap().registered = false;
        self.ledger.release("input registration");
    }
}

/// All mocks of one test, sharing a ledger.
pub struct Rig {
    pub ledger: Ledger,
    pub gpio: MockGpio,
    pub irq: MockIrqChip,
    pub input: MockInputBackend,
}

impl Rig {
    pub fn new() -> Self {
        let ledger = Ledger::default();
        Rig {
            gpio: MockGpio::new(ledger.clone()),
            irq: MockIrqChip::new(ledger.clone()),
            input: MockInputBackend::new(ledger.clone()),
            ledger,
        }
    }

    pub fn platform(&self) -> Platform<'_> {
        Platform {
            gpio: &self.gpio,
            irq: &self.irq,
            input: &self.input,
        }
    }
}

pub const STROBE_LINE: u32 = 0;
pub const DATA_LINES: [u32; 4] = [1, 2, 3, 4];

/// A complete description: strobe on line 0, Q1..Q4 on lines 1..4, the 4x4 tone keymap.
pub fn node() -> DeviceNode {
    DeviceNode {
        compatible: vec!["microsemi,mt88l70".to_string()],
        strobe_gpios: vec![Some(GpioSpec::new(STROBE_LINE))],
        data_gpios: DATA_LINES.iter().map(|&line| Some(GpioSpec::new(line))).collect(),
        keymap: Some(DtmfTone::default_keymap_entries()),
        num_rows: Some(4),
        num_columns: Some(4),
        wakeup_source: false,
    }
}

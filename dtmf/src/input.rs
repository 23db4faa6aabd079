//! The input event sink the decoder reports to.
//!
//! A backend allocates [InputDevice]s. A device is configured (name, id, capabilities, keymap),
//! hands out an [InputReporter] for the interrupt handler and is finally registered. Events
//! between two [InputReporter::sync] calls form one batch that consumers see as a whole.

use std::fmt::Debug;
use serde::Serialize;
use thiserror::Error;
use crate::keymap::{KeyCode, Keymap};

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum InputError {
    #[error("failed to allocate input device")]
    Allocation,
    #[error("could not register input device: {0}")]
    Registration(String),
}

pub type InputResult<T> = Result<T, InputError>;

/// Event classes of the Linux input subsystem the driver reports.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Syn,
    Key,
    Msc,
}

/// `Syn` code closing a batch.
pub const SYN_REPORT: u16 = 0x00;
/// `Msc` code carrying a raw scan code.
pub const MSC_SCAN: u16 = 0x04;

/// Host bus type for devices wired straight to the SoC.
pub const BUS_HOST: u16 = 0x19;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct InputId {
    pub bustype: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct InputEvent {
    #[serde(rename = "type")]
    pub kind: EventType,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    pub fn new(kind: EventType, code: u16, value: i32) -> Self {
        InputEvent { kind, code, value }
    }

    pub fn key(code: KeyCode, pressed: bool) -> Self {
        InputEvent::new(EventType::Key, code.0, pressed as i32)
    }

    pub fn scan(code: u8) -> Self {
        InputEvent::new(EventType::Msc, MSC_SCAN, code as i32)
    }
}

pub trait InputBackend: Debug + Send + Sync {
    fn allocate(&self) -> InputResult<Box<dyn InputDevice>>;
}

pub trait InputDevice: Debug + Send {
    fn set_name(&mut self, name: &str);
    fn set_id(&mut self, id: InputId);

    /// Declares that the device reports events of `kind` with `code`.
    fn set_capability(&mut self, kind: EventType, code: u16);

    /// Installs the keymap and declares every key it maps.
    fn set_keymap(&mut self, keymap: &Keymap) {
        for code in keymap.keys() {
            self.set_capability(EventType::Key, code.0);
        }
    }

    /// Gets a handle emitting events from this device.
    fn reporter(&mut self) -> InputResult<Box<dyn InputReporter>>;

    /// Makes the device visible to consumers. Dropping the registration unregisters it.
    fn register(&mut self) -> InputResult<Box<dyn InputRegistration>>;
}

/// Emits events of one device.
///
/// Called from the interrupt handler, so recording an event must not allocate or block. Closing
/// a batch with [InputReporter::sync] may block in sinks that write the batch out from userspace.
pub trait InputReporter: Debug + Send {
    fn event(&mut self, event: InputEvent);

    fn report_key(&mut self, code: KeyCode, pressed: bool) {
        self.event(InputEvent::key(code, pressed));
    }

    /// Closes the current batch.
    fn sync(&mut self) {
        self.event(InputEvent::new(EventType::Syn, SYN_REPORT, 0));
    }
}

pub trait InputRegistration: Debug + Send {}

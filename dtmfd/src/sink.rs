use std::fmt::{Debug, Formatter};
use std::io::{stdout, Write};
use log::{debug, error, info};
use mt88l70::input::{
    EventType, InputBackend, InputDevice, InputEvent, InputId, InputRegistration, InputReporter,
    InputResult,
};
use serde::Serialize;
use time::{OffsetDateTime, UtcOffset};

/// Prints the events of every device it allocates to stdout, one JSON object per line.
#[derive(Debug)]
pub struct StdoutInput {
    offset: UtcOffset,
}

impl StdoutInput {
    /// Creates a sink timestamping events in the given offset.
    ///
    /// The local offset can only be queried reliably while the process has a single thread, so
    /// it is resolved by the caller at startup.
    pub fn new(offset: UtcOffset) -> Self {
        StdoutInput { offset }
    }
}

impl InputBackend for StdoutInput {
    fn allocate(&self) -> InputResult<Box<dyn InputDevice>> {
        Ok(Box::new(StdoutDevice {
            name: String::new(),
            id: InputId::default(),
            capabilities: Vec::new(),
            offset: self.offset,
        }))
    }
}

struct StdoutDevice {
    name: String,
    id: InputId,
    capabilities: Vec<(EventType, u16)>,
    offset: UtcOffset,
}

impl Debug for StdoutDevice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "StdoutDevice({}, {} capabilities)", self.name, self.capabilities.len())
    }
}

impl InputDevice for StdoutDevice {
    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn set_id(&mut self, id: InputId) {
        self.id = id;
    }

    fn set_capability(&mut self, kind: EventType, code: u16) {
        if !self.capabilities.contains(&(kind, code)) {
            self.capabilities.push((kind, code));
        }
    }

    fn reporter(&mut self) -> InputResult<Box<dyn InputReporter>> {
        Ok(Box::new(StdoutReporter {
            device: self.name.clone(),
            offset: self.offset,
            pending: Vec::with_capacity(8),
            buffer: Vec::with_capacity(512),
        }))
    }

    fn register(&mut self) -> InputResult<Box<dyn InputRegistration>> {
        info!(
            "Input device {} registered (bus {:#x}, {} capabilities)",
            self.name, self.id.bustype, self.capabilities.len(),
        );
        Ok(Box::new(StdoutRegistration {
            name: self.name.clone(),
        }))
    }
}

#[derive(Serialize)]
struct PrintedEvent<'a> {
    device: &'a str,
    time: &'a str,
    #[serde(flatten)]
    event: InputEvent,
}

fn timestamp(now: OffsetDateTime) -> String {
    format!(
        "{:02}:{:02}:{:02}.{:06}",
        now.hour(),
        now.minute(),
        now.second(),
        now.microsecond(),
    )
}

struct StdoutReporter {
    device: String,
    offset: UtcOffset,
    pending: Vec<InputEvent>,
    buffer: Vec<u8>,
}

impl StdoutReporter {
    /// Renders the pending batch into the buffer, one line per event, all sharing `time`.
    fn render(&mut self, time: &str) -> serde_json::Result<()> {
        self.buffer.clear();
        for event in self.pending.drain(..) {
            let printed = PrintedEvent {
                device: &self.device,
                time,
                event,
            };
            serde_json::to_writer(&mut self.buffer, &printed)?;
            self.buffer.push(b'\n');
        }
        Ok(())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let time = timestamp(OffsetDateTime::now_utc().to_offset(self.offset));
        self.render(&time)?;

        let mut out = stdout().lock();
        out.write_all(&self.buffer)?;
        out.flush()
    }
}

impl Debug for StdoutReporter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "StdoutReporter({})", self.device)
    }
}

impl InputReporter for StdoutReporter {
    fn event(&mut self, event: InputEvent) {
        if event.kind != EventType::Syn {
            self.pending.push(event);
            return;
        }

        if let Err(e) = self.flush() {
            error!("Failed to print events of {}: {}", self.device, e);
            self.pending.clear();
        }
    }
}

#[derive(Debug)]
struct StdoutRegistration {
    name: String,
}

impl InputRegistration for StdoutRegistration {}

impl Drop for StdoutRegistration {
    fn drop(&mut self) {
        debug!("Input device {} unregistered", self.name);
    }
}

//! Test doubles for the event sink and the clock

use std::cell::Cell;
use std::io;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use evdev::{EventType, InputEvent, Key};

use tracing_subscriber::fmt::MakeWriter;

use crate::clock::Clock;
use crate::disambiguator::{EventSink, KeyState};

/// One thing the sink was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Key(Key, KeyState),
    Forwarded {
        kind: EventType,
        code: u16,
        value: i32,
    },
    Sync,
}

/// Records every call instead of writing to a device.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub outputs: Vec<Output>,
    /// When set, `synchronize` fails with this error kind
    pub fail_on_sync: Option<io::ErrorKind>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, key: Key, state: KeyState) -> io::Result<()> {
        self.outputs.push(Output::Key(key, state));
        Ok(())
    }

    fn forward(&mut self, event: InputEvent) -> io::Result<()> {
        self.outputs.push(Output::Forwarded {
            kind: event.event_type(),
            code: event.code(),
            value: event.value(),
        });
        Ok(())
    }

    fn synchronize(&mut self) -> io::Result<()> {
        if let Some(kind) = self.fail_on_sync {
            return Err(io::Error::new(kind, "sink failure"));
        }
        self.outputs.push(Output::Sync);
        Ok(())
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }
}

/// Log output collected in memory.
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

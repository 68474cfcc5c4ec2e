#![allow(dead_code)]
//! Test harness for pidal-core integration tests.

use std::sync::{Arc, Mutex};

use pidal_core::clock::ManualClock;
use pidal_core::gpio::SimulatedPins;
use pidal_core::midi::MemorySink;
use pidal_core::{handler, Configuration, Engine, EngineError, EngineResult, Settings};

pub const FOOTSWITCH_PINS: [u8; 4] = [16, 20, 21, 26];
pub const AUXILIARY_PINS: [u8; 4] = [17, 22, 23, 27];
pub const PORT: &str = "to_gtx";

/// Engine wired to simulated pins, a manual clock and a recording sink.
/// Inputs are initialized; the release poller is not started, so tests
/// drive releases with [`Rig::settle`].
pub struct Rig {
    pub engine: Arc<Engine>,
    pub pins: Arc<SimulatedPins>,
    pub clock: Arc<ManualClock>,
    pub sink: Arc<MemorySink>,
}

impl Rig {
    pub fn new() -> Self {
        let pins = Arc::new(SimulatedPins::new());
        let clock = Arc::new(ManualClock::new());
        let sink = Arc::new(MemorySink::with_ports(&[PORT]));
        let engine = Engine::builder(Settings::defaults())
            .pins(pins.clone())
            .clock(clock.clone())
            .output(sink.clone())
            .build();
        engine.initialize().unwrap();
        Self {
            engine,
            pins,
            clock,
            sink,
        }
    }

    pub fn press(&self, index: usize) {
        self.pins.press(FOOTSWITCH_PINS[index]);
    }

    pub fn release(&self, index: usize) {
        self.pins.release(FOOTSWITCH_PINS[index]);
    }

    /// Let the quiet interval pass and run a release pass.
    pub fn settle(&self) -> Vec<usize> {
        self.clock.advance_ms(150);
        self.engine.poll_releases()
    }

    /// Full press/release cycle on footswitch `index`.
    pub fn tap(&self, index: usize) {
        self.settle();
        self.press(index);
        self.release(index);
        self.settle();
    }

    pub fn aux(&self, index: usize) {
        self.pins.press(AUXILIARY_PINS[index]);
        self.pins.release(AUXILIARY_PINS[index]);
    }
}

/// Shared event log.
#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

/// Configuration that logs its hooks and binds every footswitch to a
/// logging handler.
pub struct Recording {
    pub name: String,
    pub log: Log,
    pub fail_enter: bool,
    pub fail_leave: bool,
}

impl Recording {
    pub fn new(name: &str, log: &Log) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log: log.clone(),
            fail_enter: false,
            fail_leave: false,
        })
    }
}

impl Configuration for Recording {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_enter(&self, engine: &Engine) -> EngineResult {
        self.log.push(format!("enter {}", self.name));
        for index in 0..4 {
            let log = self.log.clone();
            let name = self.name.clone();
            engine.register_footswitch(
                index,
                handler(move |pressed| log.push(format!("{} fs{} {}", name, index, pressed))),
            )?;
        }
        if self.fail_enter {
            return Err(EngineError::InvalidIndex(99));
        }
        Ok(())
    }

    fn on_leave(&self, _engine: &Engine) -> EngineResult {
        self.log.push(format!("leave {}", self.name));
        if self.fail_leave {
            return Err(EngineError::InvalidIndex(98));
        }
        Ok(())
    }

    fn set_controller(&self, _engine: &Engine, controller: &str, value: u8) {
        self.log.push(format!("{} {}={}", self.name, controller, value));
    }
}

//! MIDI boundary: outbound sinks, inbound sources, and the input handler
//! chain that inbound messages are offered to.

mod ports;
mod program_map;

pub use ports::{wait_for_device, MidirInput, MidirOutputs};
pub use program_map::{ProgramAction, ProgramMap};

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;

use pidal_types::MidiMessage;

use crate::error::{EngineError, EngineResult};

/// Destination for outbound messages, addressed by port name.
pub trait MidiSink: Send + Sync {
    /// Fails with [`EngineError::InvalidPort`] if `port` is unknown.
    fn send(&self, message: &MidiMessage, port: &str) -> EngineResult;

    fn has_port(&self, port: &str) -> bool;
}

/// Records everything sent. Used by tests and when running without a MIDI
/// subsystem.
#[derive(Default)]
pub struct MemorySink {
    ports: Mutex<Vec<String>>,
    sent: Mutex<Vec<(String, MidiMessage)>>,
}

impl MemorySink {
    pub fn with_ports(ports: &[&str]) -> Self {
        Self {
            ports: Mutex::new(ports.iter().map(|p| p.to_string()).collect()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn add_port(&self, port: &str) {
        let mut ports = self.ports.lock().unwrap_or_else(|e| e.into_inner());
        if !ports.iter().any(|p| p == port) {
            ports.push(port.to_string());
        }
    }

    pub fn sent(&self) -> Vec<(String, MidiMessage)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl MidiSink for MemorySink {
    fn send(&self, message: &MidiMessage, port: &str) -> EngineResult {
        if !self.has_port(port) {
            return Err(EngineError::InvalidPort(port.to_string()));
        }
        log::debug!(target: "midi", "{} <- {:?}", port, message);
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((port.to_string(), *message));
        Ok(())
    }

    fn has_port(&self, port: &str) -> bool {
        self.ports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|p| p == port)
    }
}

/// Blocking source of inbound messages.
pub trait MidiSource: Send {
    /// Wait for the next message. None once the source is closed.
    fn receive(&mut self) -> Option<MidiMessage>;
}

/// Source backed by a channel; the sending half may live in a driver
/// callback or a test.
pub struct ChannelSource {
    rx: Receiver<MidiMessage>,
}

impl ChannelSource {
    pub fn new(rx: Receiver<MidiMessage>) -> Self {
        Self { rx }
    }
}

impl MidiSource for ChannelSource {
    fn receive(&mut self) -> Option<MidiMessage> {
        self.rx.recv().ok()
    }
}

/// Returns Ok(true) once the message is fully handled; Ok(false) passes it
/// on down the chain.
pub type InputHandler = Arc<dyn Fn(&MidiMessage) -> EngineResult<bool> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Ordered input handlers. Each message is offered to them in
/// registration order until one consumes it. A handler that errors or
/// panics is treated as not having consumed the message.
#[derive(Default)]
pub struct InputChain {
    handlers: Mutex<Vec<(HandlerId, InputHandler)>>,
    next_id: AtomicU64,
}

impl InputChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&self, f: F) -> HandlerId
    where
        F: Fn(&MidiMessage) -> EngineResult<bool> + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(f)));
        id
    }

    /// Returns whether a handler was removed.
    pub fn remove(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        let before = handlers.len();
        handlers.retain(|(h, _)| *h != id);
        handlers.len() != before
    }

    pub fn len(&self) -> usize {
        self.handlers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offer `message` down the chain. Returns whether it was consumed.
    pub fn dispatch(&self, message: &MidiMessage) -> bool {
        // Snapshot so handlers can add/remove handlers while running.
        let handlers: Vec<(HandlerId, InputHandler)> = self
            .handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        for (id, h) in handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| h(message))) {
                Ok(Ok(true)) => return true,
                Ok(Ok(false)) => {}
                Ok(Err(e)) => {
                    log::warn!(target: "midi", "input handler {:?} failed on {:?}: {}", id, message, e)
                }
                Err(_) => {
                    log::warn!(target: "midi", "input handler {:?} panicked on {:?}", id, message)
                }
            }
        }
        false
    }
}

/// Pull messages from `source` and run them through `chain` until the
/// source closes.
pub fn spawn_input_loop(
    mut source: Box<dyn MidiSource>,
    chain: Arc<InputChain>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("pidal-midi-in".into())
        .spawn(move || {
            while let Some(message) = source.receive() {
                if !chain.dispatch(&message) {
                    log::trace!(target: "midi", "unhandled {:?}", message);
                }
            }
            log::debug!(target: "midi", "input source closed");
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn cc(value: u8) -> MidiMessage {
        MidiMessage::control_change(0, 7, value)
    }

    #[test]
    fn first_consumer_stops_the_chain() {
        let chain = InputChain::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for (tag, consume) in [(1, false), (2, true), (3, true)] {
            let order = order.clone();
            chain.add(move |_| {
                order.lock().unwrap().push(tag);
                Ok(consume)
            });
        }
        assert!(chain.dispatch(&cc(1)));
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn erroring_handler_passes_message_on() {
        let chain = InputChain::new();
        let reached = Arc::new(AtomicUsize::new(0));
        chain.add(|_| Err(EngineError::Midi("boom".into())));
        let r = reached.clone();
        chain.add(move |_| {
            r.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        });
        assert!(chain.dispatch(&cc(2)));
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_handler_passes_message_on() {
        let chain = InputChain::new();
        let reached = Arc::new(AtomicUsize::new(0));
        chain.add(|_| panic!("handler bug"));
        let r = reached.clone();
        chain.add(move |_| {
            r.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        });
        assert!(!chain.dispatch(&cc(3)));
        assert!(!chain.dispatch(&cc(4)));
        assert_eq!(reached.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn removed_handler_no_longer_runs() {
        let chain = InputChain::new();
        let id = chain.add(|_| Ok(true));
        assert_eq!(chain.len(), 1);
        assert!(chain.remove(id));
        assert!(!chain.remove(id));
        assert!(!chain.dispatch(&cc(0)));
    }

    #[test]
    fn input_loop_drains_source_until_closed() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let chain = Arc::new(InputChain::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        chain.add(move |m| {
            s.lock().unwrap().push(*m);
            Ok(true)
        });

        let handle = spawn_input_loop(Box::new(ChannelSource::new(rx)), chain).unwrap();
        tx.send(cc(10)).unwrap();
        tx.send(cc(11)).unwrap();
        drop(tx);
        handle.join().unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![cc(10), cc(11)]);
    }

    #[test]
    fn memory_sink_rejects_unknown_port() {
        let sink = MemorySink::with_ports(&["a"]);
        assert!(sink.send(&cc(1), "a").is_ok());
        assert_eq!(sink.send(&cc(1), "b"), Err(EngineError::InvalidPort("b".into())));
        sink.add_port("b");
        assert!(sink.send(&cc(1), "b").is_ok());
        assert_eq!(sink.sent().len(), 2);
    }
}

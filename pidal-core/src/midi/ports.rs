use std::collections::HashMap;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};

use pidal_types::MidiMessage;

use super::{ChannelSource, MidiSink};
use crate::error::{EngineError, EngineResult};

/// Named output ports on the system MIDI subsystem.
pub struct MidirOutputs {
    client_name: String,
    connections: Mutex<HashMap<String, MidiOutputConnection>>,
}

impl MidirOutputs {
    pub fn new(client_name: &str) -> Self {
        Self {
            client_name: client_name.to_string(),
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Create a virtual output port that other clients can subscribe to.
    #[cfg(unix)]
    pub fn create_port(&self, port_name: &str) -> EngineResult {
        use midir::os::unix::VirtualOutput;

        let out = MidiOutput::new(&self.client_name)?;
        let conn = out
            .create_virtual(port_name)
            .map_err(|e| EngineError::Midi(e.to_string()))?;
        self.insert(port_name, conn);
        log::info!(target: "midi", "created output port {}", port_name);
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn create_port(&self, port_name: &str) -> EngineResult {
        Err(EngineError::Midi(format!(
            "virtual port {} not supported on this platform",
            port_name
        )))
    }

    /// Open an output named `port_name` connected to the first existing
    /// device whose name contains `device`.
    pub fn connect_device(&self, port_name: &str, device: &str) -> EngineResult {
        let out = MidiOutput::new(&self.client_name)?;
        let port = out
            .ports()
            .into_iter()
            .find(|p| out.port_name(p).map(|n| n.contains(device)).unwrap_or(false))
            .ok_or_else(|| EngineError::InvalidPort(device.to_string()))?;
        let conn = out
            .connect(&port, port_name)
            .map_err(|e| EngineError::Midi(e.to_string()))?;
        self.insert(port_name, conn);
        log::info!(target: "midi", "output {} connected to {}", port_name, device);
        Ok(())
    }

    fn insert(&self, port_name: &str, conn: MidiOutputConnection) {
        let previous = self
            .connections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(port_name.to_string(), conn);
        if let Some(old) = previous {
            old.close();
        }
    }
}

impl MidiSink for MidirOutputs {
    fn send(&self, message: &MidiMessage, port: &str) -> EngineResult {
        let mut connections = self.connections.lock().unwrap_or_else(|e| e.into_inner());
        let conn = connections
            .get_mut(port)
            .ok_or_else(|| EngineError::InvalidPort(port.to_string()))?;
        conn.send(&message.to_bytes())?;
        Ok(())
    }

    fn has_port(&self, port: &str) -> bool {
        self.connections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(port)
    }
}

/// An open input port. Decoded messages are queued on a channel; hand
/// [`MidirInput::source`] to the engine's input loop. Dropping this closes
/// the port, which in turn ends the loop.
pub struct MidirInput {
    connection: Option<MidiInputConnection<()>>,
    rx: Receiver<MidiMessage>,
}

impl MidirInput {
    /// Connect to the first device whose name contains `device`.
    pub fn connect_device(client_name: &str, port_name: &str, device: &str) -> EngineResult<Self> {
        let mut midi_in = MidiInput::new(client_name)?;
        midi_in.ignore(Ignore::All);
        let port = midi_in
            .ports()
            .into_iter()
            .find(|p| midi_in.port_name(p).map(|n| n.contains(device)).unwrap_or(false))
            .ok_or_else(|| EngineError::InvalidPort(device.to_string()))?;

        let (tx, rx) = crossbeam_channel::unbounded();
        let connection = midi_in
            .connect(
                &port,
                port_name,
                move |_timestamp, data, _| {
                    if let Some(message) = MidiMessage::parse(data) {
                        let _ = tx.send(message);
                    }
                },
                (),
            )
            .map_err(|e| EngineError::Midi(e.to_string()))?;

        log::info!(target: "midi", "input {} connected to {}", port_name, device);
        Ok(Self {
            connection: Some(connection),
            rx,
        })
    }

    /// Create a virtual input port other clients can send to.
    #[cfg(unix)]
    pub fn create_port(client_name: &str, port_name: &str) -> EngineResult<Self> {
        use midir::os::unix::VirtualInput;

        let mut midi_in = MidiInput::new(client_name)?;
        midi_in.ignore(Ignore::All);
        let (tx, rx) = crossbeam_channel::unbounded();
        let connection = midi_in
            .create_virtual(
                port_name,
                move |_timestamp, data, _| {
                    if let Some(message) = MidiMessage::parse(data) {
                        let _ = tx.send(message);
                    }
                },
                (),
            )
            .map_err(|e| EngineError::Midi(e.to_string()))?;

        log::info!(target: "midi", "created input port {}", port_name);
        Ok(Self {
            connection: Some(connection),
            rx,
        })
    }

    pub fn source(&self) -> ChannelSource {
        ChannelSource::new(self.rx.clone())
    }

    pub fn close(&mut self) {
        if let Some(conn) = self.connection.take() {
            conn.close();
        }
    }
}

impl Drop for MidirInput {
    fn drop(&mut self) {
        self.close();
    }
}

fn device_present(client_name: &str, device: &str) -> EngineResult<bool> {
    let midi_in = MidiInput::new(client_name)?;
    for port in midi_in.ports() {
        if midi_in.port_name(&port)?.contains(device) {
            return Ok(true);
        }
    }
    let midi_out = MidiOutput::new(client_name)?;
    for port in midi_out.ports() {
        if midi_out.port_name(&port)?.contains(device) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Poll the device list until a port whose name contains `device` shows
/// up, or `timeout` passes.
pub fn wait_for_device(client_name: &str, device: &str, timeout: Duration) -> EngineResult {
    let deadline = Instant::now() + timeout;
    loop {
        if device_present(client_name, device)? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(EngineError::Timeout(device.to_string()));
        }
        thread::sleep(Duration::from_millis(100));
    }
}

//! The engine context: one per process, constructed at startup and handed
//! to every collaborator.
//!
//! Owns the footswitch debounce monitor, both dispatch stacks, the
//! Configuration registry and state machine, the notification bus, the MIDI
//! output sink and the inbound handler chain. Background work runs on two
//! threads: the release poller and (when an input source is attached) the
//! MIDI input loop. Edge callbacks run on whatever context the pin backend
//! delivers them on.

use std::sync::{Arc, Mutex, Weak};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use pidal_types::{MidiMessage, SwitchKind};

use crate::bus::{Notification, NotificationBus};
use crate::chord::PressedState;
use crate::clock::{Clock, SystemClock};
use crate::configuration::{ConfigMachine, ConfigRegistry, Configuration, Transition};
use crate::debounce::{spawn_release_poller, DebounceMonitor};
use crate::dispatch::{DispatchStack, OverlayGuard, PopStatus, SwitchHandler};
use crate::encoder;
use crate::error::{EngineError, EngineResult};
use crate::gpio::{InputPins, SimulatedPins};
use crate::midi::{spawn_input_loop, HandlerId, InputChain, MemorySink, MidiSink, MidiSource};
use crate::settings::Settings;

pub struct EngineBuilder {
    settings: Settings,
    pins: Option<Arc<dyn InputPins>>,
    output: Option<Arc<dyn MidiSink>>,
    clock: Option<Arc<dyn Clock>>,
}

impl EngineBuilder {
    /// Pin backend. Defaults to [`SimulatedPins`].
    pub fn pins(mut self, pins: Arc<dyn InputPins>) -> Self {
        self.pins = Some(pins);
        self
    }

    /// Outbound sink. Defaults to a [`MemorySink`] exposing the configured
    /// output port names.
    pub fn output(mut self, output: Arc<dyn MidiSink>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Arc<Engine> {
        let settings = self.settings;
        let pins = self
            .pins
            .unwrap_or_else(|| Arc::new(SimulatedPins::new()));
        let output = self.output.unwrap_or_else(|| {
            let ports: Vec<&str> = settings.output_ports().iter().map(String::as_str).collect();
            Arc::new(MemorySink::with_ports(&ports))
        });
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let footswitches = Arc::new(DispatchStack::new(SwitchKind::Footswitch));
        let auxiliary = Arc::new(DispatchStack::new(SwitchKind::Auxiliary));
        let monitor = Arc::new(DebounceMonitor::new(
            settings.footswitch_pins(),
            settings.quiet_interval(),
            footswitches.clone(),
            pins.clone(),
            clock,
        ));
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

        Arc::new_cyclic(|this| Engine {
            this: this.clone(),
            settings,
            footswitches,
            auxiliary,
            monitor,
            pins,
            registry: ConfigRegistry::new(),
            machine: ConfigMachine::new(),
            bus: Arc::new(NotificationBus::new()),
            output,
            inputs: Arc::new(InputChain::new()),
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            shutdown_rx,
            poller: Mutex::new(None),
            input_threads: Mutex::new(Vec::new()),
        })
    }
}

pub struct Engine {
    this: Weak<Engine>,
    settings: Settings,
    footswitches: Arc<DispatchStack>,
    auxiliary: Arc<DispatchStack>,
    monitor: Arc<DebounceMonitor>,
    pins: Arc<dyn InputPins>,
    registry: ConfigRegistry,
    machine: ConfigMachine,
    bus: Arc<NotificationBus>,
    output: Arc<dyn MidiSink>,
    inputs: Arc<InputChain>,
    shutdown_tx: Mutex<Option<Sender<()>>>,
    shutdown_rx: Receiver<()>,
    poller: Mutex<Option<JoinHandle<()>>>,
    input_threads: Mutex<Vec<JoinHandle<()>>>,
}

/// Non-owning reference to the engine for handlers stored inside it.
#[derive(Clone)]
pub struct EngineHandle(Weak<Engine>);

impl EngineHandle {
    pub fn get(&self) -> Option<Arc<Engine>> {
        self.0.upgrade()
    }

    /// Run `f` against the engine if it is still alive.
    pub fn with<R>(&self, f: impl FnOnce(&Engine) -> R) -> Option<R> {
        self.get().map(|e| f(&e))
    }
}

impl PressedState for EngineHandle {
    fn is_pressed(&self, index: usize) -> bool {
        self.with(|e| e.is_footswitch_pressed(index)).unwrap_or(false)
    }
}

impl Engine {
    pub fn builder(settings: Settings) -> EngineBuilder {
        EngineBuilder {
            settings,
            pins: None,
            output: None,
            clock: None,
        }
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle(self.this.clone())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Configure every switch pin as a pulled-up input and attach the
    /// falling-edge callbacks.
    pub fn initialize(&self) -> EngineResult {
        for pin in self.monitor.pins() {
            self.pins.setup_input(pin)?;
            let monitor = Arc::downgrade(&self.monitor);
            self.pins.on_falling_edge(
                pin,
                Arc::new(move |pin: u8| {
                    if let Some(m) = monitor.upgrade() {
                        if let Some(index) = m.index_of_pin(pin) {
                            m.edge(index);
                        }
                    }
                }),
            )?;
        }

        // Auxiliary buttons are not debounced and only report presses.
        for (index, pin) in self.settings.auxiliary_pins().into_iter().enumerate() {
            self.pins.setup_input(pin)?;
            let stack = Arc::downgrade(&self.auxiliary);
            self.pins.on_falling_edge(
                pin,
                Arc::new(move |_: u8| {
                    if let Some(s) = stack.upgrade() {
                        s.dispatch(index, true);
                    }
                }),
            )?;
        }
        log::info!(target: "engine", "inputs initialized");
        Ok(())
    }

    /// Start the release-confirmation poller.
    pub fn start(&self) -> EngineResult {
        let mut poller = self.poller.lock().unwrap_or_else(|e| e.into_inner());
        if poller.is_some() {
            return Ok(());
        }
        let handle = spawn_release_poller(
            self.monitor.clone(),
            self.settings.poll_interval(),
            self.shutdown_rx.clone(),
        )
        .map_err(|e| EngineError::Gpio(e.to_string()))?;
        *poller = Some(handle);
        Ok(())
    }

    /// Run `source` through the input handler chain on its own thread. The
    /// thread ends when the source closes.
    pub fn start_input(&self, source: Box<dyn MidiSource>) -> EngineResult {
        let handle = spawn_input_loop(source, self.inputs.clone())
            .map_err(|e| EngineError::Midi(e.to_string()))?;
        self.input_threads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(handle);
        Ok(())
    }

    /// Stop the release poller and wait for it and the input threads.
    /// Input threads only end when their source closes, so close every
    /// input port before calling this.
    pub fn shutdown(&self) {
        self.shutdown_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let poller = self.poller.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = poller {
            let _ = handle.join();
        }
        let inputs = std::mem::take(&mut *self.input_threads.lock().unwrap_or_else(|e| e.into_inner()));
        for handle in inputs {
            if handle.join().is_err() {
                log::warn!(target: "midi", "input thread panicked");
            }
        }
        log::info!(target: "engine", "shut down");
    }

    /// Invoke the embedding application's registration hook once, then
    /// activate the first registered Configuration if none is current.
    pub fn run_startup<F>(&self, hook: F) -> EngineResult
    where
        F: FnOnce(&Engine) -> EngineResult,
    {
        hook(self)?;
        if self.current_config().is_none() {
            if let Some(first) = self.registry.get(0) {
                self.set_config(first)?;
            }
        }
        Ok(())
    }

    // ── Switch registration ────────────────────────────────────────

    pub fn register_footswitch(&self, index: usize, handler: SwitchHandler) -> EngineResult {
        self.footswitches.register(index, handler)
    }

    pub fn register_auxiliary(&self, index: usize, handler: SwitchHandler) -> EngineResult {
        self.auxiliary.register(index, handler)
    }

    pub fn push_footswitch_scope(&self) {
        self.footswitches.push();
    }

    pub fn pop_footswitch_scope(&self) -> PopStatus {
        pop_logged(&self.footswitches)
    }

    pub fn push_auxiliary_scope(&self) {
        self.auxiliary.push();
    }

    pub fn pop_auxiliary_scope(&self) -> PopStatus {
        pop_logged(&self.auxiliary)
    }

    /// Push a scope on both stacks, popped when the guard drops.
    pub fn overlay(&self) -> OverlayGuard {
        OverlayGuard::new(self.footswitches.clone(), self.auxiliary.clone())
    }

    pub fn footswitch_depth(&self) -> usize {
        self.footswitches.depth()
    }

    pub fn auxiliary_depth(&self) -> usize {
        self.auxiliary.depth()
    }

    /// Deliver a synthetic footswitch event to the bound handler, leaving
    /// the debounced state and timers alone.
    pub fn emulate_press(&self, index: usize, pressed: bool) {
        self.monitor.emulate(index, pressed);
    }

    pub fn is_footswitch_pressed(&self, index: usize) -> bool {
        self.monitor.is_pressed(index)
    }

    /// Run one release-confirmation pass now. The poller thread does this
    /// on its own cadence.
    pub fn poll_releases(&self) -> Vec<usize> {
        self.monitor.poll()
    }

    // ── Configurations ─────────────────────────────────────────────

    pub fn add_config(&self, config: Arc<dyn Configuration>) {
        self.registry.add(config, None);
    }

    /// Insert at `index`, for Configurations that become available late.
    pub fn add_config_at(&self, config: Arc<dyn Configuration>, index: usize) {
        self.registry.add(config, Some(index));
    }

    pub fn configs(&self) -> Vec<Arc<dyn Configuration>> {
        self.registry.all()
    }

    pub fn registry(&self) -> &ConfigRegistry {
        &self.registry
    }

    pub fn current_config(&self) -> Option<Arc<dyn Configuration>> {
        self.machine.current()
    }

    pub fn set_config(&self, target: Arc<dyn Configuration>) -> EngineResult<Transition> {
        self.machine.set_config(self, target)
    }

    /// Forward a named controller value to the current Configuration.
    pub fn set_controller(&self, controller: &str, value: u8) {
        if let Some(config) = self.current_config() {
            config.set_controller(self, controller, value);
        }
    }

    // ── Notifications ──────────────────────────────────────────────

    pub fn subscribe<F>(&self, name: &str, subscriber: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.bus.subscribe(name, subscriber);
    }

    pub fn notify(&self, notification: Notification) -> bool {
        self.bus.notify(notification)
    }

    // ── MIDI ───────────────────────────────────────────────────────

    pub fn send(&self, message: &MidiMessage, port: &str) -> EngineResult {
        self.output.send(message, port)
    }

    /// Send the bank-select MSB/LSB + program-change sequence to `port`.
    pub fn set_program(&self, port: &str, bank: u16, program: u8) -> EngineResult {
        encoder::send_program_switch(self.output.as_ref(), port, bank, program)
    }

    pub fn has_port(&self, port: &str) -> bool {
        self.output.has_port(port)
    }

    pub fn add_input_handler<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&MidiMessage) -> EngineResult<bool> + Send + Sync + 'static,
    {
        self.inputs.add(handler)
    }

    pub fn remove_input_handler(&self, id: HandlerId) -> bool {
        self.inputs.remove(id)
    }

    /// Offer one message to the input chain on the calling thread.
    pub fn dispatch_input(&self, message: &MidiMessage) -> bool {
        self.inputs.dispatch(message)
    }
}

fn pop_logged(stack: &DispatchStack) -> PopStatus {
    let status = stack.pop();
    if status == PopStatus::AtBase {
        log::warn!(target: "dispatch", "pop on {} stack with only the base frame left", stack.kind());
    }
    status
}

impl Drop for Engine {
    fn drop(&mut self) {
        // Dropping the sender stops the poller; don't join from a drop that
        // might run on the poller's own thread.
        self.shutdown_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
    }
}

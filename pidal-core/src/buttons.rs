//! Reusable footswitch behaviors, and a Configuration assembled from them.
//!
//! A [`ButtonGroup`] covers one or more adjacent footswitches that share
//! state: a toggle, a set of radio buttons, or a set of flags whose
//! combination selects one of several states. [`ButtonConfig`] lays groups
//! out across the four footswitches and binds them on entry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use pidal_types::{MidiMessage, SWITCH_COUNT};

use crate::bus::Notification;
use crate::chord::double_press;
use crate::configuration::Configuration;
use crate::dispatch::{handler, SwitchHandler};
use crate::engine::{Engine, EngineHandle};
use crate::error::{EngineError, EngineResult};

/// Side effect performed when a button turns something on or off.
pub type Action = Arc<dyn Fn(&Engine) -> EngineResult + Send + Sync>;

pub fn action<F>(f: F) -> Action
where
    F: Fn(&Engine) -> EngineResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Does nothing.
pub fn no_action() -> Action {
    action(|_| Ok(()))
}

/// Select `bank`/`program` on `port`.
pub fn program_switch(port: &str, bank: u16, program: u8) -> Action {
    let port = port.to_string();
    action(move |e| e.set_program(&port, bank, program))
}

/// Send a single control change on channel 0.
pub fn control_change(port: &str, controller: u8, value: u8) -> Action {
    let port = port.to_string();
    action(move |e| e.send(&MidiMessage::control_change(0, controller, value), &port))
}

fn run(action: &Action, engine: &Engine, what: &str) {
    if let Err(e) = action(engine) {
        log::warn!(target: "buttons", "{} failed: {}", what, e);
    }
}

fn status(engine: &Engine, index: usize, active: bool) {
    engine.notify(Notification::PedalButtonStatus { index, active });
}

/// Press handler that asks the UI for the configuration picker.
pub fn show_config_list(engine: EngineHandle) -> SwitchHandler {
    handler(move |pressed| {
        if pressed {
            engine.with(|e| e.notify(Notification::ConfigList));
        }
    })
}

pub trait ButtonGroup: Send + Sync {
    /// One caption per footswitch this group occupies.
    fn labels(&self) -> Vec<String>;

    /// Handler for the group's `offset`-th button, bound at footswitch
    /// `index`.
    fn make_handler(&self, offset: usize, index: usize, engine: EngineHandle) -> SwitchHandler;

    /// Re-announce the indicator state of every button, starting at
    /// footswitch `first`.
    fn publish_status(&self, _first: usize, _engine: &Engine) {}
}

/// A single on/off button.
pub struct ToggleButton {
    label: String,
    enable: Action,
    disable: Action,
    enabled: Arc<AtomicBool>,
}

impl ToggleButton {
    pub fn new(label: &str, enable: Action, disable: Action) -> Self {
        Self {
            label: label.to_string(),
            enable,
            disable,
            enabled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn enabled(self, on: bool) -> Self {
        self.enabled.store(on, Ordering::SeqCst);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

impl ButtonGroup for ToggleButton {
    fn labels(&self) -> Vec<String> {
        vec![self.label.clone()]
    }

    fn make_handler(&self, _offset: usize, index: usize, engine: EngineHandle) -> SwitchHandler {
        let enable = self.enable.clone();
        let disable = self.disable.clone();
        let enabled = self.enabled.clone();
        handler(move |pressed| {
            if !pressed {
                return;
            }
            engine.with(|e| {
                let turn_on = !enabled.load(Ordering::SeqCst);
                if turn_on {
                    run(&enable, e, "enable");
                } else {
                    run(&disable, e, "disable");
                }
                enabled.store(turn_on, Ordering::SeqCst);
                status(e, index, turn_on);
            });
        })
    }

    fn publish_status(&self, first: usize, engine: &Engine) {
        status(engine, first, self.is_enabled());
    }
}

pub struct RadioButton {
    pub label: String,
    pub enable: Action,
    pub disable: Action,
}

impl RadioButton {
    pub fn new(label: &str, enable: Action, disable: Action) -> Self {
        Self {
            label: label.to_string(),
            enable,
            disable,
        }
    }
}

/// Mutually exclusive buttons: pressing one disables the active one and
/// enables itself.
pub struct RadioController {
    buttons: Arc<Vec<RadioButton>>,
    active: Arc<Mutex<usize>>,
}

impl RadioController {
    pub fn new(buttons: Vec<RadioButton>, active: usize) -> Self {
        Self {
            buttons: Arc::new(buttons),
            active: Arc::new(Mutex::new(active)),
        }
    }

    /// Offset of the active button within the group.
    pub fn active(&self) -> usize {
        *self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ButtonGroup for RadioController {
    fn labels(&self) -> Vec<String> {
        self.buttons.iter().map(|b| b.label.clone()).collect()
    }

    fn make_handler(&self, offset: usize, index: usize, engine: EngineHandle) -> SwitchHandler {
        let buttons = self.buttons.clone();
        let active = self.active.clone();
        let first = index - offset;
        handler(move |pressed| {
            if !pressed {
                return;
            }
            engine.with(|e| {
                let mut active = active.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(old) = buttons.get(*active) {
                    run(&old.disable, e, "radio disable");
                }
                if let Some(new) = buttons.get(offset) {
                    run(&new.enable, e, "radio enable");
                }
                status(e, first + *active, false);
                status(e, index, true);
                *active = offset;
            });
        })
    }

    fn publish_status(&self, first: usize, engine: &Engine) {
        let active = self.active();
        for offset in 0..self.buttons.len() {
            status(engine, first + offset, offset == active);
        }
    }
}

pub struct Actuator {
    pub enable: Action,
    pub disable: Action,
}

impl Actuator {
    pub fn new(enable: Action, disable: Action) -> Self {
        Self { enable, disable }
    }
}

/// Buttons acting as bits of a state number. With two buttons:
///
/// | first | second | state |
/// |-------|--------|-------|
/// | off   | off    | 0     |
/// | on    | off    | 1     |
/// | off   | on     | 2     |
/// | on    | on     | 3     |
///
/// Changing state disables the old state's actuator and enables the new
/// one. States past the end of the actuator list clamp to the last one.
pub struct FlagSetController {
    labels: Vec<String>,
    states: Arc<Vec<Actuator>>,
    state: Arc<Mutex<usize>>,
}

impl FlagSetController {
    pub fn new(labels: &[&str], states: Vec<Actuator>, state: usize) -> Self {
        Self {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            states: Arc::new(states),
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn state(&self) -> usize {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ButtonGroup for FlagSetController {
    fn labels(&self) -> Vec<String> {
        self.labels.clone()
    }

    fn make_handler(&self, offset: usize, index: usize, engine: EngineHandle) -> SwitchHandler {
        let states = self.states.clone();
        let state = self.state.clone();
        handler(move |pressed| {
            if !pressed || states.is_empty() {
                return;
            }
            engine.with(|e| {
                let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
                let mask = 1usize << offset;
                let turn_on = *state & mask == 0;
                let next = (*state ^ mask).min(states.len() - 1);
                if next == *state {
                    return;
                }
                if let Some(old) = states.get(*state) {
                    run(&old.disable, e, "flag disable");
                }
                run(&states[next].enable, e, "flag enable");
                status(e, index, turn_on);
                *state = next;
            });
        })
    }

    fn publish_status(&self, first: usize, engine: &Engine) {
        let state = self.state();
        for offset in 0..self.labels.len() {
            status(engine, first + offset, state & (1 << offset) != 0);
        }
    }
}

type ControllerFn = Arc<dyn Fn(&Engine, u8) + Send + Sync>;

/// A Configuration laid out from button groups. Footswitches 2 and 3 are
/// chorded: holding both asks for the configuration picker.
pub struct ButtonConfig {
    name: String,
    groups: Vec<Arc<dyn ButtonGroup>>,
    labels: [String; SWITCH_COUNT],
    enter: Option<Action>,
    leave: Option<Action>,
    controllers: HashMap<String, ControllerFn>,
}

impl ButtonConfig {
    /// Fails unless the groups cover exactly four footswitches.
    pub fn new(name: &str, groups: Vec<Arc<dyn ButtonGroup>>) -> EngineResult<Self> {
        let all: Vec<String> = groups.iter().flat_map(|g| g.labels()).collect();
        let labels: [String; SWITCH_COUNT] = all
            .try_into()
            .map_err(|v: Vec<String>| EngineError::ButtonCount(v.len()))?;
        Ok(Self {
            name: name.to_string(),
            groups,
            labels,
            enter: None,
            leave: None,
            controllers: HashMap::new(),
        })
    }

    /// Run `action` on entry, before footswitches are bound.
    pub fn on_enter_action(mut self, action: Action) -> Self {
        self.enter = Some(action);
        self
    }

    pub fn on_leave_action(mut self, action: Action) -> Self {
        self.leave = Some(action);
        self
    }

    /// Route controller `name` to `f` while this Configuration is current.
    pub fn with_controller<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&Engine, u8) + Send + Sync + 'static,
    {
        self.controllers.insert(name.to_string(), Arc::new(f));
        self
    }
}

impl Configuration for ButtonConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn button_labels(&self) -> [String; SWITCH_COUNT] {
        self.labels.clone()
    }

    fn on_enter(&self, engine: &Engine) -> EngineResult {
        if let Some(enter) = &self.enter {
            enter(engine)?;
        }

        let handle = engine.handle();
        let mut index = 0;
        for group in &self.groups {
            let first = index;
            for offset in 0..group.labels().len() {
                let mut h = group.make_handler(offset, index, handle.clone());
                h = match index {
                    2 => double_press(h, show_config_list(handle.clone()), 3, handle.clone()),
                    3 => double_press(h, show_config_list(handle.clone()), 2, handle.clone()),
                    _ => h,
                };
                engine.register_footswitch(index, h)?;
                index += 1;
            }
            group.publish_status(first, engine);
        }
        Ok(())
    }

    fn on_leave(&self, engine: &Engine) -> EngineResult {
        match &self.leave {
            Some(leave) => leave(engine),
            None => Ok(()),
        }
    }

    fn set_controller(&self, engine: &Engine, controller: &str, value: u8) {
        match self.controllers.get(controller) {
            Some(f) => f(engine, value),
            None => log::trace!(target: "buttons", "{}: no route for controller {}", self.name, controller),
        }
    }
}

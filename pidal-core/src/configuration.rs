//! Configurations and the single-active-configuration state machine.
//!
//! A [`Configuration`] is a named mapping of the four footswitches to
//! actions. It binds its handlers in `on_enter` and performs any teardown in
//! `on_leave`; the engine guarantees the outgoing Configuration's `on_leave`
//! finishes before the incoming one's `on_enter` starts.

use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use pidal_types::SWITCH_COUNT;

use crate::bus::Notification;
use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};

pub trait Configuration: Send + Sync {
    fn name(&self) -> &str;

    /// Footswitch captions for the display.
    fn button_labels(&self) -> [String; SWITCH_COUNT] {
        ["1", "2", "3", "4"].map(String::from)
    }

    /// Called when this Configuration becomes current. Bind footswitches here.
    fn on_enter(&self, _engine: &Engine) -> EngineResult {
        Ok(())
    }

    /// Called when this Configuration stops being current.
    fn on_leave(&self, _engine: &Engine) -> EngineResult {
        Ok(())
    }

    /// Continuous controller routed from an input device. Controller names
    /// are whatever the input handler that produced them chose.
    fn set_controller(&self, _engine: &Engine, _controller: &str, _value: u8) {}
}

/// Identity comparison on the data pointer, ignoring vtables.
pub fn same_config(a: &Arc<dyn Configuration>, b: &Arc<dyn Configuration>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Ordered list of every known Configuration. Has no say in which one is
/// current.
#[derive(Default)]
pub struct ConfigRegistry {
    configs: RwLock<Vec<Arc<dyn Configuration>>>,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append, or insert at `index` (clamped to the end).
    pub fn add(&self, config: Arc<dyn Configuration>, index: Option<usize>) {
        let mut configs = self.configs.write().unwrap_or_else(|e| e.into_inner());
        log::info!(target: "config", "registered configuration {:?}", config.name());
        match index {
            Some(i) => {
                let i = i.min(configs.len());
                configs.insert(i, config);
            }
            None => configs.push(config),
        }
    }

    pub fn all(&self) -> Vec<Arc<dyn Configuration>> {
        self.configs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.configs.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Arc<dyn Configuration>> {
        self.configs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(index)
            .cloned()
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn Configuration>> {
        self.configs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|c| c.name() == name)
            .cloned()
    }

    pub fn position(&self, config: &Arc<dyn Configuration>) -> Option<usize> {
        self.configs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .position(|c| same_config(c, config))
    }
}

#[derive(Clone, Default)]
pub enum ConfigState {
    #[default]
    NoConfig,
    Active(Arc<dyn Configuration>),
}

impl ConfigState {
    pub fn current(&self) -> Option<&Arc<dyn Configuration>> {
        match self {
            ConfigState::NoConfig => None,
            ConfigState::Active(c) => Some(c),
        }
    }
}

/// What [`ConfigMachine::set_config`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The target was already current.
    Unchanged,
    Changed,
}

/// Tracks the current Configuration and serializes transitions.
#[derive(Default)]
pub struct ConfigMachine {
    /// Held for the whole leave/enter sequence.
    transition: Mutex<()>,
    state: Mutex<ConfigState>,
}

impl ConfigMachine {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ConfigState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn current(&self) -> Option<Arc<dyn Configuration>> {
        self.state().current().cloned()
    }

    /// Make `target` current.
    ///
    /// No-op if it already is. Otherwise the outgoing Configuration's
    /// `on_leave` runs (a failure there is logged and the transition goes
    /// on), `target` is recorded as current, its `on_enter` runs and a
    /// `config_change` notification is published. An `on_enter` failure is
    /// returned after the notification; `target` stays current.
    ///
    /// Fails with [`EngineError::OverlayOpen`], changing nothing, while
    /// either dispatch stack holds more than its base frame: `on_enter`
    /// would bind into the overlay and lose its handlers when it closes.
    ///
    /// Hooks run without the state lock, so they may query
    /// [`ConfigMachine::current`], but must not call `set_config` themselves.
    pub fn set_config(&self, engine: &Engine, target: Arc<dyn Configuration>) -> EngineResult<Transition> {
        let _serial = self.transition.lock().unwrap_or_else(|e| e.into_inner());

        let outgoing = self.current();
        if let Some(current) = &outgoing {
            if same_config(current, &target) {
                return Ok(Transition::Unchanged);
            }
        }
        if engine.footswitch_depth() > 1 || engine.auxiliary_depth() > 1 {
            log::warn!(target: "config", "refusing switch to {:?} under an open overlay", target.name());
            return Err(EngineError::OverlayOpen);
        }
        if let Some(current) = &outgoing {
            if let Err(e) = current.on_leave(engine) {
                log::warn!(target: "config", "{:?} failed to leave cleanly: {}", current.name(), e);
            }
        }

        *self.state() = ConfigState::Active(target.clone());
        log::info!(
            target: "config",
            "configuration {:?} -> {:?}",
            outgoing.as_ref().map(|c| c.name().to_string()),
            target.name()
        );

        let entered = target.on_enter(engine);
        engine.notify(Notification::ConfigChange(target.clone()));
        entered.map(|_| Transition::Changed)
    }
}

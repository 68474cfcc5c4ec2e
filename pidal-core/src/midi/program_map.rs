use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use pidal_types::MidiMessage;

use crate::configuration::Configuration;
use crate::engine::{Engine, EngineHandle};
use crate::error::EngineResult;

/// What an inbound program change does.
#[derive(Clone)]
pub enum ProgramAction {
    /// Make the Configuration current.
    Activate(Arc<dyn Configuration>),
    /// Make the Configuration current, then press and release one of its
    /// footswitches.
    Actuate {
        config: Arc<dyn Configuration>,
        footswitch: usize,
    },
}

impl ProgramAction {
    fn run(&self, engine: &Engine) -> EngineResult {
        match self {
            ProgramAction::Activate(config) => {
                engine.set_config(config.clone())?;
            }
            ProgramAction::Actuate { config, footswitch } => {
                engine.set_config(config.clone())?;
                engine.emulate_press(*footswitch, true);
                engine.emulate_press(*footswitch, false);
            }
        }
        Ok(())
    }
}

/// Input handler driven by an external MIDI foot controller: program
/// changes select Configurations (or trigger their footswitches), and
/// named control changes are forwarded to the current Configuration.
#[derive(Default)]
pub struct ProgramMap {
    programs: RwLock<HashMap<u8, ProgramAction>>,
    controllers: RwLock<HashMap<u8, String>>,
}

impl ProgramMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_program(&self, program: u8, action: ProgramAction) {
        self.programs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(program, action);
    }

    pub fn bind_controller(&self, controller: u8, name: &str) {
        self.controllers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(controller, name.to_string());
    }

    /// Handle one inbound message. Returns whether it was consumed.
    pub fn handle(&self, engine: &Engine, message: &MidiMessage) -> EngineResult<bool> {
        match *message {
            MidiMessage::ProgramChange { program, .. } => {
                let action = self
                    .programs
                    .read()
                    .unwrap_or_else(|e| e.into_inner())
                    .get(&program)
                    .cloned();
                match action {
                    Some(action) => {
                        action.run(engine)?;
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
            MidiMessage::ControlChange {
                controller, value, ..
            } => {
                let name = self
                    .controllers
                    .read()
                    .unwrap_or_else(|e| e.into_inner())
                    .get(&controller)
                    .cloned();
                match name {
                    Some(name) => {
                        engine.set_controller(&name, value);
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
            _ => Ok(false),
        }
    }

    /// Register this map on the engine's input chain.
    pub fn install(self: &Arc<Self>, engine: &Engine) -> crate::midi::HandlerId {
        let map = self.clone();
        let handle: EngineHandle = engine.handle();
        engine.add_input_handler(move |message| match handle.get() {
            Some(engine) => map.handle(&engine, message),
            None => Ok(false),
        })
    }
}

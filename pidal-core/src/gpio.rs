//! Digital input boundary.
//!
//! The engine only needs two things from the board: the current level of a
//! pin, and a callback when a pin falls (switch pressed). A hardware backend
//! implements [`InputPins`]; [`SimulatedPins`] stands in for the board in
//! tests and on development machines.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use pidal_types::PinLevel;

use crate::error::{EngineError, EngineResult};

/// Invoked from the edge-detection context with the pin that fell.
pub type EdgeCallback = Arc<dyn Fn(u8) + Send + Sync>;

pub trait InputPins: Send + Sync {
    /// Configure `pin` as an input with pull-up.
    fn setup_input(&self, pin: u8) -> EngineResult;

    /// Sample the current level of `pin`.
    fn level(&self, pin: u8) -> PinLevel;

    /// Call `callback` on every falling edge of `pin`.
    fn on_falling_edge(&self, pin: u8, callback: EdgeCallback) -> EngineResult;
}

#[derive(Default)]
struct SimState {
    /// Pins currently held low. Everything else reads released.
    held: Vec<u8>,
    inputs: Vec<u8>,
    callbacks: HashMap<u8, EdgeCallback>,
}

/// In-memory pins. `press` pulls a pin low and fires its edge callback on
/// the calling thread; `release` lets it float back high without an edge.
#[derive(Default)]
pub struct SimulatedPins {
    state: Mutex<SimState>,
}

impl SimulatedPins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pull `pin` low and deliver a falling edge.
    pub fn press(&self, pin: u8) {
        let callback = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if !state.held.contains(&pin) {
                state.held.push(pin);
            }
            state.callbacks.get(&pin).cloned()
        };
        if let Some(cb) = callback {
            cb(pin);
        }
    }

    /// Deliver a falling edge without changing the level, as contact bounce
    /// does while a switch is already held.
    pub fn bounce(&self, pin: u8) {
        let callback = self
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .callbacks
            .get(&pin)
            .cloned();
        if let Some(cb) = callback {
            cb(pin);
        }
    }

    /// Let `pin` return high.
    pub fn release(&self, pin: u8) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.held.retain(|p| *p != pin);
    }

    pub fn is_input(&self, pin: u8) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .inputs
            .contains(&pin)
    }
}

impl InputPins for SimulatedPins {
    fn setup_input(&self, pin: u8) -> EngineResult {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.inputs.contains(&pin) {
            state.inputs.push(pin);
        }
        Ok(())
    }

    fn level(&self, pin: u8) -> PinLevel {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.held.contains(&pin) {
            PinLevel::Asserted
        } else {
            PinLevel::Released
        }
    }

    fn on_falling_edge(&self, pin: u8, callback: EdgeCallback) -> EngineResult {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.inputs.contains(&pin) {
            return Err(EngineError::Gpio(format!("pin {} is not configured as an input", pin)));
        }
        state.callbacks.insert(pin, callback);
        Ok(())
    }
}

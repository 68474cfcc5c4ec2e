//! Footswitch debouncing.
//!
//! Presses arrive through the falling-edge callback and are delivered
//! immediately. Releases are never taken from edges: a periodic pass samples
//! the pin level and confirms the release once the quiet interval since the
//! last transition has elapsed. Both paths refuse a transition that comes
//! sooner than the quiet interval after the previous one.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use pidal_types::{PinLevel, SWITCH_COUNT};

use crate::clock::Clock;
use crate::dispatch::DispatchStack;
use crate::gpio::InputPins;

/// Debounced state of one footswitch.
#[derive(Debug, Clone, Copy, Default)]
struct Switch {
    pressed: bool,
    /// None until the first genuine transition.
    last_transition: Option<Instant>,
}

impl Switch {
    fn quiet_since(&self, now: Instant, quiet: Duration) -> bool {
        match self.last_transition {
            Some(t) => now.saturating_duration_since(t) >= quiet,
            None => true,
        }
    }
}

pub struct DebounceMonitor {
    pins: [u8; SWITCH_COUNT],
    quiet: Duration,
    switches: Mutex<[Switch; SWITCH_COUNT]>,
    stack: Arc<DispatchStack>,
    input: Arc<dyn InputPins>,
    clock: Arc<dyn Clock>,
}

impl DebounceMonitor {
    pub fn new(
        pins: [u8; SWITCH_COUNT],
        quiet: Duration,
        stack: Arc<DispatchStack>,
        input: Arc<dyn InputPins>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pins,
            quiet,
            switches: Mutex::new([Switch::default(); SWITCH_COUNT]),
            stack,
            input,
            clock,
        }
    }

    fn switches(&self) -> MutexGuard<'_, [Switch; SWITCH_COUNT]> {
        self.switches.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn pins(&self) -> [u8; SWITCH_COUNT] {
        self.pins
    }

    /// Switch index wired to `pin`.
    pub fn index_of_pin(&self, pin: u8) -> Option<usize> {
        self.pins.iter().position(|p| *p == pin)
    }

    /// Debounced state of footswitch `index`.
    pub fn is_pressed(&self, index: usize) -> bool {
        self.switches().get(index).map(|s| s.pressed).unwrap_or(false)
    }

    /// Falling edge on footswitch `index`. Returns whether the edge was
    /// accepted as a press; a rejected edge is a bounce and leaves the
    /// switch state, including its transition time, untouched.
    pub fn edge(&self, index: usize) -> bool {
        let now = self.clock.now();
        {
            let mut switches = self.switches();
            let Some(sw) = switches.get_mut(index) else {
                return false;
            };
            if sw.pressed || !sw.quiet_since(now, self.quiet) {
                log::trace!(target: "debounce", "bounce on footswitch {}", index);
                return false;
            }
            sw.pressed = true;
            sw.last_transition = Some(now);
        }
        log::debug!(target: "debounce", "footswitch {} pressed", index);
        self.stack.dispatch(index, true);
        true
    }

    /// One release-confirmation pass over all switches. Returns the indices
    /// released on this pass.
    pub fn poll(&self) -> Vec<usize> {
        let now = self.clock.now();
        let released: Vec<usize> = {
            let mut switches = self.switches();
            let mut out = Vec::new();
            for (index, sw) in switches.iter_mut().enumerate() {
                if !sw.pressed || !sw.quiet_since(now, self.quiet) {
                    continue;
                }
                if self.input.level(self.pins[index]) == PinLevel::Released {
                    sw.pressed = false;
                    sw.last_transition = Some(now);
                    out.push(index);
                }
            }
            out
        };

        for &index in &released {
            log::debug!(target: "debounce", "footswitch {} released", index);
            self.stack.dispatch(index, false);
        }
        released
    }

    /// Invoke the bound handler as though footswitch `index` changed,
    /// without touching the debounced state or its timers.
    pub fn emulate(&self, index: usize, pressed: bool) {
        if index < SWITCH_COUNT {
            self.stack.dispatch(index, pressed);
        }
    }
}

/// Run [`DebounceMonitor::poll`] every `period` until `shutdown` receives a
/// message or disconnects.
pub fn spawn_release_poller(
    monitor: Arc<DebounceMonitor>,
    period: Duration,
    shutdown: Receiver<()>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("pidal-release".into())
        .spawn(move || {
            let ticker = crossbeam_channel::tick(period);
            loop {
                crossbeam_channel::select! {
                    recv(ticker) -> _ => {
                        monitor.poll();
                    }
                    recv(shutdown) -> _ => break,
                }
            }
            log::debug!(target: "debounce", "release poller stopped");
        })
}

//! # pidal-types
//!
//! Value types shared by the pidal engine and its front end: MIDI messages,
//! bank/program addresses, and the switch/pin vocabulary used by the
//! footswitch input layer.

mod midi;
mod switch;

pub use midi::{BankProgram, MidiMessage, MAX_BANK, MAX_PROGRAM};
pub use switch::{PinLevel, SwitchKind, SWITCH_COUNT};

//! Bank/program switching.
//!
//! The downstream instrument latches CC 0 (bank MSB) and CC 32 (bank LSB)
//! and applies them when the program change arrives, so the three messages
//! always go out in that order.

use pidal_types::{BankProgram, MidiMessage};

use crate::error::{EngineError, EngineResult};
use crate::midi::MidiSink;

pub const BANK_SELECT_MSB: u8 = 0;
pub const BANK_SELECT_LSB: u8 = 32;

/// The three-message sequence selecting `target` on channel 0.
pub fn encode(target: BankProgram) -> [MidiMessage; 3] {
    [
        MidiMessage::control_change(0, BANK_SELECT_MSB, target.bank_msb()),
        MidiMessage::control_change(0, BANK_SELECT_LSB, target.bank_lsb()),
        MidiMessage::program_change(0, target.program()),
    ]
}

/// Validate `bank`/`program` and send the switch sequence to `port`.
pub fn send_program_switch(sink: &dyn MidiSink, port: &str, bank: u16, program: u8) -> EngineResult {
    let target =
        BankProgram::new(bank, program).ok_or(EngineError::InvalidBankProgram { bank, program })?;
    for message in encode(target) {
        sink.send(&message, port)?;
    }
    log::debug!(target: "midi", "{}: bank {} program {}", port, bank, program);
    Ok(())
}

use serde::{Deserialize, Serialize};

/// Highest addressable bank: 14 bits split across CC 0 (MSB) and CC 32 (LSB).
pub const MAX_BANK: u16 = 16383;
/// Highest program number carried by a program-change message.
pub const MAX_PROGRAM: u8 = 127;

/// A channel voice message as sent to or received from a MIDI port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidiMessage {
    NoteOn {
        channel: u8,
        note: u8,
        velocity: u8,
    },
    NoteOff {
        channel: u8,
        note: u8,
    },
    ControlChange {
        channel: u8,
        controller: u8,
        value: u8,
    },
    ProgramChange {
        channel: u8,
        program: u8,
    },
    PitchBend {
        channel: u8,
        /// -8192 (full down) to +8191 (full up), 0 = center
        value: i16,
    },
}

impl MidiMessage {
    pub fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        MidiMessage::ControlChange {
            channel,
            controller,
            value,
        }
    }

    pub fn program_change(channel: u8, program: u8) -> Self {
        MidiMessage::ProgramChange { channel, program }
    }

    /// Serialize to the raw wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::NoteOff { channel, note } => {
                vec![0x80 | (channel & 0x0F), note & 0x7F, 0]
            }
            MidiMessage::ControlChange {
                channel,
                controller,
                value,
            } => vec![0xB0 | (channel & 0x0F), controller & 0x7F, value & 0x7F],
            MidiMessage::ProgramChange { channel, program } => {
                vec![0xC0 | (channel & 0x0F), program & 0x7F]
            }
            MidiMessage::PitchBend { channel, value } => {
                let raw = (value.clamp(-8192, 8191) + 8192) as u16;
                vec![
                    0xE0 | (channel & 0x0F),
                    (raw & 0x7F) as u8,
                    ((raw >> 7) & 0x7F) as u8,
                ]
            }
        }
    }

    /// Parse raw wire bytes. Returns None for messages this controller
    /// doesn't act on (system messages, aftertouch) and for truncated data.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let (&status, rest) = data.split_first()?;
        let channel = status & 0x0F;

        match status & 0xF0 {
            0x80 if rest.len() >= 2 => Some(MidiMessage::NoteOff {
                channel,
                note: rest[0],
            }),
            // Note On with velocity 0 is a Note Off
            0x90 if rest.len() >= 2 => {
                if rest[1] == 0 {
                    Some(MidiMessage::NoteOff {
                        channel,
                        note: rest[0],
                    })
                } else {
                    Some(MidiMessage::NoteOn {
                        channel,
                        note: rest[0],
                        velocity: rest[1],
                    })
                }
            }
            0xB0 if rest.len() >= 2 => Some(MidiMessage::ControlChange {
                channel,
                controller: rest[0],
                value: rest[1],
            }),
            0xC0 if !rest.is_empty() => Some(MidiMessage::ProgramChange {
                channel,
                program: rest[0],
            }),
            0xE0 if rest.len() >= 2 => {
                let lsb = rest[0] as i16;
                let msb = rest[1] as i16;
                Some(MidiMessage::PitchBend {
                    channel,
                    value: ((msb << 7) | lsb) - 8192,
                })
            }
            _ => None,
        }
    }
}

/// An instrument preset address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BankProgram {
    bank: u16,
    program: u8,
}

impl BankProgram {
    /// Returns None if either half is out of range.
    pub fn new(bank: u16, program: u8) -> Option<Self> {
        if bank > MAX_BANK || program > MAX_PROGRAM {
            return None;
        }
        Some(Self { bank, program })
    }

    pub fn bank(self) -> u16 {
        self.bank
    }

    pub fn program(self) -> u8 {
        self.program
    }

    /// Upper 7 bits of the bank (CC 0).
    pub fn bank_msb(self) -> u8 {
        (self.bank >> 7) as u8
    }

    /// Lower 7 bits of the bank (CC 32).
    pub fn bank_lsb(self) -> u8 {
        (self.bank & 0x7F) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_control_change() {
        let msg = MidiMessage::parse(&[0xB2, 7, 100]).unwrap();
        assert_eq!(msg, MidiMessage::control_change(2, 7, 100));
    }

    #[test]
    fn parse_note_on_velocity_zero_is_note_off() {
        let msg = MidiMessage::parse(&[0x90, 60, 0]).unwrap();
        assert!(matches!(msg, MidiMessage::NoteOff { note: 60, .. }));
    }

    #[test]
    fn parse_rejects_truncated_and_system() {
        assert!(MidiMessage::parse(&[]).is_none());
        assert!(MidiMessage::parse(&[0xB0, 7]).is_none());
        assert!(MidiMessage::parse(&[0xF8]).is_none());
    }

    #[test]
    fn program_change_bytes() {
        assert_eq!(MidiMessage::program_change(0, 5).to_bytes(), vec![0xC0, 5]);
        assert_eq!(
            MidiMessage::parse(&[0xC3, 42]),
            Some(MidiMessage::program_change(3, 42))
        );
    }

    #[test]
    fn pitch_bend_center_and_extremes() {
        let center = MidiMessage::PitchBend { channel: 0, value: 0 };
        assert_eq!(center.to_bytes(), vec![0xE0, 0x00, 0x40]);
        assert_eq!(
            MidiMessage::parse(&[0xE0, 0x7F, 0x7F]),
            Some(MidiMessage::PitchBend { channel: 0, value: 8191 })
        );
    }

    #[test]
    fn bank_program_split() {
        let bp = BankProgram::new(300, 5).unwrap();
        assert_eq!(bp.bank_msb(), 2);
        assert_eq!(bp.bank_lsb(), 44);
        assert_eq!(bp.program(), 5);
    }

    #[test]
    fn bank_program_limits() {
        assert!(BankProgram::new(MAX_BANK, MAX_PROGRAM).is_some());
        assert!(BankProgram::new(MAX_BANK + 1, 0).is_none());
        assert!(BankProgram::new(0, 128).is_none());
    }
}

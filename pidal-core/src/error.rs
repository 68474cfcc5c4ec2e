use std::fmt;

/// Result type for engine operations.
pub type EngineResult<T = ()> = Result<T, EngineError>;

/// Errors surfaced to callers of the registration and routing API.
///
/// Unbound switch slots, pops below the base frame and failing input
/// handlers are deliberately not errors; those are logged and ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A named MIDI port or device does not exist.
    InvalidPort(String),
    /// A switch index outside 0..4.
    InvalidIndex(usize),
    InvalidBankProgram { bank: u16, program: u8 },
    /// A button layout that doesn't expand to exactly four buttons.
    ButtonCount(usize),
    /// A Configuration transition was requested while an overlay scope
    /// was open on a dispatch stack.
    OverlayOpen,
    /// Waiting for a port to appear ran out of time.
    Timeout(String),
    Midi(String),
    Gpio(String),
    Settings(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPort(name) => write!(f, "port {} does not exist", name),
            Self::InvalidIndex(index) => write!(f, "switch index {} out of range", index),
            Self::InvalidBankProgram { bank, program } => {
                write!(f, "bank {} / program {} out of range", bank, program)
            }
            Self::ButtonCount(n) => write!(f, "expected 4 buttons, got {}", n),
            Self::OverlayOpen => write!(f, "cannot change configuration while an overlay is open"),
            Self::Timeout(what) => write!(f, "timed out waiting for {}", what),
            Self::Midi(e) => write!(f, "MIDI error: {}", e),
            Self::Gpio(e) => write!(f, "GPIO error: {}", e),
            Self::Settings(e) => write!(f, "settings error: {}", e),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<midir::InitError> for EngineError {
    fn from(e: midir::InitError) -> Self {
        Self::Midi(e.to_string())
    }
}

impl From<midir::SendError> for EngineError {
    fn from(e: midir::SendError) -> Self {
        Self::Midi(e.to_string())
    }
}

impl From<midir::PortInfoError> for EngineError {
    fn from(e: midir::PortInfoError) -> Self {
        Self::Midi(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        Self::Settings(e.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(e: toml::de::Error) -> Self {
        Self::Settings(e.to_string())
    }
}

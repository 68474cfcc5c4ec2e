use serde::{Deserialize, Serialize};

/// Number of footswitches, and independently the number of auxiliary buttons.
pub const SWITCH_COUNT: usize = 4;

/// Which of the two button families an index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwitchKind {
    Footswitch,
    Auxiliary,
}

impl SwitchKind {
    pub fn name(self) -> &'static str {
        match self {
            SwitchKind::Footswitch => "footswitch",
            SwitchKind::Auxiliary => "auxiliary",
        }
    }
}

impl std::fmt::Display for SwitchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Sampled level of a digital input.
///
/// Inputs are wired active-low with a pull-up: the raw pin reads 0 while the
/// switch is held (`Asserted`) and 1 once it is let go (`Released`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinLevel {
    Asserted,
    Released,
}

impl PinLevel {
    /// Interpret a raw active-low pin value.
    pub fn from_raw(raw: u8) -> Self {
        if raw == 0 {
            PinLevel::Asserted
        } else {
            PinLevel::Released
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            PinLevel::Asserted => 0,
            PinLevel::Released => 1,
        }
    }
}

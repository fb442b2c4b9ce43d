//! Common types shared across drivers, outputs and input watches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a physical line (a GPIO number on the reference board).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(u8);

impl LineId {
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn as_u8(self) -> u8 {
        self.0
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical level of a line.
///
/// Polarity (active-low wiring) is the driver's business; everything above
/// the driver only speaks in idle/active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Idle,
    Active,
}

impl Level {
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Level::Active)
    }
}

impl From<bool> for Level {
    fn from(active: bool) -> Self {
        if active { Level::Active } else { Level::Idle }
    }
}

/// Edge that fires a line watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Rising,
    Falling,
    Both,
}

impl Edge {
    /// Whether a transition from `from` to `to` fires this edge.
    #[must_use]
    pub fn fires(self, from: Level, to: Level) -> bool {
        match (self, from, to) {
            (Edge::Rising | Edge::Both, Level::Idle, Level::Active) => true,
            (Edge::Falling | Edge::Both, Level::Active, Level::Idle) => true,
            _ => false,
        }
    }
}

/// Named actuators driven by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputId {
    /// Gate lock relay (short release).
    GateLock,
    /// Strike lock relay (long release).
    StrikeLock,
    /// Reader LED, lit on grant.
    GrantIndicator,
    /// Loud reader beeper, sounded on denial.
    DenyBuzzer,
    /// Small beeper behind the keypad.
    KeypadBeeper,
    /// Beeper inside the control case.
    InsideBuzzer,
    /// Front panel error LED.
    StatusLed,
    /// Front panel run LED.
    RunLed,
}

impl OutputId {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            OutputId::GateLock => "gate_lock",
            OutputId::StrikeLock => "strike_lock",
            OutputId::GrantIndicator => "grant_indicator",
            OutputId::DenyBuzzer => "deny_buzzer",
            OutputId::KeypadBeeper => "keypad_beeper",
            OutputId::InsideBuzzer => "inside_buzzer",
            OutputId::StatusLed => "status_led",
            OutputId::RunLed => "run_led",
        }
    }
}

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

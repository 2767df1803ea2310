//! Power state: the commanded position of the actuator line.

use serde::{Deserialize, Serialize};

/// Commanded level of the power line.
///
/// Serialises as a JSON boolean (`true` = energized) so it can be embedded
/// directly in status responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "bool", into = "bool")]
pub enum PowerState {
    On,
    #[default]
    Off,
}

impl PowerState {
    /// Whether the line is energized.
    #[must_use]
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }

    /// Parse a submitted form value.
    ///
    /// Only the exact lowercase literals `on` and `off` are recognised.
    /// Anything else, including an empty value, yields `None` and must
    /// leave the current state untouched.
    #[must_use]
    pub fn from_form_value(value: &str) -> Option<Self> {
        match value {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            _ => None,
        }
    }
}

impl From<bool> for PowerState {
    fn from(energized: bool) -> Self {
        if energized { Self::On } else { Self::Off }
    }
}

impl From<PowerState> for bool {
    fn from(state: PowerState) -> Self {
        state.is_on()
    }
}

impl std::fmt::Display for PowerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
        }
    }
}

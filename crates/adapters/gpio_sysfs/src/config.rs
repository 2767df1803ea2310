//! Sysfs GPIO driver configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// Which line to drive and how.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SysfsConfig {
    /// Mount point of the sysfs GPIO class.
    pub root: PathBuf,
    /// GPIO number (kernel numbering, not the header pin).
    pub pin: u32,
    /// Invert the line: energized drives the pin low.
    pub active_low: bool,
}

impl Default for SysfsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/sys/class/gpio"),
            pin: 4,
            active_low: false,
        }
    }
}

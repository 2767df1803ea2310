//! Sysfs GPIO adapter error types.

use hpapower_domain::error::ActuatorError;

/// Errors specific to the sysfs GPIO driver.
#[derive(Debug, thiserror::Error)]
pub enum SysfsError {
    /// Writing the pin number to `export` failed.
    #[error("failed to export GPIO {pin}")]
    Export {
        pin: u32,
        #[source]
        source: std::io::Error,
    },

    /// Configuring the pin as an output failed.
    #[error("failed to set direction of GPIO {pin}")]
    Direction {
        pin: u32,
        #[source]
        source: std::io::Error,
    },

    /// Writing the level failed.
    #[error("failed to write value of GPIO {pin}")]
    Value {
        pin: u32,
        #[source]
        source: std::io::Error,
    },
}

impl From<SysfsError> for ActuatorError {
    fn from(err: SysfsError) -> Self {
        Self::Driver(Box::new(err))
    }
}

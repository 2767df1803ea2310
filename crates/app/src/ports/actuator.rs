//! Actuator port: the two primitives a hardware driver must provide.

use hpapower_domain::error::ActuatorError;

/// Drives the physical power line.
///
/// Implementations hold no state machine of their own: `initialize` is
/// called once at startup, then `set_level` any number of times. Callers
/// serialise access, so `&mut self` is enough.
pub trait ActuatorDriver: Send {
    /// Prepare the line for output.
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError`] if the hardware cannot be claimed.
    fn initialize(&mut self) -> Result<(), ActuatorError>;

    /// Drive the line to the energized (`true`) or de-energized (`false`) level.
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError`] if the level could not be applied.
    fn set_level(&mut self, energized: bool) -> Result<(), ActuatorError>;
}

impl<D: ActuatorDriver + ?Sized> ActuatorDriver for Box<D> {
    fn initialize(&mut self) -> Result<(), ActuatorError> {
        (**self).initialize()
    }

    fn set_level(&mut self, energized: bool) -> Result<(), ActuatorError> {
        (**self).set_level(energized)
    }
}

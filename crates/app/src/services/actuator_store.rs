//! Actuator state store: single source of truth for the commanded level.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hpapower_domain::error::ActuatorError;
use hpapower_domain::power::PowerState;

use crate::ports::ActuatorDriver;

struct Inner<D> {
    driver: D,
    state: PowerState,
}

/// Shared handle over the actuator driver and its last committed state.
///
/// The driver call and the state update happen under the same lock, so
/// concurrent submissions apply one at a time and a reader never sees a
/// state the hardware was not driven to. `Clone` only clones the `Arc`.
pub struct ActuatorStore<D> {
    inner: Arc<Mutex<Inner<D>>>,
}

impl<D> Clone for ActuatorStore<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: ActuatorDriver> ActuatorStore<D> {
    /// Initialize the driver and drive the line de-energized.
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError`] if the driver fails to initialize or to
    /// apply the safe level.
    #[tracing::instrument(skip(driver))]
    pub fn start(mut driver: D) -> Result<Self, ActuatorError> {
        driver.initialize()?;
        driver.set_level(false)?;
        tracing::info!("actuator initialized de-energized");
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                driver,
                state: PowerState::Off,
            })),
        })
    }

    /// Drive the line to `state` and commit it.
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError`] if the driver fails; the committed state is
    /// unchanged in that case.
    #[tracing::instrument(skip(self))]
    pub fn set(&self, state: PowerState) -> Result<(), ActuatorError> {
        let mut inner = self.lock();
        inner.driver.set_level(state.is_on())?;
        let previous = std::mem::replace(&mut inner.state, state);
        tracing::info!(%previous, current = %state, "actuator state committed");
        Ok(())
    }

    /// The last committed state.
    #[must_use]
    pub fn get(&self) -> PowerState {
        self.lock().state
    }

    /// Force the line de-energized, regardless of the last command.
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError`] if the driver fails.
    pub fn force_safe(&self) -> Result<(), ActuatorError> {
        self.set(PowerState::Off)
    }

    fn lock(&self) -> MutexGuard<'_, Inner<D>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

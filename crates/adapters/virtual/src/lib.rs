//! # hpapower-adapter-virtual
//!
//! Simulated power line for running the daemon without GPIO hardware and
//! for end-to-end tests.
//!
//! The driver only records what it is told. A [`VirtualLine`] handle
//! cloned before the driver is handed to the store keeps observing the
//! level afterwards.
//!
//! ## Dependency rule
//!
//! Depends on `hpapower-app` (port traits) and `hpapower-domain` only.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hpapower_app::ports::ActuatorDriver;
use hpapower_domain::error::ActuatorError;

/// Levels kept by [`VirtualLine::history`].
pub const HISTORY_LIMIT: usize = 64;

#[derive(Debug, Default)]
struct Line {
    initialized: bool,
    history: VecDeque<bool>,
    applied: u64,
}

/// Read side of a [`VirtualActuator`].
#[derive(Debug, Clone, Default)]
pub struct VirtualLine {
    line: Arc<Mutex<Line>>,
}

impl VirtualLine {
    /// Whether `initialize` was called.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    /// Current level, `None` before the first `set_level`.
    #[must_use]
    pub fn level(&self) -> Option<bool> {
        self.lock().history.back().copied()
    }

    /// The last [`HISTORY_LIMIT`] levels applied, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<bool> {
        self.lock().history.iter().copied().collect()
    }

    /// How many levels were applied in total.
    #[must_use]
    pub fn applied(&self) -> u64 {
        self.lock().applied
    }

    fn lock(&self) -> MutexGuard<'_, Line> {
        self.line.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory actuator driver.
#[derive(Debug, Default)]
pub struct VirtualActuator {
    line: VirtualLine,
}

impl VirtualActuator {
    /// Handle observing this driver's line.
    #[must_use]
    pub fn line(&self) -> VirtualLine {
        self.line.clone()
    }
}

impl ActuatorDriver for VirtualActuator {
    fn initialize(&mut self) -> Result<(), ActuatorError> {
        self.line.lock().initialized = true;
        tracing::debug!("virtual line initialized");
        Ok(())
    }

    fn set_level(&mut self, energized: bool) -> Result<(), ActuatorError> {
        let mut line = self.line.lock();
        if !line.initialized {
            return Err(ActuatorError::NotInitialized);
        }
        if line.history.len() == HISTORY_LIMIT {
            line.history.pop_front();
        }
        line.history.push_back(energized);
        line.applied += 1;
        tracing::debug!(energized, applied = line.applied, "virtual line level set");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hpapower_app::services::actuator_store::ActuatorStore;
    use hpapower_domain::power::PowerState;

    #[test]
    fn should_reject_set_before_initialize() {
        let mut driver = VirtualActuator::default();
        let err = driver.set_level(true).unwrap_err();
        assert!(matches!(err, ActuatorError::NotInitialized));
        assert_eq!(driver.line().level(), None);
    }

    #[test]
    fn should_record_levels_in_order() {
        let mut driver = VirtualActuator::default();
        driver.initialize().unwrap();
        driver.set_level(true).unwrap();
        driver.set_level(false).unwrap();

        assert!(driver.line().is_initialized());
        assert_eq!(driver.line().history(), vec![true, false]);
        assert_eq!(driver.line().level(), Some(false));
    }

    #[test]
    fn should_bound_history_and_keep_counting() {
        let mut driver = VirtualActuator::default();
        driver.initialize().unwrap();
        for i in 0..(HISTORY_LIMIT + 10) {
            driver.set_level(i % 2 == 0).unwrap();
        }

        let line = driver.line();
        assert_eq!(line.history().len(), HISTORY_LIMIT);
        assert_eq!(line.applied(), (HISTORY_LIMIT + 10) as u64);
        assert_eq!(line.level(), Some((HISTORY_LIMIT + 9) % 2 == 0));
        assert_eq!(line.history()[0], 10 % 2 == 0);
    }

    #[test]
    fn should_keep_observing_after_driver_moves_into_store() {
        let driver = VirtualActuator::default();
        let line = driver.line();
        let store = ActuatorStore::start(driver).unwrap();

        assert_eq!(line.level(), Some(false));
        store.set(PowerState::On).unwrap();
        assert_eq!(line.level(), Some(true));
    }
}

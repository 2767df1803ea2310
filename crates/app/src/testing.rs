//! Test doubles shared by the service tests.

use std::sync::{Arc, Mutex};

use hpapower_domain::error::ActuatorError;

use crate::ports::{ActuatorDriver, ResponseHead, ResponseSink, TransportError};

/// Driver that records every level it is asked to apply.
#[derive(Clone, Default)]
pub struct RecordingDriver {
    pub initialized: Arc<Mutex<bool>>,
    pub levels: Arc<Mutex<Vec<bool>>>,
    pub fail_set: Arc<Mutex<bool>>,
}

impl RecordingDriver {
    pub fn levels(&self) -> Vec<bool> {
        self.levels.lock().unwrap().clone()
    }

    pub fn fail_next_sets(&self) {
        *self.fail_set.lock().unwrap() = true;
    }
}

impl ActuatorDriver for RecordingDriver {
    fn initialize(&mut self) -> Result<(), ActuatorError> {
        *self.initialized.lock().unwrap() = true;
        Ok(())
    }

    fn set_level(&mut self, energized: bool) -> Result<(), ActuatorError> {
        if *self.fail_set.lock().unwrap() {
            return Err(ActuatorError::Driver(Box::new(std::io::Error::other(
                "line stuck",
            ))));
        }
        self.levels.lock().unwrap().push(energized);
        Ok(())
    }
}

/// Sink that buffers everything and can simulate a short write.
#[derive(Default)]
pub struct RecordingSink {
    pub head: Option<ResponseHead>,
    pub writable_requests: usize,
    pub body: Vec<u8>,
    pub finished: bool,
    pub accept_at_most: Option<usize>,
}

impl RecordingSink {
    pub fn body_text(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap()
    }
}

impl ResponseSink for RecordingSink {
    fn write_head(&mut self, head: &ResponseHead) -> Result<(), TransportError> {
        if self.head.is_some() {
            return Err(TransportError::HeadAlreadyWritten);
        }
        self.head = Some(*head);
        Ok(())
    }

    fn request_writable(&mut self) {
        self.writable_requests += 1;
    }

    fn write_final(&mut self, chunk: &[u8]) -> Result<usize, TransportError> {
        if self.finished {
            return Err(TransportError::AlreadyFinished);
        }
        let accepted = self.accept_at_most.map_or(chunk.len(), |max| max.min(chunk.len()));
        self.body.extend_from_slice(&chunk[..accepted]);
        Ok(accepted)
    }

    fn finish(&mut self) -> Result<(), TransportError> {
        self.finished = true;
        Ok(())
    }
}

//! Response writer: renders the actuator state as the response body.

use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};

use hpapower_domain::power::PowerState;

use crate::error::TransactionError;
use crate::ports::{ActuatorDriver, ResponseSink};
use crate::services::actuator_store::ActuatorStore;

/// Body of every control endpoint response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    pub state: PowerState,
}

/// Compact JSON with a single space after each key separator.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Emits `{"state": <bool>}` reflecting the store at write time.
pub struct ResponseWriter<D> {
    store: ActuatorStore<D>,
}

impl<D: ActuatorDriver> ResponseWriter<D> {
    /// Create a writer reading from the given store.
    pub fn new(store: ActuatorStore<D>) -> Self {
        Self { store }
    }

    /// Render the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if serialisation fails.
    pub fn render(&self) -> Result<Vec<u8>, serde_json::Error> {
        let snapshot = StateSnapshot {
            state: self.store.get(),
        };
        let mut body = Vec::with_capacity(16);
        let mut serializer = Serializer::with_formatter(&mut body, SpacedFormatter);
        snapshot.serialize(&mut serializer)?;
        Ok(body)
    }

    /// Write the snapshot as the final chunk and close the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::ShortWrite`] if the sink accepted fewer
    /// bytes than rendered, or the sink's own error.
    pub fn write(&self, sink: &mut impl ResponseSink) -> Result<usize, TransactionError> {
        let body = self.render()?;
        let written = sink.write_final(&body)?;
        if written != body.len() {
            return Err(TransactionError::ShortWrite {
                expected: body.len(),
                written,
            });
        }
        sink.finish()?;
        Ok(written)
    }
}

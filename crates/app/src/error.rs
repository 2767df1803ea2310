//! Errors that abort a single transaction.
//!
//! None of these is process-fatal: the transport terminates the affected
//! request or stream and keeps serving.

use hpapower_domain::error::{ActuatorError, FormError};

use crate::ports::TransportError;
use crate::services::transaction::Phase;

/// Why a transaction was aborted.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The body could not be decoded, or the decoder could not be built.
    #[error("form decoding failed")]
    Form(#[from] FormError),

    /// The hardware rejected the new level.
    #[error("actuator update failed")]
    Actuator(#[from] ActuatorError),

    /// The transport refused output.
    #[error("transport failure")]
    Transport(#[from] TransportError),

    /// The state snapshot could not be serialised.
    #[error("failed to render response body")]
    Render(#[from] serde_json::Error),

    /// The final chunk did not land in one write.
    #[error("short write: {written} of {expected} bytes accepted")]
    ShortWrite {
        /// Bytes handed to the transport.
        expected: usize,
        /// Bytes the transport accepted.
        written: usize,
    },

    /// `BodyComplete` arrived although no body chunk ever did.
    #[error("body completed without any body chunk")]
    BodyWithoutDecoder,

    /// A lifecycle event that makes no sense in the current phase.
    #[error("unexpected `{event}` event in phase `{phase}`")]
    UnexpectedEvent {
        /// Name of the rejected event.
        event: &'static str,
        /// Phase the transaction was in.
        phase: Phase,
    },
}

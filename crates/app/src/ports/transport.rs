//! Transport port: how a transaction emits its response.
//!
//! The transport owns the connection (keep-alive, multiplexed streams); a
//! sink only ever sees one request/response exchange.

/// Status line and framing headers of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHead {
    /// HTTP status code.
    pub status: u16,
    /// `Content-Type` header value.
    pub content_type: &'static str,
    /// `Content-Length`, or `None` to let connection framing delimit the body.
    pub content_length: Option<u64>,
}

impl ResponseHead {
    /// `200 OK` JSON response without a fixed length.
    #[must_use]
    pub fn json() -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            content_length: None,
        }
    }
}

/// Errors reported by a [`ResponseSink`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransportError {
    /// The head was written twice.
    #[error("response head already written")]
    HeadAlreadyWritten,
    /// Body bytes were written before the head.
    #[error("response body written before head")]
    HeadNotWritten,
    /// Output attempted after the final chunk.
    #[error("response already finished")]
    AlreadyFinished,
}

/// Per-transaction output side of the transport.
pub trait ResponseSink {
    /// Write the status line and headers.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the head cannot be written.
    fn write_head(&mut self, head: &ResponseHead) -> Result<(), TransportError>;

    /// Ask the transport to deliver a `Writable` event when output is possible.
    fn request_writable(&mut self);

    /// Write the final body chunk, returning how many bytes landed.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if nothing could be written.
    fn write_final(&mut self, chunk: &[u8]) -> Result<usize, TransportError>;

    /// Mark the transaction as logically finished.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the transport rejects the completion.
    fn finish(&mut self) -> Result<(), TransportError>;
}

//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts via `#[from]`.
//! The domain owns the errors of the two things every other layer touches:
//! decoding a form body and driving the actuator.

/// Errors raised while building or feeding a [`FormDecoder`](crate::form::FormDecoder).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormError {
    /// The request media type is neither url-encoded nor multipart.
    #[error("unsupported form content type `{0}`")]
    UnsupportedContentType(String),

    /// A multipart content type without a usable `boundary` parameter.
    #[error("multipart content type has no valid boundary")]
    InvalidBoundary,

    /// Buffers for the decoder could not be reserved.
    #[error("failed to allocate form decoder buffers")]
    Allocation,

    /// A `%` escape not followed by two hex digits.
    #[error("malformed percent escape in url-encoded body")]
    MalformedEscape,

    /// Multipart framing is broken (bad delimiter line, truncated body, …).
    #[error("malformed multipart body: {0}")]
    MalformedMultipart(&'static str),

    /// The headers of a single multipart part exceed the header budget.
    #[error("multipart part headers exceed {limit} bytes")]
    HeadersTooLong {
        /// Header budget in bytes.
        limit: usize,
    },

    /// A recognised field grew beyond the configured budget.
    #[error("field `{field}` exceeds {limit} bytes")]
    FieldTooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Per-field budget in bytes.
        limit: usize,
    },

    /// A recognised field did not decode to UTF-8 text.
    #[error("field `{field}` is not valid UTF-8")]
    InvalidUtf8 {
        /// Name of the offending field.
        field: &'static str,
    },

    /// `feed` or `finalize` called after `finalize`.
    #[error("form decoder already finalized")]
    AlreadyFinalized,
}

/// Errors raised by an actuator driver.
#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    /// `set_level` called before `initialize` succeeded.
    #[error("actuator driver is not initialized")]
    NotInitialized,

    /// Driver-specific failure (I/O on the GPIO interface, …).
    #[error("actuator driver failure")]
    Driver(#[source] Box<dyn std::error::Error + Send + Sync>),
}

//! [`ResponseSink`] that collects one exchange and converts it to an axum
//! [`Response`].

use std::convert::Infallible;
use std::io;

use axum::body::{Body, Bytes};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use hpapower_app::ports::{ResponseHead, ResponseSink, TransportError};

/// Buffers what a transaction writes until the handler returns.
#[derive(Debug, Default)]
pub struct BufferedSink {
    head: Option<ResponseHead>,
    writable_requested: bool,
    body: Option<Bytes>,
    finished: bool,
}

impl BufferedSink {
    /// Whether the transaction asked for a `Writable` event.
    #[must_use]
    pub fn writable_requested(&self) -> bool {
        self.writable_requested
    }

    /// Build the response for a transaction that reached the end.
    ///
    /// The body is streamed so the server frames it itself; no
    /// `Content-Length` is set unless the head carried one.
    #[must_use]
    pub fn into_response(self) -> Response {
        if !self.finished {
            return self.into_aborted_response();
        }
        let Some(head) = self.head else {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        };
        let body = self.body.unwrap_or_default();
        respond(
            &head,
            Body::from_stream(tokio_stream::once(Ok::<_, Infallible>(body))),
        )
    }

    /// Build the response for a transaction that aborted.
    ///
    /// Once the head is out the status cannot change any more, so the body
    /// stream fails instead and the server drops the connection.
    #[must_use]
    pub fn into_aborted_response(self) -> Response {
        let Some(head) = self.head else {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        };
        respond(
            &head,
            Body::from_stream(tokio_stream::once(Err::<Bytes, _>(io::Error::other(
                "transaction aborted",
            )))),
        )
    }
}

fn respond(head: &ResponseHead, body: Body) -> Response {
    let Ok(status) = StatusCode::from_u16(head.status) else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(head.content_type));
    if let Some(length) = head.content_length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }
    response
}

impl ResponseSink for BufferedSink {
    fn write_head(&mut self, head: &ResponseHead) -> Result<(), TransportError> {
        if self.head.is_some() {
            return Err(TransportError::HeadAlreadyWritten);
        }
        self.head = Some(*head);
        Ok(())
    }

    fn request_writable(&mut self) {
        self.writable_requested = true;
    }

    fn write_final(&mut self, chunk: &[u8]) -> Result<usize, TransportError> {
        if self.head.is_none() {
            return Err(TransportError::HeadNotWritten);
        }
        if self.finished || self.body.is_some() {
            return Err(TransportError::AlreadyFinished);
        }
        self.body = Some(Bytes::copy_from_slice(chunk));
        Ok(chunk.len())
    }

    fn finish(&mut self) -> Result<(), TransportError> {
        if self.finished {
            return Err(TransportError::AlreadyFinished);
        }
        if self.head.is_none() {
            return Err(TransportError::HeadNotWritten);
        }
        self.finished = true;
        Ok(())
    }
}

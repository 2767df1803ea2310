//! Transaction state machine: one HTTP request/response exchange.
//!
//! HTTP is stateless but the connection carrying it is not: with keep-alive
//! or HTTP/2 several transactions travel over one connection. A
//! [`Transaction`] lives exactly as long as one exchange. The transport
//! creates it when a request begins, feeds it [`TransactionEvent`]s in
//! order, and drops it when the per-request storage goes away.

use std::fmt;
use std::sync::Arc;

use hpapower_domain::form::{DEFAULT_MAX_FIELD_LEN, FormDecoder, FormEncoding};
use hpapower_domain::power::PowerState;

use crate::error::TransactionError;
use crate::ports::{ActuatorDriver, ResponseHead, ResponseSink};
use crate::services::actuator_store::ActuatorStore;
use crate::services::response_writer::ResponseWriter;

/// Name of the form field carrying the requested state.
pub const STATE_FIELD: &str = "state";

/// Fields the control form recognises, in index order.
pub const FORM_FIELDS: &[&str] = &[STATE_FIELD];

/// Settings of the control endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlEndpoint {
    /// Fixed URL path of the endpoint.
    pub path: String,
    /// Per-field byte budget of the form decoder.
    pub max_field_len: usize,
}

impl Default for ControlEndpoint {
    fn default() -> Self {
        Self {
            path: "/hpa_power_set".to_string(),
            max_field_len: DEFAULT_MAX_FIELD_LEN,
        }
    }
}

/// A transport lifecycle event.
#[derive(Debug, Clone, Copy)]
pub enum TransactionEvent<'a> {
    /// The request line and headers arrived.
    RequestReceived {
        path: &'a str,
        content_type: Option<&'a str>,
    },
    /// A piece of the request body.
    BodyChunk(&'a [u8]),
    /// The request body ended.
    BodyComplete,
    /// The transport can accept output.
    Writable,
    /// The per-request storage is being destroyed.
    TornDown,
}

impl TransactionEvent<'_> {
    /// Short name used in logs and errors.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequestReceived { .. } => "request_received",
            Self::BodyChunk(_) => "body_chunk",
            Self::BodyComplete => "body_complete",
            Self::Writable => "writable",
            Self::TornDown => "torn_down",
        }
    }
}

/// Where a transaction is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Created, request line not seen yet.
    Idle,
    /// The path is not ours; another handler serves it.
    Declined,
    /// Head written, no body byte seen yet.
    AwaitingBody,
    /// Decoder alive and consuming chunks.
    ReceivingBody,
    /// Body decoded and its intent applied.
    BodyCompleted,
    /// Response written and completion signalled.
    Finished,
    /// Failed; terminal.
    Aborted,
    /// Per-request storage released.
    TornDown,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Declined => "declined",
            Self::AwaitingBody => "awaiting_body",
            Self::ReceivingBody => "receiving_body",
            Self::BodyCompleted => "body_completed",
            Self::Finished => "finished",
            Self::Aborted => "aborted",
            Self::TornDown => "torn_down",
        })
    }
}

/// What the transport should do after an event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not the control endpoint; hand the request to the static mount.
    Declined,
    /// Keep delivering events.
    Continue,
    /// Output not possible yet; deliver `Writable` again once the body is done.
    Deferred,
    /// The response is complete.
    Completed,
}

/// Per-request controller for the control endpoint.
pub struct Transaction<D> {
    endpoint: Arc<ControlEndpoint>,
    store: ActuatorStore<D>,
    writer: ResponseWriter<D>,
    phase: Phase,
    path: Option<String>,
    content_type: Option<String>,
    decoder: Option<FormDecoder>,
    pending_output: bool,
}

impl<D: ActuatorDriver> Transaction<D> {
    /// Begin a transaction against the shared store.
    pub fn new(endpoint: Arc<ControlEndpoint>, store: ActuatorStore<D>) -> Self {
        let writer = ResponseWriter::new(store.clone());
        Self {
            endpoint,
            store,
            writer,
            phase: Phase::Idle,
            path: None,
            content_type: None,
            decoder: None,
            pending_output: false,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Target path, once the request line was seen.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Whether a form decoder is currently allocated.
    #[must_use]
    pub fn has_decoder(&self) -> bool {
        self.decoder.is_some()
    }

    /// Whether a writable callback was requested and the body not written yet.
    #[must_use]
    pub fn pending_output(&self) -> bool {
        self.pending_output
    }

    /// Handle one lifecycle event.
    ///
    /// Any error moves the transaction to [`Phase::Aborted`], releases its
    /// decoder, and is terminal: later events other than `TornDown` are
    /// rejected.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError`] when the body cannot be decoded, the
    /// actuator rejects the new level, the response cannot be written in
    /// full, or the event is out of sequence.
    pub fn handle(
        &mut self,
        event: TransactionEvent<'_>,
        sink: &mut impl ResponseSink,
    ) -> Result<Outcome, TransactionError> {
        let result = self.dispatch(event, sink);
        if let Err(err) = &result {
            tracing::warn!(
                error = %err,
                event = event.name(),
                phase = %self.phase,
                path = self.path.as_deref().unwrap_or_default(),
                "transaction aborted"
            );
            self.phase = Phase::Aborted;
            self.decoder = None;
            self.pending_output = false;
        }
        result
    }

    fn dispatch(
        &mut self,
        event: TransactionEvent<'_>,
        sink: &mut impl ResponseSink,
    ) -> Result<Outcome, TransactionError> {
        match (event, self.phase) {
            (TransactionEvent::RequestReceived { path, content_type }, Phase::Idle) => {
                self.on_request(path, content_type, sink)
            }
            (TransactionEvent::BodyChunk(chunk), Phase::AwaitingBody | Phase::ReceivingBody) => {
                self.on_body_chunk(chunk)
            }
            (TransactionEvent::BodyComplete, Phase::AwaitingBody | Phase::ReceivingBody) => {
                self.on_body_complete()
            }
            (TransactionEvent::Writable, Phase::ReceivingBody) => Ok(Outcome::Deferred),
            (TransactionEvent::Writable, Phase::AwaitingBody | Phase::BodyCompleted) => {
                self.writer.write(sink)?;
                self.pending_output = false;
                self.phase = Phase::Finished;
                Ok(Outcome::Completed)
            }
            (TransactionEvent::TornDown, _) => {
                self.on_teardown();
                Ok(Outcome::Continue)
            }
            (event, phase) => Err(TransactionError::UnexpectedEvent {
                event: event.name(),
                phase,
            }),
        }
    }

    fn on_request(
        &mut self,
        path: &str,
        content_type: Option<&str>,
        sink: &mut impl ResponseSink,
    ) -> Result<Outcome, TransactionError> {
        self.path = Some(path.to_string());
        if path != self.endpoint.path {
            self.phase = Phase::Declined;
            return Ok(Outcome::Declined);
        }

        self.content_type = content_type.map(str::to_string);
        sink.write_head(&ResponseHead::json())?;
        sink.request_writable();
        self.pending_output = true;
        self.phase = Phase::AwaitingBody;
        Ok(Outcome::Continue)
    }

    fn on_body_chunk(&mut self, chunk: &[u8]) -> Result<Outcome, TransactionError> {
        let decoder = match self.decoder.take() {
            Some(decoder) => decoder,
            None => {
                let encoding = FormEncoding::from_content_type(self.content_type.as_deref())?;
                tracing::debug!(?encoding, "creating form decoder");
                FormDecoder::new(FORM_FIELDS, self.endpoint.max_field_len, encoding)?
            }
        };
        let decoder = self.decoder.insert(decoder);
        self.phase = Phase::ReceivingBody;
        decoder.feed(chunk)?;
        Ok(Outcome::Continue)
    }

    fn on_body_complete(&mut self) -> Result<Outcome, TransactionError> {
        let decoder = self
            .decoder
            .as_mut()
            .ok_or(TransactionError::BodyWithoutDecoder)?;
        decoder.finalize()?;

        for (index, name) in FORM_FIELDS.iter().enumerate() {
            match decoder.get_by_index(index) {
                None => tracing::info!(field = name, "undefined"),
                Some(field) => tracing::info!(
                    field = field.name,
                    len = field.len(),
                    value = field.value,
                    "decoded field"
                ),
            }
        }

        let submitted = decoder.get(STATE_FIELD).map(|field| field.value);
        match submitted.and_then(PowerState::from_form_value) {
            Some(state) => self.store.set(state)?,
            None => tracing::info!(
                value = submitted,
                "no recognised state submitted, keeping current state"
            ),
        }

        self.phase = Phase::BodyCompleted;
        Ok(Outcome::Continue)
    }

    fn on_teardown(&mut self) {
        if self.decoder.take().is_some() {
            tracing::debug!(phase = %self.phase, "form decoder released");
        }
        self.pending_output = false;
        self.phase = Phase::TornDown;
    }
}

//! The single request handler.
//!
//! Every request first goes through a fresh [`Transaction`]. If it declines
//! the path, the request is served from the static mount instead.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::Response;
use tokio_stream::StreamExt;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use hpapower_app::ports::ActuatorDriver;
use hpapower_app::services::transaction::{Outcome, Transaction, TransactionEvent};

use crate::error::DispatchError;
use crate::sink::BufferedSink;
use crate::state::AppState;

/// Drive one request through the control transaction.
pub async fn dispatch<D>(State(state): State<AppState<D>>, request: Request) -> Response
where
    D: ActuatorDriver + 'static,
{
    let mut transaction = Transaction::new(Arc::clone(&state.endpoint), state.store.clone());
    let mut sink = BufferedSink::default();

    let path = request.uri().path().to_owned();
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let received = transaction.handle(
        TransactionEvent::RequestReceived {
            path: &path,
            content_type: content_type.as_deref(),
        },
        &mut sink,
    );
    match received {
        Ok(Outcome::Declined) => {
            drop(transaction);
            return serve_static(state.static_files, request).await;
        }
        Ok(_) => {}
        Err(_) => return sink.into_aborted_response(),
    }

    let driven = drive(&mut transaction, &mut sink, request.into_body()).await;

    tracing::debug!(
        path = transaction.path().unwrap_or_default(),
        phase = %transaction.phase(),
        decoder = transaction.has_decoder(),
        pending_output = transaction.pending_output(),
        "tearing down control transaction"
    );
    if let Err(err) = transaction.handle(TransactionEvent::TornDown, &mut sink) {
        tracing::warn!(error = %err, "control transaction teardown rejected");
    }

    match driven {
        Ok(()) => sink.into_response(),
        Err(err) => {
            tracing::debug!(error = %err, path = %path, "control request aborted");
            sink.into_aborted_response()
        }
    }
}

/// Feed the body frames, then ask for output.
///
/// Empty frames are skipped, and `BodyComplete` is only sent when at least
/// one byte of body arrived, so a bodiless request reaches `Writable` with
/// no decoder.
async fn drive<D>(
    transaction: &mut Transaction<D>,
    sink: &mut BufferedSink,
    body: Body,
) -> Result<(), DispatchError>
where
    D: ActuatorDriver,
{
    let mut frames = body.into_data_stream();
    let mut saw_body = false;

    while let Some(frame) = frames.next().await {
        let chunk = frame.map_err(|err| {
            tracing::warn!(error = %err, "request body interrupted");
            DispatchError::Body(err)
        })?;
        if chunk.is_empty() {
            continue;
        }
        saw_body = true;
        transaction.handle(TransactionEvent::BodyChunk(&chunk), sink)?;
    }

    if saw_body {
        transaction.handle(TransactionEvent::BodyComplete, sink)?;
    }
    if sink.writable_requested() {
        transaction.handle(TransactionEvent::Writable, sink)?;
    }
    Ok(())
}

async fn serve_static(static_files: ServeDir, request: Request) -> Response {
    match static_files.oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

//! # hpapower-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Turn every incoming request into a [`Transaction`] and feed it the
//!   request lifecycle: head, body frames, end of body, writable, teardown
//! - Hand requests the transaction declines to a static file mount
//! - Turn what the transaction wrote into an axum response, or into a
//!   broken body stream when it aborted after the head went out
//! - Add tracing and a fixed set of security headers to every response
//!
//! ## Dependency rule
//! Depends on `hpapower-app` only. The transaction never sees axum types;
//! it talks to the [`ResponseSink`] implemented here.
//!
//! [`Transaction`]: hpapower_app::services::transaction::Transaction
//! [`ResponseSink`]: hpapower_app::ports::ResponseSink

pub mod dispatch;
pub mod error;
pub mod router;
pub mod sink;
pub mod state;

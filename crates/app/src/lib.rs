//! # hpapower-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `ActuatorDriver`: initialize the power line and set its level
//!   - `ResponseSink`: emit one response on behalf of the transport
//! - Provide the **services** that run one HTTP transaction:
//!   - `ActuatorStore`: shared, mutex-guarded source of truth for the line
//!   - `ResponseWriter`: renders the state snapshot as JSON
//!   - `Transaction`: per-request state machine consuming lifecycle events
//!
//! ## Dependency rule
//! Depends on `hpapower-domain` only.
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod error;
pub mod ports;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

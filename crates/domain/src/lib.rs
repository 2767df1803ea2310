//! # hpapower-domain
//!
//! Pure domain model for the hpapower actuator service.
//!
//! ## Responsibilities
//! - Define the **power state** of the single actuator line and how a
//!   submitted form value maps onto it
//! - Provide the **incremental form decoder** that turns a POST body,
//!   delivered in arbitrary chunks, into a fixed set of named fields
//! - Define the error types shared across layers
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod form;
pub mod power;

//! Errors that end a control request early.

use hpapower_app::error::TransactionError;

/// Why a control request could not be driven to completion.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Reading the request body failed, usually because the client left.
    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),
    /// The transaction rejected an event.
    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

//! Error types for the mazure-relations crate.
//!
//! These stay internal to the engine: public operations render them into
//! the `error` field of their outcome instead of returning them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelationsError {
    #[error("Relationship tracking not available")]
    TrackingUnavailable,

    #[error("Store error: {0}")]
    Store(#[from] mazure_store::StoreError),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}

pub type Result<T> = std::result::Result<T, RelationsError>;

//! Error types for the query engines.

use mazure_store::StoreError;
use serde_json::{json, Value};

/// Errors from the Resource Graph pipeline executor.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Unsupported table or malformed request. Callers map this to a 4xx.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from the directory query surface.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DirectoryError {
    /// HTTP status the directory surface reports for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Store(_) => 500,
        }
    }

    /// Graph-style error body: `{error: {code, message, innerError}}`.
    pub fn to_body(&self) -> Value {
        let code = match self {
            Self::NotFound { .. } => "NotFound",
            Self::Store(_) => "InternalServerError",
        };
        json!({
            "error": {
                "code": code,
                "message": self.to_string(),
                "innerError": { "request-id": "mock-request-id" }
            }
        })
    }
}

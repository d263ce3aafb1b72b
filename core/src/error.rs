//! Error types for the Tabula core.
//!
//! The taxonomy keeps three concerns apart: command rejections ([`Error`])
//! are benign, synchronous, and leave the session usable; remote failures
//! ([`GatewayError`]) revert the session to its editing state with the draft
//! intact; validation output ([`FieldError`]) is data attached to the
//! session state, not a failure of any call. A cache miss is not an error at
//! all and is represented by [`crate::cache::Lookup::Miss`].

use crate::{FieldName, RecordId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All possible command rejections from the core.
///
/// None of these tear anything down: a rejected command is a no-op and the
/// rejection is mirrored into the session snapshot for the rendering layer
/// to surface as a notice.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    // Descriptor violations
    #[error("unknown field: {0}")]
    UnknownField(FieldName),

    #[error("type mismatch for field '{field}': expected {expected}, got {got}")]
    TypeMismatch {
        field: FieldName,
        expected: String,
        got: String,
    },

    #[error("unknown status: {0}")]
    UnknownStatus(String),

    #[error("illegal status transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    // Concurrency violations
    #[error("finish the current edit first")]
    EditInProgress { active: RecordId },

    #[error("no edit is active")]
    NoActiveEdit,

    #[error("a save is in flight, wait for it to finish")]
    SaveInFlight,
}

impl Error {
    /// Whether this rejection is a concurrency violation (wrong-state
    /// command) as opposed to a descriptor violation.
    pub fn is_concurrency(&self) -> bool {
        matches!(
            self,
            Error::EditInProgress { .. } | Error::NoActiveEdit | Error::SaveInFlight
        )
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A remote failure reported by the persistence gateway or record source.
///
/// Gateway errors are recoverable: the session reverts to its editing state
/// and the draft is preserved so the user does not lose input.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum GatewayError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("conflicting change on the server: {0}")]
    Conflict(String),

    #[error("rejected by the server: {0}")]
    Rejected(String),

    #[error("the request timed out")]
    Timeout,
}

/// A field-scoped validation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    /// Field the message applies to
    pub field: FieldName,
    /// Human-readable message
    pub message: String,
}

impl FieldError {
    /// Create a new field error.
    pub fn new(field: impl Into<FieldName>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

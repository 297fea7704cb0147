//! Error types for the recordplan query planner

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlannerError>;

#[derive(Error, Debug)]
pub enum PlannerError {
    /// Malformed predicate tree or a reference to a field the record type
    /// does not declare.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A constraint variant no registered strategy accepts and the planner
    /// cannot fall back from.
    #[error("unsupported constraint on field '{field}': {reason}")]
    UnsupportedConstraint { field: String, reason: String },

    /// Missing, wrongly typed, or wrongly counted parameter at bind time.
    #[error("parameter binding error: {0}")]
    ParameterBinding(String),

    /// Live statistics call failed. Recovered internally by falling back to
    /// heuristic statistics; surfaces only from direct provider calls.
    #[error("statistics unavailable: {0}")]
    StatisticsUnavailable(String),

    /// A cached prepared plan references an index that no longer exists.
    #[error("plan references dropped index '{0}'")]
    IndexInvalidation(String),

    /// Record type not registered in the catalog.
    #[error("record type not found: {0}")]
    TypeNotFound(String),

    /// Index name not registered in the catalog.
    #[error("index not found: {0}")]
    IndexNotFound(String),

    /// Record payload could not be decoded during covering reconstruction.
    #[error("record codec error: {0}")]
    Codec(String),
}

impl PlannerError {
    /// Shorthand for the common invalid-query case.
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    pub fn unsupported(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedConstraint {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

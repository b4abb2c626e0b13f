use thiserror::Error;

/// Failure of an owner or consent operation.
///
/// Each variant maps onto a distinct transport status, so callers must not collapse them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The patient record does not exist.
    #[error("patient record {0} not found")]
    NotFound(String),
    /// The caller lacks the access level the operation needs.
    #[error("{0}")]
    Forbidden(String),
    /// The request input is malformed or references something unknown.
    #[error("{0}")]
    BadRequest(String),
    /// Anything else that went wrong while serving the request.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AccessError {
    /// Builds a [`Self::BadRequest`].
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Builds a [`Self::Internal`].
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

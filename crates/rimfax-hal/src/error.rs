//! Error types for the HAL crate.

use thiserror::Error;

/// Errors that can occur in backend operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HalError {
    /// A specific instruction in the request failed to execute.
    #[error("instruction {instruction} failed: {reason}")]
    Execution {
        /// Index of the offending instruction within the request.
        instruction: usize,
        /// Backend-reported reason.
        reason: String,
    },

    /// The request needs more qubits than the backend provides.
    #[error("qubit capacity exceeded: requested {requested}, capacity {capacity}")]
    CapacityExceeded {
        /// Live qubits the request requires.
        requested: u32,
        /// Qubits the backend provides.
        capacity: u32,
    },

    /// The backend cannot serve the requested feature.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The response does not line up with the request's result slots.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Transport or connection failure.
    #[error("backend connection: {0}")]
    Connection(String),

    /// Encoding failure while serializing the request.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for HAL operations.
pub type HalResult<T> = Result<T, HalError>;

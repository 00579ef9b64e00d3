//! Error types for the instruction-set crate.

use crate::qubit::QubitId;
use thiserror::Error;

/// Errors that can occur when constructing instructions.
///
/// Deliberately exhaustive: the runtime maps every variant into its own
/// error taxonomy, so adding a variant here is a breaking change there.
#[derive(Debug, Error)]
pub enum IrError {
    /// A control qubit also appears among the gate targets.
    #[error("control qubit {0} overlaps gate target")]
    ControlOverlapsTarget(QubitId),

    /// The same qubit appears more than once in an operation.
    #[error("duplicate qubit {0} in operation")]
    DuplicateQubit(QubitId),

    /// The operation requires at least one qubit.
    #[error("operation requires at least one qubit")]
    NoQubits,
}

/// Result type for instruction-set operations.
pub type IrResult<T> = Result<T, IrError>;

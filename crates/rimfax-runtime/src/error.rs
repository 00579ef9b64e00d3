//! Error taxonomy of the runtime core.
//!
//! Four classes, surfaced at different times:
//!
//! - [`InvariantError`] — a data-model invariant violated locally; reported
//!   at the offending call.
//! - [`CompositionError`] — an operation invalid for the current
//!   control/adjoint stack state; reported at the offending call.
//! - [`ResourceError`] — capacity exhaustion detected against the backend's
//!   declared capabilities.
//! - `Backend` — a backend-reported execution failure, observable only at
//!   flush time, possibly much later than the instruction that caused it.
//!   Fatal to the scope that flushed.

use rimfax_hal::HalError;
use rimfax_ir::{IrError, MeasureId, QubitId};
use thiserror::Error;

/// Locally-detected violation of a data-model invariant.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InvariantError {
    /// Operation on a qubit that is not allocated.
    #[error("qubit {0} is not allocated")]
    QubitNotAllocated(QubitId),

    /// Release of a handle that is already free.
    #[error("qubit {0} is already free")]
    QubitAlreadyFree(QubitId),

    /// A control qubit also appears among the gate targets.
    #[error("control qubit {0} overlaps gate target")]
    ControlOverlapsTarget(QubitId),

    /// The same qubit appears more than once in an operation.
    #[error("duplicate qubit {0} in operation")]
    DuplicateQubit(QubitId),

    /// The operation requires at least one qubit.
    #[error("operation requires at least one qubit")]
    EmptyRegister,

    /// Measurement wider than one result word.
    #[error("register of {width} qubits exceeds the {max}-bit measurement word")]
    RegisterTooWide {
        /// Requested register width.
        width: usize,
        /// Maximum measurable width.
        max: usize,
    },

    /// Index past the end of a register.
    #[error("index {index} out of range for register of {len} qubits")]
    IndexOutOfRange {
        /// Requested position.
        index: usize,
        /// Register length.
        len: usize,
    },

    /// Registers of two different processes combined.
    #[error("cannot combine registers from different processes")]
    ProcessMismatch,

    /// A register from a suspended or exited scope used in the active
    /// scope.
    #[error("register belongs to a scope that is not active")]
    ScopeMismatch,

    /// Concatenation would alias the same qubit twice.
    #[error("register concatenation repeats qubit {0}")]
    OverlappingConcat(QubitId),

    /// The scope was poisoned by a failed flush and accepts no further
    /// operations.
    #[error("scope terminated by an earlier execution failure")]
    ScopeTerminated,

    /// A future or dump outlived the scope that created it.
    #[error("result belongs to a scope that is no longer active")]
    StaleResult,

    /// A measurement slot was not delivered by the flush that should have
    /// resolved it.
    #[error("measurement slot {0} was never resolved")]
    UnresolvedMeasurement(MeasureId),

    /// A dump slot was not delivered by the flush that should have
    /// resolved it.
    #[error("dump slot {0} was never resolved")]
    UnresolvedDump(rimfax_ir::DumpId),

    /// Integer division by zero while evaluating a future.
    #[error("division by zero in future expression")]
    DivisionByZero,

    /// Typed dump accessor used against a different capture mode.
    #[error("dump was not captured in the requested mode")]
    DumpModeMismatch,

    /// A shot-sampled dump with a count of zero or above the backend limit.
    #[error("invalid shot count {0}")]
    InvalidShotCount(u32),
}

/// Backend-declared capacity exhausted.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResourceError {
    /// Allocation would exceed the backend's live-qubit capacity.
    #[error("qubit capacity exceeded: {requested} requested with {live} live, capacity {capacity}")]
    CapacityExceeded {
        /// Qubits requested by this allocation.
        requested: u32,
        /// Qubits currently live.
        live: u32,
        /// Backend capacity.
        capacity: u32,
    },
}

/// Operation invalid for the current control/adjoint stack state.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompositionError {
    /// Measurement is irreversible; it cannot be controlled or inverted.
    #[error("measurement is not allowed inside an open control or adjoint scope")]
    MeasureInOpenFrame,

    /// Dumps capture a point in time; they cannot be controlled or inverted.
    #[error("dump is not allowed inside an open control or adjoint scope")]
    DumpInOpenFrame,

    /// Allocation inside an open scope has no controlled/inverted meaning.
    #[error("allocation is not allowed inside an open control or adjoint scope")]
    AllocInOpenFrame,

    /// Release inside an open scope has no controlled/inverted meaning.
    #[error("free is not allowed inside an open control or adjoint scope")]
    FreeInOpenFrame,

    /// A scope-exit operation did not match the innermost open frame.
    #[error("scope exit does not match the innermost open frame (expected {expected})")]
    FrameMismatch {
        /// Frame kind the exit operation expected.
        expected: &'static str,
    },

    /// A scope-exit operation with no frame open.
    #[error("no open frame to exit")]
    NoOpenFrame,
}

/// Top-level runtime error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RuntimeError {
    /// Violated data-model invariant, detected locally.
    #[error(transparent)]
    Invariant(#[from] InvariantError),

    /// Backend-reported capacity failure.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Invalid operation for the current composer stack.
    #[error(transparent)]
    Composition(#[from] CompositionError),

    /// Backend-reported execution failure. Fatal to the current scope.
    #[error("backend execution failed: {0}")]
    Backend(#[from] HalError),
}

impl From<IrError> for RuntimeError {
    fn from(err: IrError) -> Self {
        match err {
            IrError::ControlOverlapsTarget(q) => InvariantError::ControlOverlapsTarget(q).into(),
            IrError::DuplicateQubit(q) => InvariantError::DuplicateQubit(q).into(),
            IrError::NoQubits => InvariantError::EmptyRegister.into(),
        }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

//! Backend trait.
//!
//! The [`Backend`] trait is the single seam between the recording runtime
//! and whatever executes the instructions (simulator, hardware adapter,
//! remote service):
//!
//! ```text
//!   capabilities() ──→ execute() ──→ execute() ──→ …
//!    (sync, &ref)      (sync, blocking, one in flight)
//! ```
//!
//! ## Design principles
//!
//! - **Synchronous**: the runtime is single-threaded by contract and blocks
//!   on the backend call during a flush; there is never more than one
//!   request in flight.
//! - **Infallible introspection**: `capabilities()` never performs I/O — a
//!   backend that cannot report capabilities without I/O is not correctly
//!   initialized.
//! - **Positional correlation**: results are matched to the request's
//!   `Measure`/`Dump` instructions by position, not by value.

use crate::capability::Capabilities;
use crate::error::HalResult;
use crate::result::{ExecutionRequest, ExecutionResponse};

/// Trait for quantum execution backends.
///
/// # Contract
///
/// - `capabilities()` MUST be synchronous and infallible; implementations
///   cache the value at construction time and return a reference.
/// - `execute()` MUST run the request's instructions in order and return
///   one result per `Measure`/`Dump` instruction, in request order.
/// - On failure, `execute()` SHOULD return
///   [`HalError::Execution`](crate::HalError::Execution) identifying the
///   offending instruction index; the runtime treats any error as fatal to
///   the scope that issued the flush.
pub trait Backend {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Get the capabilities of this backend.
    fn capabilities(&self) -> &Capabilities;

    /// Execute a batch of instructions and return the correlated results.
    ///
    /// This call blocks until the backend has finished; cancellation, if
    /// supported at all, is the backend's concern.
    fn execute(&mut self, request: &ExecutionRequest) -> HalResult<ExecutionResponse>;
}

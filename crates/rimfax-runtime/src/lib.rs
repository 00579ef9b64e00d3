//! Lazy recording runtime for embedded quantum programs.
//!
//! Quantum operations never execute when they are called. Each call
//! validates locally and appends to an instruction log; the log is shipped
//! to the backend only when a classical value derived from the quantum
//! state is first observed. Between those points the program composes
//! freely: controlled scopes, inverted scopes, and deferred arithmetic on
//! measurement results all work on the recording, not on a live state.
//!
//! # Example
//!
//! ```no_run
//! use rimfax_runtime::Process;
//! # use rimfax_hal::{Backend, Capabilities, ExecutionRequest, ExecutionResponse, HalResult};
//! # struct MyBackend(Capabilities);
//! # impl Backend for MyBackend {
//! #     fn name(&self) -> &str { "mine" }
//! #     fn capabilities(&self) -> &Capabilities { &self.0 }
//! #     fn execute(&mut self, _: &ExecutionRequest) -> HalResult<ExecutionResponse> {
//! #         Ok(ExecutionResponse::default())
//! #     }
//! # }
//!
//! # fn main() -> Result<(), rimfax_runtime::RuntimeError> {
//! let p = Process::new(MyBackend(Capabilities::default()));
//! let q = p.alloc(2)?;
//! p.h(&q.qubit(0)?)?;
//! p.ctrl(&q.qubit(0)?, || p.x(&q.qubit(1)?))?;
//! let m = p.measure(&q)?;
//! println!("outcome: {}", m.value()?); // first observation: flush happens here
//! # Ok(())
//! # }
//! ```
//!
//! # Crates
//!
//! - [`rimfax_ir`] — instructions, gates, qubit handles.
//! - [`rimfax_hal`] — the [`Backend`](rimfax_hal::Backend) seam and wire
//!   types.
//! - this crate — the recording process, composer, and deferred values.

mod bridge;
mod composer;
mod dump;
mod error;
mod future;
mod log;
mod process;
mod quant;
mod registry;

pub use dump::Dump;
pub use error::{
    CompositionError, InvariantError, ResourceError, RuntimeError, RuntimeResult,
};
pub use future::{BinaryOp, Future, IntoOperand};
pub use process::{AdjointGuard, ControlGuard, Process, MAX_MEASURE_WIDTH};
pub use quant::Quant;

pub use rimfax_hal::{Backend, Capabilities, DumpData, ExecutionRequest, ExecutionResponse};
pub use rimfax_ir::{DumpMode, GateKind, QubitId};

//! Rimfax Quantum Instruction-Set Data Model
//!
//! This crate provides the instruction types shared between the Rimfax
//! runtime and its execution backends. The runtime records these
//! instructions into an ordered log; a backend consumes them in exactly
//! that order.
//!
//! # Core Components
//!
//! - **Handles**: [`QubitId`] for qubits, [`MeasureId`]/[`DumpId`] for the
//!   result slots of measurement and dump instructions
//! - **Gates**: [`GateKind`] primitive gates with numeric parameters
//! - **Instructions**: [`Instruction`] covering allocation, release, gates
//!   (with controls and inversion), measurement, and state dumps
//!
//! # Example
//!
//! ```rust
//! use rimfax_ir::{GateKind, Instruction, QubitId};
//!
//! // A Hadamard on q0 controlled by q1, as the composer would record it.
//! let inst = Instruction::gate(GateKind::Hadamard, [QubitId(0)], [QubitId(1)], false)?;
//! assert_eq!(inst.name(), "h");
//! # Ok::<(), rimfax_ir::IrError>(())
//! ```
//!
//! All types serialize with serde; JSON is the reference textual encoding,
//! but the byte layout on the wire is a backend concern.

pub mod error;
pub mod gate;
pub mod instruction;
pub mod qubit;

pub use error::{IrError, IrResult};
pub use gate::GateKind;
pub use instruction::{DumpMode, Instruction};
pub use qubit::{DumpId, MeasureId, QubitId};

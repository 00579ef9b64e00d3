//! Instructions recorded by the runtime and shipped to backends.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::GateKind;
use crate::qubit::{DumpId, MeasureId, QubitId};

/// Representation requested for a state dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DumpMode {
    /// Basis states with their probabilities.
    Probabilities,
    /// Basis states with their complex amplitudes.
    Amplitudes,
    /// Sampled measurement shots.
    Shots {
        /// Number of shots to sample.
        count: u32,
    },
}

/// A single entry of the instruction log.
///
/// Allocation and release travel through the same lazy pipeline as gates:
/// nothing here implies an immediate backend call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// Allocate one qubit. `dirty` allocations carry no |0⟩ guarantee.
    Alloc {
        /// The handle being brought to life.
        target: QubitId,
        /// Skip the |0⟩ initialization guarantee.
        dirty: bool,
    },
    /// Release one qubit. The backend rejects the release of a qubit that
    /// is not in a basis state unless `dirty` is set.
    Free {
        /// The handle being released.
        target: QubitId,
        /// Release without the basis-state check.
        dirty: bool,
    },
    /// Apply a gate, possibly controlled and possibly inverted.
    Gate {
        /// The primitive gate.
        gate: GateKind,
        /// Target qubits, in positional order.
        targets: Vec<QubitId>,
        /// Control qubits. Sorted, duplicate-free, disjoint from targets.
        controls: Vec<QubitId>,
        /// Apply the inverse of `gate`.
        inverted: bool,
    },
    /// Measure a register in the computational basis.
    Measure {
        /// Qubits to measure; `qubits[0]` maps to bit 0 of the outcome.
        qubits: Vec<QubitId>,
        /// Result slot the outcome is delivered to.
        result: MeasureId,
    },
    /// Capture a description of the state of a register.
    Dump {
        /// Qubits to capture; `qubits[0]` maps to bit 0 of basis states.
        qubits: Vec<QubitId>,
        /// Requested representation.
        mode: DumpMode,
        /// Result slot the capture is delivered to.
        result: DumpId,
    },
}

impl Instruction {
    /// Create a gate instruction, validating target/control disjointness.
    pub fn gate(
        gate: GateKind,
        targets: impl IntoIterator<Item = QubitId>,
        controls: impl IntoIterator<Item = QubitId>,
        inverted: bool,
    ) -> IrResult<Self> {
        let targets: Vec<_> = targets.into_iter().collect();
        let mut controls: Vec<_> = controls.into_iter().collect();
        if targets.is_empty() {
            return Err(IrError::NoQubits);
        }
        for (i, q) in targets.iter().enumerate() {
            if targets[..i].contains(q) {
                return Err(IrError::DuplicateQubit(*q));
            }
        }
        controls.sort_unstable();
        controls.dedup();
        if let Some(q) = controls.iter().find(|q| targets.contains(q)) {
            return Err(IrError::ControlOverlapsTarget(*q));
        }
        Ok(Instruction::Gate {
            gate,
            targets,
            controls,
            inverted,
        })
    }

    /// Create a measurement instruction.
    pub fn measure(qubits: impl IntoIterator<Item = QubitId>, result: MeasureId) -> IrResult<Self> {
        let qubits: Vec<_> = qubits.into_iter().collect();
        if qubits.is_empty() {
            return Err(IrError::NoQubits);
        }
        for (i, q) in qubits.iter().enumerate() {
            if qubits[..i].contains(q) {
                return Err(IrError::DuplicateQubit(*q));
            }
        }
        Ok(Instruction::Measure { qubits, result })
    }

    /// Create a dump instruction.
    pub fn dump(
        qubits: impl IntoIterator<Item = QubitId>,
        mode: DumpMode,
        result: DumpId,
    ) -> IrResult<Self> {
        let qubits: Vec<_> = qubits.into_iter().collect();
        if qubits.is_empty() {
            return Err(IrError::NoQubits);
        }
        for (i, q) in qubits.iter().enumerate() {
            if qubits[..i].contains(q) {
                return Err(IrError::DuplicateQubit(*q));
            }
        }
        Ok(Instruction::Dump {
            qubits,
            mode,
            result,
        })
    }

    /// Create an allocation instruction.
    pub fn alloc(target: QubitId, dirty: bool) -> Self {
        Instruction::Alloc { target, dirty }
    }

    /// Create a release instruction.
    pub fn free(target: QubitId, dirty: bool) -> Self {
        Instruction::Free { target, dirty }
    }

    /// Check if this is a gate instruction.
    pub fn is_gate(&self) -> bool {
        matches!(self, Instruction::Gate { .. })
    }

    /// Check if this is a measurement.
    pub fn is_measure(&self) -> bool {
        matches!(self, Instruction::Measure { .. })
    }

    /// Check if this is a dump.
    pub fn is_dump(&self) -> bool {
        matches!(self, Instruction::Dump { .. })
    }

    /// Get the name of the instruction.
    pub fn name(&self) -> &str {
        match self {
            Instruction::Alloc { .. } => "alloc",
            Instruction::Free { .. } => "free",
            Instruction::Gate { gate, .. } => gate.name(),
            Instruction::Measure { .. } => "measure",
            Instruction::Dump { .. } => "dump",
        }
    }
}

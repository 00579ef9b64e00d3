//! Qubit registers.

use std::ops::RangeBounds;

use rimfax_ir::QubitId;

use crate::error::{InvariantError, RuntimeResult};
use crate::process::Process;

/// An ordered register of qubit handles.
///
/// Order is semantically meaningful: it defines the positional mapping of
/// measurements (`quant[0]` is bit 0 of the outcome) and slicing. A `Quant`
/// never owns its qubits; slicing, reversal, and concatenation produce new
/// registers referencing the same handles, and freeing through one alias
/// invalidates all of them.
#[derive(Clone)]
pub struct Quant {
    process: Process,
    scope: u64,
    qubits: Vec<QubitId>,
}

impl Quant {
    pub(crate) fn new(process: Process, scope: u64, qubits: Vec<QubitId>) -> Self {
        Self {
            process,
            scope,
            qubits,
        }
    }

    /// Number of qubits in the register.
    pub fn len(&self) -> usize {
        self.qubits.len()
    }

    /// Check if the register is empty.
    pub fn is_empty(&self) -> bool {
        self.qubits.is_empty()
    }

    /// The underlying handles, in register order.
    pub fn ids(&self) -> &[QubitId] {
        &self.qubits
    }

    pub(crate) fn process(&self) -> &Process {
        &self.process
    }

    pub(crate) fn scope_id(&self) -> u64 {
        self.scope
    }

    /// Single-qubit register at position `index`.
    pub fn qubit(&self, index: usize) -> RuntimeResult<Quant> {
        match self.qubits.get(index) {
            Some(q) => Ok(self.derive(vec![*q])),
            None => Err(InvariantError::IndexOutOfRange {
                index,
                len: self.qubits.len(),
            }
            .into()),
        }
    }

    /// Sub-register over a contiguous range.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> RuntimeResult<Quant> {
        use std::ops::Bound;
        let start = match range.start_bound() {
            Bound::Included(&i) => i,
            Bound::Excluded(&i) => i + 1,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&i) => i + 1,
            Bound::Excluded(&i) => i,
            Bound::Unbounded => self.qubits.len(),
        };
        if start > end || end > self.qubits.len() {
            return Err(InvariantError::IndexOutOfRange {
                index: end,
                len: self.qubits.len(),
            }
            .into());
        }
        Ok(self.derive(self.qubits[start..end].to_vec()))
    }

    /// Sub-register at the given positions, in the given order.
    pub fn at(&self, indices: &[usize]) -> RuntimeResult<Quant> {
        let mut qubits = Vec::with_capacity(indices.len());
        for &i in indices {
            match self.qubits.get(i) {
                Some(q) => qubits.push(*q),
                None => {
                    return Err(InvariantError::IndexOutOfRange {
                        index: i,
                        len: self.qubits.len(),
                    }
                    .into());
                }
            }
        }
        Ok(self.derive(qubits))
    }

    /// Register with the qubit order inverted.
    #[must_use]
    pub fn rev(&self) -> Quant {
        let mut qubits = self.qubits.clone();
        qubits.reverse();
        self.derive(qubits)
    }

    /// Concatenate two registers of the same process scope.
    ///
    /// Fails if the registers belong to different processes or scopes, or
    /// if the result would alias the same handle twice.
    pub fn concat(&self, other: &Quant) -> RuntimeResult<Quant> {
        if !Process::same_process(&self.process, &other.process) || self.scope != other.scope {
            return Err(InvariantError::ProcessMismatch.into());
        }
        if let Some(q) = other.qubits.iter().find(|q| self.qubits.contains(q)) {
            return Err(InvariantError::OverlappingConcat(*q).into());
        }
        let mut qubits = self.qubits.clone();
        qubits.extend_from_slice(&other.qubits);
        Ok(self.derive(qubits))
    }

    /// Iterate over single-qubit sub-registers.
    pub fn iter(&self) -> impl Iterator<Item = Quant> + '_ {
        self.qubits.iter().map(|q| self.derive(vec![*q]))
    }

    fn derive(&self, qubits: Vec<QubitId>) -> Quant {
        Quant {
            process: self.process.clone(),
            scope: self.scope,
            qubits,
        }
    }
}

impl std::fmt::Debug for Quant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Quant")
            .field("scope", &self.scope)
            .field("qubits", &self.qubits)
            .finish()
    }
}

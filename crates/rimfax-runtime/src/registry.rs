//! Qubit handle lifecycle.

use rimfax_ir::QubitId;

use crate::error::{InvariantError, RuntimeResult};

#[derive(Debug, Clone, Copy)]
struct QubitState {
    allocated: bool,
    dirty: bool,
}

/// Owns allocation state for every handle a scope has ever seen.
///
/// Indices grow monotonically; a freed index is never handed out again, so
/// a stale alias can only ever name a dead qubit, not a recycled one.
#[derive(Debug, Default)]
pub(crate) struct QubitRegistry {
    states: Vec<QubitState>,
    live: u32,
}

impl QubitRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Hand out `count` fresh handles in ascending order.
    pub(crate) fn allocate(&mut self, count: u32, dirty: bool) -> Vec<QubitId> {
        let mut ids = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let id = QubitId::from(self.states.len());
            self.states.push(QubitState {
                allocated: true,
                dirty,
            });
            ids.push(id);
        }
        self.live += count;
        ids
    }

    /// Mark handles released. Liveness flips immediately; the basis-state
    /// check is the backend's, at flush time.
    pub(crate) fn free(&mut self, qubits: &[QubitId]) -> RuntimeResult<()> {
        for q in qubits {
            if !self.is_allocated(*q) {
                return Err(InvariantError::QubitAlreadyFree(*q).into());
            }
        }
        for q in qubits {
            self.states[q.0 as usize].allocated = false;
        }
        self.live -= qubits.len() as u32;
        Ok(())
    }

    pub(crate) fn is_allocated(&self, qubit: QubitId) -> bool {
        self.states
            .get(qubit.0 as usize)
            .is_some_and(|s| s.allocated)
    }

    /// Local liveness check over a whole register; no backend round-trip.
    pub(crate) fn is_free(&self, qubits: &[QubitId]) -> bool {
        qubits.iter().all(|q| !self.is_allocated(*q))
    }

    /// Error unless every handle is live.
    pub(crate) fn check_allocated(&self, qubits: &[QubitId]) -> RuntimeResult<()> {
        match qubits.iter().find(|q| !self.is_allocated(**q)) {
            Some(q) => Err(InvariantError::QubitNotAllocated(*q).into()),
            None => Ok(()),
        }
    }

    pub(crate) fn is_dirty(&self, qubit: QubitId) -> bool {
        self.states.get(qubit.0 as usize).is_some_and(|s| s.dirty)
    }

    /// Number of currently live qubits.
    pub(crate) fn live_count(&self) -> u32 {
        self.live
    }
}

//! Deferred state captures.

use num_complex::Complex64;
use rustc_hash::FxHashMap;

use rimfax_hal::DumpData;
use rimfax_ir::{DumpId, DumpMode};

use crate::error::{InvariantError, RuntimeResult};
use crate::process::Process;

/// A point-in-time capture request over a register.
///
/// The capture is recorded into the instruction log when the `Dump` is
/// created; reading any representation follows the same flush contract as
/// a [`Future`](crate::Future).
#[derive(Clone)]
pub struct Dump {
    process: Process,
    scope: u64,
    id: DumpId,
    mode: DumpMode,
    width: usize,
}

impl Dump {
    pub(crate) fn new(
        process: Process,
        scope: u64,
        id: DumpId,
        mode: DumpMode,
        width: usize,
    ) -> Self {
        Self {
            process,
            scope,
            id,
            mode,
            width,
        }
    }

    /// The representation this capture was requested in.
    pub fn mode(&self) -> DumpMode {
        self.mode
    }

    /// Width of the captured register, in qubits.
    pub fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn id(&self) -> DumpId {
        self.id
    }

    pub(crate) fn scope_id(&self) -> u64 {
        self.scope
    }

    /// True when the capture is already available without a flush.
    pub fn is_available(&self) -> bool {
        self.process.dump_available(self)
    }

    /// Resolve the capture, flushing if necessary.
    pub fn get(&self) -> RuntimeResult<DumpData> {
        self.process.clone().resolve_dump(self)
    }

    /// Basis states and probabilities of a `Probabilities` capture.
    pub fn probabilities(&self) -> RuntimeResult<Vec<(u64, f64)>> {
        match self.get()? {
            DumpData::Probabilities {
                states,
                probabilities,
            } => Ok(states.into_iter().zip(probabilities).collect()),
            _ => Err(InvariantError::DumpModeMismatch.into()),
        }
    }

    /// Basis states and amplitudes of an `Amplitudes` capture.
    pub fn amplitudes(&self) -> RuntimeResult<Vec<(u64, Complex64)>> {
        match self.get()? {
            DumpData::Amplitudes { states, amplitudes } => {
                Ok(states.into_iter().zip(amplitudes).collect())
            }
            _ => Err(InvariantError::DumpModeMismatch.into()),
        }
    }

    /// Shot counts of a `Shots` capture.
    pub fn shots(&self) -> RuntimeResult<FxHashMap<u64, u32>> {
        match self.get()? {
            DumpData::Shots { counts, .. } => Ok(counts),
            _ => Err(InvariantError::DumpModeMismatch.into()),
        }
    }
}

impl std::fmt::Debug for Dump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dump")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("mode", &self.mode)
            .field("width", &self.width)
            .finish()
    }
}

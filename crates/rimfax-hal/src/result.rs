//! Execution request and response types.

use num_complex::Complex64;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use rimfax_ir::Instruction;

use crate::error::{HalError, HalResult};

/// An ordered batch of instructions, produced by one flush of the runtime's
/// instruction log.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Instructions in program order. Backends MUST execute them in exactly
    /// this order.
    pub instructions: Vec<Instruction>,
}

impl ExecutionRequest {
    /// Create a request from a drained instruction log.
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Number of instructions in the request.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Check if the request is empty.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Number of measurement result slots this request expects.
    pub fn num_measurements(&self) -> usize {
        self.instructions.iter().filter(|i| i.is_measure()).count()
    }

    /// Number of dump result slots this request expects.
    pub fn num_dumps(&self) -> usize {
        self.instructions.iter().filter(|i| i.is_dump()).count()
    }
}

/// Resolved contents of one dump instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DumpData {
    /// Basis states with their probabilities.
    Probabilities {
        /// Observed basis states (bit i of a state = qubit i of the dumped
        /// register).
        states: Vec<u64>,
        /// Probability of each state, same order as `states`.
        probabilities: Vec<f64>,
    },
    /// Basis states with their complex amplitudes.
    Amplitudes {
        /// Observed basis states.
        states: Vec<u64>,
        /// Amplitude of each state, same order as `states`.
        amplitudes: Vec<Complex64>,
    },
    /// Sampled measurement shots.
    Shots {
        /// Map from basis state to observed count.
        counts: FxHashMap<u64, u32>,
        /// Total number of shots sampled.
        total: u32,
    },
}

/// Results of executing one [`ExecutionRequest`].
///
/// Correlation is positional: the n-th entry of `measurements` answers the
/// n-th `Measure` instruction of the request, and likewise for `dumps`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionResponse {
    /// One bit-string per `Measure` instruction: one outcome bit per
    /// measured qubit, in the instruction's qubit order.
    pub measurements: Vec<Vec<bool>>,
    /// One payload per `Dump` instruction.
    pub dumps: Vec<DumpData>,
}

impl ExecutionResponse {
    /// Check that this response carries one result per result slot of
    /// `request`.
    pub fn check_shape(&self, request: &ExecutionRequest) -> HalResult<()> {
        if self.measurements.len() != request.num_measurements() {
            return Err(HalError::MalformedResponse(format!(
                "expected {} measurement results, got {}",
                request.num_measurements(),
                self.measurements.len(),
            )));
        }
        if self.dumps.len() != request.num_dumps() {
            return Err(HalError::MalformedResponse(format!(
                "expected {} dump results, got {}",
                request.num_dumps(),
                self.dumps.len(),
            )));
        }
        Ok(())
    }
}

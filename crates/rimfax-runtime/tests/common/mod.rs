//! Scripted backends shared by the integration suites.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use num_complex::Complex64;

use rimfax_hal::{
    Backend, Capabilities, DumpData, ExecutionRequest, ExecutionResponse, HalError, HalResult,
};
use rimfax_ir::{DumpMode, Instruction};

/// Backend that records every request it receives and answers measurements
/// from a scripted queue of outcome words (zero once the script runs out).
pub struct RecordingBackend {
    caps: Capabilities,
    requests: Rc<RefCell<Vec<ExecutionRequest>>>,
    outcomes: VecDeque<u64>,
}

impl RecordingBackend {
    pub fn new() -> (Self, Rc<RefCell<Vec<ExecutionRequest>>>) {
        Self::scripted([])
    }

    /// One outcome word per `Measure` instruction, in flush order. Bit `i`
    /// of the word is the reported outcome of the instruction's qubit `i`.
    pub fn scripted(
        outcomes: impl IntoIterator<Item = u64>,
    ) -> (Self, Rc<RefCell<Vec<ExecutionRequest>>>) {
        let requests = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                caps: Capabilities::default(),
                requests: Rc::clone(&requests),
                outcomes: outcomes.into_iter().collect(),
            },
            requests,
        )
    }
}

impl Backend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    fn execute(&mut self, request: &ExecutionRequest) -> HalResult<ExecutionResponse> {
        self.requests.borrow_mut().push(request.clone());
        let mut measurements = Vec::new();
        let mut dumps = Vec::new();
        for instruction in &request.instructions {
            match instruction {
                Instruction::Measure { qubits, .. } => {
                    let value = self.outcomes.pop_front().unwrap_or(0);
                    measurements.push((0..qubits.len()).map(|i| value >> i & 1 == 1).collect());
                }
                Instruction::Dump { qubits, mode, .. } => {
                    let ones = (1u64 << qubits.len()) - 1;
                    dumps.push(match mode {
                        DumpMode::Probabilities => DumpData::Probabilities {
                            states: vec![0, ones],
                            probabilities: vec![0.5, 0.5],
                        },
                        DumpMode::Amplitudes => DumpData::Amplitudes {
                            states: vec![0, ones],
                            amplitudes: vec![
                                Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0),
                                Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0),
                            ],
                        },
                        DumpMode::Shots { count } => DumpData::Shots {
                            counts: [(0, count / 2), (ones, count - count / 2)]
                                .into_iter()
                                .collect(),
                            total: *count,
                        },
                    });
                }
                _ => {}
            }
        }
        Ok(ExecutionResponse {
            measurements,
            dumps,
        })
    }
}

/// Backend that fails every request.
pub struct FailingBackend {
    caps: Capabilities,
}

impl FailingBackend {
    pub fn new() -> Self {
        Self {
            caps: Capabilities::default(),
        }
    }
}

impl Backend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    fn execute(&mut self, _request: &ExecutionRequest) -> HalResult<ExecutionResponse> {
        Err(HalError::Execution {
            instruction: 0,
            reason: "scripted failure".into(),
        })
    }
}

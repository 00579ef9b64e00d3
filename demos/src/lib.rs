//! Rimfax Demo Suite
//!
//! Small runnable programs exercising the recording runtime end to end:
//!
//! - **Bell pair**: entangle, measure, observe a single lazy flush
//! - **Teleportation**: deferred measurements driving classical corrections
//!   across two flushes
//!
//! The demos run against [`CorrelatedSampler`], a stand-in backend: it
//! executes nothing, it just answers every measurement with one shared
//! random bit per register and every dump with the two extremal basis
//! states. That happens to be exactly the statistics of GHZ-type programs,
//! which is what the demos record. Swap in any real [`Backend`]
//! implementation to run the same programs for real.

use console::style;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use rimfax_hal::{
    Backend, Capabilities, DumpData, ExecutionRequest, ExecutionResponse, HalResult,
};
use rimfax_ir::{DumpMode, Instruction};

/// Stand-in backend with perfectly correlated outcomes.
///
/// Every `Measure` instruction gets one coin flip, reported identically for
/// each of its qubits; every `Probabilities` dump reports the all-zeros and
/// all-ones states at probability one half each.
pub struct CorrelatedSampler {
    caps: Capabilities,
    rng: StdRng,
}

impl CorrelatedSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            caps: Capabilities::simulator(32),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Backend for CorrelatedSampler {
    fn name(&self) -> &str {
        "correlated-sampler"
    }

    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    fn execute(&mut self, request: &ExecutionRequest) -> HalResult<ExecutionResponse> {
        let mut measurements = Vec::new();
        let mut dumps = Vec::new();
        for instruction in &request.instructions {
            match instruction {
                Instruction::Measure { qubits, .. } => {
                    let bit = self.rng.gen_bool(0.5);
                    measurements.push(vec![bit; qubits.len()]);
                }
                Instruction::Dump { qubits, mode, .. } => {
                    let ones = (1u64 << qubits.len()) - 1;
                    dumps.push(match mode {
                        DumpMode::Shots { count } => {
                            let heads = (0..*count).filter(|_| self.rng.gen_bool(0.5)).count()
                                as u32;
                            DumpData::Shots {
                                counts: [(0, *count - heads), (ones, heads)]
                                    .into_iter()
                                    .collect(),
                                total: *count,
                            }
                        }
                        _ => DumpData::Probabilities {
                            states: vec![0, ones],
                            probabilities: vec![0.5, 0.5],
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

/// Initialize tracing from `RUST_LOG` (default `info`).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Print a demo header.
pub fn print_header(title: &str) {
    println!();
    println!("{}", style("═".repeat(60)).cyan());
    println!("{}", style(format!("  {title}")).cyan().bold());
    println!("{}", style("═".repeat(60)).cyan());
}

/// Print a section divider.
pub fn print_section(title: &str) {
    println!();
    println!("{}", style(format!("── {title} ──")).blue().bold());
}

/// Print a key/value result line.
pub fn print_result(label: &str, value: impl std::fmt::Display) {
    println!("  {} {}", style(format!("{label}:")).dim(), value);
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("  {} {}", style("✓").green().bold(), message);
}

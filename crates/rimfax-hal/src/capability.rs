//! Backend capability declaration.

use serde::{Deserialize, Serialize};

/// Static capabilities of a backend.
///
/// Capabilities MUST be cached at backend construction time so that
/// [`Backend::capabilities`](crate::Backend::capabilities) can be
/// synchronous and infallible. The runtime uses `num_qubits` for its local
/// allocation-capacity check and `max_shots` to validate shot-sampled dumps
/// before they enter the instruction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Maximum number of simultaneously live qubits.
    pub num_qubits: u32,
    /// Maximum shot count for a sampled dump.
    pub max_shots: u32,
    /// Whether amplitude dumps are supported (simulators only; hardware
    /// backends report `false` and serve probability/shot dumps).
    pub supports_amplitudes: bool,
    /// Whether dirty (uninitialized) allocation is supported.
    pub supports_dirty_allocation: bool,
}

impl Capabilities {
    /// Capabilities typical of a state-vector simulator.
    pub fn simulator(num_qubits: u32) -> Self {
        Self {
            num_qubits,
            max_shots: 1 << 20,
            supports_amplitudes: true,
            supports_dirty_allocation: true,
        }
    }

    /// Capabilities typical of hardware: no amplitude access, no dirty
    /// allocation.
    pub fn hardware(num_qubits: u32, max_shots: u32) -> Self {
        Self {
            num_qubits,
            max_shots,
            supports_amplitudes: false,
            supports_dirty_allocation: false,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::simulator(32)
    }
}

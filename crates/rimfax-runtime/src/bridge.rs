//! Execution bridge: drains the instruction log, dispatches to the
//! backend, and demultiplexes results back into pending futures and dumps.

use tracing::{debug, info_span, warn};

use rimfax_hal::{Backend, ExecutionRequest, HalError};
use rimfax_ir::Instruction;

use crate::error::{InvariantError, RuntimeError, RuntimeResult};
use crate::process::ScopeState;

/// Perform one backend round-trip for the active scope.
///
/// No-op when the live log is empty. On any backend failure the scope is
/// poisoned: no further instructions may be appended and no further flush
/// is attempted; a new scope must be started.
pub(crate) fn flush(
    scope: &mut ScopeState,
    backend: &mut dyn Backend,
    flush_count: &mut u64,
) -> RuntimeResult<()> {
    if scope.poisoned {
        return Err(InvariantError::ScopeTerminated.into());
    }
    if scope.log.is_empty() {
        return Ok(());
    }

    let request = ExecutionRequest::new(scope.log.drain());
    let span = info_span!("flush", backend = backend.name(), instructions = request.len());
    let _guard = span.enter();

    let response = match backend.execute(&request) {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, "backend rejected request; scope poisoned");
            scope.poisoned = true;
            return Err(RuntimeError::Backend(err));
        }
    };
    if let Err(err) = response.check_shape(&request) {
        scope.poisoned = true;
        return Err(RuntimeError::Backend(err));
    }

    let mut measurements = response.measurements.into_iter();
    let mut dumps = response.dumps.into_iter();
    for instruction in &request.instructions {
        match instruction {
            Instruction::Measure { qubits, result } => {
                let bits = measurements
                    .next()
                    .expect("response shape checked against request");
                if bits.len() != qubits.len() {
                    scope.poisoned = true;
                    return Err(RuntimeError::Backend(HalError::MalformedResponse(format!(
                        "measurement {result} returned {} bits for {} qubits",
                        bits.len(),
                        qubits.len(),
                    ))));
                }
                // Bit i of the outcome is the measurement of qubits[i]:
                // least-significant-first register order.
                let mut value = 0u64;
                for (i, bit) in bits.iter().enumerate() {
                    if *bit {
                        value |= 1 << i;
                    }
                }
                scope.measurements.insert(*result, value);
            }
            Instruction::Dump { result, .. } => {
                let data = dumps
                    .next()
                    .expect("response shape checked against request");
                scope.dumps.insert(*result, data);
            }
            _ => {}
        }
    }

    *flush_count += 1;
    debug!(total_flushes = *flush_count, "flush complete");
    Ok(())
}

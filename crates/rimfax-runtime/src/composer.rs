//! Control/adjoint composer.
//!
//! A stack machine that makes controlled and inverted composition nest to
//! arbitrary depth. Each open scope is a frame:
//!
//! - `Control(set)` — every gate recorded while the frame is open carries
//!   the union of all control sets on the stack.
//! - `Adjoint(buffer)` — appends are redirected to the frame's side-buffer;
//!   on normal exit the buffer is reversed and spliced into the next-outer
//!   active buffer.
//!
//! Controls and inversion parity are read from the stack at the moment each
//! gate is issued, so nesting order is respected without a second pass. The
//! only second pass is the order reversal on adjoint exit: inverting a
//! sequence requires reversing it in addition to inverting each element.

use rustc_hash::FxHashSet;
use tracing::trace;

use rimfax_ir::{GateKind, Instruction, QubitId};

use crate::error::{CompositionError, RuntimeResult};
use crate::log::InstructionLog;

/// One open composition scope.
#[derive(Debug)]
pub(crate) enum Frame {
    /// Controlled scope with its control-qubit set.
    Control(Vec<QubitId>),
    /// Inverted scope with its side-buffer of recorded instructions.
    Adjoint(Vec<Instruction>),
}

/// The per-scope frame stack.
#[derive(Debug, Default)]
pub(crate) struct Composer {
    frames: Vec<Frame>,
}

impl Composer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// True when no frame is open.
    pub(crate) fn is_idle(&self) -> bool {
        self.frames.is_empty()
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Union of the control sets of all open control frames.
    pub(crate) fn effective_controls(&self) -> Vec<QubitId> {
        let mut set = FxHashSet::default();
        for frame in &self.frames {
            if let Frame::Control(qubits) = frame {
                set.extend(qubits.iter().copied());
            }
        }
        let mut controls: Vec<_> = set.into_iter().collect();
        controls.sort_unstable();
        controls
    }

    /// Parity of the open adjoint frames.
    pub(crate) fn net_inversion(&self) -> bool {
        self.frames
            .iter()
            .filter(|f| matches!(f, Frame::Adjoint(_)))
            .count()
            % 2
            == 1
    }

    /// True when `qubit` belongs to any open control frame.
    pub(crate) fn is_control(&self, qubit: QubitId) -> bool {
        self.frames.iter().any(|f| match f {
            Frame::Control(qubits) => qubits.contains(&qubit),
            Frame::Adjoint(_) => false,
        })
    }

    /// Build the instruction for a primitive gate issued right now: the
    /// current effective controls and inversion parity are baked in.
    pub(crate) fn compose_gate(
        &self,
        gate: GateKind,
        targets: Vec<QubitId>,
    ) -> RuntimeResult<Instruction> {
        let instruction =
            Instruction::gate(gate, targets, self.effective_controls(), self.net_inversion())?;
        Ok(instruction)
    }

    /// Route an instruction to the active buffer: the innermost open
    /// adjoint frame's side-buffer, or the live log.
    pub(crate) fn append(&mut self, instruction: Instruction, log: &mut InstructionLog) {
        match self
            .frames
            .iter_mut()
            .rev()
            .find_map(|f| match f {
                Frame::Adjoint(buffer) => Some(buffer),
                Frame::Control(_) => None,
            }) {
            Some(buffer) => {
                trace!(name = instruction.name(), "append to adjoint buffer");
                buffer.push(instruction);
            }
            None => {
                trace!(name = instruction.name(), "append to live log");
                log.append(instruction);
            }
        }
    }

    /// Open a controlled scope.
    pub(crate) fn push_control(&mut self, qubits: Vec<QubitId>) {
        self.frames.push(Frame::Control(qubits));
    }

    /// Close the innermost frame, which must be a control frame. Controls
    /// were baked into each instruction at append time; nothing to splice.
    pub(crate) fn pop_control(&mut self) -> RuntimeResult<()> {
        match self.frames.last() {
            Some(Frame::Control(_)) => {
                self.frames.pop();
                Ok(())
            }
            Some(Frame::Adjoint(_)) => {
                Err(CompositionError::FrameMismatch { expected: "control" }.into())
            }
            None => Err(CompositionError::NoOpenFrame.into()),
        }
    }

    /// Open an inverted scope with a fresh side-buffer.
    pub(crate) fn push_adjoint(&mut self) {
        self.frames.push(Frame::Adjoint(Vec::new()));
    }

    /// Close the innermost frame, which must be an adjoint frame: reverse
    /// its side-buffer and splice it into the next-outer active buffer.
    ///
    /// The spliced instructions keep their control and inversion fields;
    /// those were computed per-instruction at append time.
    pub(crate) fn pop_adjoint(&mut self, log: &mut InstructionLog) -> RuntimeResult<()> {
        let buffer = match self.frames.last() {
            Some(Frame::Adjoint(_)) => match self.frames.pop() {
                Some(Frame::Adjoint(buffer)) => buffer,
                _ => unreachable!("frame kind checked above"),
            },
            Some(Frame::Control(_)) => {
                return Err(CompositionError::FrameMismatch { expected: "adjoint" }.into());
            }
            None => return Err(CompositionError::NoOpenFrame.into()),
        };
        trace!(len = buffer.len(), "splice reversed adjoint buffer");
        for instruction in buffer.into_iter().rev() {
            self.append(instruction, log);
        }
        Ok(())
    }

    /// Drop the innermost frame without splicing. This is the error-unwind
    /// path: an abandoned adjoint buffer must never reach the log.
    pub(crate) fn discard_innermost(&mut self) -> Option<Frame> {
        self.frames.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rimfax_ir::GateKind::{Hadamard, PauliX, PauliZ, RotationY};

    /// Issue a primitive gate the way the process does: compose, then
    /// route.
    fn issue(composer: &mut Composer, log: &mut InstructionLog, gate: GateKind, target: u32) {
        let inst = composer.compose_gate(gate, vec![QubitId(target)]).unwrap();
        composer.append(inst, log);
    }

    fn plain(gate: GateKind, target: u32) -> Instruction {
        Instruction::gate(gate, [QubitId(target)], [], false).unwrap()
    }

    fn inverted(gate: GateKind, target: u32) -> Instruction {
        Instruction::gate(gate, [QubitId(target)], [], true).unwrap()
    }

    #[test]
    fn test_order_preserved_without_frames() {
        let mut composer = Composer::new();
        let mut log = InstructionLog::new();
        issue(&mut composer, &mut log, Hadamard, 0);
        issue(&mut composer, &mut log, PauliX, 1);
        issue(&mut composer, &mut log, PauliZ, 2);
        assert_eq!(
            log.drain(),
            vec![plain(Hadamard, 0), plain(PauliX, 1), plain(PauliZ, 2)]
        );
    }

    #[test]
    fn test_adjoint_reverses_and_inverts() {
        let mut composer = Composer::new();
        let mut log = InstructionLog::new();
        composer.push_adjoint();
        issue(&mut composer, &mut log, Hadamard, 0);
        issue(&mut composer, &mut log, PauliX, 1);
        issue(&mut composer, &mut log, RotationY(0.5), 2);
        assert!(log.is_empty(), "nothing reaches the log while the frame is open");
        composer.pop_adjoint(&mut log).unwrap();
        assert_eq!(
            log.drain(),
            vec![
                inverted(RotationY(0.5), 2),
                inverted(PauliX, 1),
                inverted(Hadamard, 0),
            ]
        );
    }

    #[test]
    fn test_double_adjoint_is_identity() {
        let mut composer = Composer::new();
        let mut log = InstructionLog::new();
        composer.push_adjoint();
        composer.push_adjoint();
        issue(&mut composer, &mut log, Hadamard, 0);
        issue(&mut composer, &mut log, PauliX, 1);
        issue(&mut composer, &mut log, PauliZ, 2);
        composer.pop_adjoint(&mut log).unwrap();
        composer.pop_adjoint(&mut log).unwrap();
        // Reversed twice and even inversion parity: the original program.
        assert_eq!(
            log.drain(),
            vec![plain(Hadamard, 0), plain(PauliX, 1), plain(PauliZ, 2)]
        );
    }

    #[test]
    fn test_control_union_across_nesting() {
        let mut composer = Composer::new();
        let mut log = InstructionLog::new();
        composer.push_control(vec![QubitId(5)]);
        composer.push_control(vec![QubitId(7), QubitId(5)]);
        issue(&mut composer, &mut log, PauliX, 0);
        composer.pop_control().unwrap();
        composer.pop_control().unwrap();
        assert_eq!(
            log.drain(),
            vec![
                Instruction::gate(PauliX, [QubitId(0)], [QubitId(5), QubitId(7)], false).unwrap()
            ]
        );
    }

    #[test]
    fn test_controlled_adjoint() {
        // adj(f) under control(c) == control c applied to the reversed,
        // per-gate-inverted expansion of f.
        let mut composer = Composer::new();
        let mut log = InstructionLog::new();
        composer.push_control(vec![QubitId(9)]);
        composer.push_adjoint();
        issue(&mut composer, &mut log, Hadamard, 0);
        issue(&mut composer, &mut log, PauliX, 1);
        composer.pop_adjoint(&mut log).unwrap();
        composer.pop_control().unwrap();
        assert_eq!(
            log.drain(),
            vec![
                Instruction::gate(PauliX, [QubitId(1)], [QubitId(9)], true).unwrap(),
                Instruction::gate(Hadamard, [QubitId(0)], [QubitId(9)], true).unwrap(),
            ]
        );
    }

    #[test]
    fn test_adjoint_of_controlled() {
        let mut composer = Composer::new();
        let mut log = InstructionLog::new();
        composer.push_adjoint();
        composer.push_control(vec![QubitId(3)]);
        issue(&mut composer, &mut log, Hadamard, 0);
        issue(&mut composer, &mut log, PauliZ, 1);
        composer.pop_control().unwrap();
        composer.pop_adjoint(&mut log).unwrap();
        assert_eq!(
            log.drain(),
            vec![
                Instruction::gate(PauliZ, [QubitId(1)], [QubitId(3)], true).unwrap(),
                Instruction::gate(Hadamard, [QubitId(0)], [QubitId(3)], true).unwrap(),
            ]
        );
    }

    #[test]
    fn test_adjoint_nested_in_adjoint_splices_into_outer_buffer() {
        let mut composer = Composer::new();
        let mut log = InstructionLog::new();
        composer.push_adjoint();
        issue(&mut composer, &mut log, Hadamard, 0);
        composer.push_adjoint();
        issue(&mut composer, &mut log, PauliX, 1);
        issue(&mut composer, &mut log, PauliZ, 2);
        composer.pop_adjoint(&mut log).unwrap();
        assert!(log.is_empty(), "inner splice lands in the outer buffer");
        issue(&mut composer, &mut log, RotationY(1.0), 3);
        composer.pop_adjoint(&mut log).unwrap();
        // Outer buffer was [H'(0); Z(2); X(1); Ry'(3)], reversed on exit.
        // Inner gates carried even parity at issue time.
        assert_eq!(
            log.drain(),
            vec![
                inverted(RotationY(1.0), 3),
                plain(PauliX, 1),
                plain(PauliZ, 2),
                inverted(Hadamard, 0),
            ]
        );
    }

    #[test]
    fn test_discard_drops_buffer() {
        let mut composer = Composer::new();
        let mut log = InstructionLog::new();
        composer.push_adjoint();
        issue(&mut composer, &mut log, Hadamard, 0);
        let frame = composer.discard_innermost();
        assert!(matches!(frame, Some(Frame::Adjoint(buffer)) if buffer.len() == 1));
        assert!(composer.is_idle());
        assert!(log.is_empty());
    }

    #[test]
    fn test_mismatched_pop_rejected() {
        let mut composer = Composer::new();
        let mut log = InstructionLog::new();
        composer.push_control(vec![QubitId(0)]);
        assert!(composer.pop_adjoint(&mut log).is_err());
        assert!(composer.pop_control().is_ok());
        assert!(composer.pop_control().is_err());
    }

    #[test]
    fn test_inversion_parity() {
        let mut composer = Composer::new();
        assert!(!composer.net_inversion());
        composer.push_adjoint();
        assert!(composer.net_inversion());
        composer.push_control(vec![QubitId(0)]);
        assert!(composer.net_inversion());
        composer.push_adjoint();
        assert!(!composer.net_inversion());
    }
}

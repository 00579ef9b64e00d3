//! Append-only instruction log.

use rimfax_ir::Instruction;

/// Ordered record of the instructions issued in one scope since the last
/// flush.
///
/// The log is append-only between flushes; [`drain`](InstructionLog::drain)
/// atomically empties it and hands ownership of the sequence to the
/// execution bridge.
#[derive(Debug, Default)]
pub(crate) struct InstructionLog {
    entries: Vec<Instruction>,
}

impl InstructionLog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append one instruction in program order.
    pub(crate) fn append(&mut self, instruction: Instruction) {
        self.entries.push(instruction);
    }

    /// Empty the log and return its contents.
    pub(crate) fn drain(&mut self) -> Vec<Instruction> {
        std::mem::take(&mut self.entries)
    }

    /// Check whether a flush would be a no-op.
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Read-only view of the pending instructions.
    pub(crate) fn entries(&self) -> &[Instruction] {
        &self.entries
    }
}

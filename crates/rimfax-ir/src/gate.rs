//! Primitive gate kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive single-qubit gates understood by every backend.
///
/// Controlled application and inversion are not gate kinds of their own:
/// they are carried by the `controls` and `inverted` fields of a
/// [`Instruction::Gate`](crate::Instruction::Gate), so that the composer can
/// stack them structurally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GateKind {
    /// Pauli-X gate.
    PauliX,
    /// Pauli-Y gate.
    PauliY,
    /// Pauli-Z gate.
    PauliZ,
    /// Hadamard gate.
    Hadamard,
    /// Phase gate P(λ).
    Phase(f64),
    /// Rotation around X by θ.
    RotationX(f64),
    /// Rotation around Y by θ.
    RotationY(f64),
    /// Rotation around Z by θ.
    RotationZ(f64),
}

impl GateKind {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            GateKind::PauliX => "x",
            GateKind::PauliY => "y",
            GateKind::PauliZ => "z",
            GateKind::Hadamard => "h",
            GateKind::Phase(_) => "p",
            GateKind::RotationX(_) => "rx",
            GateKind::RotationY(_) => "ry",
            GateKind::RotationZ(_) => "rz",
        }
    }

    /// Get the rotation/phase parameter, if any.
    pub fn param(&self) -> Option<f64> {
        match self {
            GateKind::Phase(p)
            | GateKind::RotationX(p)
            | GateKind::RotationY(p)
            | GateKind::RotationZ(p) => Some(*p),
            _ => None,
        }
    }

    /// Check whether this gate is its own inverse.
    pub fn is_self_inverse(&self) -> bool {
        matches!(
            self,
            GateKind::PauliX | GateKind::PauliY | GateKind::PauliZ | GateKind::Hadamard
        )
    }

    /// Return the inverse gate.
    ///
    /// Backends that do not interpret the `inverted` flag natively can use
    /// this to rewrite an inverted instruction into a plain one.
    #[must_use]
    pub fn inverse(&self) -> GateKind {
        match *self {
            GateKind::Phase(p) => GateKind::Phase(-p),
            GateKind::RotationX(p) => GateKind::RotationX(-p),
            GateKind::RotationY(p) => GateKind::RotationY(-p),
            GateKind::RotationZ(p) => GateKind::RotationZ(-p),
            g => g,
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.param() {
            Some(p) => write!(f, "{}({p})", self.name()),
            None => write!(f, "{}", self.name()),
        }
    }
}

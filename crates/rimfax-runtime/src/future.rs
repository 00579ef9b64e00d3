//! Deferred measurement values.
//!
//! A [`Future`] is an immutable expression tree over measurement results
//! and integer literals. Building expressions never touches the backend;
//! the first [`value`](Future::value) call flushes the instruction log,
//! substitutes the backend-returned bits bottom-up, and caches the result
//! on each node (single assignment, idempotent reads).

use std::cell::Cell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use rimfax_ir::MeasureId;

use crate::error::{InvariantError, RuntimeResult};
use crate::process::Process;

/// Binary operators over resolved future values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// Wrapping addition.
    Add,
    /// Wrapping subtraction.
    Sub,
    /// Wrapping multiplication.
    Mul,
    /// Floor division; division by zero is an error at evaluation time.
    Div,
    /// Left shift; the amount is taken modulo 64.
    Shl,
    /// Arithmetic right shift; the amount is taken modulo 64.
    Shr,
    /// Bitwise AND.
    And,
    /// Bitwise OR.
    Or,
    /// Bitwise XOR.
    Xor,
    /// Equality, yielding 0 or 1.
    Eq,
    /// Inequality, yielding 0 or 1.
    Neq,
    /// Less-than, yielding 0 or 1.
    Lt,
    /// Less-or-equal, yielding 0 or 1.
    Leq,
    /// Greater-than, yielding 0 or 1.
    Gt,
    /// Greater-or-equal, yielding 0 or 1.
    Geq,
}

impl BinaryOp {
    fn apply(self, lhs: i64, rhs: i64) -> RuntimeResult<i64> {
        Ok(match self {
            BinaryOp::Add => lhs.wrapping_add(rhs),
            BinaryOp::Sub => lhs.wrapping_sub(rhs),
            BinaryOp::Mul => lhs.wrapping_mul(rhs),
            BinaryOp::Div => {
                if rhs == 0 {
                    return Err(InvariantError::DivisionByZero.into());
                }
                floor_div(lhs, rhs)
            }
            BinaryOp::Shl => lhs.wrapping_shl(rhs as u32),
            BinaryOp::Shr => lhs.wrapping_shr(rhs as u32),
            BinaryOp::And => lhs & rhs,
            BinaryOp::Or => lhs | rhs,
            BinaryOp::Xor => lhs ^ rhs,
            BinaryOp::Eq => (lhs == rhs) as i64,
            BinaryOp::Neq => (lhs != rhs) as i64,
            BinaryOp::Lt => (lhs < rhs) as i64,
            BinaryOp::Leq => (lhs <= rhs) as i64,
            BinaryOp::Gt => (lhs > rhs) as i64,
            BinaryOp::Geq => (lhs >= rhs) as i64,
        })
    }
}

/// Floor division (rounds toward negative infinity).
fn floor_div(lhs: i64, rhs: i64) -> i64 {
    let quotient = lhs.wrapping_div(rhs);
    if (lhs % rhs != 0) && ((lhs < 0) != (rhs < 0)) {
        quotient - 1
    } else {
        quotient
    }
}

#[derive(Debug)]
pub(crate) enum Expr {
    Literal(i64),
    /// A measurement leaf. `MeasureId`s are only unique within a scope, so
    /// the leaf carries the id of the scope that recorded it; evaluation
    /// against any other scope's result table is rejected rather than
    /// resolved by slot collision.
    Measurement { scope: u64, id: MeasureId },
    Binary {
        op: BinaryOp,
        lhs: Rc<Node>,
        rhs: Rc<Node>,
    },
}

/// One node of the expression tree, with a single-assignment value cache.
#[derive(Debug)]
pub(crate) struct Node {
    expr: Expr,
    cache: Cell<Option<i64>>,
}

impl Node {
    fn new(expr: Expr) -> Rc<Node> {
        Rc::new(Node {
            expr,
            cache: Cell::new(None),
        })
    }
}

/// True when every measurement leaf below `node` has a delivered result in
/// `scope`'s table (or the subtree is already cached). A leaf recorded by
/// a different scope only counts as resolved through its cache.
pub(crate) fn is_resolved(node: &Node, scope: u64, results: &FxHashMap<MeasureId, u64>) -> bool {
    if node.cache.get().is_some() {
        return true;
    }
    match &node.expr {
        Expr::Literal(_) => true,
        Expr::Measurement { scope: leaf, id } => *leaf == scope && results.contains_key(id),
        Expr::Binary { lhs, rhs, .. } => {
            is_resolved(lhs, scope, results) && is_resolved(rhs, scope, results)
        }
    }
}

/// Evaluate bottom-up against `scope`'s result table, substituting
/// delivered measurement bits and caching each node's value. An uncached
/// leaf belonging to another scope is stale: its slot id would otherwise
/// collide with an unrelated measurement of `scope`.
pub(crate) fn eval(
    node: &Node,
    scope: u64,
    results: &FxHashMap<MeasureId, u64>,
) -> RuntimeResult<i64> {
    if let Some(value) = node.cache.get() {
        return Ok(value);
    }
    let value = match &node.expr {
        Expr::Literal(value) => *value,
        Expr::Measurement { scope: leaf, id } => {
            if *leaf != scope {
                return Err(InvariantError::StaleResult.into());
            }
            match results.get(id) {
                Some(bits) => *bits as i64,
                None => return Err(InvariantError::UnresolvedMeasurement(*id).into()),
            }
        }
        Expr::Binary { op, lhs, rhs } => {
            op.apply(eval(lhs, scope, results)?, eval(rhs, scope, results)?)?
        }
    };
    node.cache.set(Some(value));
    Ok(value)
}

/// A deferred integer derived from quantum measurement.
///
/// Futures are freely cloneable values; cloning shares the underlying
/// nodes and their caches.
#[derive(Clone)]
pub struct Future {
    process: Process,
    scope: u64,
    node: Rc<Node>,
}

impl Future {
    pub(crate) fn measurement(process: Process, scope: u64, id: MeasureId) -> Self {
        Self {
            process,
            scope,
            node: Node::new(Expr::Measurement { scope, id }),
        }
    }

    pub(crate) fn node(&self) -> &Rc<Node> {
        &self.node
    }

    pub(crate) fn scope_id(&self) -> u64 {
        self.scope
    }

    /// Resolve the future to its integer value.
    ///
    /// Flushes the instruction log when any measurement this expression
    /// depends on is still pending; repeated reads return the cached value
    /// without another backend round-trip.
    pub fn value(&self) -> RuntimeResult<i64> {
        self.process.clone().resolve_future(self)
    }

    /// True when the value is already available without a flush.
    pub fn is_available(&self) -> bool {
        self.process.future_available(self)
    }

    fn binary(&self, op: BinaryOp, rhs: Rc<Node>) -> Future {
        Future {
            process: self.process.clone(),
            scope: self.scope,
            node: Node::new(Expr::Binary {
                op,
                lhs: Rc::clone(&self.node),
                rhs,
            }),
        }
    }

    fn binary_rev(&self, op: BinaryOp, lhs: Rc<Node>) -> Future {
        Future {
            process: self.process.clone(),
            scope: self.scope,
            node: Node::new(Expr::Binary {
                op,
                lhs,
                rhs: Rc::clone(&self.node),
            }),
        }
    }

    fn literal(value: i64) -> Rc<Node> {
        Node::new(Expr::Literal(value))
    }

    /// Equality comparison, yielding a 0/1-valued future.
    #[must_use]
    pub fn eq(&self, other: impl IntoOperand) -> Future {
        self.binary(BinaryOp::Eq, other.into_operand())
    }

    /// Inequality comparison, yielding a 0/1-valued future.
    #[must_use]
    pub fn neq(&self, other: impl IntoOperand) -> Future {
        self.binary(BinaryOp::Neq, other.into_operand())
    }

    /// Less-than comparison, yielding a 0/1-valued future.
    #[must_use]
    pub fn lt(&self, other: impl IntoOperand) -> Future {
        self.binary(BinaryOp::Lt, other.into_operand())
    }

    /// Less-or-equal comparison, yielding a 0/1-valued future.
    #[must_use]
    pub fn leq(&self, other: impl IntoOperand) -> Future {
        self.binary(BinaryOp::Leq, other.into_operand())
    }

    /// Greater-than comparison, yielding a 0/1-valued future.
    #[must_use]
    pub fn gt(&self, other: impl IntoOperand) -> Future {
        self.binary(BinaryOp::Gt, other.into_operand())
    }

    /// Greater-or-equal comparison, yielding a 0/1-valued future.
    #[must_use]
    pub fn geq(&self, other: impl IntoOperand) -> Future {
        self.binary(BinaryOp::Geq, other.into_operand())
    }
}

impl std::fmt::Debug for Future {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Future")
            .field("scope", &self.scope)
            .field("cached", &self.node.cache.get())
            .finish()
    }
}

/// Right-hand operand of a future expression: another future or an
/// integer literal.
pub trait IntoOperand {
    /// Convert into an expression node.
    fn into_operand(self) -> Rc<Node>;
}

impl IntoOperand for &Future {
    fn into_operand(self) -> Rc<Node> {
        Rc::clone(&self.node)
    }
}

impl IntoOperand for Future {
    fn into_operand(self) -> Rc<Node> {
        self.node
    }
}

impl IntoOperand for i64 {
    fn into_operand(self) -> Rc<Node> {
        Future::literal(self)
    }
}

macro_rules! future_binop {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<T: IntoOperand> std::ops::$trait<T> for Future {
            type Output = Future;
            fn $method(self, rhs: T) -> Future {
                self.binary($op, rhs.into_operand())
            }
        }

        impl<T: IntoOperand> std::ops::$trait<T> for &Future {
            type Output = Future;
            fn $method(self, rhs: T) -> Future {
                self.binary($op, rhs.into_operand())
            }
        }

        impl std::ops::$trait<Future> for i64 {
            type Output = Future;
            fn $method(self, rhs: Future) -> Future {
                rhs.binary_rev($op, Future::literal(self))
            }
        }

        impl std::ops::$trait<&Future> for i64 {
            type Output = Future;
            fn $method(self, rhs: &Future) -> Future {
                rhs.binary_rev($op, Future::literal(self))
            }
        }
    };
}

future_binop!(Add, add, BinaryOp::Add);
future_binop!(Sub, sub, BinaryOp::Sub);
future_binop!(Mul, mul, BinaryOp::Mul);
future_binop!(Div, div, BinaryOp::Div);
future_binop!(Shl, shl, BinaryOp::Shl);
future_binop!(Shr, shr, BinaryOp::Shr);
future_binop!(BitAnd, bitand, BinaryOp::And);
future_binop!(BitOr, bitor, BinaryOp::Or);
future_binop!(BitXor, bitxor, BinaryOp::Xor);

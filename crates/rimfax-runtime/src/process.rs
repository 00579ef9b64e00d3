//! The recording process.
//!
//! A [`Process`] owns one backend and a stack of scopes. Every operation
//! records into the active scope's instruction log; nothing reaches the
//! backend until a deferred value is observed (or [`flush`](Process::flush)
//! is called explicitly). A cheaply cloneable handle: clones share the same
//! underlying state, which is how registers, futures, and dumps keep their
//! process alive.
//!
//! The process is single-threaded by contract. Interior mutability is
//! `RefCell`, and no borrow is held across a user callback.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use rimfax_hal::{Backend, DumpData, HalError};
use rimfax_ir::{DumpId, DumpMode, GateKind, Instruction, MeasureId};

use crate::bridge;
use crate::composer::Composer;
use crate::dump::Dump;
use crate::error::{
    CompositionError, InvariantError, ResourceError, RuntimeError, RuntimeResult,
};
use crate::future::{self, Future};
use crate::log::InstructionLog;
use crate::quant::Quant;
use crate::registry::QubitRegistry;

/// Widest register a single measurement can cover: one result word.
pub const MAX_MEASURE_WIDTH: usize = 64;

// Scope ids are process-global, not per-process: a future leaf carries its
// scope id, and two processes counting from zero would let a leaf from one
// process resolve against the other's result table.
static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(0);

fn fresh_scope_id() -> u64 {
    NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Per-scope recording state.
///
/// A scope is an isolated program: its own qubit namespace, instruction
/// log, composer stack, and delivered results. The root scope lives as long
/// as the process; nested scopes are pushed by [`Process::run`].
pub(crate) struct ScopeState {
    pub(crate) id: u64,
    pub(crate) registry: QubitRegistry,
    pub(crate) log: InstructionLog,
    pub(crate) composer: Composer,
    pub(crate) measurements: FxHashMap<MeasureId, u64>,
    pub(crate) dumps: FxHashMap<DumpId, DumpData>,
    next_measure: u32,
    next_dump: u32,
    pub(crate) poisoned: bool,
}

impl ScopeState {
    pub(crate) fn new(id: u64) -> Self {
        Self {
            id,
            registry: QubitRegistry::new(),
            log: InstructionLog::new(),
            composer: Composer::new(),
            measurements: FxHashMap::default(),
            dumps: FxHashMap::default(),
            next_measure: 0,
            next_dump: 0,
            poisoned: false,
        }
    }

    fn check_open(&self) -> RuntimeResult<()> {
        if self.poisoned {
            Err(InvariantError::ScopeTerminated.into())
        } else {
            Ok(())
        }
    }

    fn check_scope(&self, handle_scope: u64) -> RuntimeResult<()> {
        if handle_scope == self.id {
            Ok(())
        } else {
            Err(InvariantError::ScopeMismatch.into())
        }
    }
}

struct ProcessInner {
    backend: Box<dyn Backend>,
    scopes: Vec<ScopeState>,
    flush_count: u64,
}

impl ProcessInner {
    // The root scope is pushed at construction and never popped, so the
    // stack is never empty.
    fn active(&mut self) -> &mut ScopeState {
        self.scopes.last_mut().expect("scope stack is never empty")
    }

    fn active_ref(&self) -> &ScopeState {
        self.scopes.last().expect("scope stack is never empty")
    }
}

impl Drop for ProcessInner {
    fn drop(&mut self) {
        let pending: usize = self.scopes.iter().map(|s| s.log.len()).sum();
        if pending > 0 {
            warn!(pending, "process dropped with unflushed instructions");
        }
    }
}

/// Handle to a recording process.
#[derive(Clone)]
pub struct Process {
    inner: Rc<RefCell<ProcessInner>>,
}

impl Process {
    /// Create a process recording against `backend`.
    pub fn new(backend: impl Backend + 'static) -> Self {
        let inner = ProcessInner {
            backend: Box::new(backend),
            scopes: vec![ScopeState::new(fresh_scope_id())],
            flush_count: 0,
        };
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// True when two handles refer to the same process.
    pub fn same_process(a: &Process, b: &Process) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    fn check_register(&self, register: &Quant) -> RuntimeResult<()> {
        if Process::same_process(self, register.process()) {
            Ok(())
        } else {
            Err(InvariantError::ProcessMismatch.into())
        }
    }

    // ---- allocation ----

    /// Allocate `count` fresh qubits, initialized to |0⟩.
    pub fn alloc(&self, count: u32) -> RuntimeResult<Quant> {
        self.alloc_inner(count, false)
    }

    /// Allocate `count` qubits with no initialization guarantee.
    ///
    /// Cheaper on backends that support it; the caller owns the burden of
    /// returning the qubits to a basis state before a clean free.
    pub fn alloc_dirty(&self, count: u32) -> RuntimeResult<Quant> {
        self.alloc_inner(count, true)
    }

    fn alloc_inner(&self, count: u32, dirty: bool) -> RuntimeResult<Quant> {
        let mut inner = self.inner.borrow_mut();
        let inner = &mut *inner;
        let capacity = inner.backend.capabilities().num_qubits;
        let supports_dirty = inner.backend.capabilities().supports_dirty_allocation;
        let scope = inner.scopes.last_mut().expect("scope stack is never empty");
        scope.check_open()?;
        if !scope.composer.is_idle() {
            return Err(CompositionError::AllocInOpenFrame.into());
        }
        if dirty && !supports_dirty {
            return Err(RuntimeError::Backend(HalError::Unsupported(
                "dirty allocation".into(),
            )));
        }
        let live = scope.registry.live_count();
        // live never exceeds capacity, so the subtraction cannot wrap; the
        // sum `live + count` could.
        if count > capacity - live {
            return Err(ResourceError::CapacityExceeded {
                requested: count,
                live,
                capacity,
            }
            .into());
        }
        let ids = scope.registry.allocate(count, dirty);
        for q in &ids {
            scope.log.append(Instruction::alloc(*q, dirty));
        }
        debug!(count, dirty, scope = scope.id, "allocated qubits");
        Ok(Quant::new(self.clone(), scope.id, ids))
    }

    /// Release a register. The release is recorded lazily; the backend
    /// checks the |0⟩ precondition when the log is flushed, but liveness
    /// flips immediately and locally.
    pub fn free(&self, register: &Quant) -> RuntimeResult<()> {
        self.free_inner(register, false)
    }

    /// Release a register without the basis-state check.
    pub fn free_dirty(&self, register: &Quant) -> RuntimeResult<()> {
        self.free_inner(register, true)
    }

    fn free_inner(&self, register: &Quant, dirty: bool) -> RuntimeResult<()> {
        self.check_register(register)?;
        let mut inner = self.inner.borrow_mut();
        let scope = inner.active();
        scope.check_open()?;
        scope.check_scope(register.scope_id())?;
        if !scope.composer.is_idle() {
            return Err(CompositionError::FreeInOpenFrame.into());
        }
        // An aliased register may name the same handle twice; freeing it
        // once per occurrence would corrupt the live count.
        for (i, q) in register.ids().iter().enumerate() {
            if register.ids()[..i].contains(q) {
                return Err(InvariantError::DuplicateQubit(*q).into());
            }
        }
        scope.registry.free(register.ids())?;
        for q in register.ids() {
            scope.log.append(Instruction::free(*q, dirty));
        }
        Ok(())
    }

    /// True when every qubit of `register` has been released.
    ///
    /// Purely local: answered from the registry, never from the backend. A
    /// register whose scope has exited counts as free.
    pub fn is_free(&self, register: &Quant) -> bool {
        let inner = self.inner.borrow();
        match inner.scopes.iter().find(|s| s.id == register.scope_id()) {
            Some(scope) => scope.registry.is_free(register.ids()),
            None => true,
        }
    }

    // ---- gates ----

    /// Record `gate` applied to each qubit of `register` in order, under
    /// the current control set and inversion parity.
    pub fn gate(&self, gate: GateKind, register: &Quant) -> RuntimeResult<()> {
        self.check_register(register)?;
        let mut inner = self.inner.borrow_mut();
        let scope = inner.active();
        scope.check_open()?;
        scope.check_scope(register.scope_id())?;
        scope.registry.check_allocated(register.ids())?;
        if let Some(q) = register.ids().iter().find(|q| scope.composer.is_control(**q)) {
            return Err(InvariantError::ControlOverlapsTarget(*q).into());
        }
        for q in register.ids() {
            let instruction = scope.composer.compose_gate(gate, vec![*q])?;
            scope.composer.append(instruction, &mut scope.log);
        }
        Ok(())
    }

    /// Pauli X on every qubit of `register`.
    pub fn x(&self, register: &Quant) -> RuntimeResult<()> {
        self.gate(GateKind::PauliX, register)
    }

    /// Pauli Y on every qubit of `register`.
    pub fn y(&self, register: &Quant) -> RuntimeResult<()> {
        self.gate(GateKind::PauliY, register)
    }

    /// Pauli Z on every qubit of `register`.
    pub fn z(&self, register: &Quant) -> RuntimeResult<()> {
        self.gate(GateKind::PauliZ, register)
    }

    /// Hadamard on every qubit of `register`.
    pub fn h(&self, register: &Quant) -> RuntimeResult<()> {
        self.gate(GateKind::Hadamard, register)
    }

    /// Phase rotation by `angle` radians.
    pub fn phase(&self, angle: f64, register: &Quant) -> RuntimeResult<()> {
        self.gate(GateKind::Phase(angle), register)
    }

    /// S gate: phase of π/2.
    pub fn s(&self, register: &Quant) -> RuntimeResult<()> {
        self.phase(std::f64::consts::FRAC_PI_2, register)
    }

    /// S-dagger: phase of -π/2.
    pub fn sd(&self, register: &Quant) -> RuntimeResult<()> {
        self.phase(-std::f64::consts::FRAC_PI_2, register)
    }

    /// T gate: phase of π/4.
    pub fn t(&self, register: &Quant) -> RuntimeResult<()> {
        self.phase(std::f64::consts::FRAC_PI_4, register)
    }

    /// T-dagger: phase of -π/4.
    pub fn td(&self, register: &Quant) -> RuntimeResult<()> {
        self.phase(-std::f64::consts::FRAC_PI_4, register)
    }

    /// X-axis rotation by `angle` radians.
    pub fn rx(&self, angle: f64, register: &Quant) -> RuntimeResult<()> {
        self.gate(GateKind::RotationX(angle), register)
    }

    /// Y-axis rotation by `angle` radians.
    pub fn ry(&self, angle: f64, register: &Quant) -> RuntimeResult<()> {
        self.gate(GateKind::RotationY(angle), register)
    }

    /// Z-axis rotation by `angle` radians.
    pub fn rz(&self, angle: f64, register: &Quant) -> RuntimeResult<()> {
        self.gate(GateKind::RotationZ(angle), register)
    }

    // ---- measurement and dumps ----

    /// Measure `register` in the computational basis.
    ///
    /// Records the measurement and returns immediately with a [`Future`];
    /// the backend runs when the future is first read. Qubit `i` of the
    /// register maps to bit `i` of the resolved value.
    pub fn measure(&self, register: &Quant) -> RuntimeResult<Future> {
        self.check_register(register)?;
        let mut inner = self.inner.borrow_mut();
        let scope = inner.active();
        scope.check_open()?;
        scope.check_scope(register.scope_id())?;
        if !scope.composer.is_idle() {
            return Err(CompositionError::MeasureInOpenFrame.into());
        }
        scope.registry.check_allocated(register.ids())?;
        if register.len() > MAX_MEASURE_WIDTH {
            return Err(InvariantError::RegisterTooWide {
                width: register.len(),
                max: MAX_MEASURE_WIDTH,
            }
            .into());
        }
        let id = MeasureId(scope.next_measure);
        scope.next_measure += 1;
        let instruction = Instruction::measure(register.ids().iter().copied(), id)?;
        scope.log.append(instruction);
        Ok(Future::measurement(self.clone(), scope.id, id))
    }

    /// Record a state capture of `register` in the requested mode.
    pub fn dump(&self, register: &Quant, mode: DumpMode) -> RuntimeResult<Dump> {
        self.check_register(register)?;
        let mut inner = self.inner.borrow_mut();
        let inner = &mut *inner;
        let max_shots = inner.backend.capabilities().max_shots;
        let supports_amplitudes = inner.backend.capabilities().supports_amplitudes;
        let scope = inner.scopes.last_mut().expect("scope stack is never empty");
        scope.check_open()?;
        scope.check_scope(register.scope_id())?;
        if !scope.composer.is_idle() {
            return Err(CompositionError::DumpInOpenFrame.into());
        }
        scope.registry.check_allocated(register.ids())?;
        match mode {
            DumpMode::Shots { count } if count == 0 || count > max_shots => {
                return Err(InvariantError::InvalidShotCount(count).into());
            }
            DumpMode::Amplitudes if !supports_amplitudes => {
                return Err(RuntimeError::Backend(HalError::Unsupported(
                    "amplitude dump".into(),
                )));
            }
            _ => {}
        }
        let id = DumpId(scope.next_dump);
        scope.next_dump += 1;
        let instruction = Instruction::dump(register.ids().iter().copied(), mode, id)?;
        scope.log.append(instruction);
        Ok(Dump::new(self.clone(), scope.id, id, mode, register.len()))
    }

    // ---- control and adjoint scopes ----

    /// Open a controlled scope: every gate recorded until the matching
    /// [`ctrl_end`](Process::ctrl_end) carries `control` as controls.
    pub fn ctrl_begin(&self, control: &Quant) -> RuntimeResult<()> {
        self.check_register(control)?;
        let mut inner = self.inner.borrow_mut();
        let scope = inner.active();
        scope.check_open()?;
        scope.check_scope(control.scope_id())?;
        if control.is_empty() {
            return Err(InvariantError::EmptyRegister.into());
        }
        scope.registry.check_allocated(control.ids())?;
        scope.composer.push_control(control.ids().to_vec());
        Ok(())
    }

    /// Close the innermost frame, which must be a control frame.
    pub fn ctrl_end(&self) -> RuntimeResult<()> {
        self.inner.borrow_mut().active().composer.pop_control()
    }

    /// Open an inverted scope: on the matching
    /// [`adj_end`](Process::adj_end), the recorded block is emitted
    /// reversed with each gate inverted.
    pub fn adj_begin(&self) -> RuntimeResult<()> {
        let mut inner = self.inner.borrow_mut();
        let scope = inner.active();
        scope.check_open()?;
        scope.composer.push_adjoint();
        Ok(())
    }

    /// Close the innermost frame, which must be an adjoint frame.
    pub fn adj_end(&self) -> RuntimeResult<()> {
        let mut inner = self.inner.borrow_mut();
        let scope = inner.active();
        scope.composer.pop_adjoint(&mut scope.log)
    }

    fn discard_frame(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.active().composer.discard_innermost().is_none() {
            warn!("no open frame to discard");
        }
    }

    /// Run `body` with `control` applied to every gate it records.
    ///
    /// On error the open frame is discarded, not committed: nothing the
    /// body recorded reaches the log.
    pub fn ctrl<T>(
        &self,
        control: &Quant,
        body: impl FnOnce() -> RuntimeResult<T>,
    ) -> RuntimeResult<T> {
        self.ctrl_begin(control)?;
        match body() {
            Ok(value) => {
                self.ctrl_end()?;
                Ok(value)
            }
            Err(err) => {
                self.discard_frame();
                Err(err)
            }
        }
    }

    /// Run `body` inverted: its recording is emitted reversed with each
    /// gate inverted. On error the side-buffer is discarded.
    pub fn adj<T>(&self, body: impl FnOnce() -> RuntimeResult<T>) -> RuntimeResult<T> {
        self.adj_begin()?;
        match body() {
            Ok(value) => {
                self.adj_end()?;
                Ok(value)
            }
            Err(err) => {
                self.discard_frame();
                Err(err)
            }
        }
    }

    /// Record `outer`, then `body`, then the inverse of `outer`:
    /// the conjugation V† U V.
    pub fn around<T>(
        &self,
        outer: impl Fn() -> RuntimeResult<()>,
        body: impl FnOnce() -> RuntimeResult<T>,
    ) -> RuntimeResult<T> {
        outer()?;
        let value = body()?;
        self.adj(|| outer())?;
        Ok(value)
    }

    /// Open a controlled scope tied to a guard value.
    ///
    /// [`ControlGuard::end`] commits the scope; dropping the guard without
    /// ending it discards the frame, which makes error unwinding safe by
    /// default.
    pub fn control_scope(&self, control: &Quant) -> RuntimeResult<ControlGuard> {
        self.ctrl_begin(control)?;
        Ok(ControlGuard {
            process: self.clone(),
            committed: false,
        })
    }

    /// Open an inverted scope tied to a guard value.
    pub fn inverse_scope(&self) -> RuntimeResult<AdjointGuard> {
        self.adj_begin()?;
        Ok(AdjointGuard {
            process: self.clone(),
            committed: false,
        })
    }

    // ---- nested scopes ----

    /// Run `body` in a fresh, fully isolated scope.
    ///
    /// The nested scope has its own qubit namespace, log, composer stack,
    /// and results; handles from enclosing scopes are rejected inside it.
    /// On exit the scope is torn down and anything unflushed is discarded,
    /// whether the body succeeded or not.
    pub fn run<T>(&self, body: impl FnOnce(&Process) -> RuntimeResult<T>) -> RuntimeResult<T> {
        {
            let mut inner = self.inner.borrow_mut();
            let id = fresh_scope_id();
            debug!(scope = id, "entering nested scope");
            inner.scopes.push(ScopeState::new(id));
        }
        let _exit = ScopeExit {
            inner: Rc::clone(&self.inner),
        };
        body(self)
    }

    // ---- execution and observation ----

    /// Flush the active scope's log to the backend now.
    ///
    /// Usually implicit in the first read of a [`Future`] or [`Dump`];
    /// explicit flushing exists for programs whose only output is a freed
    /// register or a side effect on hardware.
    pub fn flush(&self) -> RuntimeResult<()> {
        let mut inner = self.inner.borrow_mut();
        let ProcessInner {
            backend,
            scopes,
            flush_count,
            ..
        } = &mut *inner;
        let scope = scopes.last_mut().expect("scope stack is never empty");
        bridge::flush(scope, backend.as_mut(), flush_count)
    }

    pub(crate) fn resolve_future(&self, future: &Future) -> RuntimeResult<i64> {
        let mut inner = self.inner.borrow_mut();
        let ProcessInner {
            backend,
            scopes,
            flush_count,
            ..
        } = &mut *inner;
        let Some(pos) = scopes.iter().position(|s| s.id == future.scope_id()) else {
            // The scope is gone; only values cached before it exited
            // survive.
            let empty = FxHashMap::default();
            if future::is_resolved(future.node(), future.scope_id(), &empty) {
                return future::eval(future.node(), future.scope_id(), &empty);
            }
            return Err(InvariantError::StaleResult.into());
        };
        let active = pos == scopes.len() - 1;
        let scope = &mut scopes[pos];
        if future::is_resolved(future.node(), scope.id, &scope.measurements) {
            return future::eval(future.node(), scope.id, &scope.measurements);
        }
        if !active {
            // A suspended scope cannot flush; its pending futures are
            // unreadable until control returns to it.
            return Err(InvariantError::StaleResult.into());
        }
        bridge::flush(scope, backend.as_mut(), flush_count)?;
        future::eval(future.node(), scope.id, &scope.measurements)
    }

    pub(crate) fn future_available(&self, future: &Future) -> bool {
        let inner = self.inner.borrow();
        match inner.scopes.iter().find(|s| s.id == future.scope_id()) {
            Some(scope) => future::is_resolved(future.node(), scope.id, &scope.measurements),
            None => {
                future::is_resolved(future.node(), future.scope_id(), &FxHashMap::default())
            }
        }
    }

    pub(crate) fn resolve_dump(&self, dump: &Dump) -> RuntimeResult<DumpData> {
        let mut inner = self.inner.borrow_mut();
        let ProcessInner {
            backend,
            scopes,
            flush_count,
            ..
        } = &mut *inner;
        let Some(pos) = scopes.iter().position(|s| s.id == dump.scope_id()) else {
            return Err(InvariantError::StaleResult.into());
        };
        let active = pos == scopes.len() - 1;
        let scope = &mut scopes[pos];
        if let Some(data) = scope.dumps.get(&dump.id()) {
            return Ok(data.clone());
        }
        if !active {
            return Err(InvariantError::StaleResult.into());
        }
        bridge::flush(scope, backend.as_mut(), flush_count)?;
        match scope.dumps.get(&dump.id()) {
            Some(data) => Ok(data.clone()),
            None => Err(InvariantError::UnresolvedDump(dump.id()).into()),
        }
    }

    pub(crate) fn dump_available(&self, dump: &Dump) -> bool {
        let inner = self.inner.borrow();
        inner
            .scopes
            .iter()
            .find(|s| s.id == dump.scope_id())
            .is_some_and(|scope| scope.dumps.contains_key(&dump.id()))
    }

    // ---- introspection ----

    /// Pending instructions of the active scope, as JSON.
    pub fn instructions_json(&self) -> RuntimeResult<String> {
        let inner = self.inner.borrow();
        let json = serde_json::to_string_pretty(inner.active_ref().log.entries())
            .map_err(HalError::from)?;
        Ok(json)
    }

    /// Number of instructions recorded since the last flush.
    pub fn pending_instructions(&self) -> usize {
        self.inner.borrow().active_ref().log.len()
    }

    /// Number of backend round-trips performed so far.
    pub fn flush_count(&self) -> u64 {
        self.inner.borrow().flush_count
    }

    /// Number of open control/adjoint frames in the active scope.
    pub fn frame_depth(&self) -> usize {
        self.inner.borrow().active_ref().composer.depth()
    }

    /// Number of live qubits in the active scope.
    pub fn live_qubits(&self) -> u32 {
        self.inner.borrow().active_ref().registry.live_count()
    }
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Process")
            .field("backend", &inner.backend.name())
            .field("scopes", &inner.scopes.len())
            .field("pending", &inner.active_ref().log.len())
            .field("flushes", &inner.flush_count)
            .finish()
    }
}

struct ScopeExit {
    inner: Rc<RefCell<ProcessInner>>,
}

impl Drop for ScopeExit {
    fn drop(&mut self) {
        let mut inner = self.inner.borrow_mut();
        if let Some(scope) = inner.scopes.pop() {
            if !scope.log.is_empty() {
                warn!(
                    scope = scope.id,
                    pending = scope.log.len(),
                    "nested scope exited with unflushed instructions; discarded"
                );
            }
        }
    }
}

/// Open controlled scope. Call [`end`](ControlGuard::end) to commit.
#[must_use = "dropping the guard without calling end() discards the scope"]
pub struct ControlGuard {
    process: Process,
    committed: bool,
}

impl ControlGuard {
    /// Commit the controlled scope.
    pub fn end(mut self) -> RuntimeResult<()> {
        self.committed = true;
        self.process.ctrl_end()
    }
}

impl Drop for ControlGuard {
    fn drop(&mut self) {
        if !self.committed {
            warn!("control scope dropped without end; frame discarded");
            self.process.discard_frame();
        }
    }
}

/// Open inverted scope. Call [`end`](AdjointGuard::end) to commit the
/// reversed, inverted block; dropping without ending discards it.
#[must_use = "dropping the guard without calling end() discards the scope"]
pub struct AdjointGuard {
    process: Process,
    committed: bool,
}

impl AdjointGuard {
    /// Commit the inverted scope.
    pub fn end(mut self) -> RuntimeResult<()> {
        self.committed = true;
        self.process.adj_end()
    }
}

impl Drop for AdjointGuard {
    fn drop(&mut self) {
        if !self.committed {
            warn!("inverse scope dropped without end; frame discarded");
            self.process.discard_frame();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use num_complex::Complex64;
    use rimfax_hal::{Capabilities, ExecutionRequest, ExecutionResponse, HalResult};
    use rimfax_ir::QubitId;

    /// Backend that answers every measured qubit with 1 and every dump
    /// with a single-state payload, counting calls.
    struct OnesBackend {
        caps: Capabilities,
        calls: Rc<Cell<u64>>,
    }

    impl OnesBackend {
        fn new() -> (Self, Rc<Cell<u64>>) {
            let calls = Rc::new(Cell::new(0));
            (
                Self {
                    caps: Capabilities::default(),
                    calls: Rc::clone(&calls),
                },
                calls,
            )
        }

        fn with_caps(caps: Capabilities) -> Self {
            Self {
                caps,
                calls: Rc::new(Cell::new(0)),
            }
        }
    }

    impl Backend for OnesBackend {
        fn name(&self) -> &str {
            "ones"
        }

        fn capabilities(&self) -> &Capabilities {
            &self.caps
        }

        fn execute(&mut self, request: &ExecutionRequest) -> HalResult<ExecutionResponse> {
            self.calls.set(self.calls.get() + 1);
            let mut measurements = Vec::new();
            let mut dumps = Vec::new();
            for instruction in &request.instructions {
                match instruction {
                    Instruction::Measure { qubits, .. } => {
                        measurements.push(vec![true; qubits.len()]);
                    }
                    Instruction::Dump { mode, qubits, .. } => {
                        let ones = (1u64 << qubits.len()) - 1;
                        dumps.push(match mode {
                            DumpMode::Probabilities => DumpData::Probabilities {
                                states: vec![ones],
                                probabilities: vec![1.0],
                            },
                            DumpMode::Amplitudes => DumpData::Amplitudes {
                                states: vec![ones],
                                amplitudes: vec![Complex64::new(1.0, 0.0)],
                            },
                            DumpMode::Shots { count } => DumpData::Shots {
                                counts: [(ones, *count)].into_iter().collect(),
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

    fn process() -> Process {
        Process::new(OnesBackend::new().0)
    }

    #[test]
    fn test_alloc_is_ascending_and_logged() {
        let p = process();
        let q = p.alloc(3).unwrap();
        assert_eq!(q.ids(), &[QubitId(0), QubitId(1), QubitId(2)]);
        assert_eq!(p.pending_instructions(), 3);
        assert_eq!(p.live_qubits(), 3);
    }

    #[test]
    fn test_capacity_checked_locally() {
        let p = Process::new(OnesBackend::with_caps(Capabilities::simulator(2)));
        let q = p.alloc(2).unwrap();
        let err = p.alloc(1).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Resource(ResourceError::CapacityExceeded {
                requested: 1,
                live: 2,
                capacity: 2,
            })
        ));
        // Freeing releases capacity without any backend round-trip.
        p.free(&q).unwrap();
        assert!(p.alloc(2).is_ok());
        assert_eq!(p.flush_count(), 0);
    }

    #[test]
    fn test_capacity_check_handles_huge_requests() {
        let p = Process::new(OnesBackend::with_caps(Capabilities::simulator(4)));
        let _q = p.alloc(1).unwrap();
        // live + count would overflow u32; the check must still reject.
        let err = p.alloc(u32::MAX).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Resource(ResourceError::CapacityExceeded {
                requested: u32::MAX,
                live: 1,
                capacity: 4,
            })
        ));
        assert_eq!(p.live_qubits(), 1);
    }

    #[test]
    fn test_alloc_rejected_in_open_frame() {
        let p = process();
        let q = p.alloc(1).unwrap();
        p.ctrl_begin(&q).unwrap();
        let err = p.alloc(1).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Composition(CompositionError::AllocInOpenFrame)
        ));
        p.ctrl_end().unwrap();
    }

    #[test]
    fn test_gate_on_freed_qubit_rejected() {
        let p = process();
        let q = p.alloc(1).unwrap();
        p.free(&q).unwrap();
        let err = p.x(&q).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Invariant(InvariantError::QubitNotAllocated(QubitId(0)))
        ));
    }

    #[test]
    fn test_gate_on_active_control_rejected() {
        let p = process();
        let c = p.alloc(1).unwrap();
        let t = p.alloc(1).unwrap();
        p.ctrl_begin(&c).unwrap();
        p.x(&t).unwrap();
        let err = p.x(&c).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Invariant(InvariantError::ControlOverlapsTarget(QubitId(0)))
        ));
        p.ctrl_end().unwrap();
    }

    #[test]
    fn test_measure_is_lazy_and_flushes_once() {
        let (backend, calls) = OnesBackend::new();
        let p = Process::new(backend);
        let q = p.alloc(3).unwrap();
        p.h(&q).unwrap();
        let m = p.measure(&q).unwrap();
        assert_eq!(calls.get(), 0, "recording must not touch the backend");
        assert!(!m.is_available());
        assert_eq!(m.value().unwrap(), 0b111);
        assert_eq!(calls.get(), 1);
        // Re-reads and sibling futures of the same flush are free.
        assert!(m.is_available());
        assert_eq!(m.value().unwrap(), 0b111);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_two_futures_one_flush() {
        let (backend, calls) = OnesBackend::new();
        let p = Process::new(backend);
        let a = p.alloc(1).unwrap();
        let b = p.alloc(2).unwrap();
        let ma = p.measure(&a).unwrap();
        let mb = p.measure(&b).unwrap();
        assert_eq!(ma.value().unwrap(), 1);
        assert_eq!(mb.value().unwrap(), 3);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_future_arithmetic_end_to_end() {
        let p = process();
        let q = p.alloc(2).unwrap();
        let m = p.measure(&q).unwrap();
        let expr = (&m + 1) * 2 - (8 / &m);
        assert_eq!(expr.value().unwrap(), (3 + 1) * 2 - 8 / 3);
        assert_eq!(m.eq(3).value().unwrap(), 1);
    }

    #[test]
    fn test_measure_rejected_in_open_frame() {
        let p = process();
        let c = p.alloc(1).unwrap();
        let t = p.alloc(1).unwrap();
        p.ctrl_begin(&c).unwrap();
        let err = p.measure(&t).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Composition(CompositionError::MeasureInOpenFrame)
        ));
        p.ctrl_end().unwrap();
    }

    #[test]
    fn test_measure_width_limit() {
        let p = Process::new(OnesBackend::with_caps(Capabilities::simulator(128)));
        let q = p.alloc(65).unwrap();
        let err = p.measure(&q).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Invariant(InvariantError::RegisterTooWide { width: 65, max: 64 })
        ));
    }

    #[test]
    fn test_dump_shot_count_validated() {
        let p = Process::new(OnesBackend::with_caps(Capabilities::hardware(4, 1024)));
        let q = p.alloc(2).unwrap();
        assert!(p.dump(&q, DumpMode::Shots { count: 0 }).is_err());
        assert!(p.dump(&q, DumpMode::Shots { count: 2048 }).is_err());
        assert!(p.dump(&q, DumpMode::Shots { count: 1024 }).is_ok());
    }

    #[test]
    fn test_amplitude_dump_needs_capability() {
        let p = Process::new(OnesBackend::with_caps(Capabilities::hardware(4, 1024)));
        let q = p.alloc(1).unwrap();
        let err = p.dump(&q, DumpMode::Amplitudes).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Backend(HalError::Unsupported(_))
        ));
    }

    #[test]
    fn test_dump_resolves_through_flush() {
        let (backend, calls) = OnesBackend::new();
        let p = Process::new(backend);
        let q = p.alloc(2).unwrap();
        p.h(&q).unwrap();
        let d = p.dump(&q, DumpMode::Probabilities).unwrap();
        assert!(!d.is_available());
        let states = d.probabilities().unwrap();
        assert_eq!(states, vec![(0b11, 1.0)]);
        assert_eq!(calls.get(), 1);
        assert!(d.is_available());
    }

    #[test]
    fn test_hof_discards_frame_on_error() {
        let p = process();
        let c = p.alloc(1).unwrap();
        let t = p.alloc(1).unwrap();
        let pending = p.pending_instructions();
        let result: RuntimeResult<()> = p.ctrl(&c, || {
            p.x(&t)?;
            Err(InvariantError::EmptyRegister.into())
        });
        assert!(result.is_err());
        assert_eq!(p.frame_depth(), 0);
        // Controls are baked in at append time, so the gate recorded
        // before the error is already in the log; discard only drops the
        // frame itself.
        assert_eq!(p.pending_instructions(), pending + 1);
    }

    #[test]
    fn test_adj_hof_discards_buffer_on_error() {
        let p = process();
        let t = p.alloc(1).unwrap();
        let pending = p.pending_instructions();
        let result: RuntimeResult<()> = p.adj(|| {
            p.x(&t)?;
            Err(InvariantError::EmptyRegister.into())
        });
        assert!(result.is_err());
        assert_eq!(p.frame_depth(), 0);
        assert_eq!(p.pending_instructions(), pending);
    }

    #[test]
    fn test_guard_drop_discards() {
        let p = process();
        let c = p.alloc(1).unwrap();
        {
            let _guard = p.control_scope(&c).unwrap();
            assert_eq!(p.frame_depth(), 1);
        }
        assert_eq!(p.frame_depth(), 0);
    }

    #[test]
    fn test_guard_end_commits() {
        let p = process();
        let t = p.alloc(1).unwrap();
        let pending = p.pending_instructions();
        let guard = p.inverse_scope().unwrap();
        p.x(&t).unwrap();
        p.z(&t).unwrap();
        guard.end().unwrap();
        assert_eq!(p.frame_depth(), 0);
        assert_eq!(p.pending_instructions(), pending + 2);
    }

    #[test]
    fn test_run_isolates_qubit_namespace() {
        let p = process();
        let outer = p.alloc(2).unwrap();
        p.run(|p| {
            let inner = p.alloc(1).unwrap();
            // Fresh namespace: ids restart from zero.
            assert_eq!(inner.ids(), &[QubitId(0)]);
            // Handles from the enclosing scope are rejected.
            let err = p.x(&outer).unwrap_err();
            assert!(matches!(
                err,
                RuntimeError::Invariant(InvariantError::ScopeMismatch)
            ));
            Ok(())
        })
        .unwrap();
        // The outer scope is untouched.
        assert_eq!(p.live_qubits(), 2);
        assert!(p.x(&outer).is_ok());
    }

    #[test]
    fn test_future_does_not_outlive_its_scope() {
        let p = process();
        let leaked = p
            .run(|p| {
                let q = p.alloc(1).unwrap();
                p.measure(&q)
            })
            .unwrap();
        let err = leaked.value().unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Invariant(InvariantError::StaleResult)
        ));
    }

    #[test]
    fn test_leaked_future_never_reads_another_scopes_slot() {
        let (backend, calls) = OnesBackend::new();
        let p = Process::new(backend);
        let q = p.alloc(2).unwrap();
        let outer = p.measure(&q).unwrap();
        // The nested scope records its own measurement in slot 0 and exits
        // without observing it. The outer scope also has a slot 0; the
        // leaked future must not resolve against it.
        let leaked = p
            .run(|p| {
                let inner = p.alloc(1).unwrap();
                p.measure(&inner)
            })
            .unwrap();
        let expr = &outer + &leaked;
        let err = expr.value().unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Invariant(InvariantError::StaleResult)
        ));
        let err = leaked.value().unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Invariant(InvariantError::StaleResult)
        ));
        // The outer future itself is unaffected.
        assert_eq!(outer.value().unwrap(), 0b11);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_futures_from_two_processes_stay_apart() {
        let p1 = process();
        let p2 = process();
        let m1 = p1.measure(&p1.alloc(1).unwrap()).unwrap();
        let m2 = p2.measure(&p2.alloc(2).unwrap()).unwrap();
        // Both processes hand out slot 0 first; the combined expression
        // resolves against p1 only, so the p2 leaf is foreign to it.
        let expr = &m1 + &m2;
        let err = expr.value().unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Invariant(InvariantError::StaleResult)
        ));
        // Each future still reads fine in its own process.
        assert_eq!(m1.value().unwrap(), 1);
        assert_eq!(m2.value().unwrap(), 0b11);
        // And once both leaves are cached, the mixed expression evaluates.
        assert_eq!(expr.value().unwrap(), 4);
    }

    #[test]
    fn test_resolved_future_survives_scope_exit() {
        let p = process();
        let resolved = p
            .run(|p| {
                let q = p.alloc(1).unwrap();
                let m = p.measure(&q)?;
                m.value()?;
                Ok(m)
            })
            .unwrap();
        // The value was cached while the scope was alive.
        assert_eq!(resolved.value().unwrap(), 1);
    }

    #[test]
    fn test_explicit_flush() {
        let (backend, calls) = OnesBackend::new();
        let p = Process::new(backend);
        let q = p.alloc(1).unwrap();
        p.x(&q).unwrap();
        p.free(&q).unwrap();
        p.flush().unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(p.pending_instructions(), 0);
    }

    #[test]
    fn test_instructions_json() {
        let p = process();
        let q = p.alloc(1).unwrap();
        p.h(&q).unwrap();
        let json = p.instructions_json().unwrap();
        assert!(json.contains("Alloc"));
        assert!(json.contains("Hadamard"));
    }

    #[test]
    fn test_around_conjugates() {
        let p = process();
        let q = p.alloc(1).unwrap();
        let pending = p.pending_instructions();
        p.around(|| p.h(&q), || p.z(&q)).unwrap();
        // H; Z; H† — three gates.
        assert_eq!(p.pending_instructions(), pending + 3);
    }

    #[test]
    fn test_register_from_other_process_rejected() {
        let p1 = process();
        let p2 = process();
        let q = p1.alloc(1).unwrap();
        let err = p2.x(&q).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Invariant(InvariantError::ProcessMismatch)
        ));
    }
}

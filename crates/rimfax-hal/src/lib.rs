//! Rimfax Backend Abstraction Layer
//!
//! This crate defines the contract between the Rimfax runtime core and the
//! quantum execution backends that serve it. A backend may be a local
//! simulator, a hardware adapter, or a remote service; the runtime core is
//! agnostic and can swap backends without change.
//!
//! # Core Components
//!
//! - **Backend**: [`Backend`] — the synchronous execute-a-batch trait
//! - **Capabilities**: [`Capabilities`] — static limits declared up front
//! - **Request/Response**: [`ExecutionRequest`], [`ExecutionResponse`],
//!   [`DumpData`] — positionally-correlated result delivery
//! - **Errors**: [`HalError`] — structured failures identifying the
//!   offending instruction
//!
//! The request/response types serialize with serde so that transports which
//! need a textual encoding (process call, network) can reuse them directly;
//! the byte layout on the wire is otherwise a backend concern.

pub mod backend;
pub mod capability;
pub mod error;
pub mod result;

pub use backend::Backend;
pub use capability::Capabilities;
pub use error::{HalError, HalResult};
pub use result::{DumpData, ExecutionRequest, ExecutionResponse};

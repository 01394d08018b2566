//! Abstract state
//!
//! The abstract memory store, the per-program-point environment, and the
//! per-vertex lattice element the driver iterates over.

pub mod abs_env;
pub mod mem_store;

pub use abs_env::{AbsEnv, Value, VertexState};
pub use mem_store::MemStore;

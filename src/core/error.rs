// SPDX-License-Identifier: GPL-2.0

//! Error types for the value-set analysis

use thiserror::Error;

/// Result type alias for analysis operations
pub type Result<T> = core::result::Result<T, VsaError>;

/// Errors surfaced by the analysis driver and its configuration layer.
///
/// Only recoverable conditions are represented here. Scalar/array tag
/// confusion at a single variable indicates malformed SSA and panics
/// instead of returning an error; see [`crate::state::abs_env`].
#[derive(Debug, Clone, Error)]
pub enum VsaError {
    /// The stack-pointer variable was left at its sentinel default.
    #[error("stack pointer variable not configured")]
    SentinelStackPointer,
    /// The memory variable was left at its sentinel default.
    #[error("memory variable not configured")]
    SentinelMemory,
    /// The CFG has no block for its entry vertex.
    #[error("entry vertex {0} has no block")]
    MissingEntry(usize),
    /// An edge references a vertex with no block.
    #[error("edge endpoint {0} has no block")]
    DanglingEdge(usize),
    /// Two operands of a value-set operation had different bit widths.
    #[error("width mismatch: expected {expected}, got {got}")]
    WidthMismatch {
        /// Width demanded by the context, in bits.
        expected: u32,
        /// Width actually found, in bits.
        got: u32,
    },
    /// An expression form the evaluator does not model.
    #[error("unimplemented expression form: {0}")]
    Unimplemented(&'static str),
}

//! # Value-Set Analysis
//!
//! An abstract interpreter computing, for every point of an SSA program on
//! a control-flow graph, an over-approximation of the values each variable
//! and each memory location may hold. Values are strided intervals grouped
//! by memory region, so the same machinery tracks plain numbers, stack
//! offsets and heap offsets without confusing them.
//!
//! ## Features
//!
//! - **Strided-interval values**: arithmetic progressions of machine
//!   integers with exact stride tracking through unions and intersections
//! - **Region-tagged addresses**: the global region holds concrete
//!   addresses, every stack frame or heap object is its own base
//! - **Abstract memory**: strong updates at unique concrete addresses,
//!   weak updates elsewhere, little-endian reassembly of narrow entries
//! - **Branch refinement**: value ranges narrow along CFG edges whose
//!   predicates match a small pattern vocabulary
//! - **Widening fixpoint**: a worklist driver that switches merges from
//!   meet to widen per vertex, guaranteeing termination
//!
//! Typical clients are binary-analysis tools resolving indirect jumps,
//! proving range bounds or seeding symbolic execution.
//!
//! ## Quick Start
//!
//! ```rust
//! use vsa::prelude::*;
//!
//! // x := 5; y := x + 3
//! let sp = Var::reg(0, "sp", 32);
//! let mem = Var::mem(1, "mem");
//! let x = Var::reg(2, "x", 32);
//! let y = Var::reg(3, "y", 32);
//! let cfg = Cfg::builder(0)
//!     .block(0, vec![
//!         Stmt::Move(x.clone(), Expr::int(5, 32)),
//!         Stmt::Move(y.clone(), Expr::binop(BinOp::Add, Expr::var(x), Expr::int(3, 32))),
//!     ])
//!     .build()
//!     .unwrap();
//!
//! let analysis = ValueSetAnalysis::run(
//!     &cfg,
//!     AnalysisConfig::default(),
//!     InitOptions::new(sp, mem),
//! )
//! .unwrap();
//! let exit = analysis.exit_state_at(0).env().unwrap();
//! assert_eq!(exit.find_scalar(&y).as_const().map(|v| v.clone()), Some(8.into()));
//! ```
//!
//! ## Module Structure
//!
//! - [`core`]: error type and analysis configuration
//! - [`ssa`]: the SSA IR consumed by the analysis (variables, expressions,
//!   statements, labeled CFG)
//! - [`valueset`]: the strided-interval and value-set algebra
//! - [`state`]: abstract store, abstract environment, vertex lattice
//! - [`transfer`]: expression evaluation, statement transfer, edge
//!   refinement
//! - [`analysis`]: worklist and the widening fixpoint driver
//!
//! ## Soundness caveat
//!
//! With [`crate::core::AnalysisConfig::signedness_hack`] enabled (the default),
//! unsigned comparisons refine ranges as if they were signed. That is
//! unsound whenever a compared quantity crosses the sign boundary; disable
//! the flag to trade the precision back for soundness.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

/// Error and configuration types
pub mod core;

/// SSA program representation
pub mod ssa;

/// Strided intervals and value sets
pub mod valueset;

/// Abstract store and environment
pub mod state;

/// Transfer functions
pub mod transfer;

/// Worklist fixpoint driver
pub mod analysis;

// ============================================================================
// Prelude - commonly used re-exports
// ============================================================================

/// Commonly used types and traits
pub mod prelude {
    pub use crate::analysis::ValueSetAnalysis;
    pub use crate::core::config::{AnalysisConfig, InitOptions};
    pub use crate::core::error::{Result, VsaError};
    pub use crate::ssa::cfg::{Cfg, EdgeLabel, VertexId};
    pub use crate::ssa::expr::{BinOp, CastKind, Endian, Expr, UnOp};
    pub use crate::ssa::stmt::Stmt;
    pub use crate::ssa::var::{Ty, Var};
    pub use crate::state::abs_env::{AbsEnv, Value, VertexState};
    pub use crate::state::mem_store::MemStore;
    pub use crate::valueset::interval::StridedInterval;
    pub use crate::valueset::region::Region;
    pub use crate::valueset::value_set::ValueSet;
}

// Re-export error types at crate root for convenience
pub use crate::core::error::{Result, VsaError};

//! SSA program representation
//!
//! The IR the analysis consumes: typed variables, expression and statement
//! trees, and a control-flow graph whose edges carry branch predicates.
//! Construction of this IR (lifting, lowering to three-address code, copy
//! propagation, de-endianization, block coalescing) is the client's
//! responsibility; the analysis only pattern-matches what it is given.

pub mod cfg;
pub mod expr;
pub mod stmt;
pub mod var;

pub use cfg::{Cfg, CfgBuilder, Edge, EdgeLabel, VertexId};
pub use expr::{BinOp, CastKind, Endian, Expr, UnOp};
pub use stmt::Stmt;
pub use var::{Ty, Var};

//! SSA statements

use crate::ssa::expr::Expr;
use crate::ssa::var::Var;

/// A statement of a basic block.
///
/// Only `Move` and `Special` transform abstract state; control statements
/// are carried for completeness and treated as identity by the transfer.
/// Branch conditions refine state on CFG edges, not here.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Assignment to an SSA variable.
    Move(Var, Expr),
    /// Opaque side effect (syscall, unmodeled instruction) with the
    /// variables it defines.
    Special(String, Vec<Var>),
    /// Assertion; no state effect.
    Assert(Expr),
    /// Assumption; no state effect.
    Assume(Expr),
    /// Unconditional jump.
    Jmp(Expr),
    /// Conditional jump; targets are encoded as CFG edges.
    CJmp {
        /// Branch condition.
        cond: Expr,
        /// Target when the condition holds.
        iftrue: Expr,
        /// Target when the condition does not hold.
        iffalse: Expr,
    },
    /// Jump target marker.
    Label(String),
    /// Comment carried through from the lifter.
    Comment(String),
    /// Program termination with an exit value.
    Halt(Expr),
}

//! Statement transfer
//!
//! Updates the abstract state across a single straight-line statement.
//! Only assignments and opaque side effects change state; branch
//! conditions are handled on CFG edges, not here.

use crate::core::config::AnalysisConfig;
use crate::ssa::stmt::Stmt;
use crate::ssa::var::Ty;
use crate::state::abs_env::VertexState;
use crate::transfer::eval::try_eval;
use crate::valueset::value_set::ValueSet;

/// Apply one statement to a vertex state.
///
/// Pure: the input is never mutated. An unreached state lifts through
/// untouched.
pub fn transfer(stmt: &Stmt, state: &VertexState, config: &AnalysisConfig) -> VertexState {
    let env = match state {
        VertexState::Unreached => return VertexState::Unreached,
        VertexState::Env(env) => env,
    };
    match stmt {
        Stmt::Move(v, e) => match try_eval(env, e, config) {
            Ok(value) => VertexState::Env(env.bind(v.clone(), value)),
            // An unevaluable right-hand side leaves the binding alone.
            Err(_) => state.clone(),
        },
        Stmt::Special(_, defs) => {
            // Havoc the defined registers. Memory variables are left
            // intact: this assumes a Special never modifies memory, which
            // is a behavioral decision, not a proven invariant.
            let mut env = env.clone();
            for def in defs {
                if let Ty::Reg(w) = def.ty {
                    env = env.bind_scalar(def.clone(), ValueSet::top(w));
                }
            }
            VertexState::Env(env)
        }
        Stmt::Assert(_)
        | Stmt::Assume(_)
        | Stmt::Jmp(_)
        | Stmt::CJmp { .. }
        | Stmt::Label(_)
        | Stmt::Comment(_)
        | Stmt::Halt(_) => state.clone(),
    }
}

/// Apply a whole block of statements in order.
pub fn transfer_block(stmts: &[Stmt], state: &VertexState, config: &AnalysisConfig) -> VertexState {
    let mut cur = state.clone();
    for stmt in stmts {
        cur = transfer(stmt, &cur, config);
    }
    cur
}

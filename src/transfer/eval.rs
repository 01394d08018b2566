//! Expression evaluation
//!
//! Interprets SSA expressions against an abstract environment, producing a
//! scalar value set or an abstract store depending on the expression's
//! inferred type. The public entry point is total: forms the analysis does
//! not model, and any internal width error, degrade to top of the right
//! shape instead of failing the enclosing transfer.

use crate::core::config::AnalysisConfig;
use crate::core::error::{Result, VsaError};
use crate::ssa::expr::Expr;
use crate::ssa::var::Ty;
use crate::state::abs_env::{AbsEnv, Value};
use crate::state::mem_store::MemStore;
use crate::valueset::value_set::ValueSet;

/// Evaluate an expression; total.
pub fn eval_expr(env: &AbsEnv, e: &Expr, config: &AnalysisConfig) -> Value {
    match try_eval(env, e, config) {
        Ok(value) => value,
        Err(_) => match e.ty() {
            Ty::Reg(w) => Value::Scalar(ValueSet::top(w)),
            Ty::Mem => Value::Array(MemStore::new()),
        },
    }
}

/// Evaluate an expression, surfacing internal errors to the caller.
///
/// Statement transfer wants the distinction: a failed `Move` leaves the
/// environment untouched rather than binding top.
pub(crate) fn try_eval(env: &AbsEnv, e: &Expr, config: &AnalysisConfig) -> Result<Value> {
    match e.ty() {
        Ty::Reg(_) => eval_scalar(env, e, config).map(Value::Scalar),
        Ty::Mem => eval_mem(env, e, config).map(Value::Array),
    }
}

/// Evaluate a register-typed expression to a value set.
pub(crate) fn eval_scalar(env: &AbsEnv, e: &Expr, config: &AnalysisConfig) -> Result<ValueSet> {
    match e {
        Expr::Int(v, w) => Ok(ValueSet::of_int(v.clone(), *w)),
        Expr::Var(v) => Ok(env.find_scalar(v)),
        Expr::Phi(vars) => {
            let width = e.width();
            let mut acc: Option<ValueSet> = None;
            for v in vars {
                match env.lookup(v) {
                    None => continue,
                    Some(Value::Scalar(vs)) => {
                        acc = Some(match acc {
                            None => vs.clone(),
                            Some(cur) => cur.union(vs),
                        });
                    }
                    Some(Value::Array(_)) => {
                        panic!("variable {} bound to a store inside a scalar phi", v)
                    }
                }
            }
            Ok(acc.unwrap_or_else(|| ValueSet::top(width)))
        }
        Expr::BinOp(op, lhs, rhs) => {
            let a = eval_scalar(env, lhs, config)?;
            let b = eval_scalar(env, rhs, config)?;
            Ok(a.binop(*op, &b))
        }
        Expr::UnOp(op, inner) => Ok(eval_scalar(env, inner, config)?.unop(*op)),
        Expr::Cast(kind, target, inner) => {
            Ok(eval_scalar(env, inner, config)?.cast(*kind, *target))
        }
        Expr::Load {
            mem, index, width, ..
        } => {
            if *width == 0 || *width % 8 != 0 {
                return Err(VsaError::Unimplemented("sub-byte load"));
            }
            let store = eval_mem(env, mem, config)?;
            let addr = eval_scalar(env, index, config)?;
            Ok(store.read(*width, &addr, config.mem_max))
        }
        Expr::Concat(..) => Err(VsaError::Unimplemented("concat")),
        Expr::Extract(..) => Err(VsaError::Unimplemented("extract")),
        Expr::Ite(..) => Err(VsaError::Unimplemented("ite")),
        Expr::Unknown(..) => Err(VsaError::Unimplemented("unknown")),
        Expr::Store { .. } => Err(VsaError::Unimplemented("store in scalar context")),
    }
}

/// Evaluate a memory-typed expression to a store.
pub(crate) fn eval_mem(env: &AbsEnv, e: &Expr, config: &AnalysisConfig) -> Result<MemStore> {
    match e {
        Expr::Var(m) => Ok(env.find_array(m)),
        Expr::Store {
            mem,
            index,
            value,
            width,
            ..
        } => {
            if *width == 0 || *width % 8 != 0 {
                return Err(VsaError::Unimplemented("sub-byte store"));
            }
            let store = eval_mem(env, mem, config)?;
            let addr = eval_scalar(env, index, config)?;
            let val = eval_scalar(env, value, config)?;
            Ok(store.write(*width, &addr, &val, config.mem_max))
        }
        Expr::Phi(vars) => {
            let mut acc: Option<MemStore> = None;
            for v in vars {
                match env.lookup(v) {
                    None => continue,
                    Some(Value::Array(store)) => {
                        acc = Some(match acc {
                            None => store.clone(),
                            Some(cur) => cur.union(store),
                        });
                    }
                    Some(Value::Scalar(_)) => {
                        panic!("variable {} bound to a scalar inside a memory phi", v)
                    }
                }
            }
            Ok(acc.unwrap_or_else(MemStore::new))
        }
        _ => Ok(MemStore::new()),
    }
}

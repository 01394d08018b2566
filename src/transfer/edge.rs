//! Edge refinement
//!
//! Narrows the abstract state along a CFG edge using the edge's branch
//! predicate. Recognition is separated from refinement: a recognizer maps
//! the label onto a small vocabulary of [`RefinePattern`]s, and the
//! refiner applies the chosen pattern. Labels outside the vocabulary, and
//! any failure while refining, leave the state unchanged; refinement is an
//! optimization for precision, never a soundness requirement.
//!
//! The condition-simplification and copy-propagation pre-passes are what
//! make this pattern vocabulary sufficient in practice.

use num_bigint::BigInt;
use tracing::debug;

use crate::core::config::AnalysisConfig;
use crate::ssa::cfg::{Edge, EdgeLabel};
use crate::ssa::expr::{BinOp, Expr};
use crate::ssa::var::Var;
use crate::state::abs_env::{AbsEnv, VertexState};
use crate::transfer::eval::eval_scalar;
use crate::valueset::interval::StridedInterval;
use crate::valueset::region::Region;
use crate::valueset::value_set::ValueSet;

/// Direction of a recognized bound on the refined value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    /// Strictly less than the constant.
    Below,
    /// Less than or equal to the constant.
    BelowEq,
    /// Strictly greater than the constant.
    Above,
    /// Greater than or equal to the constant.
    AboveEq,
}

impl BoundKind {
    /// The direction on the opposite edge of the branch.
    fn negate(self) -> Self {
        match self {
            BoundKind::Below => BoundKind::AboveEq,
            BoundKind::BelowEq => BoundKind::Above,
            BoundKind::Above => BoundKind::BelowEq,
            BoundKind::AboveEq => BoundKind::Below,
        }
    }

    /// The direction with the comparison's argument order swapped.
    fn flip(self) -> Self {
        match self {
            BoundKind::Below => BoundKind::Above,
            BoundKind::BelowEq => BoundKind::AboveEq,
            BoundKind::Above => BoundKind::Below,
            BoundKind::AboveEq => BoundKind::BelowEq,
        }
    }

    /// The interval of all values satisfying the bound.
    fn interval(self, k: &BigInt, width: u32) -> StridedInterval {
        match self {
            BoundKind::Below => StridedInterval::below(k.clone(), width),
            BoundKind::BelowEq => StridedInterval::beloweq(k.clone(), width),
            BoundKind::Above => StridedInterval::above(k.clone(), width),
            BoundKind::AboveEq => StridedInterval::aboveeq(k.clone(), width),
        }
    }
}

/// What a recognized predicate constrains.
#[derive(Debug, Clone, PartialEq)]
pub enum RefineTarget {
    /// A register-typed variable.
    Var(Var),
    /// A memory load; refinement flows back into the store.
    Load {
        /// The memory variable loaded from.
        mem: Var,
        /// The address expression of the load.
        index: Expr,
        /// Loaded width in bits.
        width: u32,
    },
}

impl RefineTarget {
    fn width(&self) -> u32 {
        match self {
            RefineTarget::Var(v) => v.width().unwrap_or(0),
            RefineTarget::Load { width, .. } => *width,
        }
    }

    fn of_expr(e: &Expr) -> Option<Self> {
        match e {
            Expr::Var(v) if v.is_reg() => Some(RefineTarget::Var(v.clone())),
            Expr::Load {
                mem, index, width, ..
            } => match mem.as_ref() {
                Expr::Var(m) if m.is_mem() => Some(RefineTarget::Load {
                    mem: m.clone(),
                    index: index.as_ref().clone(),
                    width: *width,
                }),
                _ => None,
            },
            _ => None,
        }
    }
}

/// A recognized edge predicate, ready to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum RefinePattern {
    /// The target is bounded by a constant.
    Bound {
        /// The constrained value.
        target: RefineTarget,
        /// Direction of the bound.
        kind: BoundKind,
        /// The bounding constant.
        k: BigInt,
        /// Operand width in bits.
        width: u32,
    },
    /// The target equals a constant.
    Equal {
        /// The constrained value.
        target: RefineTarget,
        /// The known value.
        k: BigInt,
        /// Operand width in bits.
        width: u32,
    },
    /// The target differs from a constant; recognized but vacuous.
    Disequal,
    /// On this edge `lesser` is signed-below `greater`.
    VarOrder {
        /// The smaller side of the comparison.
        lesser: Var,
        /// The larger side of the comparison.
        greater: Var,
    },
}

/// Whether a comparison operator participates in bound refinement.
///
/// Unsigned comparisons join the vocabulary only under the signedness
/// hack, which then narrows them with the signed constructors.
fn accept_cmp(op: BinOp, config: &AnalysisConfig) -> bool {
    match op {
        BinOp::Slt | BinOp::Sle => true,
        BinOp::Lt | BinOp::Le => config.signedness_hack,
        _ => false,
    }
}

/// Base direction of a comparison with the target on the left.
fn base_kind(op: BinOp) -> Option<BoundKind> {
    match op {
        BinOp::Slt | BinOp::Lt => Some(BoundKind::Below),
        BinOp::Sle | BinOp::Le => Some(BoundKind::BelowEq),
        _ => None,
    }
}

/// Try to map an edge label onto the refinement vocabulary.
pub fn recognize(label: &EdgeLabel, config: &AnalysisConfig) -> Option<RefinePattern> {
    // Comparisons wrapped in a boolean equality test.
    if let Expr::BinOp(BinOp::Eq, lhs, rhs) = &label.cond {
        let (cmp, literal) = match (lhs.as_bool_literal(), rhs.as_bool_literal()) {
            (None, Some(b)) => (lhs.as_ref(), b),
            (Some(b), None) => (rhs.as_ref(), b),
            _ => return None,
        };
        // The comparison holds on this edge iff the literal's truth agrees
        // with the branch direction.
        let holds = literal == label.taken;
        if let Expr::BinOp(op, a, b) = cmp {
            if accept_cmp(*op, config) {
                return recognize_bound(*op, a, b, holds);
            }
            if matches!(op, BinOp::Eq | BinOp::Neq) {
                let equality = (*op == BinOp::Eq) == holds;
                return recognize_equality(a, b, equality);
            }
        }
        return None;
    }
    // A bare signed comparison between two variables, on its taken edge.
    if label.taken {
        if let Expr::BinOp(BinOp::Slt | BinOp::Sle, a, b) = &label.cond {
            if let (Expr::Var(lesser), Expr::Var(greater)) = (a.as_ref(), b.as_ref()) {
                if lesser.is_reg() && greater.is_reg() {
                    return Some(RefinePattern::VarOrder {
                        lesser: lesser.clone(),
                        greater: greater.clone(),
                    });
                }
            }
        }
    }
    None
}

fn recognize_bound(op: BinOp, a: &Expr, b: &Expr, holds: bool) -> Option<RefinePattern> {
    let base = base_kind(op)?;
    // The constant side dictates which way the target is bounded.
    let (target, k, width, kind) = match (RefineTarget::of_expr(a), b.as_int_literal()) {
        (Some(target), Some((k, width))) => (target, k.clone(), width, base),
        _ => match (a.as_int_literal(), RefineTarget::of_expr(b)) {
            (Some((k, width)), Some(target)) => (target, k.clone(), width, base.flip()),
            _ => return None,
        },
    };
    let kind = if holds { kind } else { kind.negate() };
    Some(RefinePattern::Bound {
        target,
        kind,
        k,
        width,
    })
}

fn recognize_equality(a: &Expr, b: &Expr, equality: bool) -> Option<RefinePattern> {
    let (target, k, width) = match (RefineTarget::of_expr(a), b.as_int_literal()) {
        (Some(target), Some((k, width))) => (target, k.clone(), width),
        _ => match (a.as_int_literal(), RefineTarget::of_expr(b)) {
            (Some((k, width)), Some(target)) => (target, k.clone(), width),
            _ => return None,
        },
    };
    if equality {
        Some(RefinePattern::Equal { target, k, width })
    } else {
        Some(RefinePattern::Disequal)
    }
}

/// Refine a state along an edge.
///
/// Unlabeled and unrecognized edges pass the state through; so does any
/// evaluation failure while applying a pattern.
pub fn refine_edge(state: &VertexState, edge: &Edge, config: &AnalysisConfig) -> VertexState {
    let label = match &edge.label {
        Some(label) => label,
        None => return state.clone(),
    };
    let env = match state {
        VertexState::Unreached => return VertexState::Unreached,
        VertexState::Env(env) => env,
    };
    let pattern = match recognize(label, config) {
        Some(pattern) => pattern,
        None => return state.clone(),
    };
    debug!(?pattern, src = edge.src, dst = edge.dst, "edge refinement");
    match apply(env, &pattern, config) {
        Some(refined) => VertexState::Env(refined),
        None => state.clone(),
    }
}

fn apply(env: &AbsEnv, pattern: &RefinePattern, config: &AnalysisConfig) -> Option<AbsEnv> {
    match pattern {
        RefinePattern::Bound {
            target,
            kind,
            k,
            width,
        } => {
            let constraint = constraint_set(kind.interval(k, *width));
            apply_to_target(env, target, &constraint, config)
        }
        RefinePattern::Equal { target, k, width } => {
            let constraint = ValueSet::of_int(k.clone(), *width);
            apply_to_target(env, target, &constraint, config)
        }
        RefinePattern::Disequal => Some(env.clone()),
        RefinePattern::VarOrder { lesser, greater } => {
            if lesser.width() != greater.width() {
                return None;
            }
            let lesser_val = env.find_scalar(lesser);
            let greater_val = env.find_scalar(greater);
            // The greater side is bounded below by the lesser's minimum,
            // the lesser side above by the greater's maximum.
            let new_greater = greater_val.intersect(&lesser_val.remove_upper_bound());
            let new_lesser = lesser_val.intersect(&greater_val.remove_lower_bound());
            Some(
                env.bind_scalar(greater.clone(), new_greater)
                    .bind_scalar(lesser.clone(), new_lesser),
            )
        }
    }
}

fn constraint_set(si: StridedInterval) -> ValueSet {
    ValueSet::of_si(Region::Global, si)
}

fn apply_to_target(
    env: &AbsEnv,
    target: &RefineTarget,
    constraint: &ValueSet,
    config: &AnalysisConfig,
) -> Option<AbsEnv> {
    if constraint.width() != target.width() {
        return None;
    }
    match target {
        RefineTarget::Var(v) => {
            let refined = env.find_scalar(v).intersect(constraint);
            Some(env.bind_scalar(v.clone(), refined))
        }
        RefineTarget::Load { mem, index, width } => {
            let store = env.find_array(mem);
            let addr = eval_scalar(env, index, config).ok()?;
            let loaded = store.read(*width, &addr, config.mem_max);
            let refined = loaded.intersect(constraint);
            let store = store.write_intersection(*width, &addr, &refined);
            Some(env.bind_array(mem.clone(), store))
        }
    }
}

//! Abstract environment
//!
//! Maps SSA variables to their abstract value: a scalar value set for
//! register-typed variables, an abstract store for memory-typed ones. A
//! variable absent from the map is at top for its declared shape.
//!
//! The `Scalar`/`Array` tag is checked on every access: a mismatch means
//! the SSA in front of us is malformed, and that is a crash, not a
//! coercion.

use core::fmt;

use im::OrdMap;

use crate::ssa::var::{Ty, Var};
use crate::state::mem_store::MemStore;
use crate::valueset::value_set::ValueSet;

/// Abstract value of one variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Register-typed value.
    Scalar(ValueSet),
    /// Memory-typed value.
    Array(MemStore),
}

impl Value {
    /// Whether the tag matches a declared variable type.
    fn matches(&self, ty: &Ty) -> bool {
        match (self, ty) {
            (Value::Scalar(_), Ty::Reg(_)) => true,
            (Value::Array(_), Ty::Mem) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(vs) => write!(f, "{}", vs),
            Value::Array(store) => write!(f, "{}", store),
        }
    }
}

/// Abstract environment at one program point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbsEnv {
    map: OrdMap<Var, Value>,
}

impl AbsEnv {
    /// The environment knowing nothing: every variable at top.
    pub fn new() -> Self {
        Self { map: OrdMap::new() }
    }

    /// Raw lookup; `None` means top of the variable's declared shape.
    pub fn lookup(&self, v: &Var) -> Option<&Value> {
        self.map.get(v)
    }

    /// The scalar value of a register-typed variable; top when unbound.
    ///
    /// Panics when `v` is memory-typed or bound to a store: that is a
    /// malformed-SSA indicator, not a recoverable condition.
    pub fn find_scalar(&self, v: &Var) -> ValueSet {
        let width = match v.ty {
            Ty::Reg(w) => w,
            Ty::Mem => panic!("scalar lookup of memory variable {}", v),
        };
        match self.map.get(v) {
            None => ValueSet::top(width),
            Some(Value::Scalar(vs)) => vs.clone(),
            Some(Value::Array(_)) => {
                panic!("variable {} bound to a store but read as a scalar", v)
            }
        }
    }

    /// The store of a memory-typed variable; the unknown store when
    /// unbound. Panics on a scalar binding, as [`AbsEnv::find_scalar`].
    pub fn find_array(&self, m: &Var) -> MemStore {
        if m.ty != Ty::Mem {
            panic!("array lookup of register variable {}", m);
        }
        match self.map.get(m) {
            None => MemStore::new(),
            Some(Value::Array(store)) => store.clone(),
            Some(Value::Scalar(_)) => {
                panic!("variable {} bound to a scalar but read as a store", m)
            }
        }
    }

    /// Functional update; the binding's tag must match the declared type.
    pub fn bind(&self, v: Var, value: Value) -> Self {
        assert!(
            value.matches(&v.ty),
            "binding of {} does not match its declared type {:?}",
            v,
            v.ty
        );
        Self {
            map: self.map.update(v, value),
        }
    }

    /// Bind a register-typed variable to a scalar value set.
    pub fn bind_scalar(&self, v: Var, vs: ValueSet) -> Self {
        self.bind(v, Value::Scalar(vs))
    }

    /// Bind a memory-typed variable to a store.
    pub fn bind_array(&self, m: Var, store: MemStore) -> Self {
        self.bind(m, Value::Array(store))
    }

    /// Number of explicit bindings.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no variable is explicitly bound.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Widening join at control-flow merges.
    ///
    /// Two-sided bindings combine by union; a one-sided binding is kept,
    /// reading the unbound side as "not yet reached along that edge"
    /// (sound because SSA merges are explicit φ-nodes).
    pub fn meet(&self, other: &Self) -> Self {
        self.merge_with(other, |a, b| a.union(b), MemStore::union)
    }

    /// Widening merge; like [`AbsEnv::meet`] with widen on both shapes.
    pub fn widen(&self, other: &Self) -> Self {
        self.merge_with(other, ValueSet::widen, MemStore::widen)
    }

    fn merge_with(
        &self,
        other: &Self,
        scalar: impl Fn(&ValueSet, &ValueSet) -> ValueSet,
        array: impl Fn(&MemStore, &MemStore) -> MemStore,
    ) -> Self {
        if self.map.ptr_eq(&other.map) {
            return self.clone();
        }
        let merged = self.map.clone().union_with(other.map.clone(), |a, b| {
            match (&a, &b) {
                (Value::Scalar(x), Value::Scalar(y)) => Value::Scalar(scalar(x, y)),
                (Value::Array(x), Value::Array(y)) => Value::Array(array(x, y)),
                _ => panic!("scalar/array tag mismatch across a merge"),
            }
        });
        Self { map: merged }
    }

    /// Structural equality with a sharing fast path.
    pub fn equal(&self, other: &Self) -> bool {
        self.map.ptr_eq(&other.map) || self.map == other.map
    }
}

impl fmt::Display for AbsEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (v, value) in self.map.iter() {
            if !first {
                writeln!(f)?;
            }
            write!(f, "{} -> {}", v, value)?;
            first = false;
        }
        Ok(())
    }
}

/// Lattice element at a CFG vertex.
///
/// `Unreached` is the state of a vertex no path has reached yet; it
/// absorbs into any merge and lifts through transfer functions untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum VertexState {
    /// No path has reached this vertex.
    Unreached,
    /// Reached, with the given environment.
    Env(AbsEnv),
}

impl VertexState {
    /// Whether any path has reached the vertex.
    pub fn is_reached(&self) -> bool {
        matches!(self, VertexState::Env(_))
    }

    /// The environment, if reached.
    pub fn env(&self) -> Option<&AbsEnv> {
        match self {
            VertexState::Unreached => None,
            VertexState::Env(env) => Some(env),
        }
    }

    /// Merge at a join; `Unreached` is the identity.
    pub fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (VertexState::Unreached, x) | (x, VertexState::Unreached) => x.clone(),
            (VertexState::Env(a), VertexState::Env(b)) => VertexState::Env(a.meet(b)),
        }
    }

    /// Widening merge; `Unreached` is the identity.
    pub fn widen(&self, other: &Self) -> Self {
        match (self, other) {
            (VertexState::Unreached, x) | (x, VertexState::Unreached) => x.clone(),
            (VertexState::Env(a), VertexState::Env(b)) => VertexState::Env(a.widen(b)),
        }
    }
}

impl fmt::Display for VertexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VertexState::Unreached => write!(f, "<unreached>"),
            VertexState::Env(env) => write!(f, "{}", env),
        }
    }
}

//! Tests for vsa::state::abs_env

use num_bigint::BigInt;
use vsa::prelude::*;

fn x() -> Var {
    Var::reg(1, "x", 32)
}

fn mem() -> Var {
    Var::mem(2, "mem")
}

#[test]
fn test_unbound_scalar_is_top() {
    let env = AbsEnv::new();
    assert!(env.find_scalar(&x()).is_top());
}

#[test]
fn test_unbound_array_is_top_store() {
    let env = AbsEnv::new();
    assert!(env.find_array(&mem()).is_top());
}

#[test]
fn test_bind_then_find() {
    let env = AbsEnv::new().bind_scalar(x(), ValueSet::of_int(5, 32));
    assert_eq!(env.find_scalar(&x()).as_const(), Some(&BigInt::from(5)));
}

#[test]
fn test_bind_is_functional() {
    let env = AbsEnv::new();
    let _bound = env.bind_scalar(x(), ValueSet::of_int(5, 32));
    assert!(env.lookup(&x()).is_none());
}

#[test]
#[should_panic(expected = "read as a scalar")]
fn test_scalar_lookup_of_array_binding_panics() {
    let v = Var::reg(2, "m", 32);
    let env = AbsEnv::new().bind(Var::mem(2, "m"), Value::Array(MemStore::new()));
    env.find_scalar(&v);
}

#[test]
#[should_panic(expected = "does not match its declared type")]
fn test_mistyped_bind_panics() {
    AbsEnv::new().bind(x(), Value::Array(MemStore::new()));
}

#[test]
fn test_meet_unions_two_sided_bindings() {
    let a = AbsEnv::new().bind_scalar(x(), ValueSet::of_int(1, 32));
    let b = AbsEnv::new().bind_scalar(x(), ValueSet::of_int(5, 32));
    let m = a.meet(&b);
    let si = m.find_scalar(&x());
    let si = si.interval_of(&Region::Global).unwrap();
    assert_eq!(si.stride(), &BigInt::from(4));
    assert_eq!(si.lo(), &BigInt::from(1));
    assert_eq!(si.hi(), &BigInt::from(5));
}

#[test]
fn test_meet_keeps_one_sided_bindings() {
    let y = Var::reg(3, "y", 32);
    let a = AbsEnv::new().bind_scalar(x(), ValueSet::of_int(1, 32));
    let b = AbsEnv::new().bind_scalar(y.clone(), ValueSet::of_int(2, 32));
    let m = a.meet(&b);
    assert_eq!(m.find_scalar(&x()).as_const(), Some(&BigInt::from(1)));
    assert_eq!(m.find_scalar(&y).as_const(), Some(&BigInt::from(2)));
}

#[test]
fn test_meet_commutes() {
    let a = AbsEnv::new().bind_scalar(x(), ValueSet::of_int(1, 32));
    let b = AbsEnv::new()
        .bind_scalar(x(), ValueSet::of_int(5, 32))
        .bind_scalar(Var::reg(3, "y", 32), ValueSet::of_int(2, 32));
    assert!(a.meet(&b).equal(&b.meet(&a)));
}

#[test]
fn test_widen_of_equal_is_identity() {
    let a = AbsEnv::new().bind_scalar(x(), ValueSet::of_int(1, 32));
    assert!(a.widen(&a.clone()).equal(&a));
}

#[test]
fn test_unreached_absorbs() {
    let env = VertexState::Env(AbsEnv::new().bind_scalar(x(), ValueSet::of_int(1, 32)));
    assert_eq!(VertexState::Unreached.meet(&env), env);
    assert_eq!(env.meet(&VertexState::Unreached), env);
    assert_eq!(VertexState::Unreached.widen(&env), env);
}

#[test]
fn test_widen_blows_moving_bound() {
    let a = AbsEnv::new().bind_scalar(
        x(),
        ValueSet::of_si(Region::Global, StridedInterval::new(32, 1, 0, 4)),
    );
    let b = AbsEnv::new().bind_scalar(
        x(),
        ValueSet::of_si(Region::Global, StridedInterval::new(32, 1, 0, 5)),
    );
    let w = a.widen(&b);
    let vs = w.find_scalar(&x());
    let si = vs.interval_of(&Region::Global).unwrap();
    assert_eq!(si.lo(), &BigInt::from(0));
    assert_eq!(si.hi(), &BigInt::from(i32::MAX));
}

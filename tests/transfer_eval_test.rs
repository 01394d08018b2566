//! Tests for vsa::transfer::eval and vsa::transfer::stmt

use num_bigint::BigInt;
use vsa::prelude::*;
use vsa::transfer::{eval_expr, transfer, transfer_block};

fn cfgless_env() -> AbsEnv {
    AbsEnv::new()
}

fn config() -> AnalysisConfig {
    AnalysisConfig::default()
}

fn scalar(value: Value) -> ValueSet {
    match value {
        Value::Scalar(vs) => vs,
        Value::Array(_) => panic!("expected a scalar result"),
    }
}

fn array(value: Value) -> MemStore {
    match value {
        Value::Array(store) => store,
        Value::Scalar(_) => panic!("expected a store result"),
    }
}

#[test]
fn test_literal() {
    let v = eval_expr(&cfgless_env(), &Expr::int(42, 32), &config());
    assert_eq!(scalar(v).as_const(), Some(&BigInt::from(42)));
}

#[test]
fn test_arithmetic_chain() {
    let x = Var::reg(1, "x", 32);
    let env = cfgless_env().bind_scalar(x.clone(), ValueSet::of_int(5, 32));
    let e = Expr::binop(BinOp::Add, Expr::var(x), Expr::int(3, 32));
    let v = eval_expr(&env, &e, &config());
    assert_eq!(scalar(v).as_const(), Some(&BigInt::from(8)));
}

#[test]
fn test_unbound_variable_is_top() {
    let x = Var::reg(1, "x", 32);
    let v = eval_expr(&cfgless_env(), &Expr::var(x), &config());
    assert!(scalar(v).is_top());
}

#[test]
fn test_phi_unions_bound_operands() {
    let a = Var::reg(1, "a", 32);
    let b = Var::reg(2, "b", 32);
    let env = cfgless_env()
        .bind_scalar(a.clone(), ValueSet::of_int(1, 32))
        .bind_scalar(b.clone(), ValueSet::of_int(5, 32));
    let v = eval_expr(&env, &Expr::Phi(vec![a, b]), &config());
    let vs = scalar(v);
    let si = vs.interval_of(&Region::Global).unwrap();
    assert_eq!(si.stride(), &BigInt::from(4));
}

#[test]
fn test_phi_skips_unbound_operands() {
    let a = Var::reg(1, "a", 32);
    let b = Var::reg(2, "b", 32);
    let env = cfgless_env().bind_scalar(a.clone(), ValueSet::of_int(7, 32));
    let v = eval_expr(&env, &Expr::Phi(vec![a, b]), &config());
    assert_eq!(scalar(v).as_const(), Some(&BigInt::from(7)));
}

#[test]
fn test_phi_with_no_bound_operands_is_top() {
    let a = Var::reg(1, "a", 32);
    let v = eval_expr(&cfgless_env(), &Expr::Phi(vec![a]), &config());
    assert!(scalar(v).is_top());
}

#[test]
fn test_unimplemented_forms_degrade_to_top() {
    let x = Var::reg(1, "x", 32);
    let env = cfgless_env().bind_scalar(x.clone(), ValueSet::of_int(1, 32));
    let ite = Expr::Ite(
        Box::new(Expr::int(1, 1)),
        Box::new(Expr::var(x.clone())),
        Box::new(Expr::int(0, 32)),
    );
    assert!(scalar(eval_expr(&env, &ite, &config())).is_top());
    let unknown = Expr::Unknown("mystery".into(), Ty::Reg(16));
    let v = scalar(eval_expr(&env, &unknown, &config()));
    assert!(v.is_top());
    assert_eq!(v.width(), 16);
}

#[test]
fn test_store_then_load() {
    let m = Var::mem(1, "mem");
    let store_e = Expr::store(m.clone(), Expr::int(0x100, 64), Expr::int(0x7f, 8), 8);
    let store = array(eval_expr(&cfgless_env(), &store_e, &config()));
    let env = cfgless_env().bind_array(m.clone(), store);
    let load_e = Expr::load(m, Expr::int(0x100, 64), 8);
    let v = eval_expr(&env, &load_e, &config());
    assert_eq!(scalar(v).as_const(), Some(&BigInt::from(0x7f)));
}

#[test]
fn test_cast_widens_constant() {
    let e = Expr::Cast(CastKind::Signed, 64, Box::new(Expr::int(-2, 8)));
    let v = eval_expr(&cfgless_env(), &e, &config());
    let vs = scalar(v);
    assert_eq!(vs.width(), 64);
    assert_eq!(vs.as_const(), Some(&BigInt::from(-2)));
}

#[test]
fn test_move_binds() {
    let x = Var::reg(1, "x", 32);
    let state = VertexState::Env(AbsEnv::new());
    let out = transfer(&Stmt::Move(x.clone(), Expr::int(5, 32)), &state, &config());
    let env = out.env().unwrap();
    assert_eq!(env.find_scalar(&x).as_const(), Some(&BigInt::from(5)));
}

#[test]
fn test_transfer_lifts_unreached() {
    let x = Var::reg(1, "x", 32);
    let out = transfer(
        &Stmt::Move(x, Expr::int(5, 32)),
        &VertexState::Unreached,
        &config(),
    );
    assert_eq!(out, VertexState::Unreached);
}

#[test]
fn test_special_havocs_registers_only() {
    let x = Var::reg(1, "x", 32);
    let m = Var::mem(2, "mem");
    let store = MemStore::new().write(
        8,
        &ValueSet::of_int(0, 64),
        &ValueSet::of_int(1, 8),
        Some(16),
    );
    let env = AbsEnv::new()
        .bind_scalar(x.clone(), ValueSet::of_int(5, 32))
        .bind_array(m.clone(), store.clone());
    let out = transfer(
        &Stmt::Special("syscall".into(), vec![x.clone()]),
        &VertexState::Env(env),
        &config(),
    );
    let env = out.env().unwrap();
    assert!(env.find_scalar(&x).is_top());
    assert_eq!(env.find_array(&m), store);
}

#[test]
fn test_control_statements_are_identity() {
    let x = Var::reg(1, "x", 32);
    let state = VertexState::Env(AbsEnv::new().bind_scalar(x, ValueSet::of_int(1, 32)));
    for stmt in [
        Stmt::Label("l".into()),
        Stmt::Comment("c".into()),
        Stmt::Assert(Expr::int(1, 1)),
        Stmt::Assume(Expr::int(1, 1)),
        Stmt::Halt(Expr::int(0, 32)),
    ] {
        assert_eq!(transfer(&stmt, &state, &config()), state);
    }
}

#[test]
fn test_block_transfer_is_sequential() {
    let x = Var::reg(1, "x", 32);
    let y = Var::reg(2, "y", 32);
    let stmts = vec![
        Stmt::Move(x.clone(), Expr::int(5, 32)),
        Stmt::Move(
            y.clone(),
            Expr::binop(BinOp::Add, Expr::var(x), Expr::int(3, 32)),
        ),
    ];
    let out = transfer_block(&stmts, &VertexState::Env(AbsEnv::new()), &config());
    let env = out.env().unwrap();
    assert_eq!(env.find_scalar(&y).as_const(), Some(&BigInt::from(8)));
}

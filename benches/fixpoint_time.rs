//! Performance benchmarks for the value-set analysis
//!
//! Run with: cargo bench
//! Results are saved to target/criterion/

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vsa::prelude::*;

fn sp() -> Var {
    Var::reg(0, "R_ESP", 64)
}

fn mem() -> Var {
    Var::mem(1, "mem")
}

/// Generate a straight-line block of dependent additions.
fn generate_linear_cfg(size: usize) -> Cfg {
    let mut stmts = Vec::with_capacity(size);
    let mut prev = Var::reg(2, "v2", 64);
    stmts.push(Stmt::Move(prev.clone(), Expr::int(0, 64)));
    for i in 1..size {
        let next = Var::reg(2 + i, format!("v{}", 2 + i), 64);
        stmts.push(Stmt::Move(
            next.clone(),
            Expr::binop(BinOp::Add, Expr::var(prev), Expr::int(1, 64)),
        ));
        prev = next;
    }
    Cfg::builder(0).block(0, stmts).build().unwrap()
}

/// Generate a chain of counting loops, each with its own widening point.
///
/// Loop `l` uses blocks `3l` (seed), `3l + 1` (header) and `3l + 2`
/// (body); the exit edge of each loop feeds the next loop's seed.
fn generate_loop_chain(loops: usize) -> Cfg {
    let mut builder = Cfg::builder(0);
    for l in 0..loops {
        let (seed, header, body) = (3 * l, 3 * l + 1, 3 * l + 2);
        let next = 3 * (l + 1);
        let i0 = Var::reg(2 + 3 * l, format!("i{}_0", l), 64);
        let i1 = Var::reg(3 + 3 * l, format!("i{}_1", l), 64);
        let i2 = Var::reg(4 + 3 * l, format!("i{}_2", l), 64);
        let cond = Expr::binop(
            BinOp::Eq,
            Expr::binop(BinOp::Sle, Expr::var(i1.clone()), Expr::int(1000, 64)),
            Expr::int(1, 1),
        );
        builder = builder
            .block(seed, vec![Stmt::Move(i0.clone(), Expr::int(0, 64))])
            .block(
                header,
                vec![Stmt::Move(i1.clone(), Expr::Phi(vec![i0, i2.clone()]))],
            )
            .block(
                body,
                vec![Stmt::Move(
                    i2,
                    Expr::binop(BinOp::Add, Expr::var(i1), Expr::int(1, 64)),
                )],
            )
            .edge(seed, header)
            .labeled_edge(header, body, Some(EdgeLabel::taken(cond.clone())))
            .labeled_edge(header, next, Some(EdgeLabel::not_taken(cond)))
            .edge(body, header);
    }
    builder.block(3 * loops, vec![]).build().unwrap()
}

fn bench_linear(c: &mut Criterion) {
    let mut group = c.benchmark_group("linear");
    for size in [64usize, 256, 1024] {
        let cfg = generate_linear_cfg(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &cfg, |b, cfg| {
            b.iter(|| {
                let analysis = ValueSetAnalysis::run(
                    black_box(cfg),
                    AnalysisConfig::default(),
                    InitOptions::new(sp(), mem()),
                )
                .unwrap();
                black_box(analysis.stats().processed)
            })
        });
    }
    group.finish();
}

fn bench_loops(c: &mut Criterion) {
    let mut group = c.benchmark_group("loop_chain");
    for loops in [1usize, 4, 16] {
        let cfg = generate_loop_chain(loops);
        group.bench_with_input(BenchmarkId::from_parameter(loops), &cfg, |b, cfg| {
            b.iter(|| {
                let analysis = ValueSetAnalysis::run(
                    black_box(cfg),
                    AnalysisConfig::default(),
                    InitOptions::new(sp(), mem()),
                )
                .unwrap();
                black_box(analysis.stats().widenings)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_linear, bench_loops);
criterion_main!(benches);

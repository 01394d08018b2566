// SPDX-License-Identifier: GPL-2.0

//! Widening fixpoint driver
//!
//! Forward worklist dataflow over the CFG. At each vertex the incoming
//! state is the meet of the edge-refined outputs of its predecessors; the
//! block's statements run in order; successors are re-enqueued whenever
//! the output changes. A per-vertex visit counter switches the merge to
//! widening once it exceeds the threshold, which bounds the ascent of
//! every strided interval and guarantees termination.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::analysis::worklist::{Worklist, WorklistStats};
use crate::core::config::{AnalysisConfig, InitOptions};
use crate::core::error::Result;
use crate::ssa::cfg::{Cfg, VertexId};
use crate::ssa::expr::Expr;
use crate::state::abs_env::{AbsEnv, Value, VertexState};
use crate::state::mem_store::MemStore;
use crate::transfer::edge::refine_edge;
use crate::transfer::eval;
use crate::transfer::stmt::transfer_block;
use crate::valueset::interval::StridedInterval;
use crate::valueset::region::Region;
use crate::valueset::value_set::ValueSet;

/// Bit width used for initial-memory seed addresses.
const SEED_ADDR_WIDTH: u32 = 64;

/// A completed value-set analysis of one CFG.
#[derive(Debug)]
pub struct ValueSetAnalysis {
    config: AnalysisConfig,
    in_states: BTreeMap<VertexId, VertexState>,
    out_states: BTreeMap<VertexId, VertexState>,
    stats: WorklistStats,
    unreached: VertexState,
}

impl ValueSetAnalysis {
    /// Run the analysis to fixpoint.
    ///
    /// Fails fast when `options` still carries sentinel variables; see
    /// [`InitOptions::validate`].
    pub fn run(cfg: &Cfg, config: AnalysisConfig, options: InitOptions) -> Result<Self> {
        options.validate()?;
        let nmeets = options.widen_threshold();
        let seed = init_env(&options, &config);
        let heads = loop_heads(cfg);

        let mut in_states: BTreeMap<VertexId, VertexState> = BTreeMap::new();
        let mut out_states: BTreeMap<VertexId, VertexState> = BTreeMap::new();
        let unreached = VertexState::Unreached;
        let mut worklist = Worklist::new();
        worklist.push(cfg.entry());

        while let Some(v) = worklist.pop() {
            let visits = worklist.visits(v);
            trace!(vertex = v, visits, "processing vertex");

            let mut incoming = if v == cfg.entry() {
                VertexState::Env(seed.clone())
            } else {
                VertexState::Unreached
            };
            for edge in cfg.preds(v) {
                let out = out_states.get(&edge.src).unwrap_or(&unreached);
                let refined = refine_edge(out, edge, &config);
                incoming = incoming.meet(&refined);
            }

            // Widening happens only where a back edge can feed growth;
            // extrapolating at every revisited vertex would throw away the
            // narrowing the loop condition just established.
            let old_in = in_states.get(&v);
            let new_in = if visits > nmeets && heads.contains(&v) {
                worklist.record_widening();
                debug!(vertex = v, visits, "widening merge");
                match old_in {
                    Some(old) => old.widen(&incoming),
                    None => incoming,
                }
            } else {
                incoming
            };

            let first = !out_states.contains_key(&v);
            if !first && old_in == Some(&new_in) {
                continue;
            }
            in_states.insert(v, new_in.clone());

            let block = cfg.block(v).expect("worklist vertex has a block");
            let out = transfer_block(&block.stmts, &new_in, &config);
            let changed = out_states.get(&v) != Some(&out);
            out_states.insert(v, out);

            if first || changed {
                for edge in cfg.succs(v) {
                    worklist.push(edge.dst);
                }
            }
        }

        debug!(
            processed = worklist.stats().processed,
            widenings = worklist.stats().widenings,
            "fixpoint reached"
        );
        Ok(Self {
            config,
            in_states,
            out_states,
            stats: worklist.into_stats(),
            unreached: VertexState::Unreached,
        })
    }

    /// The fixpoint state at a vertex's entry.
    pub fn state_at(&self, v: VertexId) -> &VertexState {
        self.in_states.get(&v).unwrap_or(&self.unreached)
    }

    /// The fixpoint state after a vertex's statements.
    pub fn exit_state_at(&self, v: VertexId) -> &VertexState {
        self.out_states.get(&v).unwrap_or(&self.unreached)
    }

    /// Evaluate an expression in a client-chosen environment, e.g. to
    /// resolve an indirect jump target from a vertex's fixpoint state.
    pub fn eval_expr(&self, env: &AbsEnv, e: &Expr) -> Value {
        eval::eval_expr(env, e, &self.config)
    }

    /// The configuration the run used.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Worklist statistics of the run.
    pub fn stats(&self) -> &WorklistStats {
        &self.stats
    }
}

/// Targets of back edges, found by depth-first search from the entry.
///
/// These are the only vertices where the merge is ever replaced by
/// widening: everything else reaches its fixpoint by plain meets once its
/// loop heads stop changing.
fn loop_heads(cfg: &Cfg) -> BTreeSet<VertexId> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let mut color: BTreeMap<VertexId, Color> =
        cfg.vertices().map(|v| (v, Color::White)).collect();
    let mut heads = BTreeSet::new();
    let succs_of = |v: VertexId| cfg.succs(v).map(|e| e.dst).collect::<Vec<_>>();

    color.insert(cfg.entry(), Color::Gray);
    // Explicit stack of (vertex, successors not yet explored).
    let mut stack = vec![(cfg.entry(), succs_of(cfg.entry()))];
    while let Some((v, mut pending)) = stack.pop() {
        match pending.pop() {
            None => {
                color.insert(v, Color::Black);
            }
            Some(next) => {
                stack.push((v, pending));
                match color.get(&next).copied().unwrap_or(Color::White) {
                    // An edge into a vertex still on the stack closes a
                    // cycle.
                    Color::Gray => {
                        heads.insert(next);
                    }
                    Color::White => {
                        color.insert(next, Color::Gray);
                        let succ = succs_of(next);
                        stack.push((next, succ));
                    }
                    Color::Black => {}
                }
            }
        }
    }
    heads
}

/// The entry-vertex environment.
///
/// The stack pointer starts at offset zero of its own region; memory
/// starts as the store holding each configured initial byte, written at
/// width 8 into the global region.
fn init_env(options: &InitOptions, config: &AnalysisConfig) -> AbsEnv {
    let sp = options.sp.clone();
    let sp_width = sp.width().unwrap_or(SEED_ADDR_WIDTH);
    let sp_value = ValueSet::of_si(Region::of_var(&sp), StridedInterval::zero(sp_width));

    let mut store = MemStore::new();
    for (addr, byte) in options.seed_bytes() {
        let addr_vs = ValueSet::of_int(addr, SEED_ADDR_WIDTH);
        let byte_vs = ValueSet::of_int(byte, 8);
        store = store.write(8, &addr_vs, &byte_vs, config.mem_max);
    }

    AbsEnv::new()
        .bind_scalar(sp, sp_value)
        .bind_array(options.mem.clone(), store)
}

//! Labeled control-flow graph
//!
//! Vertices are basic blocks of SSA statements; edges optionally carry the
//! branch predicate that selects them. The graph is immutable once built;
//! the driver only ever walks predecessors and successors.

use std::collections::BTreeMap;

use crate::core::error::{Result, VsaError};
use crate::ssa::expr::Expr;
use crate::ssa::stmt::Stmt;

/// Identifier of a CFG vertex.
pub type VertexId = usize;

/// Predicate attached to a conditional edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeLabel {
    /// Whether this edge is the branch-taken side of the condition.
    pub taken: bool,
    /// The branch condition of the source block's jump.
    pub cond: Expr,
}

impl EdgeLabel {
    /// Label for the branch-taken edge.
    pub fn taken(cond: Expr) -> Self {
        Self { taken: true, cond }
    }

    /// Label for the fall-through edge.
    pub fn not_taken(cond: Expr) -> Self {
        Self { taken: false, cond }
    }
}

/// A directed CFG edge.
#[derive(Debug, Clone)]
pub struct Edge {
    /// Source vertex.
    pub src: VertexId,
    /// Destination vertex.
    pub dst: VertexId,
    /// Branch predicate, if the edge is conditional.
    pub label: Option<EdgeLabel>,
}

/// A basic block.
#[derive(Debug, Clone, Default)]
pub struct Block {
    /// Statements in execution order.
    pub stmts: Vec<Stmt>,
    /// Indices into the edge table, one per outgoing edge.
    successors: Vec<usize>,
    /// Indices into the edge table, one per incoming edge.
    predecessors: Vec<usize>,
}

/// Control-flow graph over basic blocks.
#[derive(Debug, Clone)]
pub struct Cfg {
    blocks: BTreeMap<VertexId, Block>,
    edges: Vec<Edge>,
    entry: VertexId,
}

impl Cfg {
    /// Start building a graph rooted at `entry`.
    pub fn builder(entry: VertexId) -> CfgBuilder {
        CfgBuilder {
            blocks: BTreeMap::new(),
            edges: Vec::new(),
            entry,
        }
    }

    /// The entry vertex.
    pub fn entry(&self) -> VertexId {
        self.entry
    }

    /// The block at a vertex.
    pub fn block(&self, v: VertexId) -> Option<&Block> {
        self.blocks.get(&v)
    }

    /// All vertex ids in ascending order.
    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.blocks.keys().copied()
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the graph has no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Incoming edges of a vertex.
    pub fn preds(&self, v: VertexId) -> impl Iterator<Item = &Edge> + '_ {
        self.blocks
            .get(&v)
            .into_iter()
            .flat_map(|b| b.predecessors.iter())
            .map(|&i| &self.edges[i])
    }

    /// Outgoing edges of a vertex.
    pub fn succs(&self, v: VertexId) -> impl Iterator<Item = &Edge> + '_ {
        self.blocks
            .get(&v)
            .into_iter()
            .flat_map(|b| b.successors.iter())
            .map(|&i| &self.edges[i])
    }
}

/// Incremental CFG construction.
#[derive(Debug)]
pub struct CfgBuilder {
    blocks: BTreeMap<VertexId, Block>,
    edges: Vec<Edge>,
    entry: VertexId,
}

impl CfgBuilder {
    /// Add a block; replaces any existing block at the same vertex.
    pub fn block(mut self, v: VertexId, stmts: Vec<Stmt>) -> Self {
        self.blocks.insert(
            v,
            Block {
                stmts,
                successors: Vec::new(),
                predecessors: Vec::new(),
            },
        );
        self
    }

    /// Add an unlabeled edge.
    pub fn edge(self, src: VertexId, dst: VertexId) -> Self {
        self.labeled_edge(src, dst, None)
    }

    /// Add an edge carrying an optional branch predicate.
    pub fn labeled_edge(mut self, src: VertexId, dst: VertexId, label: Option<EdgeLabel>) -> Self {
        self.edges.push(Edge { src, dst, label });
        self
    }

    /// Validate endpoints and produce the graph.
    pub fn build(self) -> Result<Cfg> {
        let mut blocks = self.blocks;
        if !blocks.contains_key(&self.entry) {
            return Err(VsaError::MissingEntry(self.entry));
        }
        for (i, edge) in self.edges.iter().enumerate() {
            match blocks.get_mut(&edge.src) {
                Some(b) => b.successors.push(i),
                None => return Err(VsaError::DanglingEdge(edge.src)),
            }
            match blocks.get_mut(&edge.dst) {
                Some(b) => b.predecessors.push(i),
                None => return Err(VsaError::DanglingEdge(edge.dst)),
            }
        }
        Ok(Cfg {
            blocks,
            edges: self.edges,
            entry: self.entry,
        })
    }
}

//! Fixpoint analysis
//!
//! The worklist and the widening dataflow driver that ties the transfer
//! functions together into a whole-CFG analysis.

pub mod fixpoint;
pub mod worklist;

pub use fixpoint::ValueSetAnalysis;
pub use worklist::{Worklist, WorklistStats};

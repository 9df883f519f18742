//! Per-node label bookkeeping.
//!
//! Mirrors the shape of a classic assembler symbol table (insertion-ordered
//! name → address) but keyed by synthetic compiler-generated names rather
//! than author-written ones, and owned per [`super::NodeCompiler`] instance
//! rather than as a global counter (Design Notes §9).

use indexmap::IndexMap;

/// Generates unique, human-greppable label names (`L0_endif`, `L1_clauseEnd`, …).
#[derive(Debug, Default)]
pub struct LabelGenerator {
    counter: usize,
}

impl LabelGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, hint: &str) -> String {
        let name = format!("L{}_{hint}", self.counter);
        self.counter += 1;
        name
    }
}

/// Insertion-ordered `label name -> instruction index` table, built once a
/// node's instruction stream is fully laid out.
pub type LabelTable = IndexMap<String, usize>;

//! # Program
//!
//! The immutable-after-compile artifact a [`crate::vm::VirtualMachine`]
//! executes: a node table, a program-wide string table, and localisation
//! provenance for every string registered as localisable (spec §3).
//!
//! `Program` is the unit a [`Dialogue`](crate::Dialogue) host loads and may
//! share read-only across several concurrently-running VMs (spec §5).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::compiler::{Instruction, LabelTable};
use crate::compiler::strings::LineInfo;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledNode {
    pub name: String,
    pub tags: Vec<String>,
    pub instructions: Vec<Instruction>,
    pub labels: LabelTable,
    /// Present only for `rawText`-tagged nodes: the string-table key under
    /// which the verbatim body was interned.
    pub source_text_string_id: Option<String>,
}

impl CompiledNode {
    pub fn is_raw_text(&self) -> bool {
        self.source_text_string_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub nodes: IndexMap<String, CompiledNode>,
    pub strings: IndexMap<String, String>,
    /// Not carried across a compiled-container round trip (spec §6): empty
    /// on anything produced by [`crate::loader::load_compiled`].
    #[serde(default)]
    pub line_info: IndexMap<String, LineInfo>,
}

impl Program {
    pub fn node(&self, name: &str) -> Option<&CompiledNode> {
        self.nodes.get(name)
    }

    pub fn node_exists(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }

    /// Merges `other` into `self`, failing if any node name collides
    /// (spec §3 invariant: node names are unique within a Program).
    pub fn merge(&mut self, other: Program) -> Result<(), crate::error::CompileError> {
        for name in other.nodes.keys() {
            if self.nodes.contains_key(name) {
                return Err(crate::error::CompileError::NodeCollision { name: name.clone() });
            }
        }
        self.nodes.extend(other.nodes);
        self.strings.extend(other.strings);
        self.line_info.extend(other.line_info);
        Ok(())
    }
}

/// Version-tagged compiled-container envelope (spec §6). Only `nodes` and
/// `strings` round-trip; `lineInfo` is dropped on save and absent on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum CompiledContainer {
    V1 { nodes: IndexMap<String, CompiledNode>, strings: IndexMap<String, String> },
}

impl CompiledContainer {
    pub fn from_program(program: &Program) -> Self {
        CompiledContainer::V1 { nodes: program.nodes.clone(), strings: program.strings.clone() }
    }

    pub fn into_program(self) -> Program {
        match self {
            CompiledContainer::V1 { nodes, strings } => Program { nodes, strings, line_info: IndexMap::new() },
        }
    }
}

//! # VariableStorage Port
//!
//! Host-owned key→[`Value`] store consulted on every `PushVariable`/
//! `StoreVariable` (spec §3/§6). The VM never assumes a particular backing
//! store — it only ever talks to this trait — so an embedding host can
//! swap in a save-file-backed or database-backed implementation without
//! touching the VM.

use indexmap::IndexMap;

use crate::value::Value;

pub trait VariableStorage: Send {
    /// Missing key reads as `Value::Null` (spec §7: a recoverable runtime
    /// condition, not an error).
    fn get(&self, name: &str) -> Option<Value>;
    fn set(&mut self, name: &str, value: Value);
    fn clear(&mut self);

    /// Every currently-set variable, for diagnostics and step debuggers.
    /// A host backed by something non-enumerable (e.g. a remote save slot)
    /// may leave this empty rather than implement it.
    fn snapshot(&self) -> Vec<(String, Value)> {
        Vec::new()
    }
}

/// Default in-process implementation: a plain insertion-ordered map.
#[derive(Debug, Default, Clone)]
pub struct MemoryVariableStorage {
    values: IndexMap<String, Value>,
}

impl MemoryVariableStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl VariableStorage for MemoryVariableStorage {
    fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    fn clear(&mut self) {
        self.values.clear();
    }

    fn snapshot(&self) -> Vec<(String, Value)> {
        self.values.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

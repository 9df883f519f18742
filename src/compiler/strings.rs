//! Program-wide localisable string table.
//!
//! One [`StringTableBuilder`] is created per compile call and threaded
//! through every node's lowering, so its counter is monotonic across the
//! whole `Program` (spec §3) rather than reset per node — and, per Design
//! Notes §9, lives on an owned instance instead of a `static` counter.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineInfo {
    pub node_name: String,
    pub line_number: usize,
}

#[derive(Debug, Default)]
pub struct StringTableBuilder {
    counter: usize,
    strings: IndexMap<String, String>,
    line_info: IndexMap<String, LineInfo>,
}

impl StringTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `text` under `explicit_key` if given (an author-pinned
    /// `#line:<id>` tag), else a fresh `<node_name>-<counter>` key.
    /// `localisable` gates whether a `lineInfo` entry is recorded (dialogue
    /// lines, option labels, and raw-text bodies are; bare expression
    /// string literals are not).
    pub fn register(
        &mut self,
        node_name: &str,
        text: String,
        explicit_key: Option<String>,
        line_number: usize,
        localisable: bool,
    ) -> Result<String, CompileError> {
        let key = explicit_key.unwrap_or_else(|| self.next_key(node_name));

        if self.strings.contains_key(&key) {
            return Err(CompileError::DuplicateStringKey { node: node_name.to_string(), key });
        }

        self.strings.insert(key.clone(), text);
        if localisable {
            self.line_info.insert(key.clone(), LineInfo { node_name: node_name.to_string(), line_number });
        }
        Ok(key)
    }

    fn next_key(&mut self, node_name: &str) -> String {
        let key = format!("{node_name}-{}", self.counter);
        self.counter += 1;
        key
    }

    pub fn into_parts(self) -> (IndexMap<String, String>, IndexMap<String, LineInfo>) {
        (self.strings, self.line_info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_generated_keys_increment_across_nodes() {
        let mut builder = StringTableBuilder::new();
        let a = builder.register("Start", "Hi".into(), None, 1, true).unwrap();
        let b = builder.register("Other", "Bye".into(), None, 2, true).unwrap();
        assert_eq!(a, "Start-0");
        assert_eq!(b, "Other-1");
    }

    #[test]
    fn explicit_key_is_used_verbatim_and_recorded_in_line_info() {
        let mut builder = StringTableBuilder::new();
        let key = builder.register("Start", "Hi".into(), Some("greet".into()), 3, true).unwrap();
        assert_eq!(key, "greet");
        let (strings, line_info) = builder.into_parts();
        assert_eq!(strings["greet"], "Hi");
        assert_eq!(line_info["greet"], LineInfo { node_name: "Start".into(), line_number: 3 });
    }

    #[test]
    fn duplicate_explicit_key_is_rejected() {
        let mut builder = StringTableBuilder::new();
        builder.register("Start", "Hi".into(), Some("greet".into()), 1, true).unwrap();
        let err = builder.register("Start", "Again".into(), Some("greet".into()), 2, true).unwrap_err();
        assert_eq!(err, CompileError::DuplicateStringKey { node: "Start".into(), key: "greet".into() });
    }

    #[test]
    fn non_localisable_strings_have_no_line_info_entry() {
        let mut builder = StringTableBuilder::new();
        let key = builder.register("Start", "literal".into(), None, 1, false).unwrap();
        let (_, line_info) = builder.into_parts();
        assert!(!line_info.contains_key(&key));
    }
}

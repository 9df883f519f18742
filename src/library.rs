//! # Function Library
//!
//! Registry mapping an operator or function name to `{paramCount,
//! returnsValue, implementation}` (spec §4.5). The standard library
//! preloads every operator name the expression grammar can synthesise
//! (§4.2/§6) plus the two built-in dialogue functions, `visited` and
//! `visitCount`, whose metadata lives here even though their actual
//! implementation is intercepted by the VM (it needs live per-run visit
//! history the library itself has no access to — see `vm/mod.rs`).
//!
//! The stdlib operator table is built once behind a `once_cell::sync::Lazy`
//! (mirrored on the static interner table in the sibling parser-corpus
//! crate) since its closures are pure and stateless; [`Library::new`] just
//! wraps that shared table into a fresh, host-extensible registry.

use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::error::RuntimeError;
use crate::value::Value;

type OperatorFn = fn(&[Value]) -> Result<Value, RuntimeError>;

/// Names the compiler can itself emit as a `CallFunc` operand when lowering
/// an `Expression::Unary`/`Expression::Binary` node. Every other `CallFunc`
/// name reaching the VM is a dialogue-script-level call (`name(args...)`)
/// and uses the variadic argument-count-on-top convention instead (see
/// `vm::VirtualMachine::dispatch_call`).
static OPERATOR_TABLE: Lazy<IndexMap<&'static str, (i32, OperatorFn)>> = Lazy::new(|| {
    fn arity_error(name: &str, args: &[Value]) -> RuntimeError {
        RuntimeError::TypeError { operand_types: args.iter().map(describe).collect::<Vec<_>>().join(", "), name: name.to_string() }
    }
    fn describe(v: &Value) -> String {
        match v {
            Value::Null => "Null".into(),
            Value::Number(_) => "Number".into(),
            Value::String(_) => "String".into(),
            Value::Bool(_) => "Bool".into(),
            Value::Variable(_) => "Variable".into(),
        }
    }

    let mut table: IndexMap<&'static str, (i32, OperatorFn)> = IndexMap::new();
    table.insert("Add", (2, |a| a[0].add(&a[1]).ok_or_else(|| arity_error("Add", a))));
    table.insert("Minus", (2, |a| a[0].subtract(&a[1]).ok_or_else(|| arity_error("Minus", a))));
    table.insert("UnaryMinus", (1, |a| a[0].negate().ok_or_else(|| arity_error("UnaryMinus", a))));
    table.insert("Multiply", (2, |a| a[0].multiply(&a[1]).ok_or_else(|| arity_error("Multiply", a))));
    table.insert("Divide", (2, |a| a[0].divide(&a[1]).ok_or_else(|| arity_error("Divide", a))));
    table.insert("Modulo", (2, |a| a[0].modulo(&a[1]).ok_or_else(|| arity_error("Modulo", a))));
    // Arity metadata only: `dispatch_call` intercepts both names ahead of
    // this table so the per-run `EngineConfig` equality mode applies;
    // these closures hardcode the legacy quirk and never actually run.
    table.insert("EqualTo", (2, |a| Ok(Value::Bool(a[0].equals(&a[1], true)))));
    table.insert("NotEqualTo", (2, |a| Ok(Value::Bool(!a[0].equals(&a[1], true)))));
    table.insert("GreaterThan", (2, |a| Ok(Value::Bool(a[0].compare(&a[1]).is_gt()))));
    table.insert("GreaterThanOrEqualTo", (2, |a| Ok(Value::Bool(a[0].compare(&a[1]).is_ge()))));
    table.insert("LessThan", (2, |a| Ok(Value::Bool(a[0].compare(&a[1]).is_lt()))));
    table.insert("LessThanOrEqualTo", (2, |a| Ok(Value::Bool(a[0].compare(&a[1]).is_le()))));
    table.insert("And", (2, |a| Ok(Value::Bool(a[0].as_bool() && a[1].as_bool()))));
    table.insert("Or", (2, |a| Ok(Value::Bool(a[0].as_bool() || a[1].as_bool()))));
    table.insert("Xor", (2, |a| Ok(Value::Bool(a[0].as_bool() ^ a[1].as_bool()))));
    table.insert("Not", (1, |a| Ok(Value::Bool(!a[0].as_bool()))));
    table
});

pub enum FunctionKind {
    Operator(OperatorFn),
    /// Metadata-only: `visited`/`visitCount` are special-cased by the VM,
    /// which has the per-run visit history this crate's `Library` does not.
    Native,
    Host(Arc<dyn Fn(&[Value]) -> Result<Value, RuntimeError> + Send + Sync>),
}

pub struct Function {
    pub param_count: i32,
    pub returns_value: bool,
    pub kind: FunctionKind,
}

/// `Register`/`Get` registry (spec §4.5). Cheap to clone (`Arc`-backed
/// closures), so a single instance may be shared across VMs that run the
/// same `Program` concurrently... modulo spec §1's single-threaded scope.
pub struct Library {
    functions: IndexMap<String, Function>,
}

impl Default for Library {
    fn default() -> Self {
        Self::new()
    }
}

impl Library {
    /// A library preloaded with every operator name plus `visited`/`visitCount`
    /// metadata placeholders.
    pub fn new() -> Self {
        let mut functions = IndexMap::new();
        for (name, (param_count, implementation)) in OPERATOR_TABLE.iter() {
            functions.insert((*name).to_string(), Function { param_count: *param_count, returns_value: true, kind: FunctionKind::Operator(*implementation) });
        }
        functions.insert("visited".to_string(), Function { param_count: 1, returns_value: true, kind: FunctionKind::Native });
        functions.insert("visitCount".to_string(), Function { param_count: -1, returns_value: true, kind: FunctionKind::Native });
        Self { functions }
    }

    /// An empty library with no stdlib operators preloaded, for embedders
    /// that want to build their own function set from scratch.
    pub fn empty() -> Self {
        Self { functions: IndexMap::new() }
    }

    pub fn register(&mut self, name: impl Into<String>, param_count: i32, returns_value: bool, implementation: impl Fn(&[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static) {
        self.functions.insert(name.into(), Function { param_count, returns_value, kind: FunctionKind::Host(Arc::new(implementation)) });
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    /// Invokes a registered operator or host function. `visited`/`visitCount`
    /// are never dispatched through here — the VM intercepts them first.
    pub fn invoke(&self, name: &str, args: &[Value]) -> Result<Option<Value>, RuntimeError> {
        let function = self.get(name).ok_or_else(|| RuntimeError::MissingFunction { name: name.to_string() })?;
        let value = match &function.kind {
            FunctionKind::Operator(f) => f(args)?,
            FunctionKind::Host(f) => f(args)?,
            FunctionKind::Native => return Err(RuntimeError::MissingFunction { name: name.to_string() }),
        };
        Ok(if function.returns_value { Some(value) } else { None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdlib_add_concatenates_strings() {
        let library = Library::new();
        let result = library.invoke("Add", &[Value::String("a".into()), Value::String("b".into())]).unwrap();
        assert_eq!(result, Some(Value::String("ab".into())));
    }

    #[test]
    fn unary_minus_is_registered_separately_from_binary_minus() {
        let library = Library::new();
        assert_eq!(library.get("UnaryMinus").unwrap().param_count, 1);
        assert_eq!(library.get("Minus").unwrap().param_count, 2);
    }

    #[test]
    fn host_registered_function_is_invocable() {
        let mut library = Library::new();
        library.register("double", 1, true, |args| Ok(Value::Number(args[0].as_number() * 2.0)));
        let result = library.invoke("double", &[Value::Number(21.0)]).unwrap();
        assert_eq!(result, Some(Value::Number(42.0)));
    }

    #[test]
    fn visited_is_present_as_metadata_but_not_directly_invocable() {
        let library = Library::new();
        assert!(library.get("visited").is_some());
        assert!(library.invoke("visited", &[Value::String("Start".into())]).is_err());
    }

    #[test]
    fn missing_function_is_an_error() {
        let library = Library::new();
        assert!(library.invoke("NoSuchFn", &[]).is_err());
    }
}

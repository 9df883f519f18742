//! Thin newtype over the VM's operand stack. Exists mainly so
//! [`RuntimeError::StackUnderflow`](crate::error::RuntimeError) has a single
//! choke point to originate from instead of every call site unwrapping
//! `Vec::pop` directly.

use crate::error::RuntimeError;
use crate::value::Value;

#[derive(Debug, Default, Clone)]
pub struct ValueStack(Vec<Value>);

impl ValueStack {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, value: Value) {
        self.0.push(value);
    }

    pub fn pop(&mut self, op: &str) -> Result<Value, RuntimeError> {
        self.0.pop().ok_or_else(|| RuntimeError::StackUnderflow { op: op.to_string() })
    }

    pub fn peek(&self, op: &str) -> Result<&Value, RuntimeError> {
        self.0.last().ok_or_else(|| RuntimeError::StackUnderflow { op: op.to_string() })
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Bottom-to-top view of the operand stack, for a host-side disassembler
    /// or step debugger. The VM itself never iterates its own stack.
    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

//! # Virtual Machine
//!
//! A single-threaded stack interpreter (spec §4.4) structured as a
//! cooperatively-suspending state machine: [`VirtualMachine::run_next`]
//! drives execution one bytecode instruction at a time internally, but
//! only ever returns control to the host at a genuine event boundary
//! (`Line`/`Command`/`OptionSet`/`NodeComplete`) — matching Design Notes
//! §9's "emit events into an iterator the host pulls" in place of the
//! per-run mutable callback fields the distilled description carried.

pub mod stack;


use std::sync::{Arc, RwLock};

use indexmap::IndexMap;

use crate::compiler::Instruction;
use crate::config::EngineConfig;
use crate::error::RuntimeError;
use crate::library::{FunctionKind, Library};
use crate::program::Program;
use crate::storage::VariableStorage;
use crate::value::Value;
use stack::ValueStack;

/// Shared, lock-guarded function registry: `Arc` lets the same table back
/// several concurrently-running VMs over the same `Program` (spec §5), and
/// the lock is what lets a host register a function through [`crate::Dialogue::library_mut`]
/// after that sharing has already happened.
pub type SharedLibrary = Arc<RwLock<Library>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    Stopped,
    WaitingOnOptionSelection,
    Suspended,
    Running,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionEntry {
    pub text: String,
    pub destination: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogueEvent {
    Line { text: String, key: String },
    Command { text: String },
    OptionSet { options: Vec<OptionEntry> },
    /// `next_node` is `None` for a `Stop`, `Some` for a `RunNode` jump.
    NodeComplete { next_node: Option<String> },
}

/// A panic elsewhere while holding the write lock (inside a host-supplied
/// closure registered through `Dialogue::library_mut`) poisons the lock;
/// recovering the inner value is preferable to taking the whole VM down
/// over a table that is still perfectly readable.
fn read_library(library: &SharedLibrary) -> std::sync::RwLockReadGuard<'_, Library> {
    library.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Fixed arity of a compiler-synthesised operator `CallFunc` (Design Notes
/// §9 / DESIGN.md open question): these sixteen names never carry an
/// argument count on the stack. Every other `CallFunc` name is a
/// dialogue-script-level call and uses the variadic N-on-top convention.
fn operator_arity(name: &str) -> Option<usize> {
    match name {
        "UnaryMinus" | "Not" => Some(1),
        "Add" | "Minus" | "Multiply" | "Divide" | "Modulo" | "EqualTo" | "NotEqualTo" | "GreaterThan" | "GreaterThanOrEqualTo" | "LessThan"
        | "LessThanOrEqualTo" | "And" | "Or" | "Xor" => Some(2),
        _ => None,
    }
}

pub struct VirtualMachine {
    program: Arc<Program>,
    library: SharedLibrary,
    storage: Box<dyn VariableStorage>,
    current_node: String,
    pc: usize,
    stack: ValueStack,
    state: VmState,
    option_accumulator: Vec<(String, String)>,
    visit_counts: IndexMap<String, u32>,
    config: EngineConfig,
}

impl VirtualMachine {
    pub fn new(program: Arc<Program>, library: SharedLibrary, storage: Box<dyn VariableStorage>) -> Self {
        Self {
            program,
            library,
            storage,
            current_node: String::new(),
            pc: 0,
            stack: ValueStack::new(),
            state: VmState::Stopped,
            option_accumulator: Vec::new(),
            visit_counts: IndexMap::new(),
            config: EngineConfig::default(),
        }
    }

    /// Switches the `EqualTo`/`NotEqualTo` null-equality rule (Design Notes
    /// §9: gated behind a compile-time-ish option rather than always on).
    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    pub fn state(&self) -> VmState {
        self.state
    }

    pub fn visit_count(&self, node: &str) -> u32 {
        self.visit_counts.get(node).copied().unwrap_or(0)
    }

    pub fn storage(&self) -> &dyn VariableStorage {
        self.storage.as_ref()
    }

    /// Name of the node currently executing, for a step debugger's prompt.
    pub fn current_node(&self) -> &str {
        &self.current_node
    }

    /// Index of the next instruction `run_next` will fetch.
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Bottom-to-top view of the operand stack, for a step debugger.
    pub fn stack_values(&self) -> &[Value] {
        self.stack.values()
    }

    /// The current node's instruction at `pc`, for a step debugger to
    /// disassemble before stepping over it. `None` past the node's end.
    pub fn peek_instruction(&self) -> Option<&Instruction> {
        self.program.node(&self.current_node)?.instructions.get(self.pc)
    }

    pub fn storage_mut(&mut self) -> &mut dyn VariableStorage {
        self.storage.as_mut()
    }

    /// Begins (or restarts) execution at `start_node`. Resets the operand
    /// stack, program counter, and option accumulator; does not clear
    /// variable storage or visit history (spec §6's `UnloadAll(clearVisited)`
    /// is the host's lever for that).
    pub fn run(&mut self, start_node: &str) -> Result<(), RuntimeError> {
        if !self.program.node_exists(start_node) {
            return Err(RuntimeError::MissingNode { name: start_node.to_string() });
        }
        self.set_node(start_node);
        self.state = VmState::Running;
        Ok(())
    }

    /// Cancellation (spec §5): the next `run_next` returns `Ok(None)`
    /// without executing anything.
    pub fn stop(&mut self) {
        self.state = VmState::Stopped;
    }

    pub fn clear_visit_history(&mut self) {
        self.visit_counts.clear();
    }

    /// Swaps in a freshly-loaded or freshly-merged `Program` without
    /// disturbing the VM's variable storage (spec §6: a load only ever
    /// adds nodes to what's already runnable).
    pub fn set_program(&mut self, program: Arc<Program>) {
        self.program = program;
    }

    pub fn set_library(&mut self, library: SharedLibrary) {
        self.library = library;
    }

    /// The shared function registry backing this VM, for a host that wants
    /// to register a function after construction (`Dialogue::library_mut`).
    pub fn library(&self) -> &SharedLibrary {
        &self.library
    }

    pub fn replace_storage(&mut self, storage: Box<dyn VariableStorage>) -> Box<dyn VariableStorage> {
        std::mem::replace(&mut self.storage, storage)
    }

    fn set_node(&mut self, name: &str) {
        self.current_node = name.to_string();
        self.pc = 0;
        self.stack.clear();
        self.option_accumulator.clear();
    }

    /// Submits the host's choice for a pending `OptionSet` (spec §5: the
    /// one blocking suspension point). Pushes the selected destination so
    /// the node's own `Jump` instruction can resume immediately after.
    pub fn submit_selection(&mut self, index: usize) -> Result<(), RuntimeError> {
        if self.state != VmState::WaitingOnOptionSelection {
            return Err(RuntimeError::AwaitingSelection);
        }
        let count = self.option_accumulator.len();
        if index >= count {
            return Err(RuntimeError::SelectionOutOfRange { index, count });
        }
        let destination = self.option_accumulator[index].1.clone();
        self.option_accumulator.clear();
        self.stack.push(Value::String(destination));
        self.state = VmState::Running;
        Ok(())
    }

    /// Runs instructions until the next host-visible event, `Stopped`, or
    /// an error. A runtime error stops the VM before propagating (spec §7).
    pub fn run_next(&mut self) -> Result<Option<DialogueEvent>, RuntimeError> {
        match self.state {
            VmState::Stopped => return Ok(None),
            VmState::WaitingOnOptionSelection => return Err(RuntimeError::AwaitingSelection),
            VmState::Suspended => self.state = VmState::Running,
            VmState::Running => {}
        }

        loop {
            match self.execute_one() {
                Ok(Some(event)) => return Ok(Some(event)),
                Ok(None) => continue,
                Err(err) => {
                    self.state = VmState::Stopped;
                    return Err(err);
                }
            }
        }
    }

    /// Executes exactly one bytecode instruction and returns any event it
    /// raised, without looping to the next event boundary the way
    /// [`VirtualMachine::run_next`] does. For a host-side step debugger
    /// that wants to show every instruction, not just suspension points.
    pub fn step(&mut self) -> Result<Option<DialogueEvent>, RuntimeError> {
        match self.execute_one() {
            Ok(event) => Ok(event),
            Err(err) => {
                self.state = VmState::Stopped;
                Err(err)
            }
        }
    }

    fn fetch(&self) -> Result<Instruction, RuntimeError> {
        let node = self.program.node(&self.current_node).ok_or_else(|| RuntimeError::MissingNode { name: self.current_node.clone() })?;
        node.instructions
            .get(self.pc)
            .cloned()
            .ok_or_else(|| RuntimeError::MissingLabel { node: self.current_node.clone(), label: "<end-of-node>".to_string() })
    }

    fn resolve_label(&self, label: &str) -> Result<usize, RuntimeError> {
        let node = self.program.node(&self.current_node).ok_or_else(|| RuntimeError::MissingNode { name: self.current_node.clone() })?;
        node.labels.get(label).copied().ok_or_else(|| RuntimeError::MissingLabel { node: self.current_node.clone(), label: label.to_string() })
    }

    fn execute_one(&mut self) -> Result<Option<DialogueEvent>, RuntimeError> {
        let instruction = self.fetch()?;
        let mut advance = true;

        let event = match instruction {
            Instruction::Label(_) => None,

            Instruction::JumpTo(target) => {
                self.pc = target;
                advance = false;
                None
            }

            Instruction::Jump => {
                let destination = self.stack.peek("Jump")?.as_string();
                self.pc = self.resolve_label(&destination)?;
                advance = false;
                None
            }

            Instruction::RunLine(key) => {
                let text = self.program.string(&key).unwrap_or_default().to_string();
                self.state = VmState::Suspended;
                Some(DialogueEvent::Line { text, key })
            }

            Instruction::RunCommand(text) => {
                if text.trim() == "stop" {
                    self.finish_node(None);
                    Some(DialogueEvent::NodeComplete { next_node: None })
                } else {
                    self.state = VmState::Suspended;
                    Some(DialogueEvent::Command { text })
                }
            }

            Instruction::AddOption { key, destination } => {
                self.option_accumulator.push((key, destination));
                None
            }

            Instruction::ShowOptions => {
                let options = self
                    .option_accumulator
                    .iter()
                    .map(|(key, destination)| OptionEntry { text: self.program.string(key).unwrap_or_default().to_string(), destination: destination.clone() })
                    .collect();
                self.state = VmState::WaitingOnOptionSelection;
                Some(DialogueEvent::OptionSet { options })
            }

            Instruction::PushString(key) => {
                self.stack.push(Value::String(self.program.string(&key).unwrap_or_default().to_string()));
                None
            }
            Instruction::PushNumber(n) => {
                self.stack.push(Value::Number(n));
                None
            }
            Instruction::PushBool(b) => {
                self.stack.push(Value::Bool(b));
                None
            }
            Instruction::PushNull => {
                self.stack.push(Value::Null);
                None
            }
            Instruction::PushVariable(name) => {
                self.stack.push(self.storage.get(&name).unwrap_or(Value::Null));
                None
            }
            Instruction::StoreVariable(name) => {
                let value = self.stack.peek("StoreVariable")?.clone();
                self.storage.set(&name, value);
                None
            }
            Instruction::Pop => {
                self.stack.pop("Pop")?;
                None
            }
            Instruction::JumpIfFalse(target) => {
                let condition = self.stack.peek("JumpIfFalse")?.as_bool();
                if !condition {
                    self.pc = target;
                    advance = false;
                }
                None
            }
            Instruction::CallFunc(name) => {
                self.dispatch_call(&name)?;
                None
            }
            Instruction::RunNode => {
                let destination = self.stack.pop("RunNode")?.as_string();
                if !self.program.node_exists(&destination) {
                    self.state = VmState::Stopped;
                    return Err(RuntimeError::MissingNode { name: destination });
                }
                self.finish_node(Some(destination.clone()));
                Some(DialogueEvent::NodeComplete { next_node: Some(destination) })
            }
            Instruction::Stop => {
                self.finish_node(None);
                Some(DialogueEvent::NodeComplete { next_node: None })
            }
        };

        if advance {
            self.pc += 1;
        }
        Ok(event)
    }

    /// Records the completing node's visit and either stops or jumps to
    /// `next`, mirroring the VM opcode table's `Stop`/`RunNode` handling.
    fn finish_node(&mut self, next: Option<String>) {
        *self.visit_counts.entry(self.current_node.clone()).or_insert(0) += 1;
        match next {
            Some(dest) => {
                self.set_node(&dest);
                self.state = VmState::Suspended;
            }
            None => self.state = VmState::Stopped,
        }
    }

    fn dispatch_call(&mut self, name: &str) -> Result<(), RuntimeError> {
        if name == "visited" || name == "visitCount" {
            return self.dispatch_native_call(name);
        }

        // `Library::invoke` always applies the legacy Null-equality quirk;
        // only the VM knows the per-run `EngineConfig`, so these two
        // operators are resolved here instead of through the library table.
        if name == "EqualTo" || name == "NotEqualTo" {
            let rhs = self.stack.pop("CallFunc")?;
            let lhs = self.stack.pop("CallFunc")?;
            let equal = lhs.equals(&rhs, self.config.legacy_null_equality);
            self.stack.push(Value::Bool(if name == "EqualTo" { equal } else { !equal }));
            return Ok(());
        }

        if let Some(arity) = operator_arity(name) {
            let mut args = Vec::with_capacity(arity);
            for _ in 0..arity {
                args.push(self.stack.pop("CallFunc")?);
            }
            args.reverse();
            if let Some(value) = read_library(&self.library).invoke(name, &args)? {
                self.stack.push(value);
            }
            return Ok(());
        }

        // Script-level call (`name(args...)`): the compiler always pushes
        // the argument count above the arguments themselves.
        let count = self.stack.pop("CallFunc")?.as_number().round().max(0.0) as usize;
        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            args.push(self.stack.pop("CallFunc")?);
        }
        args.reverse();

        {
            let library = read_library(&self.library);
            if let Some(function) = library.get(name) {
                if function.param_count >= 0 && function.param_count as usize != count {
                    return Err(RuntimeError::ArityMismatch { name: name.to_string(), expected: function.param_count, got: count });
                }
                if matches!(function.kind, FunctionKind::Native) {
                    unreachable!("visited/visitCount are intercepted above");
                }
            }
        }

        if let Some(value) = read_library(&self.library).invoke(name, &args)? {
            self.stack.push(value);
        }
        Ok(())
    }

    fn dispatch_native_call(&mut self, name: &str) -> Result<(), RuntimeError> {
        let count = self.stack.pop("CallFunc")?.as_number().round().max(0.0) as usize;
        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            args.push(self.stack.pop("CallFunc")?);
        }
        args.reverse();

        let result = match name {
            "visited" => {
                let target = args.first().map(Value::as_string).unwrap_or_default();
                Value::Bool(self.visit_count(&target) > 0)
            }
            "visitCount" => {
                let target = args.first().map(Value::as_string).unwrap_or_else(|| self.current_node.clone());
                if !self.program.node_exists(&target) {
                    log::warn!("visitCount: no such node {target:?}, returning 0");
                }
                Value::Number(self.visit_count(&target) as f32)
            }
            _ => unreachable!("guarded by caller"),
        };
        self.stack.push(result);
        Ok(())
    }
}

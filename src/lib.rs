//! # Dialogue Scripting Engine
//!
//! A Yarn-style interactive-dialogue scripting engine: a lexer and parser
//! that turn node bodies into an AST, a bytecode compiler, and a
//! cooperatively-suspending stack VM that drives branching dialogue one
//! event at a time.
//!
//! ## Pipeline
//!
//! 1. **Loader** — reads a `.yarn.txt`, `.json`, or `.node` container into
//!    node records.
//! 2. **Lexer** — tokenises each node's body.
//! 3. **Parser** — builds an AST from the token stream.
//! 4. **Compiler** — lowers the AST to linear bytecode plus a string table.
//! 5. **VM** — executes bytecode as a lazy sequence of dialogue events.
//!
//! Around the core sit two host-facing ports: [`Library`] (callable
//! functions) and [`VariableStorage`] (persisted `$`-variables).
//!
//! ## Example
//!
//! ```rust,no_run
//! use yarnspin::Dialogue;
//!
//! let mut dialogue = Dialogue::new();
//! dialogue.load_file("story.yarn.txt").unwrap();
//! dialogue.run("Start").unwrap();
//!
//! while let Some(event) = dialogue.run_next().unwrap() {
//!     println!("{event:?}");
//! }
//! ```

pub mod compiler;
pub mod config;
pub mod error;
pub mod lexer;
pub mod library;
pub mod loader;
pub mod parser;
pub mod program;
pub mod storage;
pub mod value;
pub mod vm;

use std::sync::{Arc, RwLock};

pub use config::EngineConfig;
pub use error::{Result, YarnError};
pub use library::Library;
pub use program::{CompiledContainer, Program};
pub use storage::{MemoryVariableStorage, VariableStorage};
pub use value::Value;
pub use vm::{DialogueEvent, OptionEntry, SharedLibrary, VirtualMachine, VmState};

/// The crate's one porcelain entry point: owns a loaded [`Program`], a
/// [`Library`], and a [`VariableStorage`] backend, and drives a single
/// [`VirtualMachine`] over them (spec §6's host API surface).
pub struct Dialogue {
    program: Arc<Program>,
    library: SharedLibrary,
    vm: VirtualMachine,
    config: EngineConfig,
}

impl Dialogue {
    pub fn new() -> Self {
        Self::with_storage(Box::new(MemoryVariableStorage::new()))
    }

    pub fn with_storage(storage: Box<dyn VariableStorage>) -> Self {
        let program = Arc::new(Program { nodes: indexmap::IndexMap::new(), strings: indexmap::IndexMap::new(), line_info: indexmap::IndexMap::new() });
        let library = Arc::new(RwLock::new(Library::new()));
        let vm = VirtualMachine::new(program.clone(), library.clone(), storage);
        Self { program, library, vm, config: EngineConfig::default() }
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
        self.vm.set_config(config);
    }

    /// A write guard onto the shared function registry, so a host can
    /// register a custom function (spec §6 `Library.Register`) through the
    /// same table the VM actually reads at call time.
    pub fn library_mut(&mut self) -> std::sync::RwLockWriteGuard<'_, Library> {
        self.library.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn storage(&self) -> &dyn VariableStorage {
        self.vm.storage()
    }

    pub fn storage_mut(&mut self) -> &mut dyn VariableStorage {
        self.vm.storage_mut()
    }

    /// Loads and compiles a container file, merging its nodes into the
    /// program already in place (spec §8's load-order-independence
    /// property: disjoint loads commute, collisions fail symmetrically).
    pub fn load_file(&mut self, path: &str) -> Result<()> {
        let loaded = loader::load_file(path)?;
        self.merge_program(loaded)
    }

    pub fn load_string(&mut self, text: &str, name: &str) -> Result<()> {
        let loaded = loader::load_string(loader::detect_format(name), name, text)?;
        self.merge_program(loaded)
    }

    pub fn load_compiled(&mut self, bytes: &[u8]) -> Result<()> {
        let container: CompiledContainer =
            serde_json::from_slice(bytes).map_err(|e| error::LoadError::Json { file: "<compiled>".to_string(), source: e.to_string() })?;
        self.merge_program(container.into_program())
    }

    fn merge_program(&mut self, loaded: Program) -> Result<()> {
        let mut program = (*self.program).clone();
        program.merge(loaded)?;
        self.program = Arc::new(program);
        self.vm.set_program(self.program.clone());
        Ok(())
    }

    pub fn node_exists(&self, name: &str) -> bool {
        self.program.node_exists(name)
    }

    /// The compiled program currently loaded, for hosts that want direct
    /// access to the string table or per-string `lineInfo` (localisation
    /// tooling's `GetStringInfoTable`, spec §6).
    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn get_text_for_node(&self, name: &str) -> Option<&str> {
        let node = self.program.node(name)?;
        let key = node.source_text_string_id.as_ref()?;
        self.program.string(key)
    }

    pub fn run(&mut self, start_node: &str) -> std::result::Result<(), error::RuntimeError> {
        self.vm.run(start_node)
    }

    pub fn stop(&mut self) {
        self.vm.stop();
    }

    /// Drops every loaded node and resets the standard library, leaving
    /// variable storage untouched. `clear_visited` additionally forgets
    /// per-node visit history; otherwise it survives the unload (spec §6
    /// `UnloadAll(clearVisited)`).
    pub fn unload_all(&mut self, clear_visited: bool) {
        self.program = Arc::new(Program { nodes: indexmap::IndexMap::new(), strings: indexmap::IndexMap::new(), line_info: indexmap::IndexMap::new() });
        self.library = Arc::new(RwLock::new(Library::new()));
        self.vm.stop();
        self.vm.set_program(self.program.clone());
        self.vm.set_library(self.library.clone());
        if clear_visited {
            self.vm.clear_visit_history();
        }
    }

    pub fn run_next(&mut self) -> std::result::Result<Option<DialogueEvent>, error::RuntimeError> {
        self.vm.run_next()
    }

    pub fn submit_selection(&mut self, index: usize) -> std::result::Result<(), error::RuntimeError> {
        self.vm.submit_selection(index)
    }

    pub fn state(&self) -> VmState {
        self.vm.state()
    }

    pub fn visit_count(&self, node: &str) -> u32 {
        self.vm.visit_count(node)
    }
}

impl Default for Dialogue {
    fn default() -> Self {
        Self::new()
    }
}

//! Error taxonomy for the dialogue pipeline.
//!
//! Each phase (loader, lexer, parser, compiler, VM) has its own error type,
//! carrying just enough location context to produce a useful diagnostic.
//! [`YarnError`] is the umbrella enum a caller driving the whole pipeline
//! deals with; each phase error converts into it via `#[from]`.

use thiserror::Error;

/// Location of a token or instruction within a single node's body.
///
/// Byte offsets are not tracked: the loader has already split a document
/// into per-node line arrays, so only line/column within that node matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Malformed source container: missing sentinels, bad header, unknown format.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LoadError {
    #[error("{file}: node missing terminating '---' after header")]
    MissingHeaderSentinel { file: String },

    #[error("{file}: node missing terminating '===' after body")]
    MissingBodySentinel { file: String },

    #[error("{file}: header line {line} is not of the form 'field: value': {text:?}")]
    MalformedHeaderLine { file: String, line: usize, text: String },

    #[error("{file}: node has no 'title' field")]
    MissingTitle { file: String },

    #[error("{file}: unrecognised source format (expected .yarn.txt, .json, or .node)")]
    UnknownFormat { file: String },

    #[error("{file}: {source}")]
    Json { file: String, source: String },

    #[error("{file}: {source}")]
    Io { file: String, source: String },
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("{node}:{span:?}: {message}")]
pub struct TokeniserError {
    pub node: String,
    pub span: Span,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub node: String,
    pub span: Span,
    pub token: String,
    pub expected: String,
    pub message: Option<String>,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: expected {}, found {}",
            self.node, self.span.line, self.span.column, self.expected, self.token
        )?;
        if let Some(message) = &self.message {
            write!(f, " ({message})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Duplicate node, duplicate string key, unresolved label, invalid special command.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error("duplicate node name: {name}")]
    DuplicateNode { name: String },

    #[error("node {node}: duplicate string table key: {key}")]
    DuplicateStringKey { node: String, key: String },

    #[error("node {node}: branch references unknown label: {label}")]
    UnresolvedLabel { node: String, label: String },

    #[error("node {node}: invalid special command: {command}")]
    InvalidSpecialCommand { node: String, command: String },

    #[error("merging programs: node name collision: {name}")]
    NodeCollision { name: String },
}

/// Fatal at runtime unless noted otherwise; each variant stops the VM.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuntimeError {
    #[error("RunNode: no such node: {name}")]
    MissingNode { name: String },

    #[error("node {node}: jump to unknown label: {label}")]
    MissingLabel { node: String, label: String },

    #[error("CallFunc: no such function: {name}")]
    MissingFunction { name: String },

    #[error("CallFunc {name}: expected {expected} argument(s), got {got}")]
    ArityMismatch { name: String, expected: i32, got: usize },

    #[error("CallFunc {name}: invalid operand type(s): {operand_types}")]
    TypeError { name: String, operand_types: String },

    #[error("stack underflow executing {op} (compiler bug)")]
    StackUnderflow { op: String },

    #[error("RunNext called while WaitingOnOptionSelection without a prior selection")]
    AwaitingSelection,

    #[error("submit_selection: index {index} out of range (0..{count})")]
    SelectionOutOfRange { index: usize, count: usize },
}

/// Umbrella error for callers driving the whole pipeline.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum YarnError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Tokenise(#[from] TokeniserError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type Result<T> = std::result::Result<T, YarnError>;

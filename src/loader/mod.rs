//! # Loader
//!
//! Turns a source container (text, JSON, or a single raw node) into a
//! [`Program`](crate::program::Program), dispatching to the right format
//! reader by file suffix — falling back to the self-describing `Text`
//! format when an extension doesn't name a known one, since a malformed
//! `Text` body still fails on its own missing-sentinel checks rather than
//! silently producing garbage (spec §6).

pub mod json;
pub mod single;
pub mod text;

#[cfg(test)]
mod tests;

use crate::compiler::{compile, compile_node, StringTableBuilder};
use crate::error::{CompileError, LoadError};
use crate::parser::{ast, parse};
use crate::program::Program;
use crate::lexer::tokenize;

/// A single parsed-but-not-yet-compiled dialogue node, as produced by any
/// of the three container readers (spec §3's `NodeInfo`).
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    pub title: String,
    pub body: Vec<String>,
    pub tags: Vec<String>,
    pub color_id: Option<i32>,
    pub position: Option<(f32, f32)>,
}

impl NodeInfo {
    pub fn new(title: impl Into<String>, body: Vec<String>) -> Self {
        Self { title: title.into(), body, tags: Vec::new(), color_id: None, position: None }
    }
}

/// Which format a container was recognised as, purely for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Text,
    Json,
    SingleNodeText,
}

pub fn detect_format(path: &str) -> SourceFormat {
    if path.ends_with(".json") {
        SourceFormat::Json
    } else if path.ends_with(".node") {
        SourceFormat::SingleNodeText
    } else {
        SourceFormat::Text
    }
}

/// Parses a raw source document into node records, without compiling them.
pub fn parse_nodes(format: SourceFormat, file: &str, source: &str) -> Result<Vec<NodeInfo>, LoadError> {
    match format {
        SourceFormat::Text => text::parse(file, source),
        SourceFormat::Json => json::parse(file, source),
        SourceFormat::SingleNodeText => Ok(vec![single::parse(source)]),
    }
}

/// Loads and compiles a whole document in one step: parse containers, lex
/// and parse each node's body into an AST, then lower the whole set to a
/// `Program` (one `StringTableBuilder`, so auto-generated keys stay
/// monotonic per Program rather than per node, per spec §8).
pub fn load_string(format: SourceFormat, file: &str, source: &str) -> Result<Program, crate::error::YarnError> {
    let node_infos = parse_nodes(format, file, source)?;
    let mut seen = std::collections::HashSet::new();
    let mut strings = StringTableBuilder::new();
    let mut nodes = indexmap::IndexMap::new();

    for info in node_infos {
        if !seen.insert(info.title.clone()) {
            return Err(CompileError::DuplicateNode { name: info.title.clone() }.into());
        }

        let ast_node = if info.tags.iter().any(|t| t == "rawText") {
            ast::Node { name: info.title.clone(), tags: info.tags.clone(), source: Some(info.body.join("\n")), statements: Vec::new() }
        } else {
            let lexed = tokenize(&info.title, &info.body);
            if let Some(err) = lexed.errors.into_iter().next() {
                return Err(err.into());
            }
            let parsed = parse(&info.title, &lexed.tokens);
            if let Some(err) = parsed.errors.into_iter().next() {
                return Err(err.into());
            }
            ast::Node { name: info.title.clone(), tags: info.tags.clone(), source: None, statements: parsed.statements }
        };

        nodes.insert(ast_node.name.clone(), compile_node(&ast_node, &mut strings)?);
    }

    let (table, line_info) = strings.into_parts();
    Ok(Program { nodes, strings: table, line_info })
}

pub fn load_file(path: &str) -> Result<Program, crate::error::YarnError> {
    let source = std::fs::read_to_string(path).map_err(|e| crate::error::LoadError::Io { file: path.to_string(), source: e.to_string() })?;
    load_string(detect_format(path), path, &source)
}

/// Compiles an already-parsed set of nodes, e.g. ones assembled by a host
/// that built its own `NodeInfo`s programmatically rather than loading them
/// from a container.
pub fn compile_node_infos(infos: &[NodeInfo]) -> Result<Program, CompileError> {
    let mut asts = Vec::with_capacity(infos.len());
    for info in infos {
        if info.tags.iter().any(|t| t == "rawText") {
            asts.push(ast::Node { name: info.title.clone(), tags: info.tags.clone(), source: Some(info.body.join("\n")), statements: Vec::new() });
            continue;
        }
        let lexed = tokenize(&info.title, &info.body);
        let parsed = parse(&info.title, &lexed.tokens);
        asts.push(ast::Node { name: info.title.clone(), tags: info.tags.clone(), source: None, statements: parsed.statements });
    }
    compile(&asts)
}

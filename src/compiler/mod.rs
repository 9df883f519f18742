//! # Compiler
//!
//! Lowers a parsed [`ast::Node`] into a [`CompiledNode`] of linear bytecode
//! (spec §4.3): one linear pass per node emitting instructions with
//! symbolic jump targets, followed by a single fixup pass that resolves
//! every label name to the instruction index it denotes. The VM that
//! consumes the result only ever sees resolved integer offsets — symbolic
//! names survive solely in the node's `labels` table, for disassembly.
//!
//! A small amount of engineering judgement was needed where the governing
//! description under-specifies stack hygiene; see `DESIGN.md` for the two
//! spots (`if`-clause balancing, the variadic calling convention) where a
//! concrete choice had to be made.

pub mod instruction;
pub mod labels;
pub mod strings;

#[cfg(test)]
mod tests;

use indexmap::IndexMap;

use crate::error::CompileError;
use crate::lexer::token::Operator;
use crate::parser::ast::{self, AssignOp, Clause, CommandBody, Expression, ShortcutOption, Statement};
use crate::program::{CompiledNode, Program};

pub use instruction::Instruction;
pub use labels::{LabelGenerator, LabelTable};
pub use strings::StringTableBuilder;

const SHUFFLE_OPTIONS_VAR: &str = "SHUFFLE_OPTIONS";

/// Compiles a whole set of parsed nodes into one [`Program`]. Aborts on the
/// first error, including a duplicate node name across the set.
pub fn compile(nodes: &[ast::Node]) -> Result<Program, CompileError> {
    let mut seen = std::collections::HashSet::new();
    let mut strings = StringTableBuilder::new();
    let mut compiled = IndexMap::new();

    for node in nodes {
        if !seen.insert(node.name.clone()) {
            return Err(CompileError::DuplicateNode { name: node.name.clone() });
        }
        compiled.insert(node.name.clone(), compile_node(node, &mut strings)?);
    }

    let (table, line_info) = strings.into_parts();
    Ok(Program { nodes: compiled, strings: table, line_info })
}

pub fn compile_node(node: &ast::Node, strings: &mut StringTableBuilder) -> Result<CompiledNode, CompileError> {
    if node.tags.iter().any(|t| t == "rawText") {
        let source = node.source.clone().unwrap_or_default();
        let key = strings.register(&node.name, source, None, 1, true)?;
        return Ok(CompiledNode {
            name: node.name.clone(),
            tags: node.tags.clone(),
            instructions: Vec::new(),
            labels: LabelTable::new(),
            source_text_string_id: Some(key),
        });
    }

    let mut compiler = NodeCompiler::new(&node.name, strings);
    let ends_with_options = compiler.lower_statements(&node.statements)?;
    if ends_with_options {
        compiler.emit_show_options();
        compiler.emit(Pending::RunNode);
    } else {
        compiler.emit(Pending::Stop);
    }

    let mut compiled = compiler.resolve()?;
    compiled.tags = node.tags.clone();
    Ok(compiled)
}

/// Mirrors [`Instruction`] but with symbolic label names in jump operand
/// position; resolved to instruction indices by [`NodeCompiler::resolve`].
#[derive(Debug, Clone)]
enum Pending {
    Label(String),
    JumpTo(String),
    Jump,
    RunLine(String),
    RunCommand(String),
    AddOption { key: String, destination: String },
    ShowOptions,
    PushString(String),
    PushNumber(f32),
    PushBool(bool),
    PushNull,
    PushVariable(String),
    StoreVariable(String),
    Pop,
    JumpIfFalse(String),
    CallFunc(String),
    RunNode,
    Stop,
}

struct NodeCompiler<'s> {
    name: String,
    strings: &'s mut StringTableBuilder,
    instructions: Vec<Pending>,
    labels: LabelGenerator,
    /// Set by a `<<shuffleNextOptions>>` command; consumed by the next
    /// `ShowOptions` this node emits, whichever construct produces it.
    pending_shuffle_reset: bool,
}

impl<'s> NodeCompiler<'s> {
    fn new(name: &str, strings: &'s mut StringTableBuilder) -> Self {
        Self { name: name.to_string(), strings, instructions: Vec::new(), labels: LabelGenerator::new(), pending_shuffle_reset: false }
    }

    fn emit(&mut self, instr: Pending) {
        self.instructions.push(instr);
    }

    fn emit_show_options(&mut self) {
        self.emit(Pending::ShowOptions);
        if self.pending_shuffle_reset {
            self.emit(Pending::PushBool(false));
            self.emit(Pending::StoreVariable(SHUFFLE_OPTIONS_VAR.to_string()));
            self.emit(Pending::Pop);
            self.pending_shuffle_reset = false;
        }
    }

    /// Lowers a statement list, returning whether the last statement in it
    /// leaves a bare `AddOption` pending with no following `ShowOptions`
    /// (spec §8's `endsWithOptions`, resolved per Design Notes §9 as an
    /// explicit threaded flag rather than a post-hoc scan).
    fn lower_statements(&mut self, statements: &[Statement]) -> Result<bool, CompileError> {
        let mut ends_with_options = false;
        for statement in statements {
            ends_with_options = self.lower_statement(statement)?;
        }
        Ok(ends_with_options)
    }

    fn lower_statement(&mut self, statement: &Statement) -> Result<bool, CompileError> {
        match statement {
            Statement::Line { text, line_number, tags } => {
                let explicit_key = line_key_from_tags(tags);
                let key = self.strings.register(&self.name.clone(), text.clone(), explicit_key, *line_number, true)?;
                self.emit(Pending::RunLine(key));
                Ok(false)
            }
            Statement::CustomCommand { body, .. } => self.lower_custom_command(body),
            Statement::ShortcutOptionGroup { options, .. } => {
                self.lower_shortcut_group(options)?;
                Ok(false)
            }
            Statement::Block { statements } => self.lower_statements(statements),
            Statement::IfStatement { clauses, .. } => self.lower_if(clauses),
            Statement::OptionStatement { label, destination, line_number, tags } => {
                self.lower_option(label, destination, *line_number, tags)
            }
            Statement::AssignmentStatement { name, op, value, .. } => {
                self.lower_assignment(name, op, value)?;
                Ok(false)
            }
        }
    }

    fn lower_custom_command(&mut self, body: &CommandBody) -> Result<bool, CompileError> {
        match body {
            CommandBody::Text(text) => {
                let trimmed = text.trim();
                if trimmed == "stop" {
                    self.emit(Pending::Stop);
                    return Ok(false);
                }
                if trimmed.starts_with("stop") {
                    return Err(CompileError::InvalidSpecialCommand { node: self.name.clone(), command: trimmed.to_string() });
                }
                if trimmed == "shuffleNextOptions" {
                    self.emit(Pending::PushBool(true));
                    self.emit(Pending::StoreVariable(SHUFFLE_OPTIONS_VAR.to_string()));
                    self.emit(Pending::Pop);
                    self.pending_shuffle_reset = true;
                    return Ok(false);
                }
                if trimmed.starts_with("shuffleNextOptions") {
                    return Err(CompileError::InvalidSpecialCommand { node: self.name.clone(), command: trimmed.to_string() });
                }
                self.emit(Pending::RunCommand(text.clone()));
                Ok(false)
            }
            CommandBody::Expression(expr) => {
                self.lower_expression(expr)?;
                self.emit(Pending::Pop);
                Ok(false)
            }
        }
    }

    fn lower_assignment(&mut self, name: &str, op: &AssignOp, value: &Expression) -> Result<(), CompileError> {
        if let Some(operator) = compound_operator(op) {
            self.emit(Pending::PushVariable(name.to_string()));
            self.lower_expression(value)?;
            self.emit(Pending::CallFunc(operator.fn_name().to_string()));
        } else {
            self.lower_expression(value)?;
        }
        self.emit(Pending::StoreVariable(name.to_string()));
        self.emit(Pending::Pop);
        Ok(())
    }

    /// Each conditioned clause's body is always followed by an unconditional
    /// `JumpTo endif`, which would bypass the spec-described single `Pop` at
    /// `clauseEnd` on the taken branch and leave the condition value
    /// permanently on the stack. An extra `Pop` right after `JumpIfFalse`
    /// (covering the fallthrough/true path) keeps both paths balanced.
    fn lower_if(&mut self, clauses: &[Clause]) -> Result<bool, CompileError> {
        let endif = self.labels.next("endif");
        let mut ends_with_options = false;

        for clause in clauses {
            match &clause.expression {
                Some(condition) => {
                    let clause_end = self.labels.next("clauseEnd");
                    self.lower_expression(condition)?;
                    self.emit(Pending::JumpIfFalse(clause_end.clone()));
                    self.emit(Pending::Pop);
                    self.lower_statements(&clause.statements)?;
                    self.emit(Pending::JumpTo(endif.clone()));
                    self.emit(Pending::Label(clause_end));
                    self.emit(Pending::Pop);
                    ends_with_options = false;
                }
                None => {
                    ends_with_options = self.lower_statements(&clause.statements)?;
                }
            }
        }

        self.emit(Pending::Label(endif));
        Ok(ends_with_options)
    }

    fn lower_option(&mut self, label: &Option<String>, destination: &str, line_number: usize, tags: &[String]) -> Result<bool, CompileError> {
        match label {
            Some(text) => {
                let explicit_key = line_key_from_tags(tags);
                let key = self.strings.register(&self.name.clone(), text.clone(), explicit_key, line_number, true)?;
                self.emit(Pending::AddOption { key, destination: destination.to_string() });
                Ok(true)
            }
            None => {
                // Not localisable: this is a jump target, not player-visible
                // text, but `PushString` always resolves its operand through
                // the string table (spec §4.4), so the destination still
                // needs a key.
                let key = self.strings.register(&self.name.clone(), destination.to_string(), None, line_number, false)?;
                self.emit(Pending::PushString(key));
                self.emit(Pending::RunNode);
                Ok(false)
            }
        }
    }

    fn lower_shortcut_group(&mut self, options: &[ShortcutOption]) -> Result<(), CompileError> {
        let group_end = self.labels.next("groupEnd");
        let mut option_labels = Vec::with_capacity(options.len());

        for option in options {
            let option_label = self.labels.next("option");
            let explicit_key = line_key_from_tags(&option.tags);
            let key = self.strings.register(&self.name.clone(), option.label.clone(), explicit_key, option.line_number, true)?;

            if let Some(condition) = &option.condition {
                let conditional = self.labels.next("conditional");
                self.lower_expression(condition)?;
                self.emit(Pending::JumpIfFalse(conditional.clone()));
                self.emit(Pending::AddOption { key, destination: option_label.clone() });
                self.emit(Pending::Label(conditional));
                self.emit(Pending::Pop);
            } else {
                self.emit(Pending::AddOption { key, destination: option_label.clone() });
            }
            option_labels.push(option_label);
        }

        self.emit_show_options();
        self.emit(Pending::Jump);

        for (option, option_label) in options.iter().zip(option_labels) {
            self.emit(Pending::Label(option_label));
            self.lower_statements(&option.statements)?;
            self.emit(Pending::JumpTo(group_end.clone()));
        }

        self.emit(Pending::Label(group_end));
        self.emit(Pending::Pop);
        Ok(())
    }

    fn lower_expression(&mut self, expr: &Expression) -> Result<(), CompileError> {
        match expr {
            Expression::Number(n) => self.emit(Pending::PushNumber(*n)),
            Expression::Bool(b) => self.emit(Pending::PushBool(*b)),
            Expression::Null => self.emit(Pending::PushNull),
            Expression::String(s) => {
                let key = self.strings.register(&self.name.clone(), s.clone(), None, 0, false)?;
                self.emit(Pending::PushString(key));
            }
            Expression::Variable(name) => self.emit(Pending::PushVariable(name.clone())),
            Expression::Group(inner) => self.lower_expression(inner)?,
            Expression::Unary { op, operand } => {
                self.lower_expression(operand)?;
                let fn_name = if matches!(op, Operator::Minus) { "UnaryMinus" } else { op.fn_name() };
                self.emit(Pending::CallFunc(fn_name.to_string()));
            }
            Expression::Binary { op, lhs, rhs } => {
                self.lower_expression(lhs)?;
                self.lower_expression(rhs)?;
                self.emit(Pending::CallFunc(op.fn_name().to_string()));
            }
            Expression::Call { name, args } => {
                for arg in args {
                    self.lower_expression(arg)?;
                }
                // Variadic calling convention: the argument count sits on
                // top of the stack, above the arguments themselves.
                self.emit(Pending::PushNumber(args.len() as f32));
                self.emit(Pending::CallFunc(name.clone()));
            }
        }
        Ok(())
    }

    fn resolve(self) -> Result<CompiledNode, CompileError> {
        let mut labels = LabelTable::new();
        for (index, instr) in self.instructions.iter().enumerate() {
            if let Pending::Label(name) = instr {
                labels.insert(name.clone(), index);
            }
        }

        let mut resolved = Vec::with_capacity(self.instructions.len());
        for instr in self.instructions {
            let final_instr = match instr {
                Pending::Label(name) => Instruction::Label(name),
                Pending::JumpTo(label) => Instruction::JumpTo(lookup(&labels, &self.name, &label)?),
                Pending::JumpIfFalse(label) => Instruction::JumpIfFalse(lookup(&labels, &self.name, &label)?),
                Pending::Jump => Instruction::Jump,
                Pending::RunLine(key) => Instruction::RunLine(key),
                Pending::RunCommand(text) => Instruction::RunCommand(text),
                Pending::AddOption { key, destination } => Instruction::AddOption { key, destination },
                Pending::ShowOptions => Instruction::ShowOptions,
                Pending::PushString(s) => Instruction::PushString(s),
                Pending::PushNumber(n) => Instruction::PushNumber(n),
                Pending::PushBool(b) => Instruction::PushBool(b),
                Pending::PushNull => Instruction::PushNull,
                Pending::PushVariable(name) => Instruction::PushVariable(name),
                Pending::StoreVariable(name) => Instruction::StoreVariable(name),
                Pending::Pop => Instruction::Pop,
                Pending::CallFunc(name) => Instruction::CallFunc(name),
                Pending::RunNode => Instruction::RunNode,
                Pending::Stop => Instruction::Stop,
            };
            resolved.push(final_instr);
        }

        Ok(CompiledNode { name: self.name, tags: Vec::new(), instructions: resolved, labels, source_text_string_id: None })
    }
}

fn lookup(labels: &LabelTable, node: &str, name: &str) -> Result<usize, CompileError> {
    labels.get(name).copied().ok_or_else(|| CompileError::UnresolvedLabel { node: node.to_string(), label: name.to_string() })
}

fn compound_operator(op: &AssignOp) -> Option<Operator> {
    match op {
        AssignOp::Assign => None,
        AssignOp::CompoundAdd => Some(Operator::Add),
        AssignOp::CompoundSubtract => Some(Operator::Minus),
        AssignOp::CompoundMultiply => Some(Operator::Multiply),
        AssignOp::CompoundDivide => Some(Operator::Divide),
    }
}

fn line_key_from_tags(tags: &[String]) -> Option<String> {
    tags.iter().find_map(|t| t.strip_prefix("line:").map(str::to_string))
}

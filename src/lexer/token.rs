//! # Token Types
//!
//! Defines all token types produced while tokenising a single node body.
//!
//! ## Token Structure
//!
//! Each token contains:
//! - `kind`: the token type (keyword, punctuation, literal, operator, ...)
//! - `lexeme`: the original text from source code
//! - `span`: location in the node body for error reporting
//! - `context`: which lexical mode produced it (text/command/expression/
//!   option/shortcut), per the grammar's mode-sensitive tokenisation

use crate::error::Span;

/// A single lexical token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
    pub context: LexMode,
}

/// The lexical mode active when a token was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexMode {
    /// Default mode inside a node body: runs of free text.
    Text,
    /// Between `<<` and `>>`.
    Command,
    /// Inside `{ }` inline, or after `if`/`set`/`elseif`.
    Expression,
    /// Inside `[[ ]]`.
    Option,
    /// A line starting with `->`.
    Shortcut,
}

/// Binary/unary operator tokens, named to match the `CallFunc` operand
/// strings the compiler emits (spec §4.2/§6) exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Minus,
    Multiply,
    Divide,
    Modulo,
    EqualTo,
    NotEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
    And,
    Or,
    Xor,
    Not,
}

impl Operator {
    /// The exact `CallFunc` operand name for this operator used as a
    /// binary/unary-appropriate call (see `UnaryMinus` special case in the
    /// parser — `Minus` is reused for both and disambiguated by arity).
    pub fn fn_name(&self) -> &'static str {
        match self {
            Operator::Add => "Add",
            Operator::Minus => "Minus",
            Operator::Multiply => "Multiply",
            Operator::Divide => "Divide",
            Operator::Modulo => "Modulo",
            Operator::EqualTo => "EqualTo",
            Operator::NotEqualTo => "NotEqualTo",
            Operator::GreaterThan => "GreaterThan",
            Operator::GreaterThanOrEqualTo => "GreaterThanOrEqualTo",
            Operator::LessThan => "LessThan",
            Operator::LessThanOrEqualTo => "LessThanOrEqualTo",
            Operator::And => "And",
            Operator::Or => "Or",
            Operator::Xor => "Xor",
            Operator::Not => "Not",
        }
    }
}

/// Token kinds for the dialogue scripting grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // === Text mode ===
    /// A run of free text inside a node body, up to a command/option/tag/EOL.
    Text(String),
    /// A trailing `#tag` attached to the preceding textual statement.
    HashTag(String),

    // === Structural punctuation ===
    CommandOpen,  // <<
    CommandClose, // >>
    OptionOpen,   // [[
    OptionClose,  // ]]
    Arrow,        // ->
    Pipe,         // |
    LParen,
    RParen,
    Comma,
    LBrace,
    RBrace,

    // === Keywords (command/expression mode) ===
    KwIf,
    KwElseIf,
    KwElse,
    KwEndIf,
    KwSet,
    KwTo,

    // === Literals ===
    Number(f32),
    Str(String),
    True,
    False,
    Null,

    // === Names ===
    Variable(String),   // $-prefixed
    Identifier(String),

    // === Operators & assignment ===
    Op(Operator),
    Assign,                    // '='
    CompoundAssign(Operator),  // '+=' etc

    Eof,
}

impl TokenKind {
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::KwIf
                | TokenKind::KwElseIf
                | TokenKind::KwElse
                | TokenKind::KwEndIf
                | TokenKind::KwSet
                | TokenKind::KwTo
        )
    }
}

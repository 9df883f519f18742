//! # Dialogue Parser
//!
//! Recursive descent over the statement grammar (spec grammar in the module
//! doc below), delegating to [`expr`] for Pratt-style expression parsing.
//!
//! ## Architecture
//!
//! The parser walks a flat token slice with an explicit cursor rather than
//! building a tree of sub-parsers per nesting level — blocks are just
//! sub-ranges of the same token stream, bounded either by an explicit
//! terminator token (`<<endif>>`) or, for shortcut option bodies, by a
//! drop in source-line indentation (tracked via each token's column, since
//! the lexer does not emit separate indent/dedent tokens).
//!
//! ```text
//! node      := statement*
//! statement := line | command | ifStmt | option | shortcutGroup | assignment | block
//! command   := '<<' (assignExpr | keyword | freeText) '>>'
//! ifStmt    := '<<if' expr '>>' block
//!              ( '<<elseif' expr '>>' block )*
//!              ( '<<else>>' block )?
//!              '<<endif>>'
//! option    := '[[' text ( '|' nodeName )? ']]'
//! shortcutGroup := ( '->' text ( '<<if' expr '>>' )? indentedBlock? )+
//! assignment := '<<set' '$'name op expr '>>'
//! ```

pub mod ast;
mod expr;


use crate::error::ParseError;
use crate::lexer::token::{Operator, Token, TokenKind};
use ast::{AssignOp, Clause, CommandBody, Expression, ShortcutOption, Statement};

pub struct ParseResult {
    pub statements: Vec<Statement>,
    pub errors: Vec<ParseError>,
}

#[must_use]
pub fn parse(node_name: &str, tokens: &[Token]) -> ParseResult {
    let mut parser = Parser { node_name, tokens, pos: 0, errors: Vec::new() };
    let statements = parser.parse_statements(StopAt::Never);
    ParseResult { statements, errors: parser.errors }
}

/// Block-termination condition for [`Parser::parse_statements`]. Kept as a
/// plain enum (rather than a closure) so the stop check can borrow `self`
/// immutably while the caller still holds a `&mut self` across the loop.
enum StopAt {
    Never,
    ClauseBoundary,
    ShortcutBody { group_col: usize, arrow_line: usize },
}

struct Parser<'a> {
    node_name: &'a str,
    tokens: &'a [Token],
    pos: usize,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn error_here(&self, token: String, expected: String, message: Option<String>) -> ParseError {
        ParseError { node: self.node_name.to_string(), span: self.peek().span, token, expected, message }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<Token, ParseError> {
        if std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!("{:?}", self.peek().kind), expected.into(), None))
        }
    }

    fn at_command_keyword(&self, kinds: &[TokenKind]) -> bool {
        matches!(self.peek().kind, TokenKind::CommandOpen)
            && kinds.iter().any(|k| std::mem::discriminant(&self.peek_at(1).kind) == std::mem::discriminant(k))
    }

    fn recover_to_next_statement(&mut self) {
        // Skip tokens until we hit something that plausibly starts a new
        // statement, so one bad construct doesn't cascade into spurious
        // errors for the rest of the node.
        while !self.is_eof() {
            match &self.peek().kind {
                TokenKind::Text(_) | TokenKind::Arrow | TokenKind::CommandOpen | TokenKind::OptionOpen => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn matches_stop(&self, stop: &StopAt) -> bool {
        match stop {
            StopAt::Never => false,
            StopAt::ClauseBoundary => {
                self.at_command_keyword(&[TokenKind::KwElseIf])
                    || self.at_command_keyword(&[TokenKind::KwElse])
                    || self.at_command_keyword(&[TokenKind::KwEndIf])
            }
            StopAt::ShortcutBody { group_col, arrow_line } => {
                let next = self.peek();
                (matches!(next.kind, TokenKind::Arrow) && next.span.column <= *group_col)
                    || (next.span.column <= *group_col && next.span.line > *arrow_line)
            }
        }
    }

    /// Parse statements until the stop condition matches, or EOF.
    fn parse_statements(&mut self, stop: StopAt) -> Vec<Statement> {
        let mut statements = Vec::new();
        while !self.is_eof() && !self.matches_stop(&stop) {
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.recover_to_next_statement();
                }
            }
        }
        statements
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match &self.peek().kind {
            TokenKind::Text(_) => self.parse_line(),
            TokenKind::HashTag(_) => self.parse_orphan_hashtag_line(),
            TokenKind::Arrow => self.parse_shortcut_group(),
            TokenKind::OptionOpen => self.parse_option(),
            TokenKind::CommandOpen if self.at_command_keyword(&[TokenKind::KwIf]) => self.parse_if(),
            TokenKind::CommandOpen if self.at_command_keyword(&[TokenKind::KwSet]) => self.parse_assignment(),
            TokenKind::CommandOpen => self.parse_custom_command(),
            other => Err(self.error_here(format!("{other:?}"), "a statement".into(), None)),
        }
    }

    fn collect_trailing_tags(&mut self) -> Vec<String> {
        let mut tags = Vec::new();
        while let TokenKind::HashTag(tag) = &self.peek().kind {
            tags.push(tag.clone());
            self.advance();
        }
        tags
    }

    fn parse_line(&mut self) -> Result<Statement, ParseError> {
        let tok = self.advance();
        let text = match tok.kind {
            TokenKind::Text(s) => s,
            _ => unreachable!("guarded by caller"),
        };
        let tags = self.collect_trailing_tags();
        Ok(Statement::Line { text, line_number: tok.span.line, tags })
    }

    fn parse_orphan_hashtag_line(&mut self) -> Result<Statement, ParseError> {
        let line_number = self.peek().span.line;
        let tags = self.collect_trailing_tags();
        Ok(Statement::Line { text: String::new(), line_number, tags })
    }

    fn parse_option(&mut self) -> Result<Statement, ParseError> {
        let open = self.expect(&TokenKind::OptionOpen, "'[['")?;
        let first = match &self.peek().kind {
            TokenKind::Text(s) => {
                let s = s.clone();
                self.advance();
                s
            }
            _ => String::new(),
        };

        let (label, destination) = if matches!(self.peek().kind, TokenKind::Pipe) {
            self.advance();
            let dest = match &self.peek().kind {
                TokenKind::Text(s) => {
                    let s = s.clone();
                    self.advance();
                    s
                }
                _ => return Err(self.error_here(format!("{:?}", self.peek().kind), "an option destination".into(), None)),
            };
            (Some(first), dest)
        } else {
            (None, first)
        };

        self.expect(&TokenKind::OptionClose, "']]'")?;
        let tags = self.collect_trailing_tags();
        Ok(Statement::OptionStatement { label, destination, line_number: open.span.line, tags })
    }

    fn parse_custom_command(&mut self) -> Result<Statement, ParseError> {
        let open = self.expect(&TokenKind::CommandOpen, "'<<'")?;
        let body = match &self.peek().kind {
            TokenKind::Text(raw) => {
                let raw = raw.clone();
                let body = try_parse_expression_text(self.node_name, &raw).map_or(CommandBody::Text(raw), CommandBody::Expression);
                self.advance();
                body
            }
            TokenKind::CommandClose => CommandBody::Text(String::new()),
            _ => {
                let expr = self.parse_expression()?;
                CommandBody::Expression(expr)
            }
        };
        self.expect(&TokenKind::CommandClose, "'>>'")?;
        Ok(Statement::CustomCommand { body, line_number: open.span.line })
    }

    fn parse_assignment(&mut self) -> Result<Statement, ParseError> {
        let open = self.expect(&TokenKind::CommandOpen, "'<<'")?;
        self.expect(&TokenKind::KwSet, "'set'")?;
        let name_tok = self.peek().clone();
        let name = match name_tok.kind {
            TokenKind::Variable(name) => {
                self.advance();
                name
            }
            _ => return Err(self.error_here(format!("{:?}", name_tok.kind), "a '$variable'".into(), None)),
        };

        let op = match &self.peek().kind {
            TokenKind::KwTo | TokenKind::Assign => {
                self.advance();
                AssignOp::Assign
            }
            TokenKind::CompoundAssign(Operator::Add) => {
                self.advance();
                AssignOp::CompoundAdd
            }
            TokenKind::CompoundAssign(Operator::Minus) => {
                self.advance();
                AssignOp::CompoundSubtract
            }
            TokenKind::CompoundAssign(Operator::Multiply) => {
                self.advance();
                AssignOp::CompoundMultiply
            }
            TokenKind::CompoundAssign(Operator::Divide) => {
                self.advance();
                AssignOp::CompoundDivide
            }
            other => return Err(self.error_here(format!("{other:?}"), "'to', '=', or a compound assignment operator".into(), None)),
        };

        let value = self.parse_expression()?;
        self.expect(&TokenKind::CommandClose, "'>>'")?;
        Ok(Statement::AssignmentStatement { name, op, value, line_number: open.span.line })
    }

    fn parse_if(&mut self) -> Result<Statement, ParseError> {
        let open = self.expect(&TokenKind::CommandOpen, "'<<'")?;
        self.expect(&TokenKind::KwIf, "'if'")?;
        let mut clauses = Vec::new();

        loop {
            let condition = self.parse_expression()?;
            self.expect(&TokenKind::CommandClose, "'>>'")?;
            let body = self.parse_statements(StopAt::ClauseBoundary);
            clauses.push(Clause { expression: Some(condition), statements: body });

            if self.at_command_keyword(&[TokenKind::KwElseIf]) {
                self.advance();
                self.advance();
                continue;
            }
            break;
        }

        if self.at_command_keyword(&[TokenKind::KwElse]) {
            self.advance();
            self.advance();
            self.expect(&TokenKind::CommandClose, "'>>'")?;
            let body = self.parse_statements(StopAt::ClauseBoundary);
            clauses.push(Clause { expression: None, statements: body });
        }

        if !self.at_command_keyword(&[TokenKind::KwEndIf]) {
            return Err(self.error_here(format!("{:?}", self.peek().kind), "'<<endif>>'".into(), None));
        }
        self.advance();
        self.advance();
        self.expect(&TokenKind::CommandClose, "'>>'")?;

        Ok(Statement::IfStatement { clauses, line_number: open.span.line })
    }

    fn parse_shortcut_group(&mut self) -> Result<Statement, ParseError> {
        let group_col = self.peek().span.column;
        let line_number = self.peek().span.line;
        let mut options = Vec::new();

        while matches!(self.peek().kind, TokenKind::Arrow) && self.peek().span.column == group_col {
            options.push(self.parse_shortcut_option(group_col)?);
        }

        Ok(Statement::ShortcutOptionGroup { options, line_number })
    }

    fn parse_shortcut_option(&mut self, group_col: usize) -> Result<ShortcutOption, ParseError> {
        let arrow = self.expect(&TokenKind::Arrow, "'->'")?;
        let text = match &self.peek().kind {
            TokenKind::Text(s) => {
                let s = s.trim().to_string();
                self.advance();
                s
            }
            _ => String::new(),
        };
        let tags = self.collect_trailing_tags();

        let condition = if self.at_command_keyword(&[TokenKind::KwIf]) {
            self.advance();
            self.advance();
            let expr = self.parse_expression()?;
            self.expect(&TokenKind::CommandClose, "'>>'")?;
            Some(expr)
        } else {
            None
        };

        let statements = self.parse_statements(StopAt::ShortcutBody { group_col, arrow_line: arrow.span.line });

        Ok(ShortcutOption { label: text, condition, statements, line_number: arrow.span.line, tags })
    }
}

/// Attempt to re-lex and parse a raw custom-command interior as a bare
/// expression. Used to decide whether `<<foo bar>>` is `RunCommand` text
/// or an expression whose value should be discarded.
fn try_parse_expression_text(node_name: &str, raw: &str) -> Option<Expression> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let body = vec![format!("<<if {trimmed}>>")];
    let lexed = crate::lexer::tokenize(node_name, &body);
    if !lexed.errors.is_empty() || lexed.tokens.len() < 4 {
        return None;
    }
    // Strip the synthetic `<<if ... >>` wrapper tokens, keeping the
    // trailing Eof so the sub-parser has a well-defined end.
    let mut inner: Vec<Token> = lexed.tokens[2..lexed.tokens.len() - 2].to_vec();
    inner.push(lexed.tokens.last().unwrap().clone());
    if inner.len() == 1 {
        return None;
    }
    let mut parser = Parser { node_name, tokens: &inner, pos: 0, errors: Vec::new() };
    match parser.parse_expression() {
        Ok(expr) if parser.is_eof() && parser.errors.is_empty() => Some(expr),
        _ => None,
    }
}

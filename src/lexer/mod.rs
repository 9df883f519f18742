//! # Dialogue Lexer
//!
//! Tokenises a single node body (an ordered array of source lines, as
//! produced by the loader) into a stream of [`Token`]s.
//!
//! ## Modes
//!
//! Tokenisation is mode-sensitive (spec §4.1): the lexer tracks a small
//! mode stack rather than running a single flat scanner —
//!
//! - **Text** (default): free-running dialogue text.
//! - **Command**: between `<<` and `>>`.
//! - **Expression**: inside `{ }` (an alternate grouping delimiter,
//!   equivalent to parens) or following an `if`/`elseif`/`set` keyword.
//! - **Option**: inside `[[ ]]`.
//! - **Shortcut**: a line starting with `->`.
//!
//! A custom command's interior (anything that isn't `if`/`elseif`/`else`/
//! `endif`/`set`) is captured as one raw [`TokenKind::Text`] token rather
//! than speculatively tokenised as an expression — the parser is the
//! layer that can actually decide "expression vs. free text" (by trying to
//! parse it as one and falling back), so the lexer just hands it the raw
//! interior verbatim.

pub mod cursor;
pub mod token;

#[cfg(test)]
mod tests;

use crate::error::{Span, TokeniserError};
use cursor::Cursor;
use token::{LexMode, Operator, Token, TokenKind};

pub struct LexResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<TokeniserError>,
}

#[must_use]
pub fn tokenize(node_name: &str, body: &[String]) -> LexResult {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (idx, raw_line) in body.iter().enumerate() {
        let line_number = idx + 1;
        let trimmed = raw_line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        lex_line(node_name, raw_line, line_number, &mut tokens, &mut errors);
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        lexeme: String::new(),
        span: Span::new(body.len() + 1, 1),
        context: LexMode::Text,
    });

    LexResult { tokens, errors }
}

fn lex_line(
    node_name: &str,
    line: &str,
    line_number: usize,
    tokens: &mut Vec<Token>,
    errors: &mut Vec<TokeniserError>,
) {
    let trimmed = line.trim_start();
    let leading_ws = line.len() - trimmed.len();
    let mut cursor = Cursor::new(line, line_number);
    for _ in 0..leading_ws.min(line.chars().count()) {
        cursor.advance();
    }

    let base_mode = if trimmed.starts_with("->") {
        cursor.advance();
        cursor.advance();
        tokens.push(Token {
            kind: TokenKind::Arrow,
            lexeme: "->".into(),
            span: cursor.make_span(cursor.current_pos().1),
            context: LexMode::Shortcut,
        });
        LexMode::Shortcut
    } else {
        LexMode::Text
    };

    lex_free_text_run(node_name, &mut cursor, base_mode, tokens, errors);
}

/// Scan a run of free text (Text or Shortcut mode), dispatching into
/// commands, options, and hash-tags as they're encountered, until EOL.
fn lex_free_text_run(
    node_name: &str,
    cursor: &mut Cursor,
    mode: LexMode,
    tokens: &mut Vec<Token>,
    errors: &mut Vec<TokeniserError>,
) {
    let mut text = String::new();
    let mut text_start_col = cursor.current_pos().1;
    let flush = |text: &mut String, start_col: usize, tokens: &mut Vec<Token>, cursor: &Cursor| {
        if !text.is_empty() {
            tokens.push(Token {
                kind: TokenKind::Text(std::mem::take(text)),
                lexeme: String::new(),
                span: cursor.make_span(start_col),
                context: mode,
            });
        }
    };

    loop {
        match (cursor.peek(), cursor.peek_at(1)) {
            (Some('<'), Some('<')) => {
                flush(&mut text, text_start_col, tokens, cursor);
                lex_command(node_name, cursor, mode, tokens, errors);
                text_start_col = cursor.current_pos().1;
            }
            (Some('['), Some('[')) => {
                flush(&mut text, text_start_col, tokens, cursor);
                lex_option(node_name, cursor, mode, tokens, errors);
                text_start_col = cursor.current_pos().1;
            }
            (Some('#'), _) if text.is_empty() || text.ends_with(' ') => {
                flush(&mut text, text_start_col, tokens, cursor);
                lex_hashtag(cursor, mode, tokens);
                text_start_col = cursor.current_pos().1;
            }
            (Some(c), _) => {
                text.push(c);
                cursor.advance();
            }
            (None, _) => {
                flush(&mut text, text_start_col, tokens, cursor);
                break;
            }
        }
    }
}

fn lex_hashtag(cursor: &mut Cursor, mode: LexMode, tokens: &mut Vec<Token>) {
    let start_col = cursor.current_pos().1;
    cursor.advance(); // '#'
    let mut tag = String::new();
    while matches!(cursor.peek(), Some(c) if !c.is_whitespace()) {
        tag.push(cursor.advance().unwrap());
    }
    tokens.push(Token {
        kind: TokenKind::HashTag(tag),
        lexeme: String::new(),
        span: cursor.make_span(start_col),
        context: mode,
    });
    while cursor.peek() == Some(' ') {
        cursor.advance();
    }
}

/// Lex `[[ text ('|' dest)? ]]`.
fn lex_option(
    node_name: &str,
    cursor: &mut Cursor,
    mode: LexMode,
    tokens: &mut Vec<Token>,
    errors: &mut Vec<TokeniserError>,
) {
    let start_col = cursor.current_pos().1;
    cursor.advance();
    cursor.advance(); // '[['
    tokens.push(Token {
        kind: TokenKind::OptionOpen,
        lexeme: "[[".into(),
        span: cursor.make_span(start_col),
        context: LexMode::Option,
    });

    let mut first = String::new();
    loop {
        match (cursor.peek(), cursor.peek_at(1)) {
            (Some(']'), Some(']')) | (Some('|'), _) | (None, _) => break,
            (Some(c), _) => {
                first.push(c);
                cursor.advance();
            }
        }
    }
    if !first.is_empty() {
        tokens.push(Token {
            kind: TokenKind::Text(first),
            lexeme: String::new(),
            span: cursor.make_span(start_col),
            context: LexMode::Option,
        });
    }

    if cursor.peek() == Some('|') {
        cursor.advance();
        tokens.push(Token {
            kind: TokenKind::Pipe,
            lexeme: "|".into(),
            span: cursor.make_span(cursor.current_pos().1),
            context: LexMode::Option,
        });
        let mut dest = String::new();
        loop {
            match (cursor.peek(), cursor.peek_at(1)) {
                (Some(']'), Some(']')) | (None, _) => break,
                (Some(c), _) => {
                    dest.push(c);
                    cursor.advance();
                }
            }
        }
        tokens.push(Token {
            kind: TokenKind::Text(dest.trim().to_string()),
            lexeme: String::new(),
            span: cursor.make_span(cursor.current_pos().1),
            context: LexMode::Option,
        });
    }

    if cursor.peek() == Some(']') && cursor.peek_at(1) == Some(']') {
        cursor.advance();
        cursor.advance();
        tokens.push(Token {
            kind: TokenKind::OptionClose,
            lexeme: "]]".into(),
            span: cursor.make_span(cursor.current_pos().1),
            context: LexMode::Option,
        });
    } else {
        errors.push(TokeniserError {
            node: node_name.to_string(),
            span: cursor.make_span(cursor.current_pos().1),
            message: "unterminated option: expected ']]'".into(),
        });
    }
}

/// Lex `<< ... >>`: dispatches to keyword-form (if/elseif/else/endif/set)
/// or captures a raw custom-command interior.
fn lex_command(
    node_name: &str,
    cursor: &mut Cursor,
    outer_mode: LexMode,
    tokens: &mut Vec<Token>,
    errors: &mut Vec<TokeniserError>,
) {
    let start_col = cursor.current_pos().1;
    cursor.advance();
    cursor.advance(); // '<<'
    tokens.push(Token {
        kind: TokenKind::CommandOpen,
        lexeme: "<<".into(),
        span: cursor.make_span(start_col),
        context: LexMode::Command,
    });

    while cursor.peek() == Some(' ') {
        cursor.advance();
    }

    let word_start = cursor.current_pos().1;
    let mut word = String::new();
    while matches!(cursor.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
        word.push(cursor.advance().unwrap());
    }

    let keyword_kind = match word.as_str() {
        "if" => Some(TokenKind::KwIf),
        "elseif" => Some(TokenKind::KwElseIf),
        "else" => Some(TokenKind::KwElse),
        "endif" => Some(TokenKind::KwEndIf),
        "set" => Some(TokenKind::KwSet),
        _ => None,
    };

    if let Some(kind) = keyword_kind {
        tokens.push(Token {
            kind,
            lexeme: word,
            span: cursor.make_span(word_start),
            context: LexMode::Command,
        });
        lex_expression_until_close(node_name, cursor, tokens, errors);
    } else {
        // Generic command: capture the raw interior (command name plus
        // whatever follows it) as a single Text token, rewinding to
        // before the word we spec­ulatively consumed.
        let mut interior = word;
        loop {
            match (cursor.peek(), cursor.peek_at(1)) {
                (Some('>'), Some('>')) | (None, _) => break,
                (Some(c), _) => {
                    interior.push(c);
                    cursor.advance();
                }
            }
        }
        let trimmed = interior.trim().to_string();
        if !trimmed.is_empty() {
            tokens.push(Token {
                kind: TokenKind::Text(trimmed),
                lexeme: String::new(),
                span: cursor.make_span(word_start),
                context: LexMode::Command,
            });
        }
    }

    if cursor.peek() == Some('>') && cursor.peek_at(1) == Some('>') {
        cursor.advance();
        cursor.advance();
        tokens.push(Token {
            kind: TokenKind::CommandClose,
            lexeme: ">>".into(),
            span: cursor.make_span(cursor.current_pos().1),
            context: outer_mode,
        });
    } else {
        errors.push(TokeniserError {
            node: node_name.to_string(),
            span: cursor.make_span(cursor.current_pos().1),
            message: "unterminated command: expected '>>'".into(),
        });
    }
}

/// Lex expression-mode tokens until (but not consuming) the command's
/// closing `>>`.
fn lex_expression_until_close(
    node_name: &str,
    cursor: &mut Cursor,
    tokens: &mut Vec<Token>,
    errors: &mut Vec<TokeniserError>,
) {
    loop {
        while matches!(cursor.peek(), Some(' ' | '\t')) {
            cursor.advance();
        }
        match (cursor.peek(), cursor.peek_at(1)) {
            (Some('>'), Some('>')) | (None, _) => return,
            _ => {}
        }
        match lex_expression_token(node_name, cursor) {
            Ok(Some(token)) => tokens.push(token),
            Ok(None) => {}
            Err(err) => {
                errors.push(err);
                cursor.advance();
            }
        }
    }
}

fn lex_expression_token(node_name: &str, cursor: &mut Cursor) -> Result<Option<Token>, TokeniserError> {
    let start_col = cursor.current_pos().1;
    let ch = match cursor.peek() {
        Some(c) => c,
        None => return Ok(None),
    };

    let tok = |kind: TokenKind, lexeme: &str, cursor: &Cursor| {
        Some(Token { kind, lexeme: lexeme.into(), span: cursor.make_span(start_col), context: LexMode::Expression })
    };

    match ch {
        '(' => {
            cursor.advance();
            Ok(tok(TokenKind::LParen, "(", cursor))
        }
        ')' => {
            cursor.advance();
            Ok(tok(TokenKind::RParen, ")", cursor))
        }
        '{' => {
            cursor.advance();
            Ok(tok(TokenKind::LBrace, "{", cursor))
        }
        '}' => {
            cursor.advance();
            Ok(tok(TokenKind::RBrace, "}", cursor))
        }
        ',' => {
            cursor.advance();
            Ok(tok(TokenKind::Comma, ",", cursor))
        }
        '"' => lex_string_literal(node_name, cursor, start_col),
        '$' => {
            cursor.advance();
            let mut name = String::new();
            while matches!(cursor.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
                name.push(cursor.advance().unwrap());
            }
            Ok(tok(TokenKind::Variable(name.clone()), &name, cursor))
        }
        '+' => {
            cursor.advance();
            if cursor.eat('=') {
                Ok(tok(TokenKind::CompoundAssign(Operator::Add), "+=", cursor))
            } else {
                Ok(tok(TokenKind::Op(Operator::Add), "+", cursor))
            }
        }
        '-' => {
            cursor.advance();
            if cursor.eat('=') {
                Ok(tok(TokenKind::CompoundAssign(Operator::Minus), "-=", cursor))
            } else {
                Ok(tok(TokenKind::Op(Operator::Minus), "-", cursor))
            }
        }
        '*' => {
            cursor.advance();
            if cursor.eat('=') {
                Ok(tok(TokenKind::CompoundAssign(Operator::Multiply), "*=", cursor))
            } else {
                Ok(tok(TokenKind::Op(Operator::Multiply), "*", cursor))
            }
        }
        '/' => {
            cursor.advance();
            if cursor.eat('=') {
                Ok(tok(TokenKind::CompoundAssign(Operator::Divide), "/=", cursor))
            } else {
                Ok(tok(TokenKind::Op(Operator::Divide), "/", cursor))
            }
        }
        '%' => {
            cursor.advance();
            Ok(tok(TokenKind::Op(Operator::Modulo), "%", cursor))
        }
        '^' => {
            cursor.advance();
            Ok(tok(TokenKind::Op(Operator::Xor), "^", cursor))
        }
        '=' => {
            cursor.advance();
            if cursor.eat('=') {
                Ok(tok(TokenKind::Op(Operator::EqualTo), "==", cursor))
            } else {
                Ok(tok(TokenKind::Assign, "=", cursor))
            }
        }
        '!' => {
            cursor.advance();
            if cursor.eat('=') {
                Ok(tok(TokenKind::Op(Operator::NotEqualTo), "!=", cursor))
            } else {
                Ok(tok(TokenKind::Op(Operator::Not), "!", cursor))
            }
        }
        '<' => {
            cursor.advance();
            if cursor.eat('=') {
                Ok(tok(TokenKind::Op(Operator::LessThanOrEqualTo), "<=", cursor))
            } else {
                Ok(tok(TokenKind::Op(Operator::LessThan), "<", cursor))
            }
        }
        '>' => {
            cursor.advance();
            if cursor.eat('=') {
                Ok(tok(TokenKind::Op(Operator::GreaterThanOrEqualTo), ">=", cursor))
            } else {
                Ok(tok(TokenKind::Op(Operator::GreaterThan), ">", cursor))
            }
        }
        '&' => {
            cursor.advance();
            cursor.eat('&');
            Ok(tok(TokenKind::Op(Operator::And), "&&", cursor))
        }
        '|' => {
            cursor.advance();
            cursor.eat('|');
            Ok(tok(TokenKind::Op(Operator::Or), "||", cursor))
        }
        c if c.is_ascii_digit() || (c == '.' && matches!(cursor.peek_at(1), Some(d) if d.is_ascii_digit())) => {
            lex_number(cursor, start_col)
        }
        c if c.is_alphabetic() || c == '_' => lex_identifier_or_keyword(cursor, start_col),
        other => {
            cursor.advance();
            Err(TokeniserError {
                node: node_name.to_string(),
                span: Span::new(cursor.current_pos().0, start_col),
                message: format!("unexpected character in expression: '{other}'"),
            })
        }
    }
}

fn lex_number(cursor: &mut Cursor, start_col: usize) -> Result<Option<Token>, TokeniserError> {
    let mut text = String::new();
    while matches!(cursor.peek(), Some(c) if c.is_ascii_digit()) {
        text.push(cursor.advance().unwrap());
    }
    if cursor.peek() == Some('.') && matches!(cursor.peek_at(1), Some(c) if c.is_ascii_digit()) {
        text.push(cursor.advance().unwrap());
        while matches!(cursor.peek(), Some(c) if c.is_ascii_digit()) {
            text.push(cursor.advance().unwrap());
        }
    }
    let value: f32 = text.parse().unwrap_or(0.0);
    Ok(Some(Token {
        kind: TokenKind::Number(value),
        lexeme: text,
        span: cursor.make_span(start_col),
        context: LexMode::Expression,
    }))
}

fn lex_identifier_or_keyword(cursor: &mut Cursor, start_col: usize) -> Result<Option<Token>, TokeniserError> {
    let mut text = String::new();
    while matches!(cursor.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
        text.push(cursor.advance().unwrap());
    }
    let kind = match text.as_str() {
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "null" => TokenKind::Null,
        "to" => TokenKind::KwTo,
        "and" => TokenKind::Op(Operator::And),
        "or" => TokenKind::Op(Operator::Or),
        "xor" => TokenKind::Op(Operator::Xor),
        "not" => TokenKind::Op(Operator::Not),
        _ => TokenKind::Identifier(text.clone()),
    };
    Ok(Some(Token { kind, lexeme: text, span: cursor.make_span(start_col), context: LexMode::Expression }))
}

fn lex_string_literal(
    node_name: &str,
    cursor: &mut Cursor,
    start_col: usize,
) -> Result<Option<Token>, TokeniserError> {
    cursor.advance(); // opening quote
    let mut text = String::new();
    loop {
        match cursor.peek() {
            None => {
                return Err(TokeniserError {
                    node: node_name.to_string(),
                    span: cursor.make_span(start_col),
                    message: "unterminated string literal".into(),
                })
            }
            Some('"') => {
                cursor.advance();
                break;
            }
            Some('\\') => {
                cursor.advance();
                match cursor.peek() {
                    Some('"') => {
                        text.push('"');
                        cursor.advance();
                    }
                    Some('\\') => {
                        text.push('\\');
                        cursor.advance();
                    }
                    _ => {
                        return Err(TokeniserError {
                            node: node_name.to_string(),
                            span: cursor.make_span(start_col),
                            message: "invalid escape sequence in string literal".into(),
                        })
                    }
                }
            }
            Some(c) => {
                text.push(c);
                cursor.advance();
            }
        }
    }
    Ok(Some(Token {
        kind: TokenKind::Str(text.clone()),
        lexeme: text,
        span: cursor.make_span(start_col),
        context: LexMode::Expression,
    }))
}

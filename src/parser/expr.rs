//! Expression parsing via Pratt precedence climbing.
//!
//! # Operator precedence (lowest to highest)
//!
//! | Level | Operators | Associativity |
//! |---|---|---|
//! | 1 | `or` / `\|\|` | Left |
//! | 2 | `xor` / `^` | Left |
//! | 3 | `and` / `&&` | Left |
//! | 4 | `==`, `!=` | Left |
//! | 5 | `<`, `<=`, `>`, `>=` | Left |
//! | 6 | `+`, `-` | Left |
//! | 7 | `*`, `/`, `%` | Left |
//! | 8 | unary `-`, `not`/`!` | n/a |

use crate::error::ParseError;
use crate::lexer::token::{Operator, TokenKind};

use super::ast::Expression;
use super::Parser;

#[doc(hidden)]
pub mod bp {
    pub const MIN: u8 = 0;
    pub const OR: u8 = 2;
    pub const XOR: u8 = 4;
    pub const AND: u8 = 6;
    pub const EQUALITY: u8 = 8;
    pub const RELATIONAL: u8 = 10;
    pub const ADDITIVE: u8 = 12;
    pub const MULTIPLICATIVE: u8 = 14;
    pub const UNARY: u8 = 16;
}

fn infix_binding_power(op: Operator) -> (u8, u8) {
    match op {
        Operator::Or => (bp::OR, bp::OR + 1),
        Operator::Xor => (bp::XOR, bp::XOR + 1),
        Operator::And => (bp::AND, bp::AND + 1),
        Operator::EqualTo | Operator::NotEqualTo => (bp::EQUALITY, bp::EQUALITY + 1),
        Operator::LessThan | Operator::LessThanOrEqualTo | Operator::GreaterThan | Operator::GreaterThanOrEqualTo => {
            (bp::RELATIONAL, bp::RELATIONAL + 1)
        }
        Operator::Add | Operator::Minus => (bp::ADDITIVE, bp::ADDITIVE + 1),
        Operator::Multiply | Operator::Divide | Operator::Modulo => (bp::MULTIPLICATIVE, bp::MULTIPLICATIVE + 1),
        Operator::Not => (bp::UNARY, bp::UNARY + 1),
    }
}

impl<'a> Parser<'a> {
    pub(super) fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_expression_bp(bp::MIN)
    }

    pub(super) fn parse_expression_bp(&mut self, min_bp: u8) -> Result<Expression, ParseError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let op = match self.peek_operator() {
                Some(op) => op,
                None => break,
            };
            let (left_bp, right_bp) = infix_binding_power(op);
            if left_bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_expression_bp(right_bp)?;
            lhs = Expression::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }

        Ok(lhs)
    }

    fn peek_operator(&self) -> Option<Operator> {
        match &self.peek().kind {
            TokenKind::Op(op) => Some(*op),
            _ => None,
        }
    }

    fn parse_prefix(&mut self) -> Result<Expression, ParseError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Op(Operator::Minus) => {
                self.advance();
                let operand = self.parse_expression_bp(bp::UNARY)?;
                Ok(Expression::Unary { op: Operator::Minus, operand: Box::new(operand) })
            }
            TokenKind::Op(Operator::Not) => {
                self.advance();
                let operand = self.parse_expression_bp(bp::UNARY)?;
                Ok(Expression::Unary { op: Operator::Not, operand: Box::new(operand) })
            }
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expression::Number(n))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expression::String(s))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Bool(false))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expression::Null)
            }
            TokenKind::Variable(name) => {
                self.advance();
                Ok(Expression::Variable(name))
            }
            TokenKind::LParen | TokenKind::LBrace => {
                let closing = if matches!(token.kind, TokenKind::LParen) { TokenKind::RParen } else { TokenKind::RBrace };
                self.advance();
                let inner = self.parse_expression_bp(bp::MIN)?;
                self.expect(&closing, "closing delimiter")?;
                Ok(Expression::Group(Box::new(inner)))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if matches!(self.peek().kind, TokenKind::LParen) {
                    self.advance();
                    let mut args = Vec::new();
                    if !matches!(self.peek().kind, TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expression_bp(bp::MIN)?);
                            if matches!(self.peek().kind, TokenKind::Comma) {
                                self.advance();
                                continue;
                            }
                            break;
                        }
                    }
                    self.expect(&TokenKind::RParen, "')'")?;
                    Ok(Expression::Call { name, args })
                } else {
                    Err(self.error_here(name, "a function call".into(), Some("bare identifiers are not valid expressions".into())))
                }
            }
            other => Err(self.error_here(format!("{other:?}"), "an expression".into(), None)),
        }
    }
}

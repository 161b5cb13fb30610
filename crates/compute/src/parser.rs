//! Recursive-descent parser from expression text to an [`OperationNode`] tree.
//!
//! Grammar, all binary operators left-associative:
//!
//! ```text
//! expr   := term   (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := NUMBER | '(' expr ')'
//! ```
//!
//! `NUMBER` may carry a leading `-` folded in by the lexer. Parsing is pure:
//! no ids are allocated and nothing is registered anywhere.

mod lexer;

use tally_core::Operator;

use crate::tree::OperationNode;
use lexer::{Token, TokenKind};

/// Upper bound on tokens in one expression.
pub const MAX_TOKENS: usize = 4096;
/// Upper bound on parenthesis nesting.
pub const MAX_NESTING: usize = 128;

const ADDITIVE: u8 = 1;
const MULTIPLICATIVE: u8 = 2;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("invalid number '{literal}' at position {pos}")]
    InvalidNumber { literal: String, pos: usize },
    #[error("unexpected '{found}' at position {pos}")]
    UnexpectedToken { found: String, pos: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unbalanced parenthesis at position {pos}")]
    UnbalancedParen { pos: usize },
    #[error("expression exceeds {limit} tokens")]
    TooLong { limit: usize },
    #[error("parentheses nested deeper than {limit}")]
    TooDeep { limit: usize },
}

/// Parse `input` into an operation tree.
pub fn parse(input: &str) -> Result<OperationNode, ParseError> {
    let tokens = lexer::tokenize(input, MAX_TOKENS)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut parser = Parser { tokens: &tokens, pos: 0, nesting: 0 };
    let root = parser.expr()?;

    match parser.peek() {
        None => Ok(root),
        Some(Token { kind: TokenKind::RParen, pos }) => Err(ParseError::UnbalancedParen { pos: *pos }),
        Some(tok) => Err(unexpected(tok)),
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    nesting: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// Consume the next token if it is an operator binding at `level`.
    fn eat_operator(&mut self, level: u8) -> Option<Operator> {
        match self.peek() {
            Some(Token { kind: TokenKind::Op(op), .. }) if op.precedence() == level => {
                self.pos += 1;
                Some(*op)
            }
            _ => None,
        }
    }

    fn expr(&mut self) -> Result<OperationNode, ParseError> {
        let mut node = self.term()?;
        while let Some(op) = self.eat_operator(ADDITIVE) {
            let rhs = self.term()?;
            node = OperationNode::internal(op, node, rhs);
        }
        Ok(node)
    }

    fn term(&mut self) -> Result<OperationNode, ParseError> {
        let mut node = self.factor()?;
        while let Some(op) = self.eat_operator(MULTIPLICATIVE) {
            let rhs = self.factor()?;
            node = OperationNode::internal(op, node, rhs);
        }
        Ok(node)
    }

    fn factor(&mut self) -> Result<OperationNode, ParseError> {
        let tok = self.next().ok_or(ParseError::UnexpectedEnd)?;
        match tok.kind {
            TokenKind::Number(v) => Ok(OperationNode::leaf(v)),
            TokenKind::LParen => {
                if self.nesting >= MAX_NESTING {
                    return Err(ParseError::TooDeep { limit: MAX_NESTING });
                }
                self.nesting += 1;
                let inner = self.expr();
                self.nesting -= 1;
                let inner = match inner {
                    Err(ParseError::UnexpectedEnd) => {
                        return Err(ParseError::UnbalancedParen { pos: tok.pos });
                    }
                    other => other?,
                };
                match self.next() {
                    Some(Token { kind: TokenKind::RParen, .. }) => Ok(inner),
                    Some(other) => Err(unexpected(other)),
                    None => Err(ParseError::UnbalancedParen { pos: tok.pos }),
                }
            }
            TokenKind::Op(_) | TokenKind::RParen => Err(unexpected(tok)),
        }
    }
}

fn unexpected(tok: &Token) -> ParseError {
    ParseError::UnexpectedToken { found: tok.kind.to_string(), pos: tok.pos }
}

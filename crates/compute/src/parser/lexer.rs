use tally_core::Operator;

use super::ParseError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum TokenKind {
    Number(f64),
    Op(Operator),
    LParen,
    RParen,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Number(v) => write!(f, "{}", v),
            TokenKind::Op(op) => write!(f, "{}", op),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub pos: usize,
}

/// Split `input` into tokens. Whitespace is skipped.
///
/// A `-` directly followed by a digit or `.` is folded into the literal when
/// it cannot be a binary operator: at the start of input, after another
/// operator, or after `(`.
pub(super) fn tokenize(input: &str, limit: usize) -> Result<Vec<Token>, ParseError> {
    let bytes = input.as_bytes();
    let mut tokens: Vec<Token> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if tokens.len() >= limit {
            return Err(ParseError::TooLong { limit });
        }

        let signed = c == b'-'
            && operand_expected(tokens.last())
            && bytes.get(i + 1).is_some_and(|n| n.is_ascii_digit() || *n == b'.');

        if c.is_ascii_digit() || c == b'.' || signed {
            let start = i;
            if signed {
                i += 1;
            }
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            let literal = &input[start..i];
            let invalid = || ParseError::InvalidNumber { literal: literal.to_string(), pos: start };
            let value: f64 = literal.parse().map_err(|_| invalid())?;
            // Too many digits overflow to infinity.
            if !value.is_finite() {
                return Err(invalid());
            }
            tokens.push(Token { kind: TokenKind::Number(value), pos: start });
            continue;
        }

        let kind = match c {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            _ => match Operator::from_symbol(c as char) {
                Some(op) => TokenKind::Op(op),
                None => {
                    // Report the full character, not a UTF-8 fragment.
                    let ch = input[i..].chars().next().unwrap_or('\u{FFFD}');
                    return Err(ParseError::UnexpectedChar { ch, pos: i });
                }
            },
        };
        tokens.push(Token { kind, pos: i });
        i += 1;
    }

    Ok(tokens)
}

fn operand_expected(prev: Option<&Token>) -> bool {
    match prev {
        None => true,
        Some(t) => matches!(t.kind, TokenKind::Op(_) | TokenKind::LParen),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input, 1024).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn numbers_operators_parens() {
        assert_eq!(
            kinds("(1.5 + 2) * 3"),
            vec![
                TokenKind::LParen,
                TokenKind::Number(1.5),
                TokenKind::Op(Operator::Add),
                TokenKind::Number(2.0),
                TokenKind::RParen,
                TokenKind::Op(Operator::Mul),
                TokenKind::Number(3.0),
            ]
        );
    }

    #[test]
    fn sign_folds_only_where_operand_expected() {
        assert_eq!(
            kinds("-5+3"),
            vec![TokenKind::Number(-5.0), TokenKind::Op(Operator::Add), TokenKind::Number(3.0)]
        );
        assert_eq!(
            kinds("2*-3"),
            vec![TokenKind::Number(2.0), TokenKind::Op(Operator::Mul), TokenKind::Number(-3.0)]
        );
        // After an operand, `-` is subtraction.
        assert_eq!(
            kinds("5-3"),
            vec![TokenKind::Number(5.0), TokenKind::Op(Operator::Sub), TokenKind::Number(3.0)]
        );
        // A sign in front of `(` is not folded.
        assert_eq!(kinds("-(1)")[0], TokenKind::Op(Operator::Sub));
    }

    #[test]
    fn positions_are_byte_offsets() {
        let toks = tokenize("  12 +x", 16);
        assert_eq!(toks, Err(ParseError::UnexpectedChar { ch: 'x', pos: 6 }));
        let toks = tokenize(" 12 + 3", 16).unwrap();
        assert_eq!(toks[0].pos, 1);
        assert_eq!(toks[1].pos, 4);
    }

    #[test]
    fn malformed_literal() {
        assert_eq!(
            tokenize("1.2.3", 16),
            Err(ParseError::InvalidNumber { literal: "1.2.3".into(), pos: 0 })
        );
        assert!(matches!(tokenize(".", 16), Err(ParseError::InvalidNumber { .. })));
    }

    #[test]
    fn overflowing_literal_rejected() {
        let huge = "9".repeat(400);
        assert_eq!(
            tokenize(&huge, 16),
            Err(ParseError::InvalidNumber { literal: huge.clone(), pos: 0 })
        );
        let negative = format!("1+-{}", huge);
        assert!(matches!(tokenize(&negative, 16), Err(ParseError::InvalidNumber { pos: 2, .. })));
    }

    #[test]
    fn token_limit() {
        assert_eq!(tokenize("1+1+1", 4), Err(ParseError::TooLong { limit: 4 }));
        assert!(tokenize("1+1", 3).is_ok());
    }
}

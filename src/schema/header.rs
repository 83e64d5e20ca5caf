//! C header front-end.
//!
//! Finds every `enum` declaration with a body and turns it into a
//! [`RawGroup`]. Everything else in the header is skipped.

use super::lexer::{Lexer, Token, TokenKind};
use super::{EnumKind, RawGroup, RawMember, RawValue, Schema, SchemaError};

pub fn parse_header(source: &str) -> Result<Schema, SchemaError> {
    let tokens = Lexer::new(source).tokenize();
    let mut parser = HeaderParser {
        source,
        tokens,
        pos: 0,
    };
    parser.parse()
}

struct HeaderParser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl HeaderParser<'_> {
    /// Next non-comment token, without consuming it.
    fn peek(&self) -> Option<&Token> {
        self.tokens[self.pos..]
            .iter()
            .find(|t| !matches!(t.kind, TokenKind::LineComment(_)))
    }

    fn advance(&mut self) -> Option<Token> {
        while let Some(tok) = self.tokens.get(self.pos) {
            self.pos += 1;
            if !matches!(tok.kind, TokenKind::LineComment(_)) {
                return Some(tok.clone());
            }
        }
        None
    }

    fn peek_is(&self, kind: &TokenKind) -> bool {
        self.peek().is_some_and(|t| &t.kind == kind)
    }

    fn current_line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    fn error(&self, message: impl Into<String>) -> SchemaError {
        SchemaError::Header {
            line: self.current_line(),
            message: message.into(),
        }
    }

    fn ident(&mut self) -> Option<String> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        }
    }

    /// A comment token sitting directly at `self.pos` on the given line.
    fn trailing_comment(&mut self, line: usize) -> Option<String> {
        match self.tokens.get(self.pos) {
            Some(Token {
                kind: TokenKind::LineComment(text),
                line: l,
                ..
            }) if *l == line => {
                let text = text.clone();
                self.pos += 1;
                Some(text)
            }
            _ => None,
        }
    }

    fn parse(&mut self) -> Result<Schema, SchemaError> {
        let mut schema = Schema::new();
        let mut brace_depth: usize = 0;

        while let Some(tok) = self.advance() {
            match tok.kind {
                TokenKind::Ident(ref kw) if kw == "enum" => {
                    if let Some(group) = self.parse_enum()? {
                        tracing::trace!(group = %group.name, members = group.members.len(), "header enum");
                        schema.add_group(group);
                    }
                }
                TokenKind::LBrace => brace_depth += 1,
                TokenKind::RBrace => {
                    brace_depth = brace_depth
                        .checked_sub(1)
                        .ok_or_else(|| self.error("unbalanced `}`"))?;
                }
                _ => {}
            }
        }

        if brace_depth != 0 {
            return Err(self.error("unexpected end of input: unclosed `{`"));
        }
        Ok(schema)
    }

    /// Parse after the `enum` keyword. Returns `None` for forward declarations,
    /// variable declarations and anonymous enums without a typedef name.
    fn parse_enum(&mut self) -> Result<Option<RawGroup>, SchemaError> {
        // C++ `enum class` / `enum struct`
        if let Some(TokenKind::Ident(kw)) = self.peek().map(|t| &t.kind) {
            if kw == "class" || kw == "struct" {
                self.advance();
            }
        }
        let tag = self.ident();

        let mut bit_width = 32;
        if self.peek_is(&TokenKind::Colon) {
            self.advance();
            // `std::uint8_t`, `unsigned int`
            loop {
                if let Some(name) = self.ident() {
                    if let Some(width) = width_of_type(&name) {
                        bit_width = width;
                    }
                } else if self.peek_is(&TokenKind::Colon) {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if !self.peek_is(&TokenKind::LBrace) {
            tracing::trace!(tag = ?tag, line = self.current_line(), "enum without body skipped");
            return Ok(None);
        }
        self.advance();

        let members = self.parse_enumerators()?;

        // `typedef enum Tag { ... } Alias;`
        let alias = self.ident();
        let Some(name) = tag.or(alias) else {
            return Ok(None);
        };

        let kind = if name.contains("FlagBits") {
            EnumKind::Bitmask
        } else {
            EnumKind::Plain
        };
        let needs_64 = members.iter().any(|m| match &m.value {
            RawValue::Literal { value, .. } => *value > u32::MAX as i128 || *value < i32::MIN as i128,
            _ => false,
        });
        if needs_64 {
            bit_width = 64;
        }

        Ok(Some(RawGroup {
            name,
            bit_width,
            kind,
            members,
        }))
    }

    fn parse_enumerators(&mut self) -> Result<Vec<RawMember>, SchemaError> {
        let mut members = Vec::new();

        loop {
            let Some(tok) = self.advance() else {
                return Err(self.error("unterminated enum body"));
            };
            let name = match tok.kind {
                TokenKind::RBrace => break,
                TokenKind::Comma => continue,
                TokenKind::Ident(name) => name,
                other => return Err(self.error(format!("unexpected token {other:?} in enum body"))),
            };
            let line = tok.line;

            let value = if self.peek_is(&TokenKind::Assign) {
                self.advance();
                self.parse_initializer()?
            } else {
                RawValue::Implicit
            };

            let mut comment = self.trailing_comment(line);
            let closes = self.peek_is(&TokenKind::RBrace);
            if self.peek_is(&TokenKind::Comma) {
                self.advance();
            } else if !closes {
                return Err(self.error(format!("expected `,` or `}}` after enumerator {name}")));
            }
            if comment.is_none() {
                comment = self.trailing_comment(line);
            }

            members.push(RawMember {
                name,
                value,
                comment,
            });
        }

        Ok(members)
    }

    /// Collect the tokens of one initializer (up to a top-level `,` or `}`)
    /// and classify them.
    fn parse_initializer(&mut self) -> Result<RawValue, SchemaError> {
        let mut expr: Vec<Token> = Vec::new();
        let mut depth = 0usize;

        loop {
            let Some(tok) = self.peek() else {
                return Err(self.error("unterminated enumerator initializer"));
            };
            match tok.kind {
                TokenKind::Comma | TokenKind::RBrace if depth == 0 => break,
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth = depth.saturating_sub(1),
                TokenKind::Semi | TokenKind::LBrace => {
                    return Err(self.error("unexpected token in enumerator initializer"));
                }
                _ => {}
            }
            if let Some(tok) = self.advance() {
                expr.push(tok);
            }
        }

        let (Some(first), Some(last)) = (expr.first(), expr.last()) else {
            return Err(self.error("empty enumerator initializer"));
        };
        let text = collapse_whitespace(&self.source[first.start..last.end]);

        if let [Token {
            kind: TokenKind::Ident(name),
            ..
        }] = expr.as_slice()
        {
            return Ok(RawValue::Reference(name.clone()));
        }

        let kinds: Vec<&TokenKind> = expr.iter().map(|t| &t.kind).collect();
        let mut eval = ConstEval { tokens: &kinds, pos: 0 };
        match eval.expr(0) {
            Some(value) if eval.pos == kinds.len() => Ok(RawValue::Literal { value, text }),
            _ => Ok(RawValue::Opaque(text)),
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn width_of_type(name: &str) -> Option<u32> {
    match name {
        "uint8_t" | "int8_t" | "char" => Some(8),
        "uint16_t" | "int16_t" | "short" => Some(16),
        "uint32_t" | "int32_t" | "int" => Some(32),
        "uint64_t" | "int64_t" => Some(64),
        _ => None,
    }
}

/// Precedence-climbing evaluator for integer constant expressions made only
/// of literals. Any identifier makes the expression unevaluable.
struct ConstEval<'t> {
    tokens: &'t [&'t TokenKind],
    pos: usize,
}

impl ConstEval<'_> {
    fn precedence(kind: &TokenKind) -> Option<u8> {
        Some(match kind {
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => 5,
            TokenKind::Plus | TokenKind::Minus => 4,
            TokenKind::Shl | TokenKind::Shr => 3,
            TokenKind::Amp => 2,
            TokenKind::Caret => 1,
            TokenKind::Pipe => 0,
            _ => return None,
        })
    }

    fn apply(kind: &TokenKind, a: i128, b: i128) -> Option<i128> {
        match kind {
            TokenKind::Star => a.checked_mul(b),
            TokenKind::Slash => a.checked_div(b),
            TokenKind::Percent => a.checked_rem(b),
            TokenKind::Plus => a.checked_add(b),
            TokenKind::Minus => a.checked_sub(b),
            TokenKind::Shl => a.checked_shl(u32::try_from(b).ok()?),
            TokenKind::Shr => a.checked_shr(u32::try_from(b).ok()?),
            TokenKind::Amp => Some(a & b),
            TokenKind::Caret => Some(a ^ b),
            TokenKind::Pipe => Some(a | b),
            _ => None,
        }
    }

    fn expr(&mut self, min_prec: u8) -> Option<i128> {
        let mut lhs = self.unary()?;
        while let Some(&kind) = self.tokens.get(self.pos) {
            let Some(prec) = Self::precedence(kind) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let rhs = self.expr(prec + 1)?;
            lhs = Self::apply(kind, lhs, rhs)?;
        }
        Some(lhs)
    }

    fn unary(&mut self) -> Option<i128> {
        let kind = *self.tokens.get(self.pos)?;
        self.pos += 1;
        match kind {
            TokenKind::Int(v) => Some(*v),
            TokenKind::Minus => self.unary()?.checked_neg(),
            TokenKind::Plus => self.unary(),
            TokenKind::Tilde => Some(!self.unary()?),
            TokenKind::LParen => {
                let v = self.expr(0)?;
                match self.tokens.get(self.pos) {
                    Some(TokenKind::RParen) => {
                        self.pos += 1;
                        Some(v)
                    }
                    _ => None,
                }
            }
            // Casts like `(int)` and identifiers are out of reach.
            _ => None,
        }
    }
}

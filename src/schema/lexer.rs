//! Tokenizer for the subset of C needed to find enum declarations.
//!
//! Preprocessor lines, block comments and string/char literals are skipped.
//! Line comments are kept as tokens so trailing member comments survive.

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Int(i128),
    LineComment(String),
    LBrace,
    RBrace,
    LParen,
    RParen,
    Semi,
    Comma,
    Colon,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Tilde,
    Pipe,
    Amp,
    Caret,
    Shl,
    Shr,
    /// Any other punctuation; only meaningful as "not part of an enum".
    Other(u8),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// 1-indexed source line.
    pub line: usize,
    /// Byte range into the source.
    pub start: usize,
    pub end: usize,
}

pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    /// True until a non-whitespace byte has been seen on the current line.
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            line: 1,
            at_line_start: true,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.at_line_start = true;
        }
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// Skip to the end of the line, honouring backslash continuations.
    fn skip_directive(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == b'\\' && self.peek_at(1) == Some(b'\n') {
                self.bump();
                self.bump();
                continue;
            }
            if ch == b'\n' {
                break;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        while let Some(ch) = self.bump() {
            if ch == b'*' && self.peek() == Some(b'/') {
                self.pos += 1;
                return;
            }
        }
    }

    fn skip_quoted(&mut self, quote: u8) {
        self.bump();
        while let Some(ch) = self.bump() {
            if ch == b'\\' {
                self.bump();
            } else if ch == quote || ch == b'\n' {
                return;
            }
        }
    }

    fn read_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.pos < self.input.len() && pred(self.input[self.pos]) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.input[start..self.pos]).unwrap_or("")
    }

    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            let Some(ch) = self.peek() else { break };
            let start = self.pos;
            let line = self.line;

            if ch == b'#' && self.at_line_start {
                self.skip_directive();
                continue;
            }
            self.at_line_start = false;

            let kind = match ch {
                b'/' if self.peek_at(1) == Some(b'/') => {
                    self.pos += 2;
                    let text = self.read_while(|c| c != b'\n');
                    TokenKind::LineComment(text.trim().to_string())
                }
                b'/' if self.peek_at(1) == Some(b'*') => {
                    self.skip_block_comment();
                    continue;
                }
                b'"' | b'\'' => {
                    self.skip_quoted(ch);
                    continue;
                }
                b'0'..=b'9' => {
                    let text = self.read_while(|c| c.is_ascii_alphanumeric());
                    match parse_int_literal(text) {
                        Some(v) => TokenKind::Int(v),
                        None => TokenKind::Other(b'0'),
                    }
                }
                c if c.is_ascii_alphabetic() || c == b'_' => {
                    let text = self.read_while(|c| c.is_ascii_alphanumeric() || c == b'_');
                    TokenKind::Ident(text.to_string())
                }
                b'<' if self.peek_at(1) == Some(b'<') => {
                    self.pos += 2;
                    TokenKind::Shl
                }
                b'>' if self.peek_at(1) == Some(b'>') => {
                    self.pos += 2;
                    TokenKind::Shr
                }
                _ => {
                    self.bump();
                    match ch {
                        b'{' => TokenKind::LBrace,
                        b'}' => TokenKind::RBrace,
                        b'(' => TokenKind::LParen,
                        b')' => TokenKind::RParen,
                        b';' => TokenKind::Semi,
                        b',' => TokenKind::Comma,
                        b':' => TokenKind::Colon,
                        b'=' => TokenKind::Assign,
                        b'+' => TokenKind::Plus,
                        b'-' => TokenKind::Minus,
                        b'*' => TokenKind::Star,
                        b'/' => TokenKind::Slash,
                        b'%' => TokenKind::Percent,
                        b'~' => TokenKind::Tilde,
                        b'|' => TokenKind::Pipe,
                        b'&' => TokenKind::Amp,
                        b'^' => TokenKind::Caret,
                        other => TokenKind::Other(other),
                    }
                }
            };

            tokens.push(Token {
                kind,
                line,
                start,
                end: self.pos,
            });
        }

        tokens
    }
}

/// Parse a C integer literal: decimal, `0x` hex, `0b` binary or leading-zero
/// octal, with any combination of `u`/`l` suffixes.
pub fn parse_int_literal(text: &str) -> Option<i128> {
    let digits = text.trim_end_matches(['u', 'U', 'l', 'L']);
    if digits.is_empty() {
        return None;
    }
    let (radix, body) = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (16, hex)
    } else if let Some(bin) = digits
        .strip_prefix("0b")
        .or_else(|| digits.strip_prefix("0B"))
    {
        (2, bin)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };
    i128::from_str_radix(body, radix).ok()
}

//! Line tokenizer for C++ headers.
//!
//! This is not a C++ lexer. It produces just enough structure for scope
//! tracking and declaration parsing: identifiers (with `::`-qualified paths
//! joined into one token), numbers, string/char literals, and single
//! punctuation characters. Comments produce no tokens; a `/* */` comment
//! may span lines, so the lexer keeps that one bit of state between calls.

use rpcgen_common::Span;

use crate::cursor::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// An identifier or a `::`-qualified path (`mulex::string32`, `::foo`).
    Ident,
    Number,
    /// A string or character literal, quotes included.
    Literal,
    Punct(char),
}

/// A token borrowed from the line it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
    /// Byte span within the line.
    pub span: Span,
}

impl Token<'_> {
    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }

    pub fn is_ident(&self, text: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == text
    }
}

/// Tokenizes a file one line at a time.
#[derive(Debug, Default)]
pub struct LineLexer {
    in_block_comment: bool,
}

impl LineLexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenize one line.
    pub fn tokenize<'src>(&mut self, line: &'src str) -> Vec<Token<'src>> {
        let mut cursor = Cursor::new(line);
        let mut tokens = Vec::new();

        loop {
            if self.in_block_comment && !self.skip_block_comment(&mut cursor) {
                break;
            }
            let Some(c) = cursor.peek() else { break };
            let start = cursor.pos();

            let kind = match c {
                c if c.is_whitespace() || c == BYTE_ORDER_MARK => {
                    cursor.advance();
                    continue;
                }
                '/' if cursor.peek_next() == Some('/') => {
                    cursor.eat_rest();
                    break;
                }
                '/' if cursor.peek_next() == Some('*') => {
                    cursor.advance();
                    cursor.advance();
                    self.in_block_comment = true;
                    continue;
                }
                '"' | '\'' => {
                    eat_literal(&mut cursor, c);
                    TokenKind::Literal
                }
                ':' if cursor.peek_next() == Some(':') => {
                    eat_path(&mut cursor);
                    TokenKind::Ident
                }
                c if is_ident_start(c) => {
                    eat_path(&mut cursor);
                    TokenKind::Ident
                }
                c if c.is_ascii_digit() => {
                    cursor.eat_while(|c| c.is_ascii_alphanumeric() || c == '.' || c == '\'');
                    TokenKind::Number
                }
                c => {
                    cursor.advance();
                    TokenKind::Punct(c)
                }
            };

            let end = cursor.pos();
            tokens.push(Token {
                kind,
                text: cursor.slice(start, end),
                span: Span::new(start, end),
            });
        }

        tokens
    }

    /// Consume through the closing `*/`. Returns false if the line ends first.
    fn skip_block_comment(&mut self, cursor: &mut Cursor<'_>) -> bool {
        while let Some(c) = cursor.advance() {
            if c == '*' && cursor.peek() == Some('/') {
                cursor.advance();
                self.in_block_comment = false;
                return true;
            }
        }
        false
    }
}

/// Editors may save a header with a leading BOM; it separates tokens like
/// whitespace.
const BYTE_ORDER_MARK: char = '\u{feff}';

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Consume `ident(::ident)*`, optionally starting with `::`.
fn eat_path(cursor: &mut Cursor<'_>) {
    loop {
        if cursor.peek() == Some(':') && cursor.peek_next() == Some(':') {
            cursor.advance();
            cursor.advance();
        }
        match cursor.peek() {
            Some(c) if is_ident_start(c) => cursor.eat_while(is_ident_continue),
            _ => return,
        }
        if !(cursor.peek() == Some(':') && cursor.peek_next() == Some(':')) {
            return;
        }
    }
}

/// Consume a quoted literal, honoring backslash escapes. An unterminated
/// literal runs to the end of the line.
fn eat_literal(cursor: &mut Cursor<'_>, quote: char) {
    cursor.advance();
    while let Some(c) = cursor.advance() {
        match c {
            '\\' => {
                cursor.advance();
            }
            c if c == quote => return,
            _ => {}
        }
    }
}

/// Whether `text` is a plain C++ identifier.
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if is_ident_start(c)) && chars.all(is_ident_continue)
}

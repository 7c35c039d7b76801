//! Scope-stack tracking over tokenized lines.
//!
//! The tracker is a small state machine: a running brace depth plus a stack
//! of named scopes, each remembering the depth at which it was introduced.
//! It recognizes one introduction per line, and only when the line starts
//! with `namespace`, `class` or `struct`. Everything else (function bodies,
//! `enum class`, initializer lists) only moves the depth counter.

use crate::lexer::{Token, TokenKind};

/// Keywords that introduce a named scope when they start a line.
const SCOPE_KEYWORDS: [&str; 3] = ["namespace", "class", "struct"];

/// A scope currently open.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OpenScope {
    /// Scope name; empty for an anonymous namespace. May itself be
    /// qualified (`namespace a::b {`).
    name: String,
    /// Brace depth the scope's body lives at.
    depth: u32,
}

#[derive(Debug, Default)]
pub struct ScopeTracker {
    stack: Vec<OpenScope>,
    depth: u32,
}

impl ScopeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one tokenized line.
    pub fn feed_line(&mut self, tokens: &[Token<'_>]) {
        if let Some(name) = scope_introduction(tokens) {
            tracing::trace!(scope = %name, depth = self.depth + 1, "open scope");
            self.stack.push(OpenScope {
                name,
                depth: self.depth + 1,
            });
        }

        for tok in tokens {
            match tok.kind {
                TokenKind::Punct('{') => self.depth += 1,
                TokenKind::Punct('}') => self.close_brace(),
                _ => {}
            }
        }
    }

    fn close_brace(&mut self) {
        if self.stack.last().is_some_and(|top| top.depth == self.depth) {
            self.stack.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Names of the open scopes, outermost first.
    pub fn names(&self) -> Vec<String> {
        self.stack.iter().map(|s| s.name.clone()).collect()
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }
}

/// Detect `namespace|class|struct [name]` at line start.
///
/// Returns `None` for forward declarations (`class Foo;`) and aliases
/// (`namespace fs = std::filesystem;`): anything terminated by `;` before a
/// `{` opens no scope.
fn scope_introduction(tokens: &[Token<'_>]) -> Option<String> {
    let (first, rest) = tokens.split_first()?;
    if first.kind != TokenKind::Ident || !SCOPE_KEYWORDS.contains(&first.text) {
        return None;
    }

    for tok in rest {
        if tok.is_punct('{') {
            break;
        }
        if tok.is_punct(';') {
            return None;
        }
    }

    let name = match rest.first() {
        Some(tok) if tok.kind == TokenKind::Ident => tok.text.to_string(),
        _ => String::new(),
    };
    Some(name)
}

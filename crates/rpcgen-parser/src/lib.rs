//! Scanner for marker-led RPC declarations in C++ headers.
//!
//! This is not a general C++ parser. Each file is read once, line by line:
//! the [`lexer`] tokenizes the line, the [`scope`] tracker updates the open
//! namespace/class/struct stack, and a line carrying the call marker is
//! handed to the [`decl`] grammar. The first error aborts the scan.
//!
//! Known limitations, kept on purpose:
//! - `using namespace` directives are not resolved; declarations must spell
//!   full type names.
//! - Only one scope introduction is recognized per line, and only at the
//!   start of the line.
//! - A marker line's scope is read after the whole line was consumed, so a
//!   scope opened and closed on that same line no longer qualifies it.

pub mod cursor;
pub mod decl;
pub mod lexer;
pub mod scope;

use std::path::Path;

use rpcgen_common::method::qualify;
use rpcgen_common::{DeclError, DeclErrorKind, LineIndex, Location, Method, Span};
use rpcgen_manifest::{Config, Manifest};

pub use decl::{parse_declaration, Declaration, Grammar};
pub use lexer::{LineLexer, Token, TokenKind};
pub use scope::ScopeTracker;

/// Everything a scan needs besides the source text.
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions<'a> {
    pub grammar: Grammar<'a>,
    /// Permission names are checked against this; without a manifest any
    /// permission list is an error.
    pub manifest: Option<&'a Manifest>,
}

impl<'a> ScanOptions<'a> {
    pub fn from_config(config: &'a Config, manifest: Option<&'a Manifest>) -> Self {
        Self {
            grammar: Grammar {
                call_marker: &config.markers.call,
                permission_marker: &config.markers.permission,
                generic_type: &config.generic.type_name,
            },
            manifest,
        }
    }
}

/// Scan one file's contents for declarations.
///
/// Methods come back in line order. `path` is only recorded, never read.
pub fn scan_source(
    path: &Path,
    source: &str,
    options: &ScanOptions<'_>,
) -> Result<Vec<Method>, DeclError> {
    let index = LineIndex::new(source);
    let mut lexer = LineLexer::new();
    let mut scopes = ScopeTracker::new();
    let mut methods = Vec::new();

    for (i, line) in source.lines().enumerate() {
        let tokens = lexer.tokenize(line);
        scopes.feed_line(&tokens);
        if !is_flagged(&tokens, options.grammar.call_marker) {
            continue;
        }

        let line_no = (i + 1) as u32;
        let base = index.line_start(i);
        let error = |kind: DeclErrorKind, span: Span| {
            DeclError::new(kind, path, line_no, line, span.offset(base))
        };

        let decl = parse_declaration(line, &tokens, &options.grammar)
            .map_err(|(kind, span)| error(kind, span))?;

        for (name, span) in &decl.permissions {
            let known = options
                .manifest
                .is_some_and(|m| m.permission_index(name).is_some());
            if !known {
                return Err(error(
                    DeclErrorKind::UnknownPermission { name: name.clone() },
                    *span,
                ));
            }
        }

        let full_name = qualify(&scopes.names(), &decl.name);
        tracing::info!(file = %path.display(), method = %full_name, "registering method");

        methods.push(Method {
            name: decl.name,
            full_name,
            return_type: decl.return_type,
            args: decl.args,
            permissions: decl.permissions.into_iter().map(|(name, _)| name).collect(),
            location: Location {
                file: path.to_path_buf(),
                line: line_no,
                span: decl.name_span.offset(base),
            },
        });
    }

    Ok(methods)
}

/// A line is a declaration candidate when the marker appears as a whole
/// token outside comments and the line is not a preprocessor directive.
fn is_flagged(tokens: &[Token<'_>], marker: &str) -> bool {
    match tokens.first() {
        None => false,
        Some(first) if first.is_punct('#') => false,
        Some(_) => tokens.iter().any(|t| t.is_ident(marker)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flagging_rules() {
        let mut lexer = LineLexer::new();
        let marker = "MX_RPC_METHOD";
        assert!(is_flagged(&lexer.tokenize("  MX_RPC_METHOD int f();"), marker));
        assert!(!is_flagged(&lexer.tokenize("// MX_RPC_METHOD int f();"), marker));
        assert!(!is_flagged(&lexer.tokenize("#ifndef MX_RPC_METHOD"), marker));
        assert!(!is_flagged(&lexer.tokenize("#define MX_RPC_METHOD"), marker));
        assert!(!is_flagged(&lexer.tokenize("int MX_RPC_METHODS();"), marker));
        assert!(!is_flagged(&lexer.tokenize("const char* s = \"MX_RPC_METHOD\";"), marker));
        assert!(!is_flagged(&lexer.tokenize(""), marker));
    }
}

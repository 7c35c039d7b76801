//! The method model shared by the scanner and the emitters.
//!
//! A [`Method`] is one marker-led declaration found in a scanned header:
//! its scope-qualified name, return type and ordered arguments, plus the
//! permission names the declaration requires. Types are classified once,
//! at parse time, into a [`TypeKind`] so every emission path can match on
//! it exhaustively instead of re-inspecting type text.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::span::Span;

/// Separator between scope segments in a fully-qualified name.
pub const SCOPE_SEPARATOR: &str = "::";

/// How a type travels across the dispatch buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "type")]
pub enum TypeKind {
    /// No value. Only valid as a return type.
    Void,
    /// The wildcard wire type: an 8-byte little-endian length followed by
    /// that many raw bytes.
    Generic,
    /// A fixed-width, trivially copyable type occupying `sizeof(T)` bytes.
    Trivial(String),
}

/// A return or argument type as written in the declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodType {
    /// The bare type: the last whitespace-separated token (`std::uint32_t`
    /// for `const std::uint32_t`).
    pub name: String,
    /// Every type token joined by single spaces, qualifiers included.
    pub full_name: String,
    pub kind: TypeKind,
}

impl MethodType {
    /// Classify a type from its whitespace-split tokens.
    ///
    /// `generic_type` is the configured wildcard type; a type is generic only
    /// when its full text equals it exactly.
    pub fn from_tokens(tokens: &[&str], generic_type: &str) -> MethodType {
        let full_name = tokens.join(" ");
        let name = tokens.last().copied().unwrap_or_default().to_string();
        let kind = if full_name == "void" {
            TypeKind::Void
        } else if full_name == generic_type {
            TypeKind::Generic
        } else {
            TypeKind::Trivial(full_name.clone())
        };
        MethodType {
            name,
            full_name,
            kind,
        }
    }

    /// Whether the type text carries a reference marker (`&` or `&&`).
    pub fn is_reference(&self) -> bool {
        self.full_name.contains('&')
    }

    /// Whether the type is already `const`-qualified.
    pub fn is_const(&self) -> bool {
        self.full_name.split_whitespace().any(|tok| tok == "const")
    }

    pub fn is_void(&self) -> bool {
        self.kind == TypeKind::Void
    }

    pub fn is_generic(&self) -> bool {
        self.kind == TypeKind::Generic
    }
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodArgument {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: MethodType,
}

/// Where a declaration was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: PathBuf,
    /// 1-based line number.
    pub line: u32,
    /// Byte span of the declaration's name within the file.
    pub span: Span,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// A remote-callable method discovered by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Method {
    /// The unqualified method name.
    pub name: String,
    /// `scope::name`, or just `name` at top scope.
    pub full_name: String,
    pub return_type: MethodType,
    pub args: Vec<MethodArgument>,
    /// Required permission names, in declaration order.
    pub permissions: Vec<String>,
    pub location: Location,
}

impl Method {
    /// The macro-style dispatch identifier for this method.
    pub fn identifier(&self, prefix: &str) -> String {
        dispatch_identifier(prefix, &self.full_name)
    }
}

/// Build the dispatch identifier for a fully-qualified name.
///
/// `mulex::RdbReadValueDirect` with prefix `RPC_CALL_` becomes
/// `RPC_CALL_MULEX_RDBREADVALUEDIRECT`.
pub fn dispatch_identifier(prefix: &str, full_name: &str) -> String {
    let mut ident = String::with_capacity(prefix.len() + full_name.len());
    ident.push_str(prefix);
    ident.push_str(&full_name.replace(SCOPE_SEPARATOR, "_").to_uppercase());
    ident
}

/// Join scope segments into a qualifier, skipping anonymous scopes.
pub fn qualify(scopes: &[String], name: &str) -> String {
    let mut parts: Vec<&str> = scopes
        .iter()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .collect();
    parts.push(name);
    parts.join(SCOPE_SEPARATOR)
}

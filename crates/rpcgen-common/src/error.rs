use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::method::Location;
use crate::span::Span;

/// A fatal error tied to one declaration line.
///
/// Every variant aborts the whole run; nothing is written once one of these
/// has been produced. The raw line text travels with the error so the
/// report can quote it even without re-reading the file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeclError {
    pub kind: DeclErrorKind,
    pub file: PathBuf,
    /// 1-based line number.
    pub line: u32,
    /// The offending line, without its trailing newline. Empty for errors
    /// raised after scanning, which only know the declaration's location.
    pub line_text: String,
    /// Byte span into the file of the token the error points at.
    pub span: Span,
}

impl DeclError {
    /// Create a new declaration error.
    pub fn new(
        kind: DeclErrorKind,
        file: impl Into<PathBuf>,
        line: u32,
        line_text: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            kind,
            file: file.into(),
            line,
            line_text: line_text.into(),
            span,
        }
    }

    /// Stable diagnostic code for this error's kind.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

/// The specific kind of declaration error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DeclErrorKind {
    /// The return type carries a reference marker.
    ReferenceReturnType { ty: String },
    /// A parameter type carries a reference marker.
    ReferenceArgumentType { arg: String, ty: String },
    /// A permission name is not declared in the loaded manifest.
    UnknownPermission { name: String },
    /// The line holds the call marker but does not match the declaration grammar.
    MalformedDeclaration { reason: String },
    /// Two declarations map to the same dispatch identifier.
    DuplicateMethod {
        identifier: String,
        name: String,
        first: Location,
    },
    /// More methods than a 16-bit dispatch id can address.
    TooManyMethods { count: usize },
}

impl DeclErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ReferenceReturnType { .. } | Self::ReferenceArgumentType { .. } => "R0001",
            Self::UnknownPermission { .. } => "R0002",
            Self::MalformedDeclaration { .. } => "R0003",
            Self::DuplicateMethod { .. } => "R0004",
            Self::TooManyMethods { .. } => "R0005",
        }
    }
}

impl fmt::Display for DeclErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReferenceReturnType { ty } => {
                write!(f, "return types can not be references (found `{ty}`)")
            }
            Self::ReferenceArgumentType { arg, ty } => write!(
                f,
                "parameter types can not be references (`{arg}` is `{ty}`)"
            ),
            Self::UnknownPermission { name } => {
                write!(f, "permission `{name}` is not declared in the manifest")
            }
            Self::MalformedDeclaration { reason } => {
                write!(f, "malformed RPC declaration: {reason}")
            }
            Self::DuplicateMethod {
                identifier,
                name,
                first,
            } => write!(
                f,
                "`{name}` maps to dispatch identifier {identifier}, already used at {first}"
            ),
            Self::TooManyMethods { count } => write!(
                f,
                "{count} RPC methods found, at most {} fit a 16-bit dispatch id",
                u16::MAX
            ),
        }
    }
}

impl fmt::Display for DeclError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file.display(), self.line, self.kind)?;
        let text = self.line_text.trim();
        if !text.is_empty() {
            write!(f, "\n\tat: {text}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DeclError {}

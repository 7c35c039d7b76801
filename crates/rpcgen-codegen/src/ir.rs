//! Wadler-Lindig emission tree for generated artifacts.
//!
//! Emitters build an `EmitIR` describing sections, blocks and statements;
//! the [`printer`](crate::printer) decides line breaks and indentation in a
//! single pass. Nothing in an emitter tracks columns or indentation itself.
//!
//! Indentation belongs to text, not to breaks: a line is indented by the
//! `Indent` depth of the first text printed on it. That is what lets
//! [`line`]s compose freely inside [`indent`].

/// A document node in the Wadler-Lindig style.
///
/// The printer decides at each `Group` boundary whether to render flat (all on
/// one line) or broken (with line breaks and indentation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitIR {
    /// Literal text to emit verbatim. Must not contain newlines.
    Text(String),
    /// A space in flat mode; a line break in broken mode.
    Space,
    /// Nothing in flat mode; a line break in broken mode.
    Softline,
    /// Always a line break, regardless of mode.
    Hardline,
    /// Increase indentation for the child by one level.
    Indent(Box<EmitIR>),
    /// Try to render the child flat (on one line). If it exceeds the remaining
    /// line width, render in broken mode instead.
    Group(Box<EmitIR>),
    /// A sequence of nodes rendered in order.
    Concat(Vec<EmitIR>),
    /// Produces no output.
    Empty,
}

// ── Helper constructors ─────────────────────────────────────────────────

pub fn text(s: impl Into<String>) -> EmitIR {
    EmitIR::Text(s.into())
}

pub fn space() -> EmitIR {
    EmitIR::Space
}

pub fn softline() -> EmitIR {
    EmitIR::Softline
}

pub fn hardline() -> EmitIR {
    EmitIR::Hardline
}

pub fn indent(ir: EmitIR) -> EmitIR {
    EmitIR::Indent(Box::new(ir))
}

pub fn group(ir: EmitIR) -> EmitIR {
    EmitIR::Group(Box::new(ir))
}

pub fn concat(parts: Vec<EmitIR>) -> EmitIR {
    EmitIR::Concat(parts)
}

// ── Structural helpers ──────────────────────────────────────────────────

/// One line of output: the text followed by a hard break.
pub fn line(s: impl Into<String>) -> EmitIR {
    concat(vec![text(s), hardline()])
}

/// A run of lines, each followed by a hard break.
pub fn lines<I, S>(items: I) -> EmitIR
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    concat(items.into_iter().map(line).collect())
}

/// An Allman-style block:
///
/// ```text
/// header
/// {
///     body
/// }<close_suffix>
/// ```
///
/// `body` is a run of [`line`]s; it is indented one level.
pub fn block(header: impl Into<String>, body: EmitIR, close_suffix: &str) -> EmitIR {
    concat(vec![line(header), braces(body, close_suffix)])
}

/// `{`, the indented body, then `}` followed by `close_suffix`.
pub fn braces(body: EmitIR, close_suffix: &str) -> EmitIR {
    concat(vec![
        line("{"),
        indent(body),
        line(format!("}}{close_suffix}")),
    ])
}

/// Join items with `sep` between them.
pub fn join(items: Vec<EmitIR>, sep: EmitIR) -> EmitIR {
    let mut parts = Vec::with_capacity(items.len() * 2);
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            parts.push(sep.clone());
        }
        parts.push(item);
    }
    concat(parts)
}

/// A call-like list: `open`, the items separated by `,`, then `close`.
///
/// Renders `f(a, b);` when it fits the line width, otherwise puts every
/// item on its own line one level deeper with `close` back at the outer
/// level.
pub fn call_list(open: impl Into<String>, items: Vec<EmitIR>, close: &str) -> EmitIR {
    if items.is_empty() {
        return concat(vec![text(open), text(close)]);
    }
    group(concat(vec![
        text(open),
        indent(concat(vec![
            softline(),
            join(items, concat(vec![text(","), space()])),
        ])),
        softline(),
        text(close),
    ]))
}

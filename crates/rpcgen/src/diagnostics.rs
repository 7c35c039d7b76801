//! Rendering of declaration errors.
//!
//! Human-readable reports go through ariadne with a label on the offending
//! token; `--json` prints one JSON object per diagnostic instead.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use rpcgen_common::{DeclError, DeclErrorKind};

/// Options controlling diagnostic output.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticOptions {
    pub color: bool,
    pub json: bool,
}

impl DiagnosticOptions {
    /// Plain text without ANSI colors, for tests and pipes.
    pub fn colorless() -> Self {
        Self {
            color: false,
            json: false,
        }
    }
}

/// Short label placed under the offending span.
fn label_message(kind: &DeclErrorKind) -> String {
    match kind {
        DeclErrorKind::ReferenceReturnType { .. } => "reference return type".to_string(),
        DeclErrorKind::ReferenceArgumentType { arg, .. } => {
            format!("`{arg}` is passed by reference")
        }
        DeclErrorKind::UnknownPermission { .. } => "not declared in the manifest".to_string(),
        DeclErrorKind::MalformedDeclaration { reason } => reason.clone(),
        DeclErrorKind::DuplicateMethod { first, .. } => format!("first declared at {first}"),
        DeclErrorKind::TooManyMethods { .. } => "no dispatch id left for this method".to_string(),
    }
}

fn help(kind: &DeclErrorKind) -> Option<&'static str> {
    match kind {
        DeclErrorKind::ReferenceReturnType { .. } | DeclErrorKind::ReferenceArgumentType { .. } => {
            Some("values cross the RPC buffer by copy; drop the `&` or use the generic type")
        }
        DeclErrorKind::UnknownPermission { .. } => {
            Some("add the permission to the manifest or fix its spelling")
        }
        DeclErrorKind::DuplicateMethod { .. } => {
            Some("dispatch identifiers must be unique across every scanned file")
        }
        _ => None,
    }
}

/// Clamp a span into `source`, never empty unless the source is.
fn clamp(start: usize, end: usize, source_len: usize) -> Range<usize> {
    let s = start.min(source_len);
    let e = end.min(source_len).max(s);
    if s == e {
        s..e.saturating_add(1).min(source_len)
    } else {
        s..e
    }
}

/// Render a declaration error as an ariadne report.
///
/// `source` is the full text of the file the error points into.
pub fn render_decl_error(error: &DeclError, source: &str, options: &DiagnosticOptions) -> String {
    let range = clamp(
        error.span.start as usize,
        error.span.end as usize,
        source.len(),
    );
    let config = Config::default().with_color(options.color);

    let mut builder = Report::build(ReportKind::Error, range.clone())
        .with_code(error.code())
        .with_message(format!("{}:{}: {}", error.file.display(), error.line, error.kind))
        .with_config(config)
        .with_label(
            Label::new(range)
                .with_message(label_message(&error.kind))
                .with_color(Color::Red),
        );
    if let Some(help) = help(&error.kind) {
        builder = builder.with_help(help);
    }

    let mut buf = Vec::new();
    match builder.finish().write(Source::from(source), &mut buf) {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        // The plain form still names file, line and offending text.
        Err(_) => format!("error[{}]: {}\n", error.code(), error),
    }
}

/// The JSON form of a declaration error.
pub fn decl_error_json(error: &DeclError) -> serde_json::Value {
    serde_json::json!({
        "code": error.code(),
        "severity": "error",
        "message": error.kind.to_string(),
        "file": error.file.display().to_string(),
        "line": error.line,
        "spans": [{
            "start": error.span.start,
            "end": error.span.end,
            "label": label_message(&error.kind)
        }],
        "fix": help(&error.kind)
    })
}

/// Print a declaration error to stderr in the configured format.
///
/// Without `source` the error is printed in its one-line form.
pub fn report_decl_error(error: &DeclError, source: Option<&str>, options: &DiagnosticOptions) {
    if options.json {
        eprintln!("{}", decl_error_json(error));
        return;
    }
    match source {
        Some(source) => eprint!("{}", render_decl_error(error, source, options)),
        None => eprintln!("error[{}]: {}", error.code(), error),
    }
}

/// Print a top-level failure that is not tied to a declaration.
pub fn report_failure(message: &str, options: &DiagnosticOptions) {
    if options.json {
        let msg = serde_json::json!({
            "code": "R0000",
            "severity": "error",
            "message": message,
            "file": "",
            "line": null,
            "spans": [],
            "fix": null
        });
        eprintln!("{}", msg);
    } else {
        eprintln!("error: {}", message);
    }
}

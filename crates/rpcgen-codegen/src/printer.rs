//! Wadler-Lindig printer for the emission tree.
//!
//! The printer converts an `EmitIR` tree into text by deciding at each
//! `Group` boundary whether to render flat (all on one line) or broken (with
//! line breaks). Indentation is written lazily, in front of the first text
//! of a line, so blank lines never carry trailing whitespace.

use crate::ir::EmitIR;

/// Layout settings for one artifact.
#[derive(Debug, Clone)]
pub struct EmitConfig {
    /// The text of one indentation level. Default: a tab.
    pub indent: String,
    /// Columns one indentation level counts for when measuring. Default: 4.
    pub indent_width: usize,
    /// Maximum line width before groups break. Default: 100.
    pub max_width: usize,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            indent: "\t".to_string(),
            indent_width: 4,
            max_width: 100,
        }
    }
}

impl EmitConfig {
    /// Indent with `n` spaces per level.
    pub fn spaces(n: usize) -> Self {
        Self {
            indent: " ".repeat(n),
            indent_width: n,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Flat,
    Break,
}

/// A command on the printer's work stack.
#[derive(Debug)]
struct PrintCmd<'a> {
    /// Indentation depth, in levels.
    indent: usize,
    mode: Mode,
    ir: &'a EmitIR,
}

/// Render an `EmitIR` tree as text.
///
/// Stack-based: at each `Group` the flat width of its contents is measured
/// against the remaining line; the group renders flat when it fits and broken
/// otherwise. The output always ends with a newline unless it is empty.
pub fn print(ir: &EmitIR, config: &EmitConfig) -> String {
    let mut out = String::new();
    let mut col: usize = 0;
    let mut at_line_start = true;
    let mut stack: Vec<PrintCmd> = vec![PrintCmd {
        indent: 0,
        mode: Mode::Break,
        ir,
    }];

    while let Some(cmd) = stack.pop() {
        match cmd.ir {
            EmitIR::Empty => {}

            EmitIR::Text(s) => {
                if s.is_empty() {
                    continue;
                }
                if at_line_start {
                    for _ in 0..cmd.indent {
                        out.push_str(&config.indent);
                    }
                    col = cmd.indent * config.indent_width;
                    at_line_start = false;
                }
                out.push_str(s);
                col += s.len();
            }

            EmitIR::Space if cmd.mode == Mode::Flat => {
                out.push(' ');
                col += 1;
            }

            EmitIR::Softline if cmd.mode == Mode::Flat => {}

            EmitIR::Space | EmitIR::Softline | EmitIR::Hardline => {
                out.push('\n');
                col = 0;
                at_line_start = true;
            }

            EmitIR::Indent(child) => {
                stack.push(PrintCmd {
                    indent: cmd.indent + 1,
                    mode: cmd.mode,
                    ir: child,
                });
            }

            EmitIR::Group(child) => {
                let start = if at_line_start {
                    cmd.indent * config.indent_width
                } else {
                    col
                };
                let flat_width = measure_flat(child);
                let mode = if start.saturating_add(flat_width) <= config.max_width {
                    Mode::Flat
                } else {
                    Mode::Break
                };
                stack.push(PrintCmd {
                    indent: cmd.indent,
                    mode,
                    ir: child,
                });
            }

            EmitIR::Concat(parts) => {
                // Reverse so the first part is popped first.
                for part in parts.iter().rev() {
                    stack.push(PrintCmd {
                        indent: cmd.indent,
                        mode: cmd.mode,
                        ir: part,
                    });
                }
            }
        }
    }

    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }

    out
}

/// Width of a node rendered flat.
///
/// `usize::MAX` when the node contains a `Hardline`, which can never fit
/// on a single line.
fn measure_flat(ir: &EmitIR) -> usize {
    match ir {
        EmitIR::Empty | EmitIR::Softline => 0,
        EmitIR::Text(s) => s.len(),
        EmitIR::Space => 1,
        EmitIR::Hardline => usize::MAX,
        EmitIR::Indent(child) | EmitIR::Group(child) => measure_flat(child),
        EmitIR::Concat(parts) => {
            let mut total: usize = 0;
            for part in parts {
                let w = measure_flat(part);
                if w == usize::MAX {
                    return usize::MAX;
                }
                total = total.saturating_add(w);
            }
            total
        }
    }
}

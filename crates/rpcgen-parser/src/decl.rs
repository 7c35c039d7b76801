//! The marker-led declaration grammar.
//!
//! ```text
//! CALL_MARKER [PERMISSION_MARKER(p1, p2, ...)] <return type tokens> name(<args>) [rest]
//! ```
//!
//! Types are split into words: runs of tokens with no gap between them, so
//! comments and whitespace both separate words and neither ends up in a
//! type. The last word of the head is the method name and everything before
//! it is the return type; within an argument the last word is the parameter
//! name. Spans in this module are relative to the line; the caller shifts
//! them into the file.

use rpcgen_common::{DeclErrorKind, MethodArgument, MethodType, Span, TypeKind};

use crate::lexer::{is_identifier, Token, TokenKind};

/// The configurable tokens of the grammar.
#[derive(Debug, Clone, Copy)]
pub struct Grammar<'a> {
    pub call_marker: &'a str,
    pub permission_marker: &'a str,
    pub generic_type: &'a str,
}

/// One parsed declaration, before scope qualification and permission checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub name_span: Span,
    pub return_type: MethodType,
    pub args: Vec<MethodArgument>,
    /// Required permission names with their spans.
    pub permissions: Vec<(String, Span)>,
}

/// A grammar or type error with the span it points at.
pub type DeclResult<T> = Result<T, (DeclErrorKind, Span)>;

fn malformed<T>(reason: impl Into<String>, span: Span) -> DeclResult<T> {
    Err((
        DeclErrorKind::MalformedDeclaration {
            reason: reason.into(),
        },
        span,
    ))
}

/// Parse a flagged line.
pub fn parse_declaration(
    line: &str,
    tokens: &[Token<'_>],
    grammar: &Grammar<'_>,
) -> DeclResult<Declaration> {
    let whole_line = Span::new(0, line.len() as u32);
    let Some(marker) = tokens.iter().position(|t| t.is_ident(grammar.call_marker)) else {
        return malformed(format!("missing `{}`", grammar.call_marker), whole_line);
    };
    // Only a statement or scope boundary may precede the marker
    // (`public: MARKER ...`, `namespace x { MARKER ...`).
    if marker > 0
        && !matches!(
            tokens[marker - 1].kind,
            TokenKind::Punct('{' | '}' | ';' | ':')
        )
    {
        return malformed(
            format!("`{}` must start the declaration", grammar.call_marker),
            tokens[marker].span,
        );
    }

    let mut pos = marker + 1;
    let mut permissions = Vec::new();
    if let Some(tok) = tokens.get(pos).filter(|t| t.is_ident(grammar.permission_marker)) {
        let open = pos + 1;
        if !tokens.get(open).is_some_and(|t| t.is_punct('(')) {
            return malformed(
                format!("expected `(` after `{}`", grammar.permission_marker),
                tok.span,
            );
        }
        let Some(close) = find_close(tokens, open) else {
            return malformed("unclosed permission list", tok.span);
        };
        let inner = &tokens[open + 1..close];
        if !inner.is_empty() {
            for (piece, span) in split_top_level(inner, tokens[close].span) {
                if piece.is_empty() {
                    return malformed("empty permission name", span);
                }
                permissions.push((slice(line, span).to_string(), span));
            }
        }
        pos = close + 1;
    }

    let Some(head_start) = tokens.get(pos).map(|t| t.span.start) else {
        return malformed("missing return type and method name", whole_line);
    };
    let Some(open) = tokens[pos..].iter().position(|t| t.is_punct('(')).map(|i| i + pos) else {
        return malformed("expected a parameter list", Span::new(head_start, whole_line.end));
    };
    let mut words = group_words(line, &tokens[pos..open]);
    let Some((raw_name, raw_name_span)) = words.pop() else {
        return malformed(
            "missing return type and method name",
            Span::new(head_start, tokens[open].span.end),
        );
    };
    let (prefix, name, name_span) = split_declarator(raw_name, raw_name_span);
    let mut type_words: Vec<&str> = words.iter().map(|(w, _)| *w).collect();
    if !prefix.is_empty() {
        type_words.push(prefix);
    }
    if type_words.is_empty() {
        return malformed(format!("`{name}` has no return type"), name_span);
    }
    if !is_identifier(name) {
        return malformed(format!("`{name}` is not a valid method name"), name_span);
    }

    let return_type = MethodType::from_tokens(&type_words, grammar.generic_type);
    let type_span = words
        .first()
        .map_or(name_span, |(_, s)| s.merge(words.last().map_or(*s, |(_, e)| *e)));
    if return_type.is_reference() {
        return Err((
            DeclErrorKind::ReferenceReturnType {
                ty: return_type.full_name,
            },
            if prefix.is_empty() { type_span } else { raw_name_span },
        ));
    }

    let Some(close) = find_close(tokens, open) else {
        return malformed("unclosed parameter list", tokens[open].span);
    };
    if tokens[close + 1..]
        .windows(2)
        .any(|w| w[0].is_punct('-') && w[1].is_punct('>'))
    {
        return malformed("trailing return types are not supported", name_span);
    }

    let args = parse_arguments(line, &tokens[open + 1..close], tokens[close].span, grammar)?;

    Ok(Declaration {
        name: name.to_string(),
        name_span,
        return_type,
        args,
        permissions,
    })
}

/// Parse the tokens between the parameter list's parentheses.
fn parse_arguments(
    line: &str,
    tokens: &[Token<'_>],
    close: Span,
    grammar: &Grammar<'_>,
) -> DeclResult<Vec<MethodArgument>> {
    match tokens {
        [] => return Ok(Vec::new()),
        [only] if only.is_ident("void") => return Ok(Vec::new()),
        _ => {}
    }

    let mut args = Vec::new();
    for (piece, span) in split_top_level(tokens, close) {
        if piece.is_empty() {
            return malformed("empty parameter", span);
        }
        let text = slice(line, span);
        if piece.iter().any(|t| t.is_punct('=')) {
            return malformed(
                format!("default arguments are not supported (`{text}`)"),
                span,
            );
        }
        let mut words = group_words(line, piece);
        if words.len() < 2 {
            return malformed(
                format!("parameter `{text}` needs a type and a name"),
                span,
            );
        }
        let Some((raw_name, raw_name_span)) = words.pop() else {
            return malformed("empty parameter", span);
        };
        let (prefix, name, name_span) = split_declarator(raw_name, raw_name_span);
        let mut type_words: Vec<&str> = words.iter().map(|(w, _)| *w).collect();
        if !prefix.is_empty() {
            type_words.push(prefix);
        }
        if !is_identifier(name) {
            return malformed(format!("`{name}` is not a valid parameter name"), name_span);
        }

        let ty = MethodType::from_tokens(&type_words, grammar.generic_type);
        if ty.is_reference() {
            return Err((
                DeclErrorKind::ReferenceArgumentType {
                    arg: name.to_string(),
                    ty: ty.full_name,
                },
                span,
            ));
        }
        if ty.kind == TypeKind::Void {
            return malformed(format!("parameter `{name}` can not be void"), span);
        }
        args.push(MethodArgument {
            name: name.to_string(),
            ty,
        });
    }
    Ok(args)
}

/// Index of the `)` matching the `(` at `open`.
fn find_close(tokens: &[Token<'_>], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate().skip(open) {
        if tok.is_punct('(') {
            depth += 1;
        } else if tok.is_punct(')') {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Split tokens at commas outside `<>`, `()`, `[]` and `{}`.
///
/// A piece's span runs from its first to its last token. An empty piece
/// takes the span of the token that ends it: the comma, or `end`.
fn split_top_level<'t, 'src>(
    tokens: &'t [Token<'src>],
    end: Span,
) -> Vec<(&'t [Token<'src>], Span)> {
    let mut pieces = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, tok) in tokens.iter().enumerate() {
        match tok.kind {
            TokenKind::Punct('<' | '(' | '[' | '{') => depth += 1,
            TokenKind::Punct('>' | ')' | ']' | '}') => depth -= 1,
            TokenKind::Punct(',') if depth == 0 => {
                pieces.push(piece(&tokens[start..i], tok.span));
                start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push(piece(&tokens[start..], end));
    pieces
}

fn piece<'t, 'src>(tokens: &'t [Token<'src>], boundary: Span) -> (&'t [Token<'src>], Span) {
    let span = match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => first.span.merge(last.span),
        _ => boundary,
    };
    (tokens, span)
}

/// Group tokens into words: maximal runs where each token starts exactly
/// where the previous one ended.
fn group_words<'a>(line: &'a str, tokens: &[Token<'_>]) -> Vec<(&'a str, Span)> {
    let mut words = Vec::new();
    let mut current: Option<Span> = None;
    for tok in tokens {
        current = match current {
            Some(span) if span.end == tok.span.start => Some(span.merge(tok.span)),
            Some(span) => {
                words.push((slice(line, span), span));
                Some(tok.span)
            }
            None => Some(tok.span),
        };
    }
    if let Some(span) = current {
        words.push((slice(line, span), span));
    }
    words
}

fn slice(line: &str, span: Span) -> &str {
    &line[span.start as usize..span.end as usize]
}

/// Peel `&`/`*` declarators glued to a name (`&x`, `*foo`) so they count
/// toward the type.
fn split_declarator(word: &str, span: Span) -> (&str, &str, Span) {
    let name = word.trim_start_matches(['&', '*']);
    let prefix_len = word.len() - name.len();
    (
        &word[..prefix_len],
        name,
        Span::new(span.start + prefix_len as u32, span.end),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::LineLexer;

    const GRAMMAR: Grammar<'static> = Grammar {
        call_marker: "MX_RPC_METHOD",
        permission_marker: "MX_RPC_PERMISSIONS",
        generic_type: "mulex::RPCGenericType",
    };

    fn parse(line: &str) -> DeclResult<Declaration> {
        let tokens = LineLexer::new().tokenize(line);
        parse_declaration(line, &tokens, &GRAMMAR)
    }

    fn reason(line: &str) -> String {
        match parse(line) {
            Err((DeclErrorKind::MalformedDeclaration { reason }, _)) => reason,
            other => panic!("expected malformed declaration, got {other:?}"),
        }
    }

    #[test]
    fn simple_declaration() {
        let decl = parse("MX_RPC_METHOD int foo(int x);").unwrap();
        assert_eq!(decl.name, "foo");
        assert_eq!(decl.name_span, Span::new(18, 21));
        assert_eq!(decl.return_type.full_name, "int");
        assert_eq!(decl.args.len(), 1);
        assert_eq!(decl.args[0].name, "x");
        assert_eq!(decl.args[0].ty.kind, TypeKind::Trivial("int".into()));
        assert!(decl.permissions.is_empty());
    }

    #[test]
    fn multi_word_types() {
        let decl =
            parse("\tMX_RPC_METHOD const mulex::string32 Echo(const std::uint64_t v0, mulex::RPCGenericType data);")
                .unwrap();
        assert_eq!(decl.return_type.full_name, "const mulex::string32");
        assert_eq!(decl.return_type.name, "mulex::string32");
        assert_eq!(decl.args[0].ty.full_name, "const std::uint64_t");
        assert!(decl.args[0].ty.is_const());
        assert_eq!(decl.args[1].ty.kind, TypeKind::Generic);
    }

    #[test]
    fn zero_arguments() {
        assert!(parse("MX_RPC_METHOD void RunStop();").unwrap().args.is_empty());
        assert!(parse("MX_RPC_METHOD void RunStop(void);").unwrap().args.is_empty());
        assert!(parse("MX_RPC_METHOD void RunStop(  );").unwrap().args.is_empty());
    }

    #[test]
    fn permission_list() {
        let line = "MX_RPC_METHOD MX_RPC_PERMISSIONS(read, rdb.write) bool Set(int v);";
        let decl = parse(line).unwrap();
        let names: Vec<&str> = decl.permissions.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["read", "rdb.write"]);
        let (_, span) = &decl.permissions[1];
        assert_eq!(&line[span.start as usize..span.end as usize], "rdb.write");
        assert_eq!(decl.return_type.full_name, "bool");
    }

    #[test]
    fn empty_permission_list_is_allowed() {
        let decl = parse("MX_RPC_METHOD MX_RPC_PERMISSIONS() void f();").unwrap();
        assert!(decl.permissions.is_empty());
    }

    #[test]
    fn template_arguments_keep_commas() {
        let decl = parse("MX_RPC_METHOD void f(std::pair<int, int> p, int q);").unwrap();
        assert_eq!(decl.args.len(), 2);
        assert_eq!(decl.args[0].ty.full_name, "std::pair<int, int>");
        assert_eq!(decl.args[0].ty.name, "int>");
    }

    #[test]
    fn inline_body_uses_matching_paren() {
        let decl = parse("MX_RPC_METHOD int f(int x) { return g(x); }").unwrap();
        assert_eq!(decl.args.len(), 1);
        assert_eq!(decl.args[0].name, "x");
    }

    #[test]
    fn trailing_comment_is_ignored() {
        let decl = parse("MX_RPC_METHOD int f(int x); // (int& y)").unwrap();
        assert_eq!(decl.args.len(), 1);
    }

    #[test]
    fn reference_return_rejected() {
        let line = "MX_RPC_METHOD int& foo();";
        let (kind, span) = parse(line).unwrap_err();
        assert_eq!(kind, DeclErrorKind::ReferenceReturnType { ty: "int&".into() });
        assert_eq!(&line[span.start as usize..span.end as usize], "int&");
    }

    #[test]
    fn glued_reference_return_rejected() {
        let (kind, _) = parse("MX_RPC_METHOD const std::string &name();").unwrap_err();
        assert_eq!(
            kind,
            DeclErrorKind::ReferenceReturnType {
                ty: "const std::string &".into()
            }
        );
    }

    #[test]
    fn reference_argument_rejected() {
        let line = "MX_RPC_METHOD int bar(int& x)";
        let (kind, span) = parse(line).unwrap_err();
        assert_eq!(
            kind,
            DeclErrorKind::ReferenceArgumentType {
                arg: "x".into(),
                ty: "int&".into()
            }
        );
        assert_eq!(&line[span.start as usize..span.end as usize], "int& x");
    }

    #[test]
    fn glued_reference_argument_rejected() {
        let (kind, _) = parse("MX_RPC_METHOD int bar(int &x);").unwrap_err();
        assert!(matches!(kind, DeclErrorKind::ReferenceArgumentType { .. }));
    }

    #[test]
    fn pointer_declarator_moves_to_type() {
        let decl = parse("MX_RPC_METHOD int *f(char *p);").unwrap();
        assert_eq!(decl.name, "f");
        assert_eq!(decl.return_type.full_name, "int *");
        assert_eq!(decl.args[0].ty.full_name, "char *");
    }

    #[test]
    fn malformed_lines() {
        assert!(reason("MX_RPC_METHOD").contains("missing return type"));
        assert!(reason("MX_RPC_METHOD int foo;").contains("parameter list"));
        assert!(reason("MX_RPC_METHOD foo();").contains("no return type"));
        assert!(reason("MX_RPC_METHOD int foo(int x;").contains("unclosed"));
        assert!(reason("MX_RPC_METHOD int foo(int);").contains("needs a type and a name"));
        assert!(reason("MX_RPC_METHOD int foo(int x = 3);").contains("default arguments"));
        assert!(reason("MX_RPC_METHOD int foo(int x,);").contains("empty parameter"));
        assert!(reason("MX_RPC_METHOD int foo(int x[4]);").contains("not a valid parameter name"));
        assert!(reason("MX_RPC_METHOD int foo(void v);").contains("can not be void"));
        assert!(reason("MX_RPC_METHOD auto foo() -> int;").contains("trailing return"));
        assert!(reason("static MX_RPC_METHOD int foo();").contains("must start"));
        assert!(reason("MX_RPC_METHOD MX_RPC_PERMISSIONS int foo();").contains("expected `(`"));
        assert!(reason("MX_RPC_METHOD MX_RPC_PERMISSIONS(a,) int foo();").contains("empty permission"));
    }

    #[test]
    fn marker_after_statement_boundary() {
        let decl = parse("public: MX_RPC_METHOD int f();").unwrap();
        assert_eq!(decl.name, "f");
        let decl = parse("namespace B { MX_RPC_METHOD void g(int a); }").unwrap();
        assert_eq!(decl.name, "g");
        assert_eq!(decl.args.len(), 1);
    }

    #[test]
    fn split_top_level_nests_template_arguments() {
        let line = "f( a , b<c, d> ,e)";
        let tokens = LineLexer::new().tokenize(line);
        let inner = &tokens[2..tokens.len() - 1];
        let pieces = split_top_level(inner, tokens[tokens.len() - 1].span);
        let got: Vec<&str> = pieces.iter().map(|(_, s)| slice(line, *s)).collect();
        assert_eq!(got, vec!["a", "b<c, d>", "e"]);
        assert_eq!(pieces[1].1, Span::new(7, 14));
        assert_eq!(pieces[1].0.len(), 6);
    }

    #[test]
    fn comments_are_not_part_of_types_or_names() {
        let decl = parse("MX_RPC_METHOD int f(int x /* count */);").unwrap();
        assert_eq!(decl.args[0].name, "x");
        assert_eq!(decl.args[0].ty.full_name, "int");

        let decl = parse("MX_RPC_METHOD int /* ret */ g(std::uint32_t /* ms */ timeout);").unwrap();
        assert_eq!(decl.return_type.full_name, "int");
        assert_eq!(decl.name, "g");
        assert_eq!(decl.args[0].ty.full_name, "std::uint32_t");
        assert_eq!(decl.args[0].name, "timeout");

        let decl = parse("MX_RPC_METHOD MX_RPC_PERMISSIONS(read /* r */, admin) void h();").unwrap();
        let names: Vec<&str> = decl.permissions.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["read", "admin"]);
    }
}

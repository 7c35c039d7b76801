//! The dispatch artifact: id constants, name lookup, name listing and the
//! switch that unmarshals an argument buffer and calls the target method.
//!
//! Argument buffer layout, in declaration order:
//! - a trivial argument occupies `sizeof(T)` bytes;
//! - a generic argument is an 8-byte length followed by that many bytes.
//!
//! The offset of argument `i` is `o{i}`; argument 0 sits at `args`. Offsets
//! are `constexpr` until the first generic argument, whose size is only known
//! at run time.

use rpcgen_common::{MethodArgument, TypeKind};
use rpcgen_manifest::config::GenericConfig;
use rpcgen_manifest::Config;

use crate::ids::{DispatchEntry, DispatchTable};
use crate::ir::*;
use crate::printer::{print, EmitConfig};
use crate::{cpp_string, GENERATED_BANNER};

/// Standard headers the generated code relies on.
const STD_INCLUDES: &[&str] = &[
    "<cstdint>",
    "<cstring>",
    "<new>",
    "<string>",
    "<type_traits>",
    "<unordered_map>",
    "<vector>",
];

const LENGTH_TYPE: &str = "std::uint64_t";

/// Render the dispatch artifact for a table.
pub fn render(table: &DispatchTable, config: &Config) -> String {
    print(&build(table, config), &EmitConfig::default())
}

fn build(table: &DispatchTable, config: &Config) -> EmitIR {
    concat(vec![
        line(GENERATED_BANNER),
        hardline(),
        includes(table, &config.dispatch.includes),
        id_constants(table),
        name_lookup(table),
        hardline(),
        name_listing(table),
        hardline(),
        call_locally(table, config),
    ])
}

// ── Preamble ────────────────────────────────────────────────────────────

fn includes(table: &DispatchTable, extra: &[String]) -> EmitIR {
    let mut parts: Vec<EmitIR> = STD_INCLUDES
        .iter()
        .map(|h| line(format!("#include {h}")))
        .collect();
    parts.extend(extra.iter().map(|h| line(format!("#include {h}"))));
    parts.push(hardline());

    let mut files: Vec<String> = table
        .iter()
        .map(|e| e.method.location.file.display().to_string())
        .collect();
    files.sort();
    files.dedup();
    if !files.is_empty() {
        parts.extend(files.iter().map(|f| line(format!("#include {}", cpp_string(f)))));
        parts.push(hardline());
    }
    concat(parts)
}

fn id_constants(table: &DispatchTable) -> EmitIR {
    if table.is_empty() {
        return EmitIR::Empty;
    }
    let mut parts: Vec<EmitIR> = table
        .iter()
        .map(|e| line(format!("#define {} {}", e.identifier, e.id)))
        .collect();
    parts.push(hardline());
    concat(parts)
}

// ── Name lookup and listing ─────────────────────────────────────────────

fn name_lookup(table: &DispatchTable) -> EmitIR {
    let entries = table
        .iter()
        .map(|e| line(format!("{{{}, {}}},", cpp_string(&e.method.full_name), e.id)));
    let body = concat(vec![
        line("static const std::unordered_map<std::string, std::uint16_t> _map = {"),
        indent(concat(entries.collect())),
        line("};"),
        line("auto it = _map.find(name);"),
        block("if(it != _map.end())", line("return it->second;"), ""),
        line("return static_cast<std::uint16_t>(-1);"),
    ]);
    anonymous_namespace(block(
        "std::uint16_t RPCGetMethodId(const std::string& name)",
        body,
        "",
    ))
}

fn name_listing(table: &DispatchTable) -> EmitIR {
    let entries = table.iter().map(|e| {
        concat(vec![
            line(format!("{},", cpp_string(&e.method.full_name))),
            line(format!("{},", cpp_string(&e.method.return_type.full_name))),
        ])
    });
    let body = concat(vec![
        line("static const std::vector<std::string> _list = {"),
        indent(concat(entries.collect())),
        line("};"),
        line("return _list;"),
    ]);
    anonymous_namespace(block("std::vector<std::string> RPCGetMethods()", body, ""))
}

// ── Local call dispatch ─────────────────────────────────────────────────

fn call_locally(table: &DispatchTable, config: &Config) -> EmitIR {
    let mut cases: Vec<EmitIR> = table
        .iter()
        .map(|e| dispatch_case(e, &config.generic))
        .collect();
    cases.push(line("default:"));
    cases.push(indent(line("break;")));

    let body = concat(vec![
        lines(config.dispatch.prologue.iter().map(String::as_str)),
        line("std::vector<std::uint8_t> retbuf;"),
        block("switch(pid)", concat(cases), ""),
        line("return retbuf;"),
    ]);
    anonymous_namespace(block(
        "std::vector<std::uint8_t> RPCCallLocally(std::uint16_t pid, const std::uint8_t* args)",
        body,
        "",
    ))
}

fn dispatch_case(entry: &DispatchEntry, generic: &GenericConfig) -> EmitIR {
    let method = &entry.method;
    let mut body = Vec::new();

    if let TypeKind::Trivial(ty) = &method.return_type.kind {
        body.push(line(trivially_copyable_assert(ty, "return")));
    }
    for arg in &method.args {
        if let TypeKind::Trivial(ty) = &arg.ty.kind {
            body.push(line(trivially_copyable_assert(ty, "parameter")));
        }
    }

    if !method.args.is_empty() {
        body.push(block("if(args == nullptr)", line("return {};"), ""));
    }
    body.extend(offsets(&method.args).into_iter().map(line));

    let args: Vec<EmitIR> = method
        .args
        .iter()
        .enumerate()
        .map(|(i, arg)| text(argument_expr(i, arg, generic)))
        .collect();
    let target = &method.full_name;

    match &method.return_type.kind {
        TypeKind::Void => {
            body.push(call_list(format!("{target}("), args, ");"));
            body.push(hardline());
        }
        TypeKind::Generic => {
            let payload = &generic.payload;
            body.push(call_list(
                format!("{} r = {target}(", generic.type_name),
                args,
                ");",
            ));
            body.push(hardline());
            body.push(lines([
                format!("{LENGTH_TYPE} data_size = r.{payload}.size();"),
                format!("retbuf.resize(data_size + sizeof({LENGTH_TYPE}));"),
                format!("std::memcpy(retbuf.data(), &data_size, sizeof({LENGTH_TYPE}));"),
                format!(
                    "std::memcpy(retbuf.data() + sizeof({LENGTH_TYPE}), r.{payload}.data(), data_size);"
                ),
            ]));
        }
        TypeKind::Trivial(ty) => {
            body.push(line(format!("retbuf.resize(sizeof({ty}));")));
            body.push(call_list(
                format!("::new(static_cast<void*>(retbuf.data())) {ty}({target}("),
                args,
                "));",
            ));
            body.push(hardline());
        }
    }
    body.push(line("break;"));

    concat(vec![
        line(format!("case {}:", entry.identifier)),
        braces(concat(body), ""),
    ])
}

fn trivially_copyable_assert(ty: &str, what: &str) -> String {
    let message = format!("RPC {what} type must be trivially copyable. But is of type: {ty}");
    format!(
        "static_assert(std::is_trivially_copyable_v<{ty}>, {});",
        cpp_string(&message)
    )
}

/// Offset declarations `o1..o{K-1}` for `K` arguments.
fn offsets(args: &[MethodArgument]) -> Vec<String> {
    let mut out = Vec::new();
    let mut runtime = false;
    for (i, prev) in args.iter().enumerate().take(args.len().saturating_sub(1)) {
        let n = i + 1;
        let base = if i == 0 { String::new() } else { format!("o{i} + ") };
        let size = if prev.ty.is_generic() {
            runtime = true;
            format!(
                "*reinterpret_cast<const {LENGTH_TYPE}*>({}) + sizeof({LENGTH_TYPE})",
                position(i)
            )
        } else {
            format!("sizeof({})", prev.ty.full_name)
        };
        let qualifier = if runtime { "const" } else { "constexpr" };
        out.push(format!("{qualifier} {LENGTH_TYPE} o{n} = {base}{size};"));
    }
    out
}

/// Where argument `i` starts in the buffer.
fn position(i: usize) -> String {
    if i == 0 {
        "args".to_string()
    } else {
        format!("args + o{i}")
    }
}

fn argument_expr(i: usize, arg: &MethodArgument, generic: &GenericConfig) -> String {
    let at = position(i);
    if arg.ty.is_generic() {
        format!(
            "{}::{}({at} + sizeof({LENGTH_TYPE}), *reinterpret_cast<const {LENGTH_TYPE}*>({at}))",
            generic.type_name, generic.from_data
        )
    } else {
        let constkw = if arg.ty.is_const() { "" } else { "const " };
        format!("*reinterpret_cast<{constkw}{}*>({at})", arg.ty.full_name)
    }
}

fn anonymous_namespace(body: EmitIR) -> EmitIR {
    block("namespace", body, "")
}

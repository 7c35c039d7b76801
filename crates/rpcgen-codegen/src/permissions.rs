//! The permission artifact: index constants, the role mask lookup and the
//! per-dispatch-id permission check.
//!
//! Masks use the manifest index of each permission as its bit, the same
//! index the SQL seed stores (1-based there).

use rpcgen_common::{DeclError, DeclErrorKind};
use rpcgen_manifest::{Manifest, PermissionMask, BYPASS_INDEX};

use crate::ids::{DispatchEntry, DispatchTable};
use crate::ir::*;
use crate::printer::{print, EmitConfig};
use crate::{cpp_string, GENERATED_BANNER};

/// Render the permission artifact.
///
/// Fails when a method requires a permission the manifest does not declare.
/// The scanner normally catches that first.
pub fn render(table: &DispatchTable, manifest: &Manifest) -> Result<String, DeclError> {
    let masks = method_masks(table, manifest)?;
    let ir = concat(vec![
        line(GENERATED_BANNER),
        line("#pragma once"),
        hardline(),
        lines(["#include <cstdint>", "#include <string>", "#include <unordered_map>"]),
        hardline(),
        constants(manifest),
        block(
            "namespace",
            concat(vec![
                mask_struct(),
                hardline(),
                role_lookup(manifest),
                hardline(),
                check_function(table, &masks, manifest),
            ]),
            "",
        ),
    ]);
    Ok(print(&ir, &EmitConfig::default()))
}

/// The required mask of every entry, in table order.
pub fn method_masks(
    table: &DispatchTable,
    manifest: &Manifest,
) -> Result<Vec<PermissionMask>, DeclError> {
    table
        .iter()
        .map(|entry| {
            manifest
                .mask_of(entry.method.permissions.iter().map(String::as_str))
                .map_err(|name| unknown_permission(entry, name))
        })
        .collect()
}

fn unknown_permission(entry: &DispatchEntry, name: &str) -> DeclError {
    let location = &entry.method.location;
    DeclError::new(
        DeclErrorKind::UnknownPermission {
            name: name.to_string(),
        },
        location.file.clone(),
        location.line,
        String::new(),
        location.span,
    )
}

fn constants(manifest: &Manifest) -> EmitIR {
    if manifest.permissions.is_empty() {
        return EmitIR::Empty;
    }
    concat(vec![
        lines(
            manifest
                .permissions
                .iter()
                .enumerate()
                .map(|(i, p)| format!("#define {} {i}", p.constant_name())),
        ),
        hardline(),
    ])
}

fn mask_struct() -> EmitIR {
    block(
        "struct RPCPermissionMask",
        lines(["std::uint64_t hi;", "std::uint64_t lo;"]),
        ";",
    )
}

fn role_lookup(manifest: &Manifest) -> EmitIR {
    let entries = manifest.roles.iter().map(|role| {
        let mask = role.mask();
        line(format!(
            "{{{}, {{{}, {}}}}},",
            cpp_string(&role.name),
            hex(mask.hi),
            hex(mask.lo)
        ))
    });
    let body = concat(vec![
        line("static const std::unordered_map<std::string, RPCPermissionMask> _map = {"),
        indent(concat(entries.collect())),
        line("};"),
        line("auto it = _map.find(role);"),
        block("if(it != _map.end())", line("return it->second;"), ""),
        line("return {0, 0};"),
    ]);
    block(
        "RPCPermissionMask RPCGetRoleMask(const std::string& role)",
        body,
        "",
    )
}

fn check_function(table: &DispatchTable, masks: &[PermissionMask], manifest: &Manifest) -> EmitIR {
    let mut body = Vec::new();
    if let Some(bypass) = manifest.bypass() {
        body.push(line(format!("// {} overrides every check", bypass.name)));
        body.push(block(
            format!("if((lo & (1ULL << {})) != 0)", bypass.constant_name()),
            line("return true;"),
            "",
        ));
    }

    let mut cases = Vec::new();
    for (entry, mask) in table.iter().zip(masks) {
        cases.push(line(format!("case {}: // {}", entry.id, entry.identifier)));
        let test = if mask.is_empty() {
            "return true;".to_string()
        } else {
            format!(
                "return (hi & {hi}) == {hi} && (lo & {lo}) == {lo};",
                hi = hex(mask.hi),
                lo = hex(mask.lo)
            )
        };
        cases.push(indent(line(test)));
    }
    cases.push(line("default:"));
    cases.push(indent(line("return false;")));
    body.push(block("switch(pid)", concat(cases), ""));

    block(
        "bool RPCCheckPermission(std::uint16_t pid, std::uint64_t hi, std::uint64_t lo)",
        concat(body),
        "",
    )
}

fn hex(value: u64) -> String {
    format!("{value:#018x}ULL")
}

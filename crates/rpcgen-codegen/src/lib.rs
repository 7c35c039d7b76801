//! Artifact generation for scanned RPC methods.
//!
//! [`generate`] assigns dispatch ids and renders every artifact into memory.
//! Nothing here touches the filesystem; the caller writes the results once
//! all of them rendered.

pub mod dispatch;
pub mod ids;
pub mod ir;
pub mod permissions;
pub mod printer;
pub mod sql;

use rpcgen_common::{DeclError, Method};
use rpcgen_manifest::{Config, Manifest};

pub use ids::{DispatchEntry, DispatchTable, MAX_METHODS};

/// First line of every generated C++ artifact.
pub const GENERATED_BANNER: &str = "// Generated by rpcgen. Do not modify.";

/// The rendered outputs of one run.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub table: DispatchTable,
    pub dispatch: String,
    /// Present when a manifest was loaded.
    pub permissions: Option<String>,
    /// Present when a manifest was loaded.
    pub sql: Option<String>,
}

/// Assign ids and render every artifact.
pub fn generate(
    methods: Vec<Method>,
    manifest: Option<&Manifest>,
    config: &Config,
) -> Result<Artifacts, DeclError> {
    let table = DispatchTable::assign(methods, &config.dispatch.id_prefix)?;
    tracing::info!(methods = table.len(), "assigned dispatch ids");

    let dispatch = dispatch::render(&table, config);
    let (permissions, sql) = match manifest {
        Some(manifest) => (
            Some(permissions::render(&table, manifest)?),
            Some(sql::render(manifest)),
        ),
        None => (None, None),
    };

    Ok(Artifacts {
        table,
        dispatch,
        permissions,
        sql,
    })
}

/// A C++ string literal.
pub(crate) fn cpp_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

//! The SQL seed artifact (SQLite dialect).
//!
//! Four relations: permissions, roles, the role-permission join and users.
//! Every seed row carries an explicit id equal to the 1-based manifest
//! position, so the ids always agree with the bit indices of the permission
//! artifact no matter how the database assigns row ids.

use rpcgen_manifest::Manifest;

use crate::ir::*;
use crate::printer::{print, EmitConfig};

/// Comment line opening the script.
const SQL_BANNER: &str = "-- Generated by rpcgen. Do not modify.";

/// A table: name, `(column, type and constraints)` pairs, then table
/// constraints.
type TableDef = (&'static str, &'static [(&'static str, &'static str)], &'static [&'static str]);

const TABLES: &[TableDef] = &[
    (
        "permissions",
        &[
            ("id", "INTEGER PRIMARY KEY"),
            ("name", "TEXT NOT NULL UNIQUE"),
            ("description", "TEXT NOT NULL DEFAULT ''"),
        ],
        &[],
    ),
    (
        "roles",
        &[
            ("id", "INTEGER PRIMARY KEY"),
            ("name", "TEXT NOT NULL UNIQUE"),
            ("description", "TEXT NOT NULL DEFAULT ''"),
        ],
        &[],
    ),
    (
        "role_permissions",
        &[
            ("role_id", "INTEGER NOT NULL"),
            ("permission_id", "INTEGER NOT NULL"),
        ],
        &[
            "PRIMARY KEY (role_id, permission_id)",
            "FOREIGN KEY (role_id) REFERENCES roles(id) ON DELETE CASCADE",
            "FOREIGN KEY (permission_id) REFERENCES permissions(id) ON DELETE CASCADE",
        ],
    ),
    (
        "users",
        &[
            ("id", "INTEGER PRIMARY KEY AUTOINCREMENT"),
            ("username", "TEXT NOT NULL UNIQUE"),
            ("salt", "BLOB NOT NULL"),
            ("passhash", "BLOB NOT NULL"),
            ("role_id", "INTEGER NOT NULL"),
            ("created_at", "TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP"),
        ],
        &["FOREIGN KEY (role_id) REFERENCES roles(id)"],
    ),
];

/// Render the schema and seed script for a manifest.
pub fn render(manifest: &Manifest) -> String {
    let mut parts = vec![
        line(SQL_BANNER),
        hardline(),
        line("PRAGMA foreign_keys = ON;"),
        hardline(),
        line("BEGIN TRANSACTION;"),
        hardline(),
    ];
    for (name, columns, constraints) in TABLES {
        parts.push(create_table(name, columns, constraints));
        parts.push(hardline());
    }

    parts.push(lines(manifest.permissions.iter().enumerate().map(|(i, p)| {
        insert(
            "permissions",
            &["id", "name", "description"],
            &[(i + 1).to_string(), quote_literal(&p.name), quote_literal(&p.description)],
        )
    })));
    parts.push(lines(manifest.roles.iter().enumerate().map(|(i, r)| {
        insert(
            "roles",
            &["id", "name", "description"],
            &[(i + 1).to_string(), quote_literal(&r.name), quote_literal(&r.description)],
        )
    })));
    parts.push(lines(manifest.roles.iter().enumerate().flat_map(|(i, r)| {
        r.permissions.iter().map(move |&p| {
            insert(
                "role_permissions",
                &["role_id", "permission_id"],
                &[(i + 1).to_string(), (p + 1).to_string()],
            )
        })
    })));

    parts.push(hardline());
    parts.push(line("COMMIT;"));
    print(&concat(parts), &EmitConfig::spaces(4))
}

fn create_table(name: &str, columns: &[(&str, &str)], constraints: &[&str]) -> EmitIR {
    let defs: Vec<String> = columns
        .iter()
        .map(|(column, def)| format!("{column} {def}"))
        .chain(constraints.iter().map(|c| c.to_string()))
        .collect();
    let last = defs.len().saturating_sub(1);
    let body = defs
        .into_iter()
        .enumerate()
        .map(|(i, d)| if i == last { line(d) } else { line(format!("{d},")) });
    concat(vec![
        line(format!("CREATE TABLE IF NOT EXISTS {name} (")),
        indent(concat(body.collect())),
        line(");"),
    ])
}

fn insert(table: &str, columns: &[&str], values: &[String]) -> String {
    format!(
        "INSERT INTO {table} ({}) VALUES ({});",
        columns.join(", "),
        values.join(", ")
    )
}

/// Quote a string literal, escaping embedded single quotes by doubling them.
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

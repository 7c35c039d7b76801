//! End-to-end generation from header text to rendered artifacts.

use std::path::Path;

use rpcgen_codegen::{generate, Artifacts};
use rpcgen_manifest::{Config, Manifest};
use rpcgen_parser::{scan_source, ScanOptions};

const HEADER: &str = "\
namespace mulex
{
\tMX_RPC_METHOD MX_RPC_PERMISSIONS(read, rdb.write) int Add(int a, int b);
\tMX_RPC_METHOD mulex::RPCGenericType Echo(mulex::RPCGenericType data, const std::uint32_t n);
}

MX_RPC_METHOD MX_RPC_PERMISSIONS(admin) void RunStop();
";

const MANIFEST: &str = r#"{
  "permissions": [
    {"name": "read", "description": "Read access"},
    {"name": "admin", "description": "Bypasses every check"},
    {"name": "rdb.write", "description": "Write the run's database"}
  ],
  "roles": [
    {"name": "viewer", "description": "Read only", "permissions": ["read"]},
    {"name": "operator", "permissions": ["read", "rdb.write"]},
    {"name": "root", "description": "Everything", "permissions": ["admin"]}
  ]
}"#;

fn config() -> Config {
    Config::from_str("[dispatch]\nprologue = [\"ZoneScoped;\"]\n").unwrap()
}

fn run(sources: &[(&str, &str)], manifest: Option<&Manifest>, config: &Config) -> Artifacts {
    let options = ScanOptions::from_config(config, manifest);
    let mut methods = Vec::new();
    for (path, source) in sources {
        methods.extend(scan_source(Path::new(path), source, &options).unwrap());
    }
    generate(methods, manifest, config).unwrap()
}

#[test]
fn dispatch_artifact_golden() {
    let manifest = Manifest::from_str(MANIFEST).unwrap();
    let artifacts = run(&[("/src/rpc.h", HEADER)], Some(&manifest), &config());
    assert_eq!(
        artifacts.dispatch,
        include_str!("fixtures/dispatch.expected.h")
    );
}

#[test]
fn permission_artifact_golden() {
    let manifest = Manifest::from_str(MANIFEST).unwrap();
    let artifacts = run(&[("/src/rpc.h", HEADER)], Some(&manifest), &config());
    assert_eq!(
        artifacts.permissions.as_deref(),
        Some(include_str!("fixtures/permissions.expected.h"))
    );
}

#[test]
fn output_is_independent_of_scan_order() {
    let a = ("/src/a.h", "MX_RPC_METHOD void Zeta();\nMX_RPC_METHOD void Alpha(int x);\n");
    let b = ("/src/b.h", "namespace n {\nMX_RPC_METHOD int Mid();\n}\n");
    let forward = run(&[a, b], None, &Config::default());
    let backward = run(&[b, a], None, &Config::default());
    assert_eq!(forward.dispatch, backward.dispatch);

    let ids: Vec<(u16, &str)> = forward
        .table
        .iter()
        .map(|e| (e.id, e.identifier.as_str()))
        .collect();
    assert_eq!(
        ids,
        vec![(0, "RPC_CALL_ALPHA"), (1, "RPC_CALL_N_MID"), (2, "RPC_CALL_ZETA")]
    );
    // Includes are sorted and listed once per file.
    let includes = "#include \"/src/a.h\"\n#include \"/src/b.h\"\n";
    assert!(forward.dispatch.contains(includes), "{}", forward.dispatch);
}

#[test]
fn zero_argument_method_has_no_offsets_or_guard() {
    let artifacts = run(&[("x.h", "MX_RPC_METHOD void Tick();\n")], None, &Config::default());
    let out = &artifacts.dispatch;
    assert!(!out.contains("std::uint64_t o1"));
    assert!(!out.contains("nullptr"));
    assert!(out.contains("\t\t\t\tTick();\n"));
}

#[test]
fn single_generic_argument_reads_its_length_first() {
    let src = "MX_RPC_METHOD void Push(mulex::RPCGenericType data);\n";
    let artifacts = run(&[("x.h", src)], None, &Config::default());
    let out = &artifacts.dispatch;
    assert!(out.contains(
        "\t\t\t\tPush(\n\t\t\t\t\tmulex::RPCGenericType::FromData(args + sizeof(std::uint64_t), *reinterpret_cast<const std::uint64_t*>(args))\n\t\t\t\t);\n"
    ), "{out}");
    assert!(!out.contains("o1"));
    assert!(!out.contains("static_assert"));
}

#[test]
fn offsets_turn_runtime_after_a_generic_argument() {
    let src = "MX_RPC_METHOD void Mixed(char a, mulex::RPCGenericType g, int b, int c);\n";
    let artifacts = run(&[("x.h", src)], None, &Config::default());
    let out = &artifacts.dispatch;
    assert!(out.contains("constexpr std::uint64_t o1 = sizeof(char);\n"));
    assert!(out.contains(
        "const std::uint64_t o2 = o1 + *reinterpret_cast<const std::uint64_t*>(args + o1) + sizeof(std::uint64_t);\n"
    ));
    assert!(out.contains("const std::uint64_t o3 = o2 + sizeof(int);\n"));
    assert!(!out.contains("o4"));
    assert!(out.contains("mulex::RPCGenericType::FromData(args + o1 + sizeof(std::uint64_t), *reinterpret_cast<const std::uint64_t*>(args + o1))"));
    assert!(out.contains("*reinterpret_cast<const int*>(args + o3)"));
}

#[test]
fn custom_generic_type() {
    let config = Config::from_str(
        "[generic]\ntype = \"net::Blob\"\nfrom_data = \"Wrap\"\npayload = \"bytes\"\n",
    )
    .unwrap();
    let src = "MX_RPC_METHOD net::Blob Get(net::Blob key);\n";
    let artifacts = run(&[("x.h", src)], None, &config);
    let out = &artifacts.dispatch;
    assert!(out.contains("net::Blob r = Get(\n"));
    assert!(out.contains("net::Blob::Wrap(args + sizeof(std::uint64_t), "));
    assert!(out.contains("std::uint64_t data_size = r.bytes.size();"));
}

#[test]
fn unknown_dispatch_id_falls_through_to_empty_result() {
    let artifacts = run(&[], None, &Config::default());
    let out = &artifacts.dispatch;
    assert!(out.contains("\t\tswitch(pid)\n\t\t{\n\t\t\tdefault:\n\t\t\t\tbreak;\n\t\t}\n\t\treturn retbuf;\n"));
    assert!(!out.contains("#define"));
    assert!(!out.contains("#include \""));
}

#[test]
fn sql_seed_mirrors_manifest_order() {
    let manifest = Manifest::from_str(MANIFEST).unwrap();
    let artifacts = run(&[("/src/rpc.h", HEADER)], Some(&manifest), &config());
    let sql = artifacts.sql.unwrap();

    assert!(sql.contains("INSERT INTO permissions (id, name, description) VALUES (1, 'read', 'Read access');"));
    assert!(sql.contains("VALUES (3, 'rdb.write', 'Write the run''s database');"));
    assert!(sql.contains("INSERT INTO roles (id, name, description) VALUES (2, 'operator', '');"));

    let joins: Vec<&str> = sql
        .lines()
        .filter(|l| l.starts_with("INSERT INTO role_permissions"))
        .collect();
    assert_eq!(joins.len(), 4);
    assert_eq!(
        joins,
        vec![
            "INSERT INTO role_permissions (role_id, permission_id) VALUES (1, 1);",
            "INSERT INTO role_permissions (role_id, permission_id) VALUES (2, 1);",
            "INSERT INTO role_permissions (role_id, permission_id) VALUES (2, 3);",
            "INSERT INTO role_permissions (role_id, permission_id) VALUES (3, 2);",
        ]
    );

    let permission_rows = sql.find("INSERT INTO permissions").unwrap();
    let role_rows = sql.find("INSERT INTO roles").unwrap();
    let join_rows = sql.find("INSERT INTO role_permissions").unwrap();
    assert!(permission_rows < role_rows && role_rows < join_rows);
}

#[test]
fn role_names_with_spaces_and_quotes_are_escaped() {
    let manifest = Manifest::from_str(
        r#"{
  "permissions": [{"name": "read"}],
  "roles": [{"name": "Ops \"night\" O'Neil", "permissions": ["read"]}]
}"#,
    )
    .unwrap();
    let artifacts = run(&[], Some(&manifest), &Config::default());

    let permissions = artifacts.permissions.unwrap();
    assert!(permissions.contains(r#""Ops \"night\" O'Neil""#), "{permissions}");

    let sql = artifacts.sql.unwrap();
    assert!(
        sql.contains(r#"INSERT INTO roles (id, name, description) VALUES (1, 'Ops "night" O''Neil', '');"#),
        "{sql}"
    );
}

#[test]
fn sql_schema_has_four_relations() {
    let manifest = Manifest::from_str(MANIFEST).unwrap();
    let sql = run(&[], Some(&manifest), &Config::default()).sql.unwrap();
    for table in ["permissions", "roles", "role_permissions", "users"] {
        assert!(
            sql.contains(&format!("CREATE TABLE IF NOT EXISTS {table} (")),
            "missing {table}"
        );
    }
    assert!(sql.contains("    PRIMARY KEY (role_id, permission_id),\n"));
    assert!(sql.contains("REFERENCES roles(id) ON DELETE CASCADE"));
}

#[test]
fn duplicate_methods_across_files_are_rejected() {
    let config = Config::default();
    let options = ScanOptions::from_config(&config, None);
    let mut methods = scan_source(Path::new("a.h"), "MX_RPC_METHOD void f();\n", &options).unwrap();
    methods.extend(scan_source(Path::new("b.h"), "MX_RPC_METHOD int f();\n", &options).unwrap());
    let err = generate(methods, None, &config).unwrap_err();
    assert_eq!(err.code(), "R0004");
    assert!(err.to_string().contains("already used at a.h:1"), "{err}");
}

#[test]
fn table_lists_in_text_form() {
    let manifest = Manifest::from_str(MANIFEST).unwrap();
    let artifacts = run(&[("/src/rpc.h", HEADER)], Some(&manifest), &Config::default());
    let summary: Vec<String> = artifacts
        .table
        .iter()
        .map(|e| {
            let args: Vec<String> = e
                .method
                .args
                .iter()
                .map(|a| format!("{} {}", a.ty, a.name))
                .collect();
            format!("{} {} {}({})", e.id, e.method.return_type, e.method.full_name, args.join(", "))
        })
        .collect();
    insta::assert_snapshot!(summary.join("\n"), @r"
    0 int mulex::Add(int a, int b)
    1 mulex::RPCGenericType mulex::Echo(mulex::RPCGenericType data, const std::uint32_t n)
    2 void RunStop()
    ");
}

#[test]
fn table_serializes_for_listing() {
    let manifest = Manifest::from_str(MANIFEST).unwrap();
    let artifacts = run(&[("/src/rpc.h", HEADER)], Some(&manifest), &Config::default());
    let json = serde_json::to_value(artifacts.table.entries()).unwrap();

    let add = &json[0];
    assert_eq!(add["id"], 0);
    assert_eq!(add["identifier"], "RPC_CALL_MULEX_ADD");
    assert_eq!(add["method"]["permissions"], serde_json::json!(["read", "rdb.write"]));
    assert_eq!(add["method"]["args"][1]["type"]["kind"]["type"], "int");
    assert_eq!(add["method"]["location"]["line"], 3);
    assert_eq!(json[2]["method"]["return_type"]["kind"]["kind"], "Void");
}

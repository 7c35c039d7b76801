//! The rpcgen command-line tool.
//!
//! Provides the `rpcgen` command with the following subcommands:
//!
//! - `rpcgen generate` - Scan headers and write the dispatch artifact, plus the
//!   permission header and SQL seed when a manifest is configured
//! - `rpcgen list` - Scan headers and print the dispatch table without writing
//!
//! Options:
//! - `--config` - Generator configuration (default: `./rpcgen.toml` if present)
//! - `--dirs`, `--extensions`, `--recursive`, `--ignore` - Header discovery
//! - `--manifest` - Permission/role manifest (JSON)
//! - `--json` - Output diagnostics (and `list` results) as JSON
//! - `--no-color` - Disable colorized output
//! - `--log-level`, `--quiet` - Logging verbosity (`RPCGEN_LOG` overrides)

mod diagnostics;
mod discovery;
mod logging;
mod output;

use std::path::{Path, PathBuf};
use std::process;

use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand};
use rustc_hash::FxHashMap;

use rpcgen_codegen::{generate, DispatchTable};
use rpcgen_common::Method;
use rpcgen_manifest::{Config, Manifest};
use rpcgen_parser::{scan_source, ScanOptions};

use crate::diagnostics::{report_decl_error, report_failure, DiagnosticOptions};
use crate::output::PendingWrite;

const ABORTED: &str = "Generation aborted due to errors above; no files were written.";

#[derive(Parser)]
#[command(
    name = "rpcgen",
    version,
    about = "Generates RPC dispatch tables, permission checks and auth seed SQL from annotated C++ headers"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level used when RPCGEN_LOG is not set
    #[arg(long = "log-level", global = true, default_value = "info",
          value_parser = PossibleValuesParser::new(logging::LEVELS))]
    log_level: String,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output diagnostics as JSON (one object per line) instead of human-readable format
    #[arg(long, global = true)]
    json: bool,

    /// Disable colorized output
    #[arg(long = "no-color", global = true)]
    no_color: bool,
}

/// Inputs shared by every subcommand.
#[derive(Args)]
struct InputArgs {
    /// Path to the generator configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directories to search for headers
    #[arg(long, num_args = 1..)]
    dirs: Vec<PathBuf>,

    /// File extensions to scan (e.g. .h .hpp)
    #[arg(long, num_args = 1..)]
    extensions: Vec<String>,

    /// Descend into nested directories of `dirs`
    #[arg(long)]
    recursive: bool,

    /// Directory names to skip, matched against names and relative paths
    #[arg(long, num_args = 1..)]
    ignore: Vec<String>,

    /// Permission/role manifest (JSON)
    #[arg(long)]
    manifest: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan headers and write the generated artifacts
    Generate {
        #[command(flatten)]
        input: InputArgs,

        /// Output path of the dispatch artifact
        #[arg(short, long = "output-file")]
        output_file: Option<PathBuf>,

        /// Output path of the permission header (requires a manifest)
        #[arg(long = "permissions-output")]
        permissions_output: Option<PathBuf>,

        /// Output path of the SQL seed script (requires a manifest)
        #[arg(long = "sql-output")]
        sql_output: Option<PathBuf>,
    },
    /// Scan headers and print the dispatch table
    List {
        #[command(flatten)]
        input: InputArgs,
    },
}

fn main() {
    let cli = Cli::parse();

    let diag_opts = DiagnosticOptions {
        color: !cli.no_color && !cli.json && std::env::var_os("NO_COLOR").is_none(),
        json: cli.json,
    };
    logging::init(&cli.log_level, cli.quiet, !cli.no_color);

    let result = match cli.command {
        Commands::Generate {
            input,
            output_file,
            permissions_output,
            sql_output,
        } => run_generate(
            &input,
            output_file,
            permissions_output,
            sql_output,
            &diag_opts,
        ),
        Commands::List { input } => run_list(&input, &diag_opts),
    };

    if let Err(e) = result {
        report_failure(&e, &diag_opts);
        process::exit(1);
    }
}

// ── Subcommands ─────────────────────────────────────────────────────────

/// Discover -> scan -> assign ids -> render -> write.
fn run_generate(
    input: &InputArgs,
    output_file: Option<PathBuf>,
    permissions_output: Option<PathBuf>,
    sql_output: Option<PathBuf>,
    diag_opts: &DiagnosticOptions,
) -> Result<(), String> {
    let mut config = load_config(input)?;
    if output_file.is_some() {
        config.dispatch.output = output_file;
    }
    if permissions_output.is_some() {
        config.permissions.header = permissions_output;
    }
    if sql_output.is_some() {
        config.permissions.sql = sql_output;
    }

    let dispatch_path = config.dispatch.output.clone().ok_or_else(|| {
        "No output file: pass --output-file or set `output` under [dispatch] in rpcgen.toml"
            .to_string()
    })?;
    let manifest = load_manifest(&config)?;
    if manifest.is_none()
        && (config.permissions.header.is_some() || config.permissions.sql.is_some())
    {
        tracing::warn!("permission outputs are configured but no manifest is; they are skipped");
    }

    let scanned = scan_all(&config, manifest.as_ref(), diag_opts)?;
    let artifacts = generate(scanned.methods, manifest.as_ref(), &config).map_err(|e| {
        report_decl_error(&e, scanned.sources.get(&e.file).map(String::as_str), diag_opts);
        ABORTED.to_string()
    })?;

    let mut pending = vec![PendingWrite {
        path: dispatch_path,
        contents: artifacts.dispatch,
    }];
    if let (Some(path), Some(contents)) = (config.permissions.header, artifacts.permissions) {
        pending.push(PendingWrite { path, contents });
    }
    if let (Some(path), Some(contents)) = (config.permissions.sql, artifacts.sql) {
        pending.push(PendingWrite { path, contents });
    }
    output::write_all(&pending)?;

    tracing::info!(
        methods = artifacts.table.len(),
        artifacts = pending.len(),
        "generation complete"
    );
    Ok(())
}

/// Discover -> scan -> assign ids -> print.
fn run_list(input: &InputArgs, diag_opts: &DiagnosticOptions) -> Result<(), String> {
    let config = load_config(input)?;
    let manifest = load_manifest(&config)?;
    let scanned = scan_all(&config, manifest.as_ref(), diag_opts)?;
    let table = DispatchTable::assign(scanned.methods, &config.dispatch.id_prefix).map_err(|e| {
        report_decl_error(&e, scanned.sources.get(&e.file).map(String::as_str), diag_opts);
        ABORTED.to_string()
    })?;

    if diag_opts.json {
        let json = serde_json::to_string_pretty(table.entries())
            .map_err(|e| format!("Failed to serialize the dispatch table: {}", e))?;
        println!("{}", json);
    } else {
        print!("{}", format_table(&table));
    }
    Ok(())
}

// ── Pipeline stages ─────────────────────────────────────────────────────

/// The config file (explicit, else `./rpcgen.toml`, else defaults) with
/// the discovery flags applied on top.
fn load_config(input: &InputArgs) -> Result<Config, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Failed to read the current directory: {}", e))?;
    let mut config = Config::discover(input.config.as_deref(), &cwd)?;
    let base = match input.config.as_deref() {
        Some(path) => path.parent().map(Path::to_path_buf).unwrap_or_default(),
        None => cwd,
    };
    config = config.rebase(&base);

    if !input.dirs.is_empty() {
        config.discovery.dirs = input.dirs.clone();
    }
    if !input.extensions.is_empty() {
        config.discovery.extensions = input.extensions.clone();
    }
    if input.recursive {
        config.discovery.recursive = true;
    }
    if !input.ignore.is_empty() {
        config.discovery.ignore = input.ignore.clone();
    }
    if let Some(manifest) = &input.manifest {
        config.permissions.manifest = Some(manifest.clone());
    }
    Ok(config)
}

fn load_manifest(config: &Config) -> Result<Option<Manifest>, String> {
    let Some(path) = &config.permissions.manifest else {
        return Ok(None);
    };
    let manifest = Manifest::from_file(path)
        .map_err(|e| format!("Invalid manifest '{}': {}", path.display(), e))?;
    tracing::info!(
        path = %path.display(),
        permissions = manifest.permissions.len(),
        roles = manifest.roles.len(),
        "loaded manifest"
    );
    Ok(Some(manifest))
}

struct Scanned {
    methods: Vec<Method>,
    /// File contents by path, kept for rendering later diagnostics.
    sources: FxHashMap<PathBuf, String>,
}

/// Scan every discovered file in order, stopping at the first error.
fn scan_all(
    config: &Config,
    manifest: Option<&Manifest>,
    diag_opts: &DiagnosticOptions,
) -> Result<Scanned, String> {
    let files = discovery::discover_sources(&config.discovery)?;
    tracing::info!(count = files.len(), "files to scan");

    let options = ScanOptions::from_config(config, manifest);
    let mut methods = Vec::new();
    let mut sources = FxHashMap::default();
    for file in files {
        tracing::debug!(file = %file.display(), "scanning");
        let source = std::fs::read_to_string(&file)
            .map_err(|e| format!("Failed to read '{}': {}", file.display(), e))?;
        match scan_source(&file, &source, &options) {
            Ok(found) => methods.extend(found),
            Err(e) => {
                report_decl_error(&e, Some(&source), diag_opts);
                return Err(ABORTED.to_string());
            }
        }
        sources.insert(file, source);
    }

    tracing::info!(count = methods.len(), "total parsed RPC methods");
    Ok(Scanned { methods, sources })
}

/// One line per method: id, identifier, signature and required permissions.
fn format_table(table: &DispatchTable) -> String {
    let width = table
        .iter()
        .map(|e| e.identifier.len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for entry in table.iter() {
        let method = &entry.method;
        let args: Vec<String> = method
            .args
            .iter()
            .map(|a| format!("{} {}", a.ty, a.name))
            .collect();
        out.push_str(&format!(
            "{:>5}  {:<width$}  {}({}) -> {}",
            entry.id,
            entry.identifier,
            method.full_name,
            args.join(", "),
            method.return_type,
        ));
        if !method.permissions.is_empty() {
            out.push_str(&format!("  [{}]", method.permissions.join(", ")));
        }
        out.push('\n');
    }
    out
}

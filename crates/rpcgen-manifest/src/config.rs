//! Generator configuration loaded from `rpcgen.toml`.
//!
//! Every section is optional; a missing file, a missing section or a missing
//! key all fall back to the defaults the native runtime was built against.
//! The command line overrides individual values after loading.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "rpcgen.toml";

/// A parsed `rpcgen.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub markers: Markers,
    pub generic: GenericConfig,
    pub dispatch: DispatchConfig,
    pub permissions: PermissionsConfig,
    pub discovery: DiscoveryConfig,
}

/// The tokens that introduce a remote-callable declaration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Markers {
    /// Marks a declaration as remote-callable.
    pub call: String,
    /// Introduces the optional parenthesized permission list.
    pub permission: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            call: "MX_RPC_METHOD".to_string(),
            permission: "MX_RPC_PERMISSIONS".to_string(),
        }
    }
}

/// The wildcard wire type and how generated code builds and reads it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenericConfig {
    /// Full type name that marks a length-framed argument or return.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Static constructor taking `(const std::uint8_t*, std::uint64_t)`.
    pub from_data: String,
    /// Member holding the returned payload bytes.
    pub payload: String,
}

impl Default for GenericConfig {
    fn default() -> Self {
        Self {
            type_name: "mulex::RPCGenericType".to_string(),
            from_data: "FromData".to_string(),
            payload: "_data".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    pub output: Option<PathBuf>,
    pub id_prefix: String,
    /// Extra include targets, written verbatim after `#include ` (`<tracy/Tracy.hpp>`).
    pub includes: Vec<String>,
    /// Statements placed at the top of the dispatch function (`ZoneScoped;`).
    pub prologue: Vec<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            output: None,
            id_prefix: "RPC_CALL_".to_string(),
            includes: Vec::new(),
            prologue: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PermissionsConfig {
    pub manifest: Option<PathBuf>,
    pub header: Option<PathBuf>,
    pub sql: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    pub dirs: Vec<PathBuf>,
    pub extensions: Vec<String>,
    pub recursive: bool,
    pub ignore: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            dirs: vec![PathBuf::from(".")],
            extensions: vec![".h".to_string()],
            recursive: false,
            ignore: Vec::new(),
        }
    }
}

impl Config {
    /// Read and parse a config file.
    pub fn from_file(path: &Path) -> Result<Config, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_str(&content)
            .map_err(|e| format!("{} (in {})", e, path.display()))
    }

    /// Parse a config from TOML text.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Config, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Load `path` if given, else `rpcgen.toml` in `dir` if it exists, else defaults.
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Config, String> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let default_path = dir.join(CONFIG_FILE_NAME);
                if default_path.is_file() {
                    Self::from_file(&default_path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    /// Resolve every relative path in the config against `base`.
    ///
    /// Paths in a config file are relative to the file, not to the
    /// directory the generator happens to run from.
    pub fn rebase(mut self, base: &Path) -> Config {
        let fix = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(p) = self.dispatch.output.as_mut() {
            fix(p);
        }
        if let Some(p) = self.permissions.manifest.as_mut() {
            fix(p);
        }
        if let Some(p) = self.permissions.header.as_mut() {
            fix(p);
        }
        if let Some(p) = self.permissions.sql.as_mut() {
            fix(p);
        }
        self.discovery.dirs.iter_mut().for_each(fix);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.markers.call, "MX_RPC_METHOD");
        assert_eq!(config.generic.type_name, "mulex::RPCGenericType");
        assert_eq!(config.dispatch.id_prefix, "RPC_CALL_");
        assert_eq!(config.discovery.extensions, vec![".h"]);
        assert!(!config.discovery.recursive);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[markers]
call = "RPC"
permission = "REQUIRES"

[generic]
type = "net::Blob"
from_data = "Wrap"
payload = "bytes"

[dispatch]
output = "gen/rpc.h"
id_prefix = "CALL_"
includes = ["<tracy/Tracy.hpp>"]
prologue = ["ZoneScoped;"]

[permissions]
manifest = "perms.json"
header = "gen/perms.h"
sql = "gen/seed.sql"

[discovery]
dirs = ["src", "include"]
extensions = [".h", ".hpp"]
recursive = true
ignore = ["build"]
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.markers.call, "RPC");
        assert_eq!(config.markers.permission, "REQUIRES");
        assert_eq!(config.generic.type_name, "net::Blob");
        assert_eq!(config.generic.from_data, "Wrap");
        assert_eq!(config.generic.payload, "bytes");
        assert_eq!(config.dispatch.output.as_deref(), Some(Path::new("gen/rpc.h")));
        assert_eq!(config.dispatch.prologue, vec!["ZoneScoped;"]);
        assert_eq!(config.permissions.sql.as_deref(), Some(Path::new("gen/seed.sql")));
        assert_eq!(config.discovery.dirs.len(), 2);
        assert!(config.discovery.recursive);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = Config::from_str("[markers]\ncall = \"EXPORT\"\n").unwrap();
        assert_eq!(config.markers.call, "EXPORT");
        assert_eq!(config.markers.permission, "MX_RPC_PERMISSIONS");
    }

    #[test]
    fn reject_unknown_key() {
        let err = Config::from_str("[markers]\ncal = \"X\"\n").unwrap_err();
        assert!(err.contains("Failed to parse config"), "Error: {}", err);
    }

    #[test]
    fn rebase_only_touches_relative_paths() {
        let mut config = Config::default();
        config.dispatch.output = Some(PathBuf::from("out/rpc.h"));
        config.permissions.sql = Some(PathBuf::from("/abs/seed.sql"));
        let config = config.rebase(Path::new("/project"));
        assert_eq!(
            config.dispatch.output.as_deref(),
            Some(Path::new("/project/out/rpc.h"))
        );
        assert_eq!(config.permissions.sql.as_deref(), Some(Path::new("/abs/seed.sql")));
        assert_eq!(config.discovery.dirs, vec![PathBuf::from("/project/.")]);
    }

    #[test]
    fn discover_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::discover(None, tmp.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn discover_reads_default_file_name() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), "[markers]\ncall = \"X\"\n").unwrap();
        let config = Config::discover(None, tmp.path()).unwrap();
        assert_eq!(config.markers.call, "X");
    }
}

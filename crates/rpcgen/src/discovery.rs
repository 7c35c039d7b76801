//! Header discovery.
//!
//! Walks every configured directory and collects files whose lower-cased name
//! ends with one of the configured extensions. Ignore entries match configured
//! directories as well as the ones found below them. The result is sorted and
//! deduplicated so the generated include list is reproducible.

use std::path::{Path, PathBuf};

use rpcgen_manifest::config::DiscoveryConfig;

/// Collect the files to scan.
///
/// Returned paths are absolute: they end up in the dispatch artifact's
/// include directives, which must resolve from wherever that file lives.
pub fn discover_sources(config: &DiscoveryConfig) -> Result<Vec<PathBuf>, String> {
    let extensions: Vec<String> = config.extensions.iter().map(|e| e.to_lowercase()).collect();
    let mut files = Vec::new();

    for dir in &config.dirs {
        if !dir.is_dir() {
            return Err(format!("Source directory '{}' does not exist", dir.display()));
        }
        let shown = dir.to_string_lossy();
        if config.ignore.iter().any(|entry| shown.contains(entry.as_str())) {
            tracing::debug!(dir = %dir.display(), "skipping ignored source directory");
            continue;
        }
        let root = std::path::absolute(dir)
            .map_err(|e| format!("Failed to resolve '{}': {}", dir.display(), e))?;
        let walker = Walker {
            root: &root,
            extensions: &extensions,
            recursive: config.recursive,
            ignore: &config.ignore,
        };
        walker
            .walk(&root, &mut files)
            .map_err(|e| format!("Failed to walk directory '{}': {}", dir.display(), e))?;
    }

    files.sort();
    files.dedup();
    Ok(files)
}

struct Walker<'a> {
    root: &'a Path,
    extensions: &'a [String],
    recursive: bool,
    ignore: &'a [String],
}

impl Walker<'_> {
    fn walk(&self, dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let entry_path = entry.path();
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();

            // Skip hidden directories and files
            if name.starts_with('.') {
                continue;
            }

            if entry_path.is_dir() {
                if self.recursive && !self.is_ignored(&entry_path, &name) {
                    self.walk(&entry_path, files)?;
                }
            } else if self.has_extension(&name) {
                files.push(entry_path);
            }
        }
        Ok(())
    }

    fn has_extension(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.extensions.iter().any(|ext| lower.ends_with(ext.as_str()))
    }

    /// A directory is ignored when an entry occurs in its name or in its
    /// path below the walk root.
    fn is_ignored(&self, dir: &Path, name: &str) -> bool {
        let relative = dir.strip_prefix(self.root).unwrap_or(dir).to_string_lossy();
        self.ignore
            .iter()
            .any(|entry| name.contains(entry.as_str()) || relative.contains(entry.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn config(dirs: Vec<PathBuf>, recursive: bool, ignore: &[&str]) -> DiscoveryConfig {
        DiscoveryConfig {
            dirs,
            extensions: vec![".h".to_string(), ".hpp".to_string()],
            recursive,
            ignore: ignore.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn names(files: &[PathBuf], root: &Path) -> Vec<String> {
        let root = std::path::absolute(root).unwrap();
        files
            .iter()
            .map(|f| {
                f.strip_prefix(&root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn top_level_only_by_default() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("b.h"));
        touch(&tmp.path().join("a.HPP"));
        touch(&tmp.path().join("main.cpp"));
        touch(&tmp.path().join("sub/c.h"));

        let files = discover_sources(&config(vec![tmp.path().to_path_buf()], false, &[])).unwrap();
        assert_eq!(names(&files, tmp.path()), vec!["a.HPP", "b.h"]);
        assert!(files.iter().all(|f| f.is_absolute()));
    }

    #[test]
    fn recursive_walk_with_ignore_and_hidden() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("a.h"));
        touch(&tmp.path().join("net/rpc.h"));
        touch(&tmp.path().join("net/build/gen.h"));
        touch(&tmp.path().join("third_party/x.h"));
        touch(&tmp.path().join(".cache/y.h"));

        let files = discover_sources(&config(
            vec![tmp.path().to_path_buf()],
            true,
            &["third_party", "build"],
        ))
        .unwrap();
        assert_eq!(names(&files, tmp.path()), vec!["a.h", "net/rpc.h"]);
    }

    #[test]
    fn every_directory_is_walked_once() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("one/a.h"));
        touch(&tmp.path().join("two/b.h"));

        let dirs = vec![
            tmp.path().join("two"),
            tmp.path().join("one"),
            tmp.path().join("one"),
        ];
        let files = discover_sources(&config(dirs, false, &[])).unwrap();
        assert_eq!(names(&files, tmp.path()), vec!["one/a.h", "two/b.h"]);
    }

    #[test]
    fn ignore_list_applies_to_configured_directories() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("src/a.h"));
        touch(&tmp.path().join("third_party/x.h"));

        let dirs = vec![tmp.path().join("src"), tmp.path().join("third_party")];
        let files = discover_sources(&config(dirs, true, &["third_party"])).unwrap();
        assert_eq!(names(&files, tmp.path()), vec!["src/a.h"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = discover_sources(&config(vec![tmp.path().join("nope")], false, &[])).unwrap_err();
        assert!(err.contains("does not exist"), "{err}");
    }
}

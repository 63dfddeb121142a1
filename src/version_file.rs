//! Reading and writing version-spec files.
//!
//! Three formats are understood:
//! - `.go-version` and the global `version` file: one identifier per line
//!   (colon-joined lines are also accepted), forming an ordered fallback chain;
//! - `go.mod`: the `toolchain goX.Y.Z` directive, or failing that the
//!   `go X.Y` directive. A manifest contributes exactly one identifier.

use std::io::ErrorKind;
use std::path::Path;
use log::debug;
use crate::config::GO_MOD_FILE;
use crate::error::{GoenvError, Result};
use crate::version::{normalize_version, validate_version, VersionSpec};

/// Reads `path` and returns the versions it names, choosing the format from
/// the file name.
///
/// # Errors
///
/// Returns [`GoenvError::NoVersionFile`] when the file does not exist and
/// [`GoenvError::EmptyVersionFile`] when it names no valid version.
pub fn read_version_file<P: AsRef<Path>>(path: P) -> Result<VersionSpec> {
    let path = path.as_ref();
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(GoenvError::NoVersionFile(path.to_path_buf()));
        }
        Err(e) => return Err(GoenvError::io(format!("read {}", path.display()), e)),
    };
    let spec = if is_go_mod(path) {
        parse_go_mod(&content).and_then(|v| VersionSpec::new([v]))
    } else {
        parse_version_file(&content)
    };
    spec.ok_or_else(|| GoenvError::EmptyVersionFile(path.to_path_buf()))
}

pub fn is_go_mod(path: &Path) -> bool {
    path.file_name().is_some_and(|name| name == GO_MOD_FILE)
}

/// Parses the body of a `.go-version` style file.
/// Entries that fail [`validate_version`] are skipped.
pub fn parse_version_file(content: &str) -> Option<VersionSpec> {
    let entries = content
        .lines()
        .flat_map(|line| line.trim_end_matches('\r').split(':'))
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter(|entry| match validate_version(entry) {
            Ok(()) => true,
            Err(_) => {
                debug!("skipping invalid version entry {entry:?}");
                false
            }
        });
    VersionSpec::new(entries)
}

/// Extracts the Go version from a `go.mod` body. `toolchain` wins over `go`;
/// `toolchain default` is ignored.
pub fn parse_go_mod(content: &str) -> Option<String> {
    let mut go_version = None;
    let mut toolchain = None;
    for line in content.lines() {
        let line = match line.find("//") {
            Some(idx) => &line[..idx],
            None => line,
        };
        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next()) {
            (Some("toolchain"), Some(value)) if value != "default" => {
                let value = normalize_version(value);
                if validate_version(value).is_ok() {
                    toolchain = Some(value.to_string());
                }
            }
            (Some("go"), Some(value)) => {
                if validate_version(value).is_ok() {
                    go_version = Some(value.to_string());
                }
            }
            _ => {}
        }
    }
    toolchain.or(go_version)
}

/// Writes `spec` newline-joined, creating parent directories as needed.
pub fn write_version_file<P: AsRef<Path>>(path: P, spec: &VersionSpec) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| GoenvError::io(format!("create {}", parent.display()), e))?;
    }
    std::fs::write(path, spec.to_file_content())
        .map_err(|e| GoenvError::io(format!("write {}", path.display()), e))
}

/// Removes a version file. Returns whether a file was removed.
pub fn unset_version_file<P: AsRef<Path>>(path: P) -> Result<bool> {
    let path = path.as_ref();
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(GoenvError::io(format!("remove {}", path.display()), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_multi_line_file() {
        let spec = parse_version_file("1.11.1\n1.10.3\n").unwrap();
        assert_eq!(spec.to_string(), "1.11.1:1.10.3");
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let spec = parse_version_file("\r\n  1.21.0  \r\n\r\nsystem\r\n").unwrap();
        assert_eq!(spec.versions(), &["1.21.0".to_string(), "system".to_string()]);
    }

    #[test]
    fn test_colon_joined_line() {
        let spec = parse_version_file("1.22.0:1.21.3\n").unwrap();
        assert_eq!(spec.len(), 2);
    }

    #[test]
    fn test_traversal_entries_are_skipped() {
        let spec = parse_version_file("../../etc\n1.20.0\n").unwrap();
        assert_eq!(spec.to_string(), "1.20.0");
        assert!(parse_version_file("../x\n").is_none());
    }

    #[test]
    fn test_go_mod_go_directive() {
        let gomod = "module example.com/m\n\ngo 1.21 // minimum\n\nrequire x v1.0.0\n";
        assert_eq!(parse_go_mod(gomod).as_deref(), Some("1.21"));
    }

    #[test]
    fn test_go_mod_toolchain_wins() {
        let gomod = "module m\ntoolchain go1.22.5\ngo 1.21\n";
        assert_eq!(parse_go_mod(gomod).as_deref(), Some("1.22.5"));
    }

    #[test]
    fn test_go_mod_toolchain_default_ignored() {
        let gomod = "module m\ngo 1.20.3\ntoolchain default\n";
        assert_eq!(parse_go_mod(gomod).as_deref(), Some("1.20.3"));
    }

    #[test]
    fn test_go_mod_without_directive() {
        assert!(parse_go_mod("module m\n").is_none());
    }

    #[test]
    fn test_read_go_mod_file_yields_single_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("go.mod");
        std::fs::write(&path, "module m\n\ngo 1.21.4\n").unwrap();
        let spec = read_version_file(&path).unwrap();
        assert_eq!(spec.versions(), &["1.21.4".to_string()]);
    }

    #[test]
    fn test_read_missing_and_empty() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join(".go-version");
        assert!(matches!(read_version_file(&missing), Err(GoenvError::NoVersionFile(_))));
        std::fs::write(&missing, "\n\n").unwrap();
        assert!(matches!(read_version_file(&missing), Err(GoenvError::EmptyVersionFile(_))));
    }

    #[test]
    fn test_write_then_unset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(".go-version");
        let spec = VersionSpec::new(["1.21.0", "1.20.5"]).unwrap();
        write_version_file(&path, &spec).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1.21.0\n1.20.5\n");
        assert_eq!(read_version_file(&path).unwrap(), spec);
        assert!(unset_version_file(&path).unwrap());
        assert!(!unset_version_file(&path).unwrap());
    }
}

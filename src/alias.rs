//! Named version aliases kept in `<root>/aliases`.
//!
//! The file holds one `name=version` pair per line; blank lines and lines
//! starting with `#` are ignored. An alias is looked up once, before `latest`
//! and partial-version matching, so its target may itself be `latest`, a
//! prefix such as `1.22`, or `system`.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use log::debug;
use crate::error::{GoenvError, Result};
use crate::version::{validate_version, LATEST_VERSION, SYSTEM_VERSION};

const ALIASES_HEADER: &str = "# goenv aliases\n# Format: alias_name=target_version\n";
const MAX_ALIAS_LEN: usize = 64;

/// Parses the aliases file body. Malformed lines are skipped.
pub fn parse_aliases(content: &str) -> BTreeMap<String, String> {
    let mut aliases = BTreeMap::new();
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name, version)) = line.split_once('=') else {
            continue;
        };
        let (name, version) = (name.trim(), version.trim());
        if !name.is_empty() && !version.is_empty() {
            aliases.insert(name.to_string(), version.to_string());
        }
    }
    aliases
}

/// Reads the aliases at `path`. A missing file means no aliases.
pub fn read_aliases<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, String>> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(parse_aliases(&content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(GoenvError::io(format!("read {}", path.display()), e)),
    }
}

/// Rewrites the aliases file, sorted by name.
pub fn write_aliases<P: AsRef<Path>>(path: P, aliases: &BTreeMap<String, String>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| GoenvError::io(format!("create {}", parent.display()), e))?;
    }
    let mut content = ALIASES_HEADER.to_string();
    for (name, version) in aliases {
        content.push_str(&format!("{name}={version}\n"));
    }
    std::fs::write(path, content).map_err(|e| GoenvError::io(format!("write {}", path.display()), e))
}

/// Checks that `name` can be stored and looked up as an alias.
pub fn validate_alias_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(GoenvError::InvalidAlias {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };
    if name.is_empty() {
        return invalid("name cannot be empty");
    }
    if name == SYSTEM_VERSION || name == LATEST_VERSION {
        return invalid("name is reserved");
    }
    if name.chars().any(|c| "=/\\:;\"'` \t\n\r".contains(c)) {
        return invalid("name contains invalid characters");
    }
    if name.contains("..") || name.starts_with('.') {
        return invalid("name cannot start with a dot or contain '..'");
    }
    if name.len() > MAX_ALIAS_LEN {
        return invalid("name is longer than 64 characters");
    }
    Ok(())
}

/// Creates or updates `name` so it points at `version`.
///
/// # Errors
///
/// Returns [`GoenvError::InvalidAlias`] for a bad name and
/// [`GoenvError::InvalidVersion`] for a bad target.
pub fn set_alias<P: AsRef<Path>>(path: P, name: &str, version: &str) -> Result<()> {
    validate_alias_name(name)?;
    validate_version(version)?;
    let path = path.as_ref();
    let mut aliases = read_aliases(path)?;
    aliases.insert(name.to_string(), version.to_string());
    debug!("alias {name} -> {version}");
    write_aliases(path, &aliases)
}

/// Deletes `name`. Fails with [`GoenvError::AliasNotFound`] if it is not defined.
pub fn remove_alias<P: AsRef<Path>>(path: P, name: &str) -> Result<()> {
    let path = path.as_ref();
    let mut aliases = read_aliases(path)?;
    if aliases.remove(name).is_none() {
        return Err(GoenvError::AliasNotFound(name.to_string()));
    }
    write_aliases(path, &aliases)
}

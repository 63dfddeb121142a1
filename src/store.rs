use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use log::warn;
use crate::alias::read_aliases;
use crate::config::{Config, GOPATH_DIR};
use crate::error::{GoenvError, Result};
use crate::util::{command_name, find_executable_in, is_executable};
use crate::version::{
    compare_versions, max_version, normalize_version, validate_version, LATEST_VERSION, SYSTEM_VERSION,
};

/// Read-only view of the installed versions.
///
/// [`FsVersionStore`] reads `<root>/versions`; [`MemoryStore`] is an
/// in-memory double for tests.
pub trait VersionStore {
    /// Installed version identifiers in listing order (ascending by name).
    fn installed_versions(&self) -> Result<Vec<String>>;

    fn is_installed(&self, version: &str) -> bool;

    /// Directory holding `version` (it need not exist).
    fn version_dir(&self, version: &str) -> PathBuf;

    /// Every command name provided by `version`, across its binary directories.
    fn command_names(&self, version: &str) -> Result<Vec<String>>;

    /// Path of `command` inside `version`, searching `bin` before the tool directory.
    fn find_command(&self, version: &str, command: &str) -> Option<PathBuf>;

    /// Target of the alias `name`, if one is defined.
    fn alias(&self, _name: &str) -> Option<String> {
        None
    }

    /// Applies an alias to `spec`, or returns it unchanged.
    fn expand_alias(&self, spec: &str) -> String {
        self.alias(spec).unwrap_or_else(|| spec.to_string())
    }

    /// Maps a user-supplied identifier to an installed version: an alias is
    /// expanded first, then matched with [`VersionStore::match_installed`].
    fn resolve_installed(&self, spec: &str) -> Option<String> {
        self.match_installed(&self.expand_alias(spec))
    }

    /// Whether `spec` names something runnable: `system` (directly or through
    /// an alias) or an installed version.
    fn is_available(&self, spec: &str) -> bool {
        let target = self.expand_alias(spec);
        target == SYSTEM_VERSION || self.match_installed(&target).is_some()
    }

    /// Exact name, `latest`, or a partial version such as `1.22` (highest
    /// `1.22.x`). Aliases are not consulted.
    fn match_installed(&self, spec: &str) -> Option<String> {
        if self.is_installed(spec) {
            return Some(spec.to_string());
        }
        let installed = self.installed_versions().ok()?;
        if spec == LATEST_VERSION {
            return max_version(&installed).cloned();
        }
        let wanted = normalize_version(spec);
        let prefix = format!("{wanted}.");
        let matches: Vec<String> = installed
            .into_iter()
            .filter(|v| {
                let v = normalize_version(v);
                v == wanted || v.starts_with(&prefix)
            })
            .collect();
        max_version(&matches).cloned()
    }

    /// Installed versions that provide `command`, with its path, in listing order.
    fn versions_with_command(&self, command: &str) -> Result<Vec<(String, PathBuf)>> {
        let mut found = Vec::new();
        for version in self.installed_versions()? {
            if let Some(path) = self.find_command(&version, command) {
                found.push((version, path));
            }
        }
        Ok(found)
    }
}

/// The on-disk store under `<root>/versions`.
#[derive(Debug, Clone)]
pub struct FsVersionStore {
    versions_dir: PathBuf,
    include_tools: bool,
    aliases_file: Option<PathBuf>,
}

impl FsVersionStore {
    pub fn new<P: AsRef<Path>>(versions_dir: P, include_tools: bool) -> Self {
        FsVersionStore {
            versions_dir: versions_dir.as_ref().to_path_buf(),
            include_tools,
            aliases_file: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        FsVersionStore::new(config.versions_dir(), !config.disable_gopath)
            .with_aliases_file(config.aliases_file())
    }

    pub fn with_aliases_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.aliases_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// `bin/` and, unless disabled, the user tool directory `gopath/bin/`.
    pub fn bin_dirs(&self, version: &str) -> Vec<PathBuf> {
        let dir = self.version_dir(version);
        let mut dirs = vec![dir.join("bin")];
        if self.include_tools {
            dirs.push(dir.join(GOPATH_DIR).join("bin"));
        }
        dirs
    }
}

impl VersionStore for FsVersionStore {
    fn installed_versions(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.versions_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(GoenvError::io("read versions directory", e)),
        };
        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| GoenvError::io("read versions directory", e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            versions.push(name);
        }
        versions.sort();
        Ok(versions)
    }

    fn is_installed(&self, version: &str) -> bool {
        validate_version(version).is_ok() && self.version_dir(version).is_dir()
    }

    fn version_dir(&self, version: &str) -> PathBuf {
        self.versions_dir.join(version)
    }

    fn command_names(&self, version: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for dir in self.bin_dirs(version) {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(GoenvError::io(format!("read {}", dir.display()), e));
                }
            };
            for entry in entries {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("skipping unreadable entry in {}: {e}", dir.display());
                        continue;
                    }
                };
                let path = entry.path();
                if path.is_file() && is_executable(&path) {
                    if let Some(name) = command_name(&path) {
                        names.push(name);
                    }
                }
            }
        }
        Ok(names)
    }

    fn alias(&self, name: &str) -> Option<String> {
        let path = self.aliases_file.as_ref()?;
        match read_aliases(path) {
            Ok(mut aliases) => aliases.remove(name),
            Err(e) => {
                warn!("ignoring aliases: {e}");
                None
            }
        }
    }

    fn find_command(&self, version: &str, command: &str) -> Option<PathBuf> {
        if !self.is_installed(version) {
            return None;
        }
        self.bin_dirs(version)
            .iter()
            .find_map(|dir| find_executable_in(dir, command))
    }
}

/// In-memory [`VersionStore`]: version -> command names. Paths are reported
/// under `<root>/<version>/bin/`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    root: PathBuf,
    versions: BTreeMap<String, Vec<String>>,
    aliases: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        MemoryStore {
            root: root.as_ref().to_path_buf(),
            versions: BTreeMap::new(),
            aliases: BTreeMap::new(),
        }
    }

    pub fn with_alias(mut self, name: &str, version: &str) -> Self {
        self.aliases.insert(name.to_string(), version.to_string());
        self
    }

    pub fn with_version(mut self, version: &str, commands: &[&str]) -> Self {
        self.versions.insert(
            version.to_string(),
            commands.iter().map(|c| c.to_string()).collect(),
        );
        self
    }
}

impl VersionStore for MemoryStore {
    fn installed_versions(&self) -> Result<Vec<String>> {
        Ok(self.versions.keys().cloned().collect())
    }

    fn is_installed(&self, version: &str) -> bool {
        self.versions.contains_key(version)
    }

    fn version_dir(&self, version: &str) -> PathBuf {
        self.root.join(version)
    }

    fn alias(&self, name: &str) -> Option<String> {
        self.aliases.get(name).cloned()
    }

    fn command_names(&self, version: &str) -> Result<Vec<String>> {
        Ok(self.versions.get(version).cloned().unwrap_or_default())
    }

    fn find_command(&self, version: &str, command: &str) -> Option<PathBuf> {
        let commands = self.versions.get(version)?;
        commands
            .iter()
            .any(|c| c == command)
            .then(|| self.version_dir(version).join("bin").join(command))
    }
}

/// Sorts identifiers by Go version order (used for `versions` output).
pub fn sort_by_version(versions: &mut [String]) {
    versions.sort_by(|a, b| compare_versions(a, b));
}

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use directories::BaseDirs;

pub const ENV_ROOT: &str = "GOENV_ROOT";
pub const ENV_DIR: &str = "GOENV_DIR";
pub const ENV_VERSION: &str = "GOENV_VERSION";
pub const ENV_VERSION_ORIGIN: &str = "GOENV_VERSION_ORIGIN";
pub const ENV_DEBUG: &str = "GOENV_DEBUG";
pub const ENV_GOMOD_VERSION_ENABLE: &str = "GOENV_GOMOD_VERSION_ENABLE";
pub const ENV_NO_AUTO_REHASH: &str = "GOENV_NO_AUTO_REHASH";
pub const ENV_DISABLE_GOPATH: &str = "GOENV_DISABLE_GOPATH";

/// Name of the per-directory version file.
pub const LOCAL_VERSION_FILE: &str = ".go-version";
/// Name of the build manifest carrying a `go` / `toolchain` directive.
pub const GO_MOD_FILE: &str = "go.mod";
/// Sub-directory of a version that holds user-installed tools (`gopath/bin`).
pub const GOPATH_DIR: &str = "gopath";

/// Process-wide settings, read from the environment once and passed
/// explicitly to every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub root: PathBuf,
    pub debug: bool,
    pub no_auto_rehash: bool,
    pub disable_gopath: bool,
}

impl Config {
    /// Builds a config rooted at `root` with every flag off.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Config {
            root: root.as_ref().to_path_buf(),
            debug: false,
            no_auto_rehash: false,
            disable_gopath: false,
        }
    }

    /// Reads `GOENV_ROOT` and the feature flags from the process environment.
    pub fn from_env() -> Self {
        let root = match env::var(ENV_ROOT) {
            Ok(root) if !root.trim().is_empty() => expand_tilde(root.trim()),
            _ => default_root(),
        };
        Config {
            root,
            debug: env_is_set(ENV_DEBUG),
            no_auto_rehash: env_is_one(ENV_NO_AUTO_REHASH),
            disable_gopath: env_is_one(ENV_DISABLE_GOPATH),
        }
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.versions_dir().join(version)
    }

    pub fn shims_dir(&self) -> PathBuf {
        self.root.join("shims")
    }

    pub fn global_version_file(&self) -> PathBuf {
        self.root.join("version")
    }

    /// `name=version` alias definitions.
    pub fn aliases_file(&self) -> PathBuf {
        self.root.join("aliases")
    }

    /// Global files in lookup order: `version`, then the legacy `global` and `default`.
    pub fn global_version_files(&self) -> [PathBuf; 3] {
        [
            self.global_version_file(),
            self.root.join("global"),
            self.root.join("default"),
        ]
    }
}

/// Everything version resolution reads from the outside world, captured once
/// per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionContext {
    pub dir: PathBuf,
    pub version_override: Option<String>,
    pub origin_override: Option<String>,
    pub gomod_enabled: bool,
    pub search_path: Vec<PathBuf>,
}

impl ResolutionContext {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        ResolutionContext {
            dir: dir.as_ref().to_path_buf(),
            version_override: None,
            origin_override: None,
            gomod_enabled: false,
            search_path: Vec::new(),
        }
    }

    /// Captures `GOENV_DIR` (or the current directory), the override variables,
    /// the manifest flag and `PATH`.
    pub fn from_env() -> std::io::Result<Self> {
        let dir = match env::var(ENV_DIR) {
            Ok(dir) if !dir.is_empty() => expand_tilde(&dir),
            _ => env::current_dir()?,
        };
        Ok(ResolutionContext {
            dir,
            version_override: non_empty_var(ENV_VERSION),
            origin_override: non_empty_var(ENV_VERSION_ORIGIN),
            gomod_enabled: env_is_one(ENV_GOMOD_VERSION_ENABLE),
            search_path: split_search_path(env::var_os("PATH")),
        })
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version_override = Some(version.to_string());
        self
    }

    pub fn with_origin(mut self, origin: &str) -> Self {
        self.origin_override = Some(origin.to_string());
        self
    }

    pub fn with_gomod(mut self, enabled: bool) -> Self {
        self.gomod_enabled = enabled;
        self
    }

    pub fn with_search_path(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_path = dirs;
        self
    }
}

fn default_root() -> PathBuf {
    match BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(".goenv"),
        None => env::temp_dir().join(".goenv"),
    }
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(dirs) = BaseDirs::new() {
            let rest = rest.trim_start_matches(['/', '\\']);
            return dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}

fn split_search_path(path: Option<OsString>) -> Vec<PathBuf> {
    match path {
        Some(path) => env::split_paths(&path)
            .filter(|p| !p.as_os_str().is_empty())
            .collect(),
        None => Vec::new(),
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_is_set(key: &str) -> bool {
    non_empty_var(key).is_some()
}

fn env_is_one(key: &str) -> bool {
    matches!(env::var(key).as_deref(), Ok("1") | Ok("true"))
}

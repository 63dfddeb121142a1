//! Active-version resolution.
//!
//! First match wins:
//! 1. `GOENV_VERSION`, stamped with the hook origin label when one is set;
//! 2. the nearest `.go-version` walking up from the working directory;
//! 3. the nearest `go.mod` directive, when manifest resolution is enabled;
//! 4. the global version file (`version`, then legacy `global`/`default`);
//! 5. `system`, unset.
//!
//! The resolver reports what the configuration says. Whether the versions
//! are installed is checked later by the dispatcher.

use std::fmt;
use std::path::{Path, PathBuf};
use log::debug;
use crate::config::{Config, ResolutionContext, ENV_VERSION, GO_MOD_FILE, LOCAL_VERSION_FILE};
use crate::error::{GoenvError, Result};
use crate::version::VersionSpec;
use crate::version_file::read_version_file;

/// Where a [`VersionSpec`] came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    EnvironmentOverride,
    LocalFile(PathBuf),
    GlobalFile(PathBuf),
    ManifestDirective(PathBuf),
    HookOrigin(String),
    Unset,
}

impl Source {
    /// Text answering `version-origin`. An unset version reports the global
    /// file it would be read from.
    pub fn origin(&self, config: &Config) -> String {
        match self {
            Source::Unset => config.global_version_file().display().to_string(),
            other => other.to_string(),
        }
    }

    /// The file backing this source, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Source::LocalFile(p) | Source::GlobalFile(p) | Source::ManifestDirective(p) => Some(p),
            _ => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::EnvironmentOverride => write!(f, "{ENV_VERSION} environment variable"),
            Source::LocalFile(p) | Source::GlobalFile(p) | Source::ManifestDirective(p) => {
                write!(f, "{}", p.display())
            }
            Source::HookOrigin(label) => write!(f, "{label}"),
            Source::Unset => write!(f, "unset"),
        }
    }
}

/// Resolves the active version spec for `ctx`.
///
/// # Errors
///
/// Only I/O failures other than a missing file are reported; an absent
/// configuration resolves to `system` with [`Source::Unset`].
///
/// # Examples
///
/// ```no_run
/// use goenv::{resolve, Config, ResolutionContext};
///
/// let config = Config::from_env();
/// let ctx = ResolutionContext::from_env().unwrap();
/// let (spec, source) = resolve(&config, &ctx).unwrap();
/// println!("{spec} (set by {})", source.origin(&config));
/// ```
pub fn resolve(config: &Config, ctx: &ResolutionContext) -> Result<(VersionSpec, Source)> {
    if let Some(spec) = ctx.version_override.as_deref().and_then(VersionSpec::parse) {
        let source = match &ctx.origin_override {
            Some(label) => Source::HookOrigin(label.clone()),
            None => Source::EnvironmentOverride,
        };
        debug!("version {spec} from {source}");
        return Ok((spec, source));
    }

    if let Some(path) = find_upward(&ctx.dir, LOCAL_VERSION_FILE) {
        if let Some(spec) = read_optional(&path)? {
            debug!("version {spec} from {}", path.display());
            return Ok((spec, Source::LocalFile(path)));
        }
    }

    if ctx.gomod_enabled {
        if let Some(path) = find_upward(&ctx.dir, GO_MOD_FILE) {
            if let Some(spec) = read_optional(&path)? {
                debug!("version {spec} from manifest {}", path.display());
                return Ok((spec, Source::ManifestDirective(path)));
            }
        }
    }

    for path in config.global_version_files() {
        if let Some(spec) = read_optional(&path)? {
            debug!("version {spec} from global file {}", path.display());
            return Ok((spec, Source::GlobalFile(path)));
        }
    }

    debug!("no version configured, using system");
    Ok((VersionSpec::system(), Source::Unset))
}

/// Nearest local version file at or above `dir`.
pub fn find_version_file<P: AsRef<Path>>(dir: P) -> Option<PathBuf> {
    find_upward(dir.as_ref(), LOCAL_VERSION_FILE)
}

fn find_upward(start: &Path, name: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// A missing or empty file yields `None` so resolution moves on.
fn read_optional(path: &Path) -> Result<Option<VersionSpec>> {
    match read_version_file(path) {
        Ok(spec) => Ok(Some(spec)),
        Err(GoenvError::NoVersionFile(_)) => Ok(None),
        Err(GoenvError::EmptyVersionFile(p)) => {
            debug!("ignoring empty version file {}", p.display());
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

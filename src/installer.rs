use std::io::ErrorKind;
use std::path::Path;
use log::debug;
use crate::config::Config;
use crate::error::{GoenvError, Result};
use crate::shims::rehash;
use crate::store::{FsVersionStore, VersionStore};
use crate::version::{validate_version, SYSTEM_VERSION};

/// A release offered by a remote index.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Release {
    pub version: String,
    pub stable: bool,
}

/// Populates `<root>/versions/<version>` for a version.
///
/// Downloading and unpacking are up to the implementor; the core only needs
/// the directory to exist with a `bin/` inside once `install` returns `Ok`.
pub trait Installer {
    fn install(&self, version: &str, dest: &Path) -> Result<()>;
}

/// Lists the versions available for installation, newest first.
pub trait ReleaseIndex {
    fn releases(&self) -> Result<Vec<Release>>;
}

/// Installs `version` with `installer` and refreshes the shims unless
/// automatic rehashing is off. Returns the shim count after the rehash, or
/// `None` when it was skipped.
///
/// # Errors
///
/// Returns [`GoenvError::InvalidVersion`] for `system` or identifiers that
/// could escape the versions directory, and whatever the installer reports.
pub fn install_version<I: Installer + ?Sized>(
    config: &Config,
    installer: &I,
    version: &str,
) -> Result<Option<usize>> {
    if version == SYSTEM_VERSION {
        return Err(GoenvError::InvalidVersion(version.to_string()));
    }
    validate_version(version)?;
    let dest = config.version_dir(version);
    std::fs::create_dir_all(config.versions_dir())
        .map_err(|e| GoenvError::io("create versions directory", e))?;
    debug!("installing {version} into {}", dest.display());
    installer.install(version, &dest)?;

    if config.no_auto_rehash {
        return Ok(None);
    }
    rehash(config, &FsVersionStore::from_config(config)).map(Some)
}

/// Deletes an installed version and rehashes so its shims disappear.
/// Returns whether the version was installed.
pub fn uninstall_version(config: &Config, version: &str) -> Result<bool> {
    if version == SYSTEM_VERSION {
        return Err(GoenvError::InvalidVersion(version.to_string()));
    }
    validate_version(version)?;
    let store = FsVersionStore::from_config(config);
    if !store.is_installed(version) {
        return Ok(false);
    }
    let dir = store.version_dir(version);
    match std::fs::remove_dir_all(&dir) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(GoenvError::io(format!("remove {}", dir.display()), e)),
    }
    debug!("removed {}", dir.display());
    rehash(config, &store)?;
    Ok(true)
}

/// Stable releases from `index`, in index order.
pub fn stable_releases<R: ReleaseIndex + ?Sized>(index: &R) -> Result<Vec<Release>> {
    Ok(index.releases()?.into_iter().filter(|r| r.stable).collect())
}

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use log::{debug, warn};
use serde::Serialize;
use walkdir::WalkDir;
use crate::cache::fingerprint::{parse_cache_name, CacheKey, CacheKind, CacheName};
use crate::error::{GoenvError, Result};
use crate::store::VersionStore;

/// Time allowed for sizing a single cache before the result is reported as approximate.
pub const DEFAULT_SIZE_BUDGET: Duration = Duration::from_secs(10);

/// Size of a directory tree. `files` is `None` when counting was skipped or
/// the walk ran out of time, in which case `bytes` is a lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DirSize {
    pub bytes: u64,
    pub files: Option<u64>,
}

/// Walks `path` and totals file sizes, giving up after `budget`.
/// Unreadable entries are skipped.
pub fn dir_size<P: AsRef<Path>>(path: P, fast: bool, budget: Duration) -> DirSize {
    let start = Instant::now();
    let mut bytes = 0u64;
    let mut files = 0u64;
    let mut timed_out = false;
    for entry in WalkDir::new(path.as_ref()).into_iter().filter_map(|e| e.ok()) {
        if files % 1000 == 0 && start.elapsed() >= budget {
            timed_out = true;
            break;
        }
        if entry.file_type().is_file() {
            if let Ok(meta) = entry.metadata() {
                bytes += meta.len();
            }
            files += 1;
        }
    }
    if timed_out {
        debug!("sizing {} exceeded {budget:?}", path.as_ref().display());
    }
    DirSize {
        bytes,
        files: (!fast && !timed_out).then_some(files),
    }
}

/// A cache directory found under an installed version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    pub version: String,
    pub kind: CacheKind,
    pub path: PathBuf,
    /// `None` for legacy caches.
    pub key: Option<CacheKey>,
    pub legacy: bool,
    pub size: DirSize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CacheStatus {
    pub caches: Vec<CacheEntry>,
    pub total_bytes: u64,
    /// `None` if any cache could not be counted.
    pub total_files: Option<u64>,
}

/// Cache directories of one version, sorted by name. Unrecognized names are skipped.
pub fn version_caches(version_dir: &Path) -> Result<Vec<(PathBuf, CacheName)>> {
    let entries = match std::fs::read_dir(version_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(GoenvError::io(format!("read {}", version_dir.display()), e)),
    };
    let mut caches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| GoenvError::io(format!("read {}", version_dir.display()), e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(parsed) = parse_cache_name(&name) {
            caches.push((path, parsed));
        }
    }
    caches.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(caches)
}

/// Sizes every recognized cache of every installed version.
pub fn cache_status<S: VersionStore + ?Sized>(store: &S, fast: bool, budget: Duration) -> Result<CacheStatus> {
    let mut status = CacheStatus {
        total_files: Some(0),
        ..CacheStatus::default()
    };
    for version in store.installed_versions()? {
        for (path, name) in version_caches(&store.version_dir(&version))? {
            let size = dir_size(&path, fast, budget);
            status.total_bytes += size.bytes;
            status.total_files = match (status.total_files, size.files) {
                (Some(total), Some(files)) => Some(total + files),
                _ => None,
            };
            status.caches.push(CacheEntry {
                version: version.clone(),
                kind: name.kind(),
                legacy: matches!(name, CacheName::Legacy(_)),
                key: name.key().cloned(),
                path,
                size,
            });
        }
    }
    Ok(status)
}

/// Moves `<version_dir>/go-build` to the architecture-qualified name for
/// this host. Returns the new path, or `None` when there is no legacy cache.
/// With `dry_run` nothing is renamed and the planned path is returned.
///
/// # Errors
///
/// Returns [`GoenvError::CacheExists`] if the target already exists, in
/// dry runs too; the legacy cache is left in place.
pub fn migrate_cache<P: AsRef<Path>>(version_dir: P, dry_run: bool) -> Result<Option<PathBuf>> {
    let version_dir = version_dir.as_ref();
    let legacy = version_dir.join(CacheKind::Build.prefix());
    if !legacy.is_dir() {
        return Ok(None);
    }
    let target = version_dir.join(CacheKey::host().dir_name(CacheKind::Build));
    if target.exists() {
        return Err(GoenvError::CacheExists(target));
    }
    if dry_run {
        debug!("would migrate {} -> {}", legacy.display(), target.display());
        return Ok(Some(target));
    }
    std::fs::rename(&legacy, &target)
        .map_err(|e| GoenvError::io(format!("move {} to {}", legacy.display(), target.display()), e))?;
    debug!("migrated {} -> {}", legacy.display(), target.display());
    Ok(Some(target))
}

#[derive(Debug, Default)]
pub struct MigrateReport {
    pub migrated: Vec<(String, PathBuf)>,
    pub failed: Vec<(String, GoenvError)>,
}

/// Runs [`migrate_cache`] for every installed version. A failure in one
/// version is recorded and the rest are still migrated.
pub fn migrate_all<S: VersionStore + ?Sized>(store: &S, dry_run: bool) -> Result<MigrateReport> {
    let mut report = MigrateReport::default();
    for version in store.installed_versions()? {
        match migrate_cache(store.version_dir(&version), dry_run) {
            Ok(Some(path)) => report.migrated.push((version, path)),
            Ok(None) => {}
            Err(e) => {
                warn!("could not migrate cache of {version}: {e}");
                report.failed.push((version, e));
            }
        }
    }
    Ok(report)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanOptions {
    pub kind: Option<CacheKind>,
    pub version: Option<String>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub removed: Vec<PathBuf>,
    pub bytes: u64,
}

/// Deletes the caches selected by `options`, or only lists them on a dry run.
pub fn clean_caches<S: VersionStore + ?Sized>(store: &S, options: &CleanOptions) -> Result<CleanReport> {
    let mut report = CleanReport::default();
    for version in store.installed_versions()? {
        if options.version.as_deref().is_some_and(|v| v != version) {
            continue;
        }
        for (path, name) in version_caches(&store.version_dir(&version))? {
            if options.kind.is_some_and(|k| k != name.kind()) {
                continue;
            }
            let size = dir_size(&path, true, DEFAULT_SIZE_BUDGET);
            if !options.dry_run {
                make_writable(&path);
                std::fs::remove_dir_all(&path)
                    .map_err(|e| GoenvError::io(format!("remove {}", path.display()), e))?;
                debug!("removed cache {}", path.display());
            }
            report.bytes += size.bytes;
            report.removed.push(path);
        }
    }
    Ok(report)
}

/// Module caches are written read-only; restore write permission so they can be deleted.
#[cfg(unix)]
fn make_writable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_dir() {
            if let Ok(meta) = entry.metadata() {
                let mode = meta.permissions().mode();
                if mode & 0o200 == 0 {
                    let _ = std::fs::set_permissions(entry.path(), std::fs::Permissions::from_mode(mode | 0o700));
                }
            }
        }
    }
}

#[cfg(not(unix))]
fn make_writable(_path: &Path) {}

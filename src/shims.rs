use std::collections::BTreeSet;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use log::{debug, warn};
use tempfile::NamedTempFile;
use crate::config::Config;
use crate::error::{GoenvError, Result};
use crate::store::VersionStore;

/// Start of the line every generated shim carries (`# goenv shim for <name>`).
/// Stale removal only touches files with it.
#[cfg(not(windows))]
pub const SHIM_MARKER: &str = "# goenv shim";
#[cfg(windows)]
pub const SHIM_MARKER: &str = "REM goenv shim";

/// File name of the shim for `command`.
pub fn shim_file_name(command: &str) -> String {
    #[cfg(windows)]
    return format!("{command}.bat");
    #[cfg(not(windows))]
    return command.to_string();
}

/// Shim body for `command`. The output depends only on the name, so
/// regenerating a shim never changes it.
pub fn shim_content(command: &str) -> String {
    #[cfg(windows)]
    return format!(
        "@echo off\r\n{SHIM_MARKER} for {command}\r\nif \"%GOENV_DEBUG%\"==\"1\" echo on\r\ngoenv exec \"{command}\" %*\r\n"
    );
    #[cfg(not(windows))]
    return format!(
        "#!/usr/bin/env bash\n{SHIM_MARKER} for {command}\nset -e\n[ -n \"$GOENV_DEBUG\" ] && set -x\n\nexec goenv exec \"{command}\" \"$@\"\n"
    );
}

/// Names that can be embedded in a shim without quoting trouble.
fn is_shimmable(command: &str) -> bool {
    !command.is_empty()
        && !command.starts_with('.')
        && command
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+'))
}

/// Distinct command names across every installed version.
pub fn collect_commands<S: VersionStore + ?Sized>(store: &S) -> Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    for version in store.installed_versions()? {
        for name in store.command_names(&version)? {
            if is_shimmable(&name) {
                names.insert(name);
            } else {
                debug!("not shimming {name:?} from {version}");
            }
        }
    }
    Ok(names)
}

/// Reconciles the shims directory with the installed commands and returns
/// the number of shims present afterwards.
///
/// Missing shims are created, outdated ones rewritten, stale ones deleted.
/// Shims that already have the right content are not touched, so running
/// this repeatedly leaves the directory unchanged.
///
/// # Errors
///
/// Returns [`GoenvError::ShimDir`] if the shims directory cannot be created,
/// read or written, and store errors when a version directory is unreadable.
///
/// # Examples
///
/// ```no_run
/// use goenv::{rehash, Config, FsVersionStore};
///
/// let config = Config::from_env();
/// let count = rehash(&config, &FsVersionStore::from_config(&config)).unwrap();
/// println!("Rehashed {count} shims");
/// ```
pub fn rehash<S: VersionStore + ?Sized>(config: &Config, store: &S) -> Result<usize> {
    let shims_dir = config.shims_dir();
    std::fs::create_dir_all(&shims_dir).map_err(|e| GoenvError::shim_dir(&shims_dir, e))?;

    let commands = collect_commands(store)?;
    let mut wanted = BTreeSet::new();
    for command in &commands {
        let file_name = shim_file_name(command);
        write_shim(&shims_dir, &file_name, &shim_content(command))?;
        wanted.insert(file_name);
    }
    remove_stale(&shims_dir, &wanted)?;
    Ok(commands.len())
}

fn write_shim(dir: &Path, file_name: &str, content: &str) -> Result<()> {
    let path = dir.join(file_name);
    match std::fs::read(&path) {
        Ok(existing) if existing == content.as_bytes() => {
            ensure_mode(&path).map_err(|e| GoenvError::shim_dir(dir, e))?;
            return Ok(());
        }
        Ok(_) => debug!("updating shim {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => debug!("creating shim {}", path.display()),
        Err(e) => return Err(GoenvError::shim_dir(dir, e)),
    }

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| GoenvError::shim_dir(dir, e))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| GoenvError::shim_dir(dir, e))?;
    ensure_mode(tmp.path()).map_err(|e| GoenvError::shim_dir(dir, e))?;
    tmp.persist(&path)
        .map_err(|e| GoenvError::shim_dir(dir, e.error))?;
    Ok(())
}

#[cfg(unix)]
fn ensure_mode(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::metadata(path)?.permissions().mode() & 0o777;
    if mode != 0o755 {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_mode(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn remove_stale(dir: &Path, wanted: &BTreeSet<String>) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| GoenvError::shim_dir(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| GoenvError::shim_dir(dir, e))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if wanted.contains(&name) {
            continue;
        }
        let path = entry.path();
        if !path.is_file() || !is_generated_shim(&path) {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => debug!("removed stale shim {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(GoenvError::shim_dir(dir, e)),
        }
    }
    Ok(())
}

fn is_generated_shim(path: &Path) -> bool {
    match std::fs::read_to_string(path) {
        Ok(content) => content.lines().take(3).any(is_marker_line),
        Err(e) => {
            if e.kind() != ErrorKind::InvalidData {
                warn!("could not inspect {}: {e}", path.display());
            }
            false
        }
    }
}

fn is_marker_line(line: &str) -> bool {
    match line.trim().strip_prefix(SHIM_MARKER) {
        Some(rest) => rest.is_empty() || rest.starts_with(' '),
        None => false,
    }
}

/// Paths of the files in the shims directory, sorted by name.
pub fn list_shims(config: &Config) -> Result<Vec<PathBuf>> {
    let dir = config.shims_dir();
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(GoenvError::shim_dir(&dir, e)),
    };
    let mut shims = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| GoenvError::shim_dir(&dir, e))?.path();
        if path.is_file() {
            shims.push(path);
        }
    }
    shims.sort();
    Ok(shims)
}

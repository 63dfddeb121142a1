use std::path::{Path, PathBuf};

/// Extensions treated as runnable on Windows, in lookup order.
#[cfg(windows)]
pub const EXECUTABLE_EXTENSIONS: &[&str] = &["exe", "bat", "cmd", "com"];

/// Checks if a given path is an executable file on Unix.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Checks if a given path has a Windows executable extension.
#[cfg(windows)]
pub fn is_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => EXECUTABLE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// The command a file provides: its file name, minus the executable
/// extension on Windows.
pub fn command_name(path: &Path) -> Option<String> {
    #[cfg(windows)]
    let name = path.file_stem();
    #[cfg(not(windows))]
    let name = path.file_name();
    name.map(|n| n.to_string_lossy().to_string())
}

/// Looks for `command` as an executable directly inside `dir`.
pub fn find_executable_in(dir: &Path, command: &str) -> Option<PathBuf> {
    #[cfg(windows)]
    {
        for ext in EXECUTABLE_EXTENSIONS {
            let candidate = dir.join(format!("{command}.{ext}"));
            if is_executable(&candidate) {
                return Some(candidate);
            }
        }
        None
    }
    #[cfg(not(windows))]
    {
        let candidate = dir.join(command);
        is_executable(&candidate).then_some(candidate)
    }
}

/// Searches `dirs` in order for `command`, skipping `excluded` and anything
/// beneath it. Paths are compared in canonical form when they exist.
pub fn find_in_search_path(dirs: &[PathBuf], command: &str, excluded: &Path) -> Option<PathBuf> {
    let excluded = clean_path(excluded);
    dirs.iter()
        .filter(|dir| !clean_path(dir).starts_with(&excluded))
        .find_map(|dir| find_executable_in(dir, command))
}

fn clean_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Human-readable size with one decimal, e.g. `1.5 MB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}


#[cfg(test)]
mod tests {
    use super::test_support::write_executable;
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_find_executable_in_dir() {
        let dir = tempdir().unwrap();
        let path = write_executable(dir.path(), "go");
        assert_eq!(find_executable_in(dir.path(), "go"), Some(path.clone()));
        assert_eq!(find_executable_in(dir.path(), "gofmt"), None);
        assert_eq!(command_name(&path).as_deref(), Some("go"));
    }

    #[cfg(unix)]
    #[test]
    fn test_plain_file_is_not_executable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes");
        std::fs::write(&path, "text").unwrap();
        assert!(!is_executable(&path));
        assert!(!is_executable(dir.path()));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_search_path_skips_excluded_tree() {
        let dir = tempdir().unwrap();
        let shims = dir.path().join("shims");
        let nested = shims.join("nested");
        let real = dir.path().join("usr-bin");
        write_executable(&shims, "go");
        write_executable(&nested, "go");
        let expected = write_executable(&real, "go");
        let dirs = vec![shims.clone(), nested, real];
        let found = find_in_search_path(&dirs, "go", &shims).unwrap();
        assert_eq!(
            std::fs::canonicalize(found).unwrap(),
            std::fs::canonicalize(expected).unwrap()
        );
        assert!(find_in_search_path(&dirs[..2], "go", &shims).is_none());
    }
}

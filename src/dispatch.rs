use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;
use log::{debug, warn};
use crate::cache::{CacheKey, CacheKind};
use crate::config::{Config, ResolutionContext, GOPATH_DIR};
use crate::error::{GoenvError, Result};
use crate::resolver::resolve;
use crate::shims::rehash;
use crate::store::VersionStore;
use crate::util::find_in_search_path;
use crate::version::SYSTEM_VERSION;

/// A command located through the active version chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Installed version providing the command; `None` when found via `system`.
    pub version: Option<String>,
    pub path: PathBuf,
}

/// Finds `command` for the active version chain.
///
/// Each entry of the chain is tried in order. `system` searches `PATH`
/// without the shims directory; any other entry must be installed.
///
/// # Errors
///
/// - [`GoenvError::VersionNotInstalled`] if an entry of the chain is not installed.
/// - [`GoenvError::CommandNotFound`] if no entry provides the command. Its
///   `candidates` list the other installed versions that do.
pub fn locate<S: VersionStore + ?Sized>(
    config: &Config,
    store: &S,
    ctx: &ResolutionContext,
    command: &str,
) -> Result<Target> {
    let (spec, source) = resolve(config, ctx)?;
    let mut chain = Vec::with_capacity(spec.len());
    for entry in spec.versions() {
        let target = store.expand_alias(entry);
        if target == SYSTEM_VERSION {
            if let Some(path) = find_in_search_path(&ctx.search_path, command, &config.shims_dir()) {
                debug!("{command} found on system PATH at {}", path.display());
                return Ok(Target { version: None, path });
            }
            continue;
        }
        let version = store.match_installed(&target).ok_or_else(|| GoenvError::VersionNotInstalled {
            version: entry.clone(),
            origin: source.origin(config),
        })?;
        if let Some(path) = store.find_command(&version, command) {
            debug!("{command} found in {version} at {}", path.display());
            return Ok(Target { version: Some(version), path });
        }
        chain.push(version);
    }

    let candidates = store
        .versions_with_command(command)?
        .into_iter()
        .map(|(version, _)| version)
        .filter(|version| !chain.contains(version))
        .collect();
    Err(GoenvError::CommandNotFound {
        command: command.to_string(),
        candidates,
    })
}

/// Path of `command` for the active version chain. See [`locate`].
pub fn which<S: VersionStore + ?Sized>(
    config: &Config,
    store: &S,
    ctx: &ResolutionContext,
    command: &str,
) -> Result<PathBuf> {
    locate(config, store, ctx, command).map(|target| target.path)
}

/// Every installed version providing `command`, in listing order, ignoring
/// the active chain.
pub fn whence<S: VersionStore + ?Sized>(store: &S, command: &str) -> Result<Vec<(String, PathBuf)>> {
    store.versions_with_command(command)
}

/// Environment overrides for running a command from `target`.
///
/// The version's `bin` (and tool `bin`) directories go in front of `PATH`,
/// `GOROOT` points at the version, `GOPATH` gets the version's tool tree in
/// front of `existing_gopath`, and `GOCACHE` is the host-qualified build
/// cache. A `system` target gets no overrides.
pub fn exec_env<S: VersionStore + ?Sized>(
    config: &Config,
    store: &S,
    ctx: &ResolutionContext,
    target: &Target,
    existing_gopath: Option<OsString>,
) -> Result<Vec<(String, OsString)>> {
    let Some(version) = &target.version else {
        return Ok(Vec::new());
    };
    let version_dir = store.version_dir(version);
    let gopath = version_dir.join(GOPATH_DIR);

    let mut path = vec![version_dir.join("bin")];
    if !config.disable_gopath {
        path.push(gopath.join("bin"));
    }
    path.extend(ctx.search_path.iter().cloned());
    let path = std::env::join_paths(path).map_err(|e| GoenvError::io("build PATH", std::io::Error::other(e)))?;

    let mut env = vec![
        ("PATH".to_string(), path),
        ("GOROOT".to_string(), version_dir.clone().into_os_string()),
    ];
    if !config.disable_gopath {
        let mut dirs = vec![gopath];
        if let Some(existing) = existing_gopath.filter(|g| !g.is_empty()) {
            dirs.extend(std::env::split_paths(&existing));
        }
        let joined = std::env::join_paths(dirs)
            .map_err(|e| GoenvError::io("build GOPATH", std::io::Error::other(e)))?;
        env.push(("GOPATH".to_string(), joined));
    }
    let cache = version_dir.join(CacheKey::host().dir_name(CacheKind::Build));
    env.push(("GOCACHE".to_string(), cache.into_os_string()));
    Ok(env)
}

/// Whether a finished `go` invocation may have installed new tools.
pub fn should_auto_rehash(config: &Config, command: &str, args: &[String]) -> bool {
    if config.no_auto_rehash || command != "go" {
        return false;
    }
    go_subcommand(args) == Some("install")
}

/// First non-flag argument of a `go` invocation. `-C` takes the next
/// argument as its directory.
fn go_subcommand(args: &[String]) -> Option<&str> {
    let mut args = args.iter();
    while let Some(arg) = args.next() {
        if arg == "-C" {
            args.next();
        } else if !arg.starts_with('-') {
            return Some(arg);
        }
    }
    None
}

/// Runs `command` with `args` from the active version and returns its exit
/// code. A successful `go install` is followed by a rehash.
pub fn exec<S: VersionStore + ?Sized>(
    config: &Config,
    store: &S,
    ctx: &ResolutionContext,
    command: &str,
    args: &[String],
) -> Result<i32> {
    let target = locate(config, store, ctx, command)?;
    let env = exec_env(config, store, ctx, &target, std::env::var_os("GOPATH"))?;
    debug!("exec {} {args:?}", target.path.display());
    let status = Command::new(&target.path)
        .args(args)
        .envs(env)
        .status()
        .map_err(|e| GoenvError::io(format!("run {}", target.path.display()), e))?;

    if status.success() && should_auto_rehash(config, command, args) {
        if let Err(e) = rehash(config, store) {
            warn!("rehash after install failed: {e}");
        }
    }
    Ok(status.code().unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::util::test_support::write_executable;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, Config, ResolutionContext) {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path().join("root"));
        let work = dir.path().join("work");
        std::fs::create_dir_all(&work).unwrap();
        let ctx = ResolutionContext::new(&work);
        (dir, config, ctx)
    }

    #[test]
    fn test_multi_version_fallback() {
        let (_dir, config, ctx) = setup();
        std::fs::write(ctx.dir.join(".go-version"), "1.11.1\n1.10.3\n").unwrap();
        let store = MemoryStore::new("/v")
            .with_version("1.11.1", &["go"])
            .with_version("1.10.3", &["go", "godoc"]);
        assert_eq!(which(&config, &store, &ctx, "go").unwrap(), PathBuf::from("/v/1.11.1/bin/go"));
        assert_eq!(which(&config, &store, &ctx, "godoc").unwrap(), PathBuf::from("/v/1.10.3/bin/godoc"));
    }

    #[test]
    fn test_uninstalled_version_is_an_error() {
        let (_dir, config, ctx) = setup();
        let ctx = ctx.with_version("1.99.0:1.21.0");
        let store = MemoryStore::new("/v").with_version("1.21.0", &["go"]);
        let err = which(&config, &store, &ctx, "go").unwrap_err();
        assert!(matches!(
            err,
            GoenvError::VersionNotInstalled { ref version, ref origin }
                if version == "1.99.0" && origin == "GOENV_VERSION environment variable"
        ));
    }

    #[test]
    fn test_not_found_lists_other_versions() {
        let (_dir, config, ctx) = setup();
        let ctx = ctx.with_version("1.21.0");
        let store = MemoryStore::new("/v")
            .with_version("1.20.0", &["go", "gopls"])
            .with_version("1.21.0", &["go"])
            .with_version("1.22.0", &["go", "gopls"]);
        match which(&config, &store, &ctx, "gopls").unwrap_err() {
            GoenvError::CommandNotFound { command, candidates } => {
                assert_eq!(command, "gopls");
                assert_eq!(candidates, vec!["1.20.0", "1.22.0"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_alias_in_version_file_dispatches_to_target() {
        let (_dir, config, ctx) = setup();
        std::fs::write(ctx.dir.join(".go-version"), "stable\n").unwrap();
        let store = MemoryStore::new("/v")
            .with_version("1.21.0", &["go"])
            .with_version("1.22.5", &["go"])
            .with_alias("stable", "1.21.0");
        let target = locate(&config, &store, &ctx, "go").unwrap();
        assert_eq!(target.version.as_deref(), Some("1.21.0"));
    }

    #[test]
    fn test_alias_to_system_searches_path() {
        let (dir, config, ctx) = setup();
        let system_bin = dir.path().join("usr").join("bin");
        let real = write_executable(&system_bin, "go");
        let ctx = ctx.with_version("host").with_search_path(vec![system_bin]);
        let store = MemoryStore::new("/v").with_alias("host", "system");
        let target = locate(&config, &store, &ctx, "go").unwrap();
        assert_eq!(target, Target { version: None, path: real });
    }

    #[test]
    fn test_alias_to_missing_version_reports_alias_name() {
        let (_dir, config, ctx) = setup();
        let ctx = ctx.with_version("stable");
        let store = MemoryStore::new("/v").with_alias("stable", "1.19.0");
        let err = which(&config, &store, &ctx, "go").unwrap_err();
        assert!(matches!(err, GoenvError::VersionNotInstalled { ref version, .. } if version == "stable"));
    }

    #[test]
    fn test_partial_version_in_chain() {
        let (_dir, config, ctx) = setup();
        let ctx = ctx.with_version("1.21");
        let store = MemoryStore::new("/v")
            .with_version("1.21.3", &["go"])
            .with_version("1.21.10", &["go"]);
        let target = locate(&config, &store, &ctx, "go").unwrap();
        assert_eq!(target.version.as_deref(), Some("1.21.10"));
    }

    #[test]
    fn test_system_skips_shims_dir() {
        let (dir, config, ctx) = setup();
        write_executable(&config.shims_dir(), "go");
        let system_bin = dir.path().join("usr").join("bin");
        let real = write_executable(&system_bin, "go");
        let ctx = ctx.with_search_path(vec![config.shims_dir(), system_bin]);
        let target = locate(&config, &MemoryStore::new("/v"), &ctx, "go").unwrap();
        assert_eq!(target.version, None);
        assert_eq!(target.path, real);
    }

    #[test]
    fn test_system_without_command_is_not_found() {
        let (_dir, config, ctx) = setup();
        let err = which(&config, &MemoryStore::new("/v"), &ctx, "go").unwrap_err();
        assert_eq!(err.to_string(), "goenv: 'go' command not found");
    }

    #[test]
    fn test_whence_ignores_active_chain() {
        let store = MemoryStore::new("/v")
            .with_version("1.10.0", &["go", "godoc"])
            .with_version("1.9.0", &["go", "godoc"])
            .with_version("1.21.0", &["go"]);
        let versions: Vec<String> = whence(&store, "godoc").unwrap().into_iter().map(|(v, _)| v).collect();
        assert_eq!(versions, vec!["1.10.0", "1.9.0"]);
    }

    #[test]
    fn test_exec_env_for_installed_version() {
        let (_dir, config, ctx) = setup();
        let ctx = ctx.with_search_path(vec![PathBuf::from("/usr/bin")]);
        let store = MemoryStore::new("/v").with_version("1.21.0", &["go"]);
        let target = Target { version: Some("1.21.0".to_string()), path: PathBuf::from("/v/1.21.0/bin/go") };
        let env = exec_env(&config, &store, &ctx, &target, Some(OsString::from("/home/me/go"))).unwrap();
        let get = |k: &str| env.iter().find(|(key, _)| key == k).map(|(_, v)| v.clone());

        let path: Vec<PathBuf> = std::env::split_paths(&get("PATH").unwrap()).collect();
        assert_eq!(path[0], PathBuf::from("/v/1.21.0/bin"));
        assert_eq!(path[1], PathBuf::from("/v/1.21.0/gopath/bin"));
        assert_eq!(path[2], PathBuf::from("/usr/bin"));
        assert_eq!(get("GOROOT").unwrap(), OsString::from("/v/1.21.0"));
        let gopath: Vec<PathBuf> = std::env::split_paths(&get("GOPATH").unwrap()).collect();
        assert_eq!(gopath, vec![PathBuf::from("/v/1.21.0/gopath"), PathBuf::from("/home/me/go")]);
        let cache = PathBuf::from(get("GOCACHE").unwrap());
        assert_eq!(cache.parent().unwrap(), PathBuf::from("/v/1.21.0"));
        assert!(cache.file_name().unwrap().to_string_lossy().starts_with("go-build-"));
    }

    #[test]
    fn test_exec_env_without_gopath() {
        let (_dir, mut config, ctx) = setup();
        config.disable_gopath = true;
        let store = MemoryStore::new("/v").with_version("1.21.0", &["go"]);
        let target = Target { version: Some("1.21.0".to_string()), path: PathBuf::from("/v/1.21.0/bin/go") };
        let env = exec_env(&config, &store, &ctx, &target, None).unwrap();
        assert!(env.iter().all(|(k, _)| k != "GOPATH"));
    }

    #[test]
    fn test_exec_env_for_system_is_empty() {
        let (_dir, config, ctx) = setup();
        let target = Target { version: None, path: PathBuf::from("/usr/bin/go") };
        assert!(exec_env(&config, &MemoryStore::new("/v"), &ctx, &target, None).unwrap().is_empty());
    }

    #[test]
    fn test_should_auto_rehash() {
        let (_dir, mut config, _ctx) = setup();
        let args = |a: &[&str]| a.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert!(should_auto_rehash(&config, "go", &args(&["install", "golang.org/x/tools/gopls@latest"])));
        assert!(should_auto_rehash(&config, "go", &args(&["-v", "install", "./..."])));
        assert!(!should_auto_rehash(&config, "go", &args(&["build", "install"])));
        assert!(!should_auto_rehash(&config, "gofmt", &args(&["install"])));
        assert!(should_auto_rehash(&config, "go", &args(&["-C", "./tools", "install", "./..."])));
        assert!(should_auto_rehash(&config, "go", &args(&["-C=./tools", "install"])));
        assert!(!should_auto_rehash(&config, "go", &args(&["-C", "install", "build"])));
        assert!(!should_auto_rehash(&config, "go", &args(&["-C"])));
        config.no_auto_rehash = true;
        assert!(!should_auto_rehash(&config, "go", &args(&["install", "x"])));
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_runs_and_propagates_exit_code() {
        use std::os::unix::fs::PermissionsExt;
        let (_dir, config, ctx) = setup();
        let bin = config.version_dir("1.21.0").join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let script = bin.join("fail");
        std::fs::write(&script, "#!/bin/sh\nexit 3\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let store = crate::store::FsVersionStore::from_config(&config);
        let ctx = ctx.with_version("1.21.0").with_search_path(vec![PathBuf::from("/bin"), PathBuf::from("/usr/bin")]);
        assert_eq!(exec(&config, &store, &ctx, "fail", &[]).unwrap(), 3);
    }
}

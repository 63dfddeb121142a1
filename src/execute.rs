use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};
use colored::Colorize;
use goenv::cache::{cache_status, clean_caches, migrate_all, CleanOptions, DEFAULT_SIZE_BUDGET};
use goenv::util::{find_in_search_path, format_size};
use goenv::{
    exec, find_version_file, read_aliases, remove_alias, set_alias, list_shims, read_version_file, rehash, resolve, sort_by_version,
    uninstall_version, unset_version_file, validate_version, whence, which, write_version_file,
    Config, FsVersionStore, GoenvError, ResolutionContext, Source, VersionSpec, VersionStore,
    LOCAL_VERSION_FILE, SYSTEM_VERSION,
};
use crate::cli::{CacheCommand, GoenvCommand, CLI};

/// Runs a parsed command and returns the process exit code.
pub fn execute(cli: CLI, config: &Config) -> Result<i32> {
    let store = FsVersionStore::from_config(config);
    match cli.command {
        GoenvCommand::Rehash => execute_rehash(config, &store),
        GoenvCommand::Shims { short } => execute_shims(config, short),
        GoenvCommand::Which { command } => execute_which(config, &store, &command),
        GoenvCommand::Whence { path, command } => execute_whence(&store, &command, path),
        GoenvCommand::Exec { command, args } => {
            let ctx = context()?;
            Ok(exec(config, &store, &ctx, &command, &args)?)
        }
        GoenvCommand::Version => execute_version(config, &store),
        GoenvCommand::VersionName => execute_version_name(config, &store),
        GoenvCommand::VersionOrigin => execute_version_origin(config),
        GoenvCommand::VersionFile { dir } => execute_version_file(config, dir),
        GoenvCommand::VersionFileRead { file } => execute_version_file_read(&file),
        GoenvCommand::VersionFileWrite { file, versions } => {
            execute_version_file_write(&store, &file, &versions)
        }
        GoenvCommand::Versions { bare } => execute_versions(config, &store, bare),
        GoenvCommand::Global { versions } => execute_global(config, &store, &versions),
        GoenvCommand::Local { unset, versions } => execute_local(&store, unset, &versions),
        GoenvCommand::Alias { name, version } => execute_alias(config, name, version),
        GoenvCommand::Unalias { name } => execute_unalias(config, &name),
        GoenvCommand::Uninstall { version } => execute_uninstall(config, &version),
        GoenvCommand::Cache { command } => match command {
            CacheCommand::Status { fast, json } => execute_cache_status(&store, fast, json),
            CacheCommand::Migrate { dry_run } => execute_cache_migrate(&store, dry_run),
            CacheCommand::Clean { kind, version, dry_run } => {
                execute_cache_clean(&store, CleanOptions { kind, version, dry_run })
            }
        },
    }
}

fn context() -> Result<ResolutionContext> {
    ResolutionContext::from_env().context("could not determine the working directory")
}

pub fn execute_rehash(config: &Config, store: &FsVersionStore) -> Result<i32> {
    let count = rehash(config, store)?;
    println!("Rehashed {count} shims");
    Ok(0)
}

pub fn execute_shims(config: &Config, short: bool) -> Result<i32> {
    for shim in list_shims(config)? {
        match (short, shim.file_name()) {
            (true, Some(name)) => println!("{}", name.to_string_lossy()),
            _ => println!("{}", shim.display()),
        }
    }
    Ok(0)
}

pub fn execute_which(config: &Config, store: &FsVersionStore, command: &str) -> Result<i32> {
    let ctx = context()?;
    let path = which(config, store, &ctx, command)?;
    println!("{}", path.display());
    Ok(0)
}

pub fn execute_whence(store: &FsVersionStore, command: &str, print_path: bool) -> Result<i32> {
    let found = whence(store, command)?;
    for (version, path) in &found {
        if print_path {
            println!("{}", path.display());
        } else {
            println!("{version}");
        }
    }
    Ok(if found.is_empty() { 1 } else { 0 })
}

/// Fails when an entry of the active chain is not installed.
fn check_installed(config: &Config, store: &FsVersionStore, spec: &VersionSpec, source: &Source) -> Result<()> {
    for version in spec.versions() {
        if !store.is_available(version) {
            return Err(GoenvError::VersionNotInstalled {
                version: version.clone(),
                origin: source.origin(config),
            }
            .into());
        }
    }
    Ok(())
}

pub fn execute_version(config: &Config, store: &FsVersionStore) -> Result<i32> {
    let (spec, source) = resolve(config, &context()?)?;
    check_installed(config, store, &spec, &source)?;
    let origin = source.origin(config);
    for version in spec.versions() {
        println!("{version} (set by {origin})");
    }
    Ok(0)
}

pub fn execute_version_name(config: &Config, store: &FsVersionStore) -> Result<i32> {
    let (spec, source) = resolve(config, &context()?)?;
    check_installed(config, store, &spec, &source)?;
    println!("{spec}");
    Ok(0)
}

pub fn execute_version_origin(config: &Config) -> Result<i32> {
    let ctx = context()?;
    match &ctx.origin_override {
        Some(label) => println!("{label}"),
        None => {
            let (_, source) = resolve(config, &ctx)?;
            println!("{}", source.origin(config));
        }
    }
    Ok(0)
}

pub fn execute_version_file(config: &Config, dir: Option<PathBuf>) -> Result<i32> {
    match dir {
        Some(dir) => {
            let file = find_version_file(&dir).ok_or(GoenvError::NoVersionFile(dir))?;
            println!("{}", file.display());
        }
        None => {
            let ctx = context()?;
            let file = find_version_file(&ctx.dir).unwrap_or_else(|| config.global_version_file());
            println!("{}", file.display());
        }
    }
    Ok(0)
}

pub fn execute_version_file_read(file: &Path) -> Result<i32> {
    println!("{}", read_version_file(file)?);
    Ok(0)
}

/// Validates `versions` and checks that each one is installed (`system` excepted).
fn installed_spec(store: &FsVersionStore, versions: &[String]) -> Result<VersionSpec> {
    for version in versions {
        validate_version(version)?;
        if !store.is_available(version) {
            bail!("goenv: version '{version}' not installed");
        }
    }
    VersionSpec::new(versions).ok_or_else(|| anyhow::anyhow!("goenv: no version given"))
}

fn is_only_system(versions: &[String]) -> bool {
    matches!(versions, [only] if only == SYSTEM_VERSION)
}

pub fn execute_version_file_write(store: &FsVersionStore, file: &Path, versions: &[String]) -> Result<i32> {
    if is_only_system(versions) {
        unset_version_file(file)?;
        return Ok(0);
    }
    let spec = installed_spec(store, versions)?;
    write_version_file(file, &spec)?;
    Ok(0)
}

pub fn execute_versions(config: &Config, store: &FsVersionStore, bare: bool) -> Result<i32> {
    let ctx = context()?;
    let mut installed = store.installed_versions()?;
    sort_by_version(&mut installed);
    let mut listed = Vec::new();
    if find_in_search_path(&ctx.search_path, "go", &config.shims_dir()).is_some() {
        listed.push(SYSTEM_VERSION.to_string());
    }
    listed.extend(installed);

    if bare {
        for version in &listed {
            println!("{version}");
        }
        return Ok(0);
    }

    let (spec, source) = resolve(config, &ctx)?;
    let active: Vec<String> = spec
        .versions()
        .iter()
        .map(|v| store.resolve_installed(v).unwrap_or_else(|| store.expand_alias(v)))
        .collect();
    let origin = source.origin(config);
    for version in &listed {
        if active.contains(version) {
            println!("{}", format!("* {version} (set by {origin})").green());
        } else {
            println!("  {version}");
        }
    }
    Ok(0)
}

pub fn execute_global(config: &Config, store: &FsVersionStore, versions: &[String]) -> Result<i32> {
    let file = config.global_version_file();
    if versions.is_empty() {
        let spec = config
            .global_version_files()
            .iter()
            .find_map(|path| read_version_file(path).ok())
            .unwrap_or_else(VersionSpec::system);
        println!("{spec}");
        return Ok(0);
    }
    let spec = installed_spec(store, versions)?;
    write_version_file(&file, &spec)?;
    Ok(0)
}

pub fn execute_local(store: &FsVersionStore, unset: bool, versions: &[String]) -> Result<i32> {
    let ctx = context()?;
    let file = ctx.dir.join(LOCAL_VERSION_FILE);
    if unset {
        unset_version_file(&file)?;
        return Ok(0);
    }
    if versions.is_empty() {
        let spec = read_version_file(&file).map_err(|e| match e {
            GoenvError::NoVersionFile(_) => anyhow::anyhow!("goenv: no local version configured for this directory"),
            other => other.into(),
        })?;
        println!("{spec}");
        return Ok(0);
    }
    let spec = installed_spec(store, versions)?;
    write_version_file(&file, &spec)?;
    Ok(0)
}

pub fn execute_alias(config: &Config, name: Option<String>, version: Option<String>) -> Result<i32> {
    let file = config.aliases_file();
    match (name, version) {
        (None, _) => {
            let aliases = read_aliases(&file)?;
            if aliases.is_empty() {
                println!("No aliases defined");
            }
            for (name, version) in &aliases {
                println!("{name} -> {version}");
            }
        }
        (Some(name), None) => match read_aliases(&file)?.remove(&name) {
            Some(version) => println!("{version}"),
            None => return Err(GoenvError::AliasNotFound(name).into()),
        },
        (Some(name), Some(version)) => set_alias(&file, &name, &version)?,
    }
    Ok(0)
}

pub fn execute_unalias(config: &Config, name: &str) -> Result<i32> {
    remove_alias(config.aliases_file(), name)?;
    Ok(0)
}

pub fn execute_uninstall(config: &Config, version: &str) -> Result<i32> {
    if !uninstall_version(config, version)? {
        bail!("goenv: version '{version}' not installed");
    }
    println!("Uninstalled {version}");
    Ok(0)
}

pub fn execute_cache_status(store: &FsVersionStore, fast: bool, json: bool) -> Result<i32> {
    let status = cache_status(store, fast, DEFAULT_SIZE_BUDGET)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(0);
    }
    if status.caches.is_empty() {
        println!("No caches found");
        return Ok(0);
    }
    for cache in &status.caches {
        let name = cache
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let files = match cache.size.files {
            Some(files) => format!("{files} files"),
            None => "? files".to_string(),
        };
        let marker = if cache.legacy { " (legacy)".yellow().to_string() } else { String::new() };
        println!(
            "{:<12} {:<40} {:>10} {:>14}{marker}",
            cache.version,
            name,
            format_size(cache.size.bytes),
            files
        );
    }
    let total_files = match status.total_files {
        Some(files) => files.to_string(),
        None => "?".to_string(),
    };
    println!("Total: {} in {total_files} files", format_size(status.total_bytes));
    Ok(0)
}

pub fn execute_cache_migrate(store: &FsVersionStore, dry_run: bool) -> Result<i32> {
    let report = migrate_all(store, dry_run)?;
    let verb = if dry_run { "Would migrate" } else { "Migrated" };
    for (version, path) in &report.migrated {
        println!("{verb} {version} cache to {}", path.display());
    }
    if report.migrated.is_empty() && report.failed.is_empty() {
        println!("Nothing to migrate");
    }
    for (version, err) in &report.failed {
        eprintln!("{}", format!("{version}: {err}").red());
    }
    if !report.failed.is_empty() {
        bail!("goenv: {} cache migration(s) failed", report.failed.len());
    }
    Ok(0)
}

pub fn execute_cache_clean(store: &FsVersionStore, options: CleanOptions) -> Result<i32> {
    let report = clean_caches(store, &options)?;
    let verb = if options.dry_run { "Would remove" } else { "Removed" };
    for path in &report.removed {
        println!("{verb} {}", path.display());
    }
    println!(
        "{verb} {} cache(s), {}",
        report.removed.len(),
        format_size(report.bytes)
    );
    Ok(0)
}

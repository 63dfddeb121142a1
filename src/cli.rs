use std::path::PathBuf;
use clap::{Parser, Subcommand};
use goenv::cache::CacheKind;

#[derive(Debug, Parser, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct CLI {
    #[command(subcommand)]
    pub(crate) command: GoenvCommand,
}

#[derive(Debug, Subcommand, Clone, PartialEq)]
pub enum GoenvCommand {
    /// Rebuild the shims for every command of every installed version
    Rehash,
    /// List existing shims
    Shims {
        /// Print only the shim names
        #[clap(long)]
        short: bool,
    },
    /// Output the full path of the command the active version would run
    Which {
        command: String,
    },
    /// List all installed versions that contain the command
    Whence {
        /// Print the executable path instead of the version
        #[clap(long)]
        path: bool,
        command: String,
    },
    /// Run a command from the active version
    Exec {
        command: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Show the active version and where it was set
    Version,
    /// Show the active version
    VersionName,
    /// Explain where the active version was set
    VersionOrigin,
    /// Print the version file that sets the active version
    VersionFile {
        /// Directory to search from instead of the current one
        dir: Option<PathBuf>,
    },
    /// Print the versions named by a version file
    VersionFileRead {
        file: PathBuf,
    },
    /// Write versions to a version file. A single `system` removes the file
    VersionFileWrite {
        file: PathBuf,
        #[arg(required = true)]
        versions: Vec<String>,
    },
    /// List installed versions, marking the active one
    Versions {
        /// Print only the version names
        #[clap(long)]
        bare: bool,
    },
    /// Show or set the global version
    Global {
        versions: Vec<String>,
    },
    /// Show or set the version for the current directory
    Local {
        /// Remove the local version file
        #[clap(long)]
        unset: bool,
        versions: Vec<String>,
    },
    /// List aliases, show one, or point an alias at a version
    Alias {
        name: Option<String>,
        version: Option<String>,
    },
    /// Remove an alias
    Unalias {
        name: String,
    },
    /// Remove an installed version and its shims
    Uninstall {
        version: String,
    },
    /// Inspect and manage per-version build and module caches
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

#[derive(Debug, Subcommand, Clone, PartialEq)]
pub enum CacheCommand {
    /// Show cache sizes per version
    Status {
        /// Skip counting files
        #[clap(long)]
        fast: bool,
        /// Print machine-readable JSON
        #[clap(long)]
        json: bool,
    },
    /// Move legacy `go-build` caches to the architecture-specific name for this machine
    Migrate {
        /// Only show what would be moved
        #[clap(long)]
        dry_run: bool,
    },
    /// Delete caches
    Clean {
        /// Only caches of this kind (build or mod)
        #[clap(long)]
        kind: Option<CacheKind>,
        /// Only caches of this version
        #[clap(long)]
        version: Option<String>,
        /// Only list what would be removed
        #[clap(long)]
        dry_run: bool,
    },
}

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the resolution, dispatch and shim engines.
#[derive(Error, Debug)]
pub enum GoenvError {
    /// An active version chain names a version that is not on disk.
    #[error("goenv: version '{version}' is not installed (set by {origin})")]
    VersionNotInstalled { version: String, origin: String },

    /// No version in the active chain provides the command.
    /// `candidates` lists other installed versions that do.
    #[error("goenv: '{command}' command not found")]
    CommandNotFound {
        command: String,
        candidates: Vec<String>,
    },

    #[error("goenv: no version file found in {0}")]
    NoVersionFile(PathBuf),

    #[error("goenv: no version found in {0}")]
    EmptyVersionFile(PathBuf),

    #[error("goenv: invalid version '{0}'")]
    InvalidVersion(String),

    #[error("goenv: system version not found in PATH")]
    SystemNotFound,

    #[error("goenv: cache target already exists: {0}")]
    CacheExists(PathBuf),

    #[error("goenv: invalid alias name '{name}': {reason}")]
    InvalidAlias { name: String, reason: String },

    #[error("goenv: alias '{0}' not found")]
    AliasNotFound(String),

    #[error("goenv: shims directory {path} is not usable: {source}")]
    ShimDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("goenv: failed to {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, GoenvError>;

impl GoenvError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        GoenvError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn shim_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GoenvError::ShimDir {
            path: path.into(),
            source,
        }
    }
}

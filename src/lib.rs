//! # goenv Core Library
//!
//! This crate contains the engines behind the `goenv` tool: a per-directory Go version manager.
//!
//! Many Go versions live side by side under `<root>/versions/<id>`. Small shim scripts in
//! `<root>/shims` forward every command (`go`, `gofmt`, `gopls`, ...) to the version selected
//! for the current directory.
//!
//! ## Modules Overview
//! - [`config`] – Root layout, environment flags and the per-invocation resolution context
//! - [`version`] – Version identifiers, fallback chains and ordering
//! - [`version_file`] – Reading and writing `.go-version`, the global file and `go.mod`
//! - [`store`] – Read-only view of installed versions
//! - [`alias`] – Named aliases for versions (`stable -> 1.22.5`)
//! - [`resolver`] – Active-version precedence (environment, local file, manifest, global)
//! - [`shims`] – Shim synchronization (`rehash`)
//! - [`dispatch`] – `which`, `whence` and `exec`
//! - [`cache`] – Build/module cache fingerprinting, status, migration and cleanup
//! - [`installer`] – Contracts for installers and release indexes
//! - [`error`] – The library error type

pub mod config;
pub mod error;
pub mod version;
pub mod version_file;
pub mod store;
pub mod alias;
pub mod resolver;
pub mod shims;
pub mod dispatch;
pub mod cache;
pub mod installer;
pub mod util;

pub use config::*;
pub use error::*;
pub use version::*;
pub use version_file::*;
pub use store::*;
pub use alias::*;
pub use resolver::*;
pub use shims::*;
pub use dispatch::*;
pub use installer::*;

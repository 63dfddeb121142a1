//! Build and module caches stored next to each installed version.
//!
//! Cache directories are named `go-build[-<goos>-<goarch>[-<abi tags>]]` and
//! `go-mod[-<goos>-<goarch>]`. [`fingerprint`] turns such a name into a
//! [`CacheKey`]; [`manager`] reports on, migrates and cleans the caches.

pub mod fingerprint;
pub mod manager;

pub use fingerprint::*;
pub use manager::*;

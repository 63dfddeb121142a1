use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use serde::Serialize;

pub const BUILD_CACHE_PREFIX: &str = "go-build";
pub const MOD_CACHE_PREFIX: &str = "go-mod";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    Build,
    Mod,
}

impl CacheKind {
    pub fn prefix(self) -> &'static str {
        match self {
            CacheKind::Build => BUILD_CACHE_PREFIX,
            CacheKind::Mod => MOD_CACHE_PREFIX,
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKind::Build => write!(f, "build"),
            CacheKind::Mod => write!(f, "mod"),
        }
    }
}

impl FromStr for CacheKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "build" => Ok(CacheKind::Build),
            "mod" => Ok(CacheKind::Mod),
            other => Err(format!("unknown cache kind '{other}' (expected build or mod)")),
        }
    }
}

/// Architecture identity of a cache: target OS, architecture and ABI variants
/// (`GOAMD64`, `GOARM`, `GOEXPERIMENT`, `CGO_HASH`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey {
    pub goos: String,
    pub goarch: String,
    pub abi: BTreeMap<String, String>,
}

/// A recognized cache directory name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheName {
    /// `go-build` / `go-mod` from before caches were split by architecture.
    Legacy(CacheKind),
    Keyed(CacheKind, CacheKey),
}

impl CacheName {
    pub fn kind(&self) -> CacheKind {
        match self {
            CacheName::Legacy(kind) | CacheName::Keyed(kind, _) => *kind,
        }
    }

    pub fn key(&self) -> Option<&CacheKey> {
        match self {
            CacheName::Keyed(_, key) => Some(key),
            CacheName::Legacy(_) => None,
        }
    }
}

impl CacheKey {
    pub fn new(goos: &str, goarch: &str) -> Self {
        CacheKey {
            goos: goos.to_string(),
            goarch: goarch.to_string(),
            abi: BTreeMap::new(),
        }
    }

    /// Key of the machine this process runs on. `GOOS` and `GOARCH` are not
    /// consulted.
    pub fn host() -> Self {
        CacheKey::new(host_goos(), host_goarch())
    }

    pub fn with_abi(mut self, name: &str, value: &str) -> Self {
        self.abi.insert(name.to_string(), value.to_string());
        self
    }

    /// Directory name for a cache of `kind` with this key. Parsing the result
    /// with [`parse_cache_name`] yields an equal key.
    pub fn dir_name(&self, kind: CacheKind) -> String {
        let mut parts = vec![kind.prefix().to_string(), self.goos.clone(), self.goarch.clone()];
        for (name, value) in &self.abi {
            match name.as_str() {
                "GOARM" => parts.push(format!("v{value}")),
                "GOEXPERIMENT" | "CGO_HASH" | "CGO" => {}
                _ => parts.push(value.clone()),
            }
        }
        if let Some(exp) = self.abi.get("GOEXPERIMENT") {
            parts.push(format!("exp-{exp}"));
        }
        if let Some(hash) = self.abi.get("CGO_HASH") {
            parts.push(format!("cgo-{hash}"));
        } else if self.abi.contains_key("CGO") {
            parts.push("cgo".to_string());
        }
        parts.join("-")
    }
}

/// Parses a cache directory name.
///
/// Returns `None` for names this tool does not manage, including names with
/// any trailing segment that is not a known ABI tag for the architecture.
///
/// # Examples
///
/// ```
/// use goenv::cache::{parse_cache_name, CacheName};
///
/// let name = parse_cache_name("go-build-linux-arm-v7").unwrap();
/// assert_eq!(name.key().unwrap().abi["GOARM"], "7");
/// assert!(matches!(parse_cache_name("go-build"), Some(CacheName::Legacy(_))));
/// assert!(parse_cache_name("build-linux-amd64").is_none());
/// ```
pub fn parse_cache_name(name: &str) -> Option<CacheName> {
    for kind in [CacheKind::Build, CacheKind::Mod] {
        if name == kind.prefix() {
            return Some(CacheName::Legacy(kind));
        }
        if let Some(rest) = name.strip_prefix(kind.prefix()).and_then(|r| r.strip_prefix('-')) {
            return parse_key(rest).map(|key| CacheName::Keyed(kind, key));
        }
    }
    None
}

fn parse_key(rest: &str) -> Option<CacheKey> {
    let parts: Vec<&str> = rest.split('-').collect();
    if parts.len() < 2 || !is_platform_word(parts[0]) || !is_platform_word(parts[1]) {
        return None;
    }
    let mut key = CacheKey::new(parts[0], parts[1]);
    let mut tags = parts[2..].iter();
    while let Some(&tag) = tags.next() {
        let (name, value) = match tag {
            "exp" => ("GOEXPERIMENT", tags.next().filter(|v| is_experiment(v))?.to_string()),
            "cgo" => match tags.next() {
                Some(hash) if is_token(hash) => ("CGO_HASH", hash.to_string()),
                Some(_) => return None,
                None => ("CGO", "1".to_string()),
            },
            _ => arch_variant(&key.goarch, tag)?,
        };
        if key.abi.insert(name.to_string(), value).is_some() {
            return None;
        }
    }
    Some(key)
}

/// Maps an architecture-specific tag to its variable, if `goarch` has one.
fn arch_variant(goarch: &str, tag: &str) -> Option<(&'static str, String)> {
    let is_level = |t: &str| t.len() > 1 && t.starts_with('v') && t[1..].bytes().all(|b| b.is_ascii_digit());
    match goarch {
        "amd64" if is_level(tag) => Some(("GOAMD64", tag.to_string())),
        "arm" => {
            let level = tag.strip_prefix('v').unwrap_or(tag);
            matches!(level, "5" | "6" | "7").then(|| ("GOARM", level.to_string()))
        }
        "386" if matches!(tag, "sse2" | "softfloat") => Some(("GO386", tag.to_string())),
        "mips" | "mipsle" if matches!(tag, "hardfloat" | "softfloat") => {
            Some(("GOMIPS", tag.to_string()))
        }
        "mips64" | "mips64le" if matches!(tag, "hardfloat" | "softfloat") => {
            Some(("GOMIPS64", tag.to_string()))
        }
        "ppc64" | "ppc64le" if matches!(tag, "power8" | "power9" | "power10") => {
            Some(("GOPPC64", tag.to_string()))
        }
        "riscv64" if tag.starts_with("rva") && tag.ends_with("u64") && tag.len() > 6 => {
            Some(("GORISCV64", tag.to_string()))
        }
        "wasm" if matches!(tag, "satconv" | "signext") => Some(("GOWASM", tag.to_string())),
        _ => None,
    }
}

fn is_platform_word(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn is_experiment(s: &str) -> bool {
    !s.is_empty()
        && s.split(',')
            .all(|e| !e.is_empty() && e.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_'))
}

/// Go's name for the operating system this binary was built for.
pub fn host_goos() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

/// Go's name for the architecture this binary was built for.
pub fn host_goarch() -> &'static str {
    let little = cfg!(target_endian = "little");
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "loongarch64" => "loong64",
        "wasm32" => "wasm",
        "powerpc64" if little => "ppc64le",
        "powerpc64" => "ppc64",
        "powerpc" => "ppc",
        "mips" if little => "mipsle",
        "mips64" if little => "mips64le",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_name() {
        let name = parse_cache_name("go-build-linux-amd64-v3-exp-boringcrypto-cgo-abc12345").unwrap();
        let expected = CacheKey::new("linux", "amd64")
            .with_abi("GOAMD64", "v3")
            .with_abi("GOEXPERIMENT", "boringcrypto")
            .with_abi("CGO_HASH", "abc12345");
        assert_eq!(name, CacheName::Keyed(CacheKind::Build, expected));
    }

    #[test]
    fn test_parse_plain_key_has_empty_abi() {
        let name = parse_cache_name("go-build-darwin-arm64").unwrap();
        let key = name.key().unwrap();
        assert_eq!((key.goos.as_str(), key.goarch.as_str()), ("darwin", "arm64"));
        assert!(key.abi.is_empty());
    }

    #[test]
    fn test_legacy_names() {
        assert_eq!(parse_cache_name("go-build"), Some(CacheName::Legacy(CacheKind::Build)));
        assert_eq!(parse_cache_name("go-mod"), Some(CacheName::Legacy(CacheKind::Mod)));
    }

    #[test]
    fn test_not_recognized() {
        for name in [
            "build-linux-amd64",
            "go-build-linux",
            "go-build-",
            "go-buildx",
            "go-build-linux-amd64-turbo",
            "go-build-linux-arm64-v3",
            "go-build-linux-amd64-exp",
            "go-build-linux-amd64-v3-v2",
            "go-build-Linux-amd64",
        ] {
            assert_eq!(parse_cache_name(name), None, "{name}");
        }
    }

    #[test]
    fn test_arch_specific_tags() {
        let abi = |n: &str| parse_cache_name(n).unwrap().key().unwrap().abi.clone();
        assert_eq!(abi("go-build-linux-arm-v6")["GOARM"], "6");
        assert_eq!(abi("go-build-linux-arm-7")["GOARM"], "7");
        assert_eq!(abi("go-build-linux-386-softfloat")["GO386"], "softfloat");
        assert_eq!(abi("go-build-linux-mipsle-hardfloat")["GOMIPS"], "hardfloat");
        assert_eq!(abi("go-build-linux-mips64-softfloat")["GOMIPS64"], "softfloat");
        assert_eq!(abi("go-build-linux-ppc64le-power9")["GOPPC64"], "power9");
        assert_eq!(abi("go-build-linux-riscv64-rva22u64")["GORISCV64"], "rva22u64");
        assert_eq!(abi("go-build-js-wasm-satconv")["GOWASM"], "satconv");
        assert_eq!(abi("go-build-linux-amd64-cgo")["CGO"], "1");
        assert_eq!(abi("go-build-linux-amd64-exp-arenas,loopvar")["GOEXPERIMENT"], "arenas,loopvar");
    }

    #[test]
    fn test_mod_cache_key() {
        let name = parse_cache_name("go-mod-linux-amd64").unwrap();
        assert_eq!(name.kind(), CacheKind::Mod);
        assert_eq!(name.key().unwrap(), &CacheKey::new("linux", "amd64"));
    }

    #[test]
    fn test_dir_name_parses_back() {
        let key = CacheKey::new("linux", "arm")
            .with_abi("GOARM", "7")
            .with_abi("GOEXPERIMENT", "boringcrypto")
            .with_abi("CGO_HASH", "deadbeef");
        let name = key.dir_name(CacheKind::Build);
        assert_eq!(name, "go-build-linux-arm-v7-exp-boringcrypto-cgo-deadbeef");
        assert_eq!(parse_cache_name(&name).unwrap().key(), Some(&key));
    }

    #[test]
    fn test_host_key_uses_go_names() {
        let key = CacheKey::host();
        assert_ne!(key.goos, "macos");
        assert_ne!(key.goarch, "x86_64");
        assert_ne!(key.goarch, "aarch64");
        assert!(key.abi.is_empty());
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("build".parse::<CacheKind>(), Ok(CacheKind::Build));
        assert_eq!("mod".parse::<CacheKind>(), Ok(CacheKind::Mod));
        assert!("other".parse::<CacheKind>().is_err());
    }
}

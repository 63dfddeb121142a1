use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;
use regex::Regex;
use semver::{Prerelease, Version};
use crate::error::{GoenvError, Result};

/// Identifier that resolves through the OS search path instead of an installed version.
pub const SYSTEM_VERSION: &str = "system";
/// Identifier for the highest installed version.
pub const LATEST_VERSION: &str = "latest";

static GO_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:-?(alpha|beta|rc)\.?(\d+))?$")
        .expect("static regex")
});

/// Ordered, duplicate-free fallback list of version identifiers.
///
/// The first entry is the one shown to users; all entries are tried in order
/// when looking up a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSpec(Vec<String>);

impl VersionSpec {
    /// Builds a spec from identifiers, dropping blanks and later duplicates.
    /// Returns `None` when nothing is left.
    pub fn new<I, S>(versions: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for version in versions {
            let version = version.as_ref().trim();
            if version.is_empty() || out.iter().any(|v| v == version) {
                continue;
            }
            out.push(version.to_string());
        }
        if out.is_empty() { None } else { Some(VersionSpec(out)) }
    }

    /// Parses a colon- or newline-separated list.
    pub fn parse(text: &str) -> Option<Self> {
        VersionSpec::new(text.split([':', '\n', '\r']))
    }

    pub fn system() -> Self {
        VersionSpec(vec![SYSTEM_VERSION.to_string()])
    }

    pub fn first(&self) -> &str {
        &self.0[0]
    }

    pub fn versions(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_system(&self) -> bool {
        self.0.len() == 1 && self.0[0] == SYSTEM_VERSION
    }

    pub fn contains(&self, version: &str) -> bool {
        self.0.iter().any(|v| v == version)
    }

    /// Newline-joined form used by version files.
    pub fn to_file_content(&self) -> String {
        let mut content = self.0.join("\n");
        content.push('\n');
        content
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(":"))
    }
}

/// Rejects identifiers that could escape the versions directory or break
/// file parsing. `system` and `latest` are always accepted.
pub fn validate_version(version: &str) -> Result<()> {
    let invalid = || Err(GoenvError::InvalidVersion(version.to_string()));
    if version.is_empty() {
        return invalid();
    }
    if version == SYSTEM_VERSION || version == LATEST_VERSION {
        return Ok(());
    }
    if version.contains("..")
        || version.contains('/')
        || version.contains('\\')
        || version.starts_with('.')
        || version.len() > 255
    {
        return invalid();
    }
    let bytes = version.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        return invalid();
    }
    if version.chars().any(|c| c <= ' ' || c == '\u{7f}') {
        return invalid();
    }
    Ok(())
}

/// Strips a leading `go` (as in `go1.22.5`).
pub fn normalize_version(version: &str) -> &str {
    version.strip_prefix("go").unwrap_or(version)
}

/// Reads a Go version string as a semver version: missing parts are zero and
/// `1.22rc1` becomes `1.22.0-rc.1`.
pub fn to_semver(version: &str) -> Option<Version> {
    let caps = GO_VERSION.captures(normalize_version(version))?;
    let part = |i: usize| -> Option<u64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    let mut parsed = Version::new(part(1)?, part(2)?, part(3)?);
    if let (Some(kind), Some(num)) = (caps.get(4), caps.get(5)) {
        parsed.pre = Prerelease::new(&format!("{}.{}", kind.as_str(), num.as_str())).ok()?;
    }
    Some(parsed)
}

/// Orders two version strings: numeric by dot-separated parts, and a stable
/// release sorts above its rc, beta and alpha builds. Strings that are not Go
/// versions sort below those that are, and among themselves lexically.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (to_semver(a), to_semver(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

/// Highest version in the slice, if any.
pub fn max_version<'a>(versions: impl IntoIterator<Item = &'a String>) -> Option<&'a String> {
    versions.into_iter().max_by(|a, b| compare_versions(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_order_and_dedupes() {
        let spec = VersionSpec::parse("1.11.1\n1.10.3\n1.11.1").unwrap();
        assert_eq!(spec.versions(), &["1.11.1".to_string(), "1.10.3".to_string()]);
        assert_eq!(spec.first(), "1.11.1");
        assert_eq!(spec.to_string(), "1.11.1:1.10.3");
    }

    #[test]
    fn test_parse_colon_joined() {
        let spec = VersionSpec::parse("1.22.0:system").unwrap();
        assert_eq!(spec.len(), 2);
        assert!(spec.contains("system"));
        assert!(!spec.is_system());
    }

    #[test]
    fn test_parse_empty_is_none() {
        assert!(VersionSpec::parse("").is_none());
        assert!(VersionSpec::parse(" \n\r\n").is_none());
    }

    #[test]
    fn test_file_content_is_newline_joined() {
        let spec = VersionSpec::new(["1.21.0", "1.20.5"]).unwrap();
        assert_eq!(spec.to_file_content(), "1.21.0\n1.20.5\n");
    }

    #[test]
    fn test_validate_version() {
        assert!(validate_version("1.22.1").is_ok());
        assert!(validate_version("system").is_ok());
        assert!(validate_version("latest").is_ok());
        assert!(validate_version("").is_err());
        assert!(validate_version("../1.22").is_err());
        assert!(validate_version("/usr/local/go").is_err());
        assert!(validate_version("C:go").is_err());
        assert!(validate_version(".hidden").is_err());
        assert!(validate_version("1.22 1").is_err());
        assert!(validate_version(&"1".repeat(256)).is_err());
    }

    #[test]
    fn test_to_semver_handles_go_forms() {
        assert_eq!(to_semver("1.22").unwrap(), Version::new(1, 22, 0));
        assert_eq!(to_semver("go1.21.5").unwrap(), Version::new(1, 21, 5));
        assert_eq!(to_semver("1.22rc1").unwrap().pre.as_str(), "rc.1");
        assert!(to_semver("tip").is_none());
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("1.21.5", "1.21.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.9", "1.10"), Ordering::Less);
        assert_eq!(compare_versions("1.22.0", "1.22rc1"), Ordering::Greater);
        assert_eq!(compare_versions("1.22rc1", "1.22beta1"), Ordering::Greater);
        assert_eq!(compare_versions("1.22", "1.22.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.0.0", "custom"), Ordering::Greater);
    }

    #[test]
    fn test_max_version() {
        let versions = vec!["1.20.1".to_string(), "1.21.0".to_string(), "1.9.7".to_string()];
        assert_eq!(max_version(&versions).unwrap(), "1.21.0");
    }
}

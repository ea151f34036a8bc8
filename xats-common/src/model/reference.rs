// xats-common/src/model/reference.rs
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, XatsError};
use crate::validation::ValidationReport;

pub const PROTOCOL: &str = "xats";
const SCHEME_PREFIX: &str = "xats://";

static REGISTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*[a-z0-9]$").expect("registry pattern"));
static SEGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([a-z0-9_-]*[a-z0-9])?$").expect("segment pattern"));

/// A parsed `xats://<registry>/<package>[@<version>][/<path>]` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub protocol: String,
    pub registry: String,
    pub package: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Raw pieces of a reference before any rule is applied.
#[derive(Debug, Default)]
struct Pieces<'a> {
    registry: &'a str,
    package: &'a str,
    version: Option<&'a str>,
    path: Option<&'a str>,
}

impl Reference {
    pub fn parse(raw: &str) -> Result<Self> {
        let rest = raw.trim().strip_prefix(SCHEME_PREFIX).ok_or_else(|| {
            XatsError::ParseError("reference", format!("'{raw}' must start with {SCHEME_PREFIX}"))
        })?;
        if let Some(msg) = traversal_violation(rest) {
            return Err(XatsError::PathTraversal(format!("{raw}: {msg}")));
        }
        let pieces = split_pieces(rest);
        let errors = piece_errors(&pieces);
        if !errors.is_empty() {
            return Err(XatsError::ParseError("reference", format!("{raw}: {}", errors.join("; "))));
        }
        Ok(Self {
            protocol: PROTOCOL.to_string(),
            registry: pieces.registry.to_string(),
            package: pieces.package.to_string(),
            version: pieces.version.map(str::to_string),
            path: pieces.path.map(str::to_string),
        })
    }

    /// Re-checks every component and reports each violated rule.
    pub fn validate(&self) -> ValidationReport {
        let mut errors = Vec::new();
        if self.protocol != PROTOCOL {
            errors.push(format!("protocol must be '{PROTOCOL}', got '{}'", self.protocol));
        }
        let pieces = Pieces {
            registry: &self.registry,
            package: &self.package,
            version: self.version.as_deref(),
            path: self.path.as_deref(),
        };
        if let Some(path) = pieces.path {
            if let Some(msg) = traversal_violation(path) {
                errors.push(msg);
            }
        }
        errors.extend(piece_errors(&pieces));
        ValidationReport::from_errors(errors)
    }

    /// Version to look up: the explicit one, or `latest`.
    pub fn version_or_latest(&self) -> &str {
        self.version.as_deref().unwrap_or("latest")
    }

    /// Reference without its sub-path, e.g. for package-level cache keys.
    pub fn package_ref(&self) -> String {
        match &self.version {
            Some(v) => format!("{}://{}/{}@{}", self.protocol, self.registry, self.package, v),
            None => format!("{}://{}/{}", self.protocol, self.registry, self.package),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.package_ref())?;
        if let Some(path) = &self.path {
            write!(f, "/{path}")?;
        }
        Ok(())
    }
}

impl FromStr for Reference {
    type Err = XatsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Validates a reference string without stopping at the first problem.
pub fn validate_reference(raw: &str) -> ValidationReport {
    let mut errors = Vec::new();
    let trimmed = raw.trim();
    let rest = match trimmed.strip_prefix(SCHEME_PREFIX) {
        Some(r) => r,
        None => {
            errors.push(format!("reference must start with {SCHEME_PREFIX}"));
            trimmed.split_once("://").map_or(trimmed, |(_, r)| r)
        }
    };
    if let Some(msg) = traversal_violation(rest) {
        errors.push(msg);
    }
    errors.extend(piece_errors(&split_pieces(rest)));
    ValidationReport::from_errors(errors)
}

fn split_pieces(rest: &str) -> Pieces<'_> {
    let Some((registry, remainder)) = rest.split_once('/') else {
        return Pieces {
            registry: rest,
            ..Pieces::default()
        };
    };
    match remainder.split_once('@') {
        Some((package, after)) => {
            let (version, path) = match after.split_once('/') {
                Some((v, p)) => (v, Some(p)),
                None => (after, None),
            };
            Pieces {
                registry,
                package,
                version: Some(version),
                path,
            }
        }
        None => Pieces {
            registry,
            package: remainder,
            version: None,
            path: None,
        },
    }
}

fn piece_errors(pieces: &Pieces<'_>) -> Vec<String> {
    let mut errors = Vec::new();
    if !REGISTRY_RE.is_match(pieces.registry) {
        errors.push(format!(
            "invalid registry name '{}': expected [a-z0-9][a-z0-9_-]*[a-z0-9]",
            pieces.registry
        ));
    }
    if pieces.package.is_empty() {
        errors.push("missing package name".to_string());
    } else if let Some(bad) = pieces.package.split('/').find(|seg| !SEGMENT_RE.is_match(seg)) {
        errors.push(format!(
            "invalid package segment '{bad}' in '{}'",
            pieces.package
        ));
    }
    if let Some(version) = pieces.version {
        if semver::Version::parse(version).is_err() {
            errors.push(format!("invalid version '{version}': expected a semantic version"));
        }
    }
    if let Some(path) = pieces.path {
        if path.is_empty() {
            errors.push("empty sub-path".to_string());
        } else if path.starts_with('/') || path.starts_with('\\') {
            errors.push(format!("sub-path '{path}' must not be absolute"));
        }
    }
    errors
}

/// Detects `.`/`..` segments in any separator or percent-encoded spelling,
/// and absolute components.
pub(crate) fn traversal_violation(s: &str) -> Option<String> {
    let decoded = s
        .to_ascii_lowercase()
        .replace("%2e", ".")
        .replace("%2f", "/")
        .replace("%5c", "\\");
    if decoded.starts_with('/') || decoded.starts_with('\\') {
        return Some(format!("'{s}' is an absolute path"));
    }
    if decoded.contains("//") || decoded.contains("\\\\") {
        return Some(format!("'{s}' contains an empty segment that would make it absolute"));
    }
    decoded
        .split(['/', '\\'])
        .find(|seg| *seg == ".." || *seg == ".")
        .map(|seg| format!("'{s}' contains a '{seg}' segment"))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn parses_full_reference() {
        let r = Reference::parse("xats://biology-commons/org/cell-diagrams@1.2.0-beta.1/figures/a.json")
            .unwrap();
        assert_eq!(r.registry, "biology-commons");
        assert_eq!(r.package, "org/cell-diagrams");
        assert_eq!(r.version.as_deref(), Some("1.2.0-beta.1"));
        assert_eq!(r.path.as_deref(), Some("figures/a.json"));
        assert_eq!(
            r.to_string(),
            "xats://biology-commons/org/cell-diagrams@1.2.0-beta.1/figures/a.json"
        );
    }

    #[test]
    fn version_defaults_to_latest() {
        let r = Reference::parse("xats://biology-commons/cell-diagrams").unwrap();
        assert_eq!(r.version, None);
        assert_eq!(r.version_or_latest(), "latest");
    }

    #[test]
    fn traversal_is_rejected_in_every_spelling() {
        for raw in [
            "xats://reg/pkg/../../etc/passwd",
            "xats://reg/pkg@1.0.0/../secret",
            "xats://reg/pkg@1.0.0/a\\..\\..\\b",
            "xats://reg/pkg@1.0.0/%2e%2e/x",
            "xats://reg/pkg@1.0.0//etc/passwd",
            "xats:///etc/passwd",
        ] {
            let err = Reference::parse(raw).unwrap_err();
            assert_eq!(err.code(), ErrorCode::PathTraversalViolation, "{raw}");
        }
    }

    #[test]
    fn rejects_malformed_components() {
        assert!(Reference::parse("http://reg/pkg").is_err());
        assert!(Reference::parse("xats://Reg/pkg").is_err());
        assert!(Reference::parse("xats://reg/pkg@not-a-version").is_err());
        assert!(Reference::parse("xats://reg").is_err());
        assert!(Reference::parse("xats://reg/-pkg").is_err());
    }

    #[test]
    fn validate_collects_every_problem() {
        let report = validate_reference("http://R/Bad_Pkg-@1.x");
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 4, "{:?}", report.errors);

        assert!(validate_reference("xats://reg/org/pkg@1.0.0/a.json").valid);
    }

    #[test]
    fn struct_validation_rechecks_components() {
        let mut r = Reference::parse("xats://reg/pkg@1.0.0/a.json").unwrap();
        assert!(r.validate().valid);
        r.registry = "X".into();
        r.path = Some("../b.json".into());
        let report = r.validate();
        assert_eq!(report.errors.len(), 2, "{:?}", report.errors);
    }

    fn reference_strategy() -> impl Strategy<Value = String> {
        let registry = "[a-z0-9][a-z0-9_-]{0,8}[a-z0-9]";
        let segment = "[a-z0-9]([a-z0-9_-]{0,6}[a-z0-9])?";
        let package = prop::collection::vec(segment, 1..4).prop_map(|s| s.join("/"));
        let version = (0u32..20, 0u32..20, 0u32..20, prop::option::of(0u32..5)).prop_map(
            |(a, b, c, pre)| match pre {
                Some(n) => format!("{a}.{b}.{c}-beta.{n}"),
                None => format!("{a}.{b}.{c}"),
            },
        );
        let path = prop::collection::vec("[a-z]{1,6}", 1..3).prop_map(|s| format!("{}.json", s.join("/")));
        (registry, package, prop::option::of((version, prop::option::of(path)))).prop_map(
            |(r, p, tail)| match tail {
                None => format!("xats://{r}/{p}"),
                Some((v, None)) => format!("xats://{r}/{p}@{v}"),
                Some((v, Some(path))) => format!("xats://{r}/{p}@{v}/{path}"),
            },
        )
    }

    proptest! {
        #[test]
        fn parse_serialize_round_trip(raw in reference_strategy()) {
            let parsed = Reference::parse(&raw).unwrap();
            let reparsed = Reference::parse(&parsed.to_string()).unwrap();
            prop_assert_eq!(parsed, reparsed);
            prop_assert!(validate_reference(&raw).valid);
        }
    }
}

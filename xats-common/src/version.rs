// xats-common/src/version.rs
//! Numeric version ordering and constraint matching.
//!
//! Ordering only looks at (major, minor, patch). Prerelease and build
//! suffixes are accepted but never take part in comparisons.
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::{Result, XatsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionKey {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl VersionKey {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Lenient parse: `1`, `1.2`, `1.2.3`, `1.2.3-beta.1`, `v1.2.3+build`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let s = s.strip_prefix('v').unwrap_or(s);
        let core = s.split(['-', '+']).next().unwrap_or_default();
        if core.is_empty() {
            return None;
        }
        let mut parts = [0u64; 3];
        let mut count = 0;
        for piece in core.split('.') {
            if count == 3 {
                return None;
            }
            parts[count] = piece.parse().ok()?;
            count += 1;
        }
        Some(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Empty, `*` or `latest`.
    Any,
    /// `^X.Y.Z`: same major, at least X.Y.Z.
    Caret(VersionKey),
    /// `~X.Y.Z`: same major.minor, at least X.Y.Z.
    Tilde(VersionKey),
    /// `>=X.Y.Z`
    AtLeast(VersionKey),
    /// Bare `X.Y.Z`. No match is a miss, never a fallback.
    Exact(VersionKey),
}

impl Constraint {
    pub fn parse(raw: &str) -> Result<Self> {
        let s = raw.trim();
        if s.is_empty() || s == "*" || s.eq_ignore_ascii_case("latest") {
            return Ok(Self::Any);
        }
        let (ctor, rest): (fn(VersionKey) -> Self, &str) = if let Some(r) = s.strip_prefix(">=") {
            (Self::AtLeast, r)
        } else if let Some(r) = s.strip_prefix('^') {
            (Self::Caret, r)
        } else if let Some(r) = s.strip_prefix('~') {
            (Self::Tilde, r)
        } else {
            (Self::Exact, s)
        };
        VersionKey::parse(rest)
            .map(ctor)
            .ok_or_else(|| XatsError::ParseError("constraint", format!("invalid constraint '{raw}'")))
    }

    pub fn matches(&self, v: VersionKey) -> bool {
        match *self {
            Self::Any => true,
            Self::Caret(base) => v.major == base.major && v >= base,
            Self::Tilde(base) => v.major == base.major && v.minor == base.minor && v >= base,
            Self::AtLeast(base) => v >= base,
            Self::Exact(base) => v == base,
        }
    }

    /// Highest version in `available` that satisfies the constraint.
    pub fn select<'a, I>(&self, available: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        sort_descending(available)
            .into_iter()
            .find(|(key, _)| self.matches(*key))
            .map(|(_, s)| s)
    }
}

impl FromStr for Constraint {
    type Err = XatsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Caret(v) => write!(f, "^{v}"),
            Self::Tilde(v) => write!(f, "~{v}"),
            Self::AtLeast(v) => write!(f, ">={v}"),
            Self::Exact(v) => write!(f, "{v}"),
        }
    }
}

/// Parsable versions, highest first. Unparsable entries are dropped.
fn sort_descending<'a, I>(available: I) -> Vec<(VersionKey, &'a str)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut keyed: Vec<(VersionKey, &'a str)> = available
        .into_iter()
        .filter_map(|s| match VersionKey::parse(s) {
            Some(key) => Some((key, s)),
            None => {
                debug!("Ignoring unparsable version '{}'", s);
                None
            }
        })
        .collect();
    keyed.sort_by_key(|(key, _)| Reverse(*key));
    keyed
}

/// Picks the latest version in `available` compatible with `constraint`.
/// An invalid constraint or no compatible version yields `None`.
pub fn resolve_constraint<S: AsRef<str>>(constraint: &str, available: &[S]) -> Option<String> {
    let parsed = match Constraint::parse(constraint) {
        Ok(c) => c,
        Err(e) => {
            debug!("{}", e);
            return None;
        }
    };
    parsed
        .select(available.iter().map(AsRef::as_ref))
        .map(str::to_string)
}

/// Highest parsable version, if any.
pub fn highest<S: AsRef<str>>(available: &[S]) -> Option<String> {
    resolve_constraint("", available)
}

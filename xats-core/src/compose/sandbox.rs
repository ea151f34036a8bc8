// xats-core/src/compose/sandbox.rs
// Confines fragment references to the composition base directory.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use xats_common::error::{Result, XatsError};

/// A reference resolved to a location inside the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Confined {
    /// `/`-joined path relative to the sandbox root; the fragment's identity.
    pub key: String,
    pub full: PathBuf,
}

impl Confined {
    /// Directory key nested references are resolved against.
    pub fn dir_key(&self) -> &str {
        self.key.rsplit_once('/').map_or("", |(dir, _)| dir)
    }
}

/// Lexical confinement: rejects absolute paths and parent segments in any
/// spelling, then joins what is left onto `base` below `dir_key`.
pub(crate) fn confine(base: &Path, dir_key: &str, ref_path: &str) -> Result<Confined> {
    let violation = |why: &str| XatsError::PathTraversal(format!("'{ref_path}' {why}"));

    let decoded = ref_path
        .to_ascii_lowercase()
        .replace("%2e", ".")
        .replace("%2f", "/")
        .replace("%5c", "\\");
    if decoded.trim().is_empty() {
        return Err(XatsError::ParseError("fragment reference", "empty $ref".to_string()));
    }
    let bytes = decoded.as_bytes();
    if decoded.starts_with(['/', '\\']) || (bytes.len() > 1 && bytes[1] == b':') {
        return Err(violation("is an absolute path"));
    }
    if decoded.split(['/', '\\']).any(|seg| seg == "..") {
        return Err(violation("contains a parent-directory segment"));
    }
    if decoded != ref_path.to_ascii_lowercase() {
        return Err(violation("uses percent-encoded path characters"));
    }

    let segments: Vec<&str> = dir_key
        .split('/')
        .chain(ref_path.split(['/', '\\']))
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect();
    if segments.is_empty() {
        return Err(violation("does not name a file"));
    }
    let full = segments.iter().fold(base.to_path_buf(), |acc, seg| acc.join(seg));
    Ok(Confined {
        key: segments.join("/"),
        full,
    })
}

/// Canonical check for locations that exist, catching symlinks that lead
/// out of the sandbox. Missing files pass; the loader reports them.
pub(crate) async fn verify_within(canonical_base: &Path, confined: &Confined) -> Result<()> {
    match tokio::fs::canonicalize(&confined.full).await {
        Ok(real) if real.starts_with(canonical_base) => Ok(()),
        Ok(real) => {
            warn!(
                "Fragment {} resolves to {} outside {}",
                confined.key,
                real.display(),
                canonical_base.display()
            );
            Err(XatsError::PathTraversal(format!(
                "'{}' resolves outside the base directory",
                confined.key
            )))
        }
        Err(e) => {
            debug!("Cannot canonicalize {}: {}", confined.full.display(), e);
            Ok(())
        }
    }
}

// xats-common/src/model/resolved.rs
use serde::{Deserialize, Serialize};

use super::reference::Reference;
use super::registry::{FileRecord, PackageRecord, VersionRecord};

/// Package metadata without the version table, which can be large.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMetadata {
    pub name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub latest: String,
}

impl From<&PackageRecord> for PackageMetadata {
    fn from(p: &PackageRecord) -> Self {
        Self {
            name: p.name.clone(),
            title: p.title.clone(),
            description: p.description.clone(),
            latest: p.latest.clone(),
        }
    }
}

/// A reference pinned to a concrete, fetchable location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedReference {
    #[serde(flatten)]
    pub reference: Reference,
    pub resolved_url: String,
    pub package_metadata: PackageMetadata,
    pub version_metadata: VersionRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_metadata: Option<FileRecord>,
}

impl ResolvedReference {
    pub fn resolved_version(&self) -> &str {
        &self.version_metadata.version
    }

    /// Bytes this resolution points at: the file when one was selected,
    /// otherwise the whole version.
    pub fn size(&self) -> u64 {
        self.file_metadata
            .as_ref()
            .map_or(self.version_metadata.size, |f| f.size)
    }

    /// Integrity string the fetched bytes must match.
    pub fn expected_integrity(&self) -> &str {
        self.file_metadata
            .as_ref()
            .map_or(self.version_metadata.integrity.as_str(), |f| f.integrity.as_str())
    }
}

// xats-common/src/model/registry.rs
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, XatsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    Verified,
    Community,
    Experimental,
}

impl TrustLevel {
    pub const ALL: [&'static str; 3] = ["verified", "community", "experimental"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthKind {
    Token,
    Basic,
    Oauth,
}

impl AuthKind {
    pub const ALL: [&'static str; 3] = ["token", "basic", "oauth"];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authentication {
    #[serde(rename = "type")]
    pub kind: AuthKind,
    /// Name of the environment variable holding the credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryDescriptor {
    pub name: String,
    pub url: String,
    pub api_version: String,
    pub trust_level: TrustLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(default)]
    pub public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Authentication>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: u64,
    pub integrity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub version: String,
    #[serde(default)]
    pub files: Vec<FileRecord>,
    pub integrity: String,
    pub size: u64,
    pub published: DateTime<Utc>,
    /// Package name to constraint; resolution walks these in name order.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_message: Option<String>,
}

impl VersionRecord {
    pub fn file(&self, path: &str) -> Option<&FileRecord> {
        self.files.iter().find(|f| f.path == path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRecord {
    pub name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub versions: BTreeMap<String, VersionRecord>,
    pub latest: String,
}

impl PackageRecord {
    /// Looks up `latest` or an exact version key.
    pub fn version(&self, requested: &str) -> Result<&VersionRecord> {
        let key = if requested == "latest" {
            self.latest.as_str()
        } else {
            requested
        };
        self.versions
            .get(key)
            .ok_or_else(|| XatsError::VersionNotFound {
                package: self.name.clone(),
                version: requested.to_string(),
            })
    }

    pub fn version_keys(&self) -> Vec<&str> {
        self.versions.keys().map(String::as_str).collect()
    }
}

/// A registry descriptor together with the packages it serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    #[serde(flatten)]
    pub descriptor: RegistryDescriptor,
    #[serde(default)]
    pub packages: Vec<PackageRecord>,
}

impl Registry {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn package(&self, name: &str) -> Result<&PackageRecord> {
        self.packages
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| XatsError::PackageNotFound {
                registry: self.descriptor.name.clone(),
                package: name.to_string(),
            })
    }
}

/// Top-level registry configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    pub registries: Vec<Registry>,
}

impl RegistryConfig {
    pub fn registry(&self, name: &str) -> Result<&Registry> {
        self.registries
            .iter()
            .find(|r| r.name() == name)
            .ok_or_else(|| XatsError::RegistryNotFound(name.to_string()))
    }

    /// First registry, in declaration order, that carries `package`.
    pub fn find_package(&self, package: &str) -> Option<(&Registry, &PackageRecord)> {
        self.registries
            .iter()
            .find_map(|r| r.package(package).ok().map(|p| (r, p)))
    }
}

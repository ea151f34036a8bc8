// xats-core/src/registry/mod.rs
// Maps symbolic references onto the registry set and produces fetchable,
// versioned locations.

mod batch;
mod fetch;

use std::sync::Arc;

pub use batch::{BatchResolution, ResolutionStats};
pub use fetch::fetch_verified;
use tracing::debug;
use xats_common::config::{default_concurrency, Config};
use xats_common::error::{Result, XatsError};
use xats_common::model::{PackageMetadata, Reference, RegistryConfig, ResolvedReference};
use xats_common::ResolutionCache;

#[derive(Clone)]
pub struct RegistryResolver {
    registries: Arc<RegistryConfig>,
    cache: Option<Arc<dyn ResolutionCache>>,
    concurrency: usize,
}

impl RegistryResolver {
    pub fn new(registries: RegistryConfig) -> Self {
        Self {
            registries: Arc::new(registries),
            cache: None,
            concurrency: default_concurrency(),
        }
    }

    /// Takes the fan-out limit from `config`.
    pub fn from_config(config: &Config, registries: RegistryConfig) -> Self {
        Self::new(registries).with_concurrency(config.concurrency)
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResolutionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn registries(&self) -> &RegistryConfig {
        &self.registries
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Resolves a single reference string, consulting the cache when one is set.
    pub fn resolve_one(&self, raw: &str) -> Result<ResolvedReference> {
        self.lookup(raw).map(|(resolved, _)| resolved)
    }

    /// Like [`resolve_one`](Self::resolve_one), also reporting whether the
    /// answer came from the cache.
    pub(crate) fn lookup(&self, raw: &str) -> Result<(ResolvedReference, bool)> {
        let key = raw.trim();
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(key) {
                debug!("Cache hit for {}", key);
                return Ok((hit, true));
            }
        }
        let reference = Reference::parse(key)?;
        let resolved = self.resolve_reference(&reference)?;
        if let Some(cache) = &self.cache {
            cache.put(key, &resolved);
        }
        Ok((resolved, false))
    }

    /// Resolves an already-parsed reference. Never touches the cache.
    pub fn resolve_reference(&self, reference: &Reference) -> Result<ResolvedReference> {
        let registry = self.registries.registry(&reference.registry)?;
        let package = registry.package(&reference.package)?;
        let version = package.version(reference.version_or_latest())?;

        let file_metadata = match &reference.path {
            Some(path) => Some(
                version
                    .file(path)
                    .cloned()
                    .ok_or_else(|| XatsError::FileNotFound {
                        package: package.name.clone(),
                        version: version.version.clone(),
                        path: path.clone(),
                    })?,
            ),
            None => None,
        };

        let mut resolved_url = format!(
            "{}/{}/{}",
            registry.descriptor.url.trim_end_matches('/'),
            package.name,
            version.version
        );
        if let Some(path) = &reference.path {
            resolved_url.push('/');
            resolved_url.push_str(path);
        }
        debug!("Resolved {} -> {}", reference, resolved_url);

        Ok(ResolvedReference {
            reference: reference.clone(),
            resolved_url,
            package_metadata: PackageMetadata::from(package),
            version_metadata: version.clone(),
            file_metadata,
        })
    }
}

impl std::fmt::Debug for RegistryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryResolver")
            .field("registries", &self.registries.registries.len())
            .field("cached", &self.cache.is_some())
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::json;
    use xats_common::error::ErrorCode;
    use xats_common::validation::parse_registry_config;
    use xats_common::MemoryResolutionCache;

    use super::*;

    pub(crate) fn biology_commons() -> RegistryConfig {
        parse_registry_config(&json!({
            "registries": [{
                "name": "biology-commons",
                "url": "https://registry.biology-commons.org/",
                "apiVersion": "v1",
                "trustLevel": "community",
                "packages": [{
                    "name": "cell-diagrams",
                    "title": "Cell Diagrams",
                    "latest": "1.1.0",
                    "versions": {
                        "1.0.0": {
                            "version": "1.0.0",
                            "integrity": "sha256-47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=",
                            "size": 2048,
                            "published": "2024-01-10T00:00:00Z",
                            "files": [{
                                "path": "figures/mitosis.svg",
                                "type": "image",
                                "size": 512,
                                "integrity": "sha256-47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=",
                                "mimeType": "image/svg+xml"
                            }]
                        },
                        "1.1.0": {
                            "version": "1.1.0",
                            "integrity": "sha256-47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=",
                            "size": 4096,
                            "published": "2024-03-02T00:00:00Z"
                        }
                    }
                }]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn resolves_latest_and_explicit_versions() {
        let resolver = RegistryResolver::new(biology_commons());

        let latest = resolver.resolve_one("xats://biology-commons/cell-diagrams").unwrap();
        assert_eq!(latest.resolved_version(), "1.1.0");
        assert_eq!(
            latest.resolved_url,
            "https://registry.biology-commons.org/cell-diagrams/1.1.0"
        );

        let pinned = resolver.resolve_one("xats://biology-commons/cell-diagrams@1.0.0").unwrap();
        assert_eq!(pinned.resolved_version(), "1.0.0");
        assert_eq!(pinned.size(), 2048);
    }

    #[test]
    fn selects_file_records() {
        let resolver = RegistryResolver::new(biology_commons());
        let file = resolver
            .resolve_one("xats://biology-commons/cell-diagrams@1.0.0/figures/mitosis.svg")
            .unwrap();
        assert_eq!(
            file.resolved_url,
            "https://registry.biology-commons.org/cell-diagrams/1.0.0/figures/mitosis.svg"
        );
        assert_eq!(file.size(), 512);

        let err = resolver
            .resolve_one("xats://biology-commons/cell-diagrams@1.0.0/figures/none.svg")
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileNotFound);
    }

    #[test]
    fn failures_carry_codes() {
        let resolver = RegistryResolver::new(biology_commons());
        let cases = [
            ("xats://chem-commons/cell-diagrams", ErrorCode::RegistryNotFound),
            ("xats://biology-commons/missing-pkg", ErrorCode::PackageNotFound),
            ("xats://biology-commons/cell-diagrams@9.9.9", ErrorCode::VersionNotFound),
            ("xats://reg/pkg/../../etc/passwd", ErrorCode::PathTraversalViolation),
        ];
        for (raw, code) in cases {
            assert_eq!(resolver.resolve_one(raw).unwrap_err().code(), code, "{raw}");
        }
    }

    #[test]
    fn cache_short_circuits_lookup() {
        let cache = Arc::new(MemoryResolutionCache::default());
        let resolver = RegistryResolver::new(biology_commons()).with_cache(cache.clone());
        let (_, hit) = resolver.lookup("xats://biology-commons/cell-diagrams").unwrap();
        assert!(!hit);
        let (again, hit) = resolver.lookup("xats://biology-commons/cell-diagrams").unwrap();
        assert!(hit);
        assert_eq!(again.resolved_version(), "1.1.0");
        assert_eq!(cache.len(), 1);
    }
}

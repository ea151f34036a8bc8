// xats-core/tests/registry_resolution.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use xats_common::dependency::resolve_dependencies;
use xats_common::error::{ErrorCode, Result, XatsError};
use xats_common::integrity::{HashAlgorithm, Integrity};
use xats_common::{CancelSignal, Config, MemoryResolutionCache, RegistryConfig};
use xats_core::{fetch_verified, RegistryResolver};
use xats_net::Fetcher;

const FIGURE: &[u8] = b"<svg><circle r=\"4\"/></svg>";

fn version(v: &str, deps: Value) -> Value {
    let figure = Integrity::compute(HashAlgorithm::Sha384, FIGURE).to_string();
    json!({
        "version": v,
        "integrity": Integrity::compute(HashAlgorithm::Sha256, v.as_bytes()).to_string(),
        "size": v.len(),
        "published": "2024-05-01T12:00:00Z",
        "dependencies": deps,
        "files": [{
            "path": "figures/cell.svg",
            "type": "image",
            "size": FIGURE.len(),
            "integrity": figure,
            "mimeType": "image/svg+xml"
        }]
    })
}

fn package(name: &str, latest: &str, versions: &[(&str, Value)]) -> Value {
    let versions: serde_json::Map<String, Value> = versions
        .iter()
        .map(|(v, deps)| (v.to_string(), version(v, deps.clone())))
        .collect();
    json!({"name": name, "title": name, "latest": latest, "versions": versions})
}

/// Writes the registry file into a fresh home and loads it the way the
/// binary does.
fn load_fixture() -> (tempfile::TempDir, RegistryConfig) {
    let home = tempfile::tempdir().unwrap();
    let doc = json!({
        "registries": [{
            "name": "biology-commons",
            "url": "https://registry.biology-commons.org/v1/",
            "apiVersion": "v1",
            "trustLevel": "verified",
            "publicKey": "ed25519:abc123",
            "packages": [
                package("cell-diagrams", "1.1.0", &[("1.0.0", json!({})), ("1.1.0", json!({}))]),
                package("a", "1.0.0", &[("1.0.0", json!({"b": "^1.0.0"}))]),
                package("b", "1.2.0", &[("1.0.0", json!({})), ("1.2.0", json!({"c": "~2.0.0"}))]),
                package("c", "2.0.1", &[("2.0.1", json!({"a": "1.0.0"}))]),
            ]
        }]
    });
    std::fs::write(home.path().join("registries.json"), doc.to_string()).unwrap();

    let home_str = home.path().display().to_string();
    let config = Config::from_lookup(|key| (key == "XATS_HOME").then(|| home_str.clone())).unwrap();
    let registries = config.load_registries().unwrap();
    (home, registries)
}

#[test]
fn biology_commons_scenario() {
    let (_home, registries) = load_fixture();
    let resolver = RegistryResolver::new(registries);

    let latest = resolver.resolve_one("xats://biology-commons/cell-diagrams").unwrap();
    let pinned = resolver.resolve_one("xats://biology-commons/cell-diagrams@1.1.0").unwrap();
    assert_eq!(latest.resolved_version(), "1.1.0");
    assert_eq!(latest.resolved_url, pinned.resolved_url);
    assert_eq!(latest.version_metadata, pinned.version_metadata);
    assert_eq!(
        latest.resolved_url,
        "https://registry.biology-commons.org/v1/cell-diagrams/1.1.0"
    );

    let old = resolver.resolve_one("xats://biology-commons/cell-diagrams@1.0.0").unwrap();
    assert_eq!(old.resolved_version(), "1.0.0");

    let missing = resolver.resolve_one("xats://biology-commons/missing-pkg").unwrap_err();
    assert_eq!(missing.code(), ErrorCode::PackageNotFound);

    let escape = resolver.resolve_one("xats://reg/pkg/../../etc/passwd").unwrap_err();
    assert_eq!(escape.code(), ErrorCode::PathTraversalViolation);
}

#[tokio::test]
async fn batch_with_shared_cache() {
    let (_home, registries) = load_fixture();
    let cache = Arc::new(MemoryResolutionCache::default());
    let resolver = RegistryResolver::new(registries).with_cache(cache.clone());
    let refs: Vec<String> = [
        "xats://biology-commons/cell-diagrams@1.0.0/figures/cell.svg",
        "xats://biology-commons/cell-diagrams@2.0.0",
        "xats://nowhere/cell-diagrams",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let first = resolver.resolve_many(&refs, &CancelSignal::never()).await;
    assert_eq!(first.stats.successful, 1);
    assert_eq!(first.stats.total_bytes, FIGURE.len() as u64);
    let codes: Vec<_> = first.errors.iter().map(|e| e.code).collect();
    assert_eq!(codes, [ErrorCode::VersionNotFound, ErrorCode::RegistryNotFound]);

    let second = resolver.resolve_many(&refs, &CancelSignal::never()).await;
    assert_eq!(second.stats.cache_hits, 1);
    assert_eq!(cache.len(), 1);
}

struct FixtureFetcher(HashMap<String, Vec<u8>>);

#[async_trait]
impl Fetcher for FixtureFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.0
            .get(url)
            .cloned()
            .ok_or_else(|| XatsError::Network(url.to_string(), "HTTP 404".to_string()))
    }
}

#[tokio::test]
async fn fetched_bytes_are_verified() {
    let (_home, registries) = load_fixture();
    let resolver = RegistryResolver::new(registries);
    let figure = resolver
        .resolve_one("xats://biology-commons/cell-diagrams@1.0.0/figures/cell.svg")
        .unwrap();
    let good = FixtureFetcher(HashMap::from([(figure.resolved_url.clone(), FIGURE.to_vec())]));
    assert_eq!(fetch_verified(&figure, &good).await.unwrap(), FIGURE);

    let mut tampered = FIGURE.to_vec();
    tampered[1] = b'S';
    let bad = FixtureFetcher(HashMap::from([(figure.resolved_url.clone(), tampered)]));
    let err = fetch_verified(&figure, &bad).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::IntegrityMismatch);
}

#[test]
fn dependency_cycle_through_the_registry_file() {
    let (_home, registries) = load_fixture();
    let result = resolve_dependencies("a", "1.0.0", &registries);

    let cycles: Vec<_> = result
        .errors
        .iter()
        .filter(|e| e.code == ErrorCode::CircularDependency)
        .collect();
    assert_eq!(cycles.len(), 1);
    let resolved: Vec<_> = result
        .flattened
        .iter()
        .map(|d| (d.package.as_str(), d.resolved_version.as_str()))
        .collect();
    assert_eq!(resolved, [("b", "1.2.0"), ("c", "2.0.1"), ("a", "1.0.0")]);
    assert!(result.conflicts.is_empty());
}

// xats-common/src/dependency/resolver.rs

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ErrorCode, XatsError};
use crate::model::registry::RegistryConfig;
use crate::version::resolve_constraint;

pub const DEFAULT_MAX_DEPTH: usize = 64;

// --- ResolutionContext ---
pub struct ResolutionContext<'a> {
    pub registries: &'a RegistryConfig,
    /// Deepest level expanded below the root before giving up on a branch.
    pub max_depth: usize,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(registries: &'a RegistryConfig) -> Self {
        Self {
            registries,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyNode {
    pub package: String,
    pub version: String,
    pub dependencies: Vec<DependencyNode>,
    pub depth: usize,
}

impl DependencyNode {
    /// Number of nodes in this subtree, including itself.
    pub fn count(&self) -> usize {
        1 + self.dependencies.iter().map(Self::count).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlattenedDependency {
    pub package: String,
    pub constraint: String,
    pub resolved_version: String,
    pub requested_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictingRequest {
    pub version: String,
    pub requested_by: String,
}

/// One package that resolved to more than one version across the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyConflict {
    pub package: String,
    pub requests: Vec<ConflictingRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyError {
    pub code: ErrorCode,
    pub package: String,
    pub message: String,
    /// `package@version` chain from the root to where the failure happened.
    pub path: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyResolution {
    pub graph: Option<DependencyNode>,
    pub flattened: Vec<FlattenedDependency>,
    pub conflicts: Vec<DependencyConflict>,
    pub errors: Vec<DependencyError>,
}

/// `package@version` keys on the current branch. Cloned before each
/// recursive step so sibling branches never see each other's entries.
#[derive(Debug, Clone, Default)]
struct VisitPath {
    chain: Vec<String>,
    members: HashSet<String>,
}

impl VisitPath {
    fn contains(&self, key: &str) -> bool {
        self.members.contains(key)
    }

    fn extended(&self, key: &str) -> Self {
        let mut next = self.clone();
        next.chain.push(key.to_string());
        next.members.insert(key.to_string());
        next
    }

    fn chain_with(&self, key: &str) -> Vec<String> {
        let mut chain = self.chain.clone();
        chain.push(key.to_string());
        chain
    }
}

pub struct DependencyResolver<'a> {
    context: ResolutionContext<'a>,
    flattened: Vec<FlattenedDependency>,
    errors: Vec<DependencyError>,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(context: ResolutionContext<'a>) -> Self {
        Self {
            context,
            flattened: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Expands `package@version` (or `latest`) into a dependency tree.
    pub fn resolve(&mut self, package: &str, version: &str) -> DependencyResolution {
        debug!("Starting dependency resolution for {}@{}", package, version);
        self.flattened.clear();
        self.errors.clear();

        let root = match self.lookup_root(package, version) {
            Ok(resolved_version) => resolved_version,
            Err(e) => {
                warn!("Cannot resolve root {}@{}: {}", package, version, e);
                self.record(package, &e, Vec::new());
                return self.finish(None, package, version);
            }
        };

        let graph = self.visit(package, &root, &VisitPath::default(), 0);
        if !self.errors.is_empty() {
            warn!(
                "Dependency resolution for {}@{} finished with {} errors",
                package,
                root,
                self.errors.len()
            );
        }
        self.finish(graph, package, &root)
    }

    fn lookup_root(&self, package: &str, version: &str) -> Result<String, XatsError> {
        let (_, record) = self
            .context
            .registries
            .find_package(package)
            .ok_or_else(|| XatsError::PackageNotFound {
                registry: "any configured registry".to_string(),
                package: package.to_string(),
            })?;
        Ok(record.version(version)?.version.clone())
    }

    /// Walk one node. Returns `None` when the node itself is cut (cycle or depth).
    fn visit(
        &mut self,
        package: &str,
        version: &str,
        path: &VisitPath,
        depth: usize,
    ) -> Option<DependencyNode> {
        let key = format!("{package}@{version}");

        // -------- cycle guard -------------------------------------------------------------
        if path.contains(&key) {
            let chain = path.chain_with(&key);
            warn!("Dependency cycle detected: {}", chain.join(" -> "));
            self.record(package, &XatsError::CircularDependency(chain.clone()), chain);
            return None;
        }
        if depth > self.context.max_depth {
            let err = XatsError::DepthLimitExceeded {
                at: key.clone(),
                limit: self.context.max_depth,
            };
            self.record(package, &err, path.chain_with(&key));
            return None;
        }

        let path = path.extended(&key);
        let declared: BTreeMap<String, String> = self
            .context
            .registries
            .find_package(package)
            .and_then(|(_, p)| p.versions.get(version))
            .map(|v| v.dependencies.clone())
            .unwrap_or_default();

        let mut children = Vec::with_capacity(declared.len());
        for (dep_name, constraint) in &declared {
            let resolved = match self.resolve_edge(dep_name, constraint) {
                Ok(v) => v,
                Err(e) => {
                    debug!("'{}' requested by {} is unresolvable: {}", dep_name, key, e);
                    self.record(dep_name, &e, path.chain.clone());
                    continue;
                }
            };
            self.flattened.push(FlattenedDependency {
                package: dep_name.clone(),
                constraint: constraint.clone(),
                resolved_version: resolved.clone(),
                requested_by: key.clone(),
            });
            if let Some(child) = self.visit(dep_name, &resolved, &path, depth + 1) {
                children.push(child);
            }
        }

        Some(DependencyNode {
            package: package.to_string(),
            version: version.to_string(),
            dependencies: children,
            depth,
        })
    }

    fn resolve_edge(&self, package: &str, constraint: &str) -> Result<String, XatsError> {
        let (_, record) = self
            .context
            .registries
            .find_package(package)
            .ok_or_else(|| XatsError::PackageNotFound {
                registry: "any configured registry".to_string(),
                package: package.to_string(),
            })?;
        resolve_constraint(constraint, &record.version_keys()).ok_or_else(|| {
            XatsError::VersionNotFound {
                package: package.to_string(),
                version: constraint.to_string(),
            }
        })
    }

    fn record(&mut self, package: &str, err: &XatsError, path: Vec<String>) {
        self.errors.push(DependencyError {
            code: err.code(),
            package: package.to_string(),
            message: err.to_string(),
            path,
        });
    }

    fn finish(
        &mut self,
        graph: Option<DependencyNode>,
        root_package: &str,
        root_version: &str,
    ) -> DependencyResolution {
        let conflicts = if graph.is_some() {
            detect_conflicts(root_package, root_version, &self.flattened)
        } else {
            Vec::new()
        };
        DependencyResolution {
            graph,
            flattened: std::mem::take(&mut self.flattened),
            conflicts,
            errors: std::mem::take(&mut self.errors),
        }
    }
}

/// Packages that resolved to more than one version. Detection only; no
/// attempt is made to unify them.
fn detect_conflicts(
    root_package: &str,
    root_version: &str,
    flattened: &[FlattenedDependency],
) -> Vec<DependencyConflict> {
    let mut by_package: BTreeMap<&str, Vec<ConflictingRequest>> = BTreeMap::new();
    by_package
        .entry(root_package)
        .or_default()
        .push(ConflictingRequest {
            version: root_version.to_string(),
            requested_by: "<root>".to_string(),
        });
    for dep in flattened {
        by_package
            .entry(dep.package.as_str())
            .or_default()
            .push(ConflictingRequest {
                version: dep.resolved_version.clone(),
                requested_by: dep.requested_by.clone(),
            });
    }
    by_package
        .into_iter()
        .filter(|(_, requests)| {
            let distinct: HashSet<&str> = requests.iter().map(|r| r.version.as_str()).collect();
            distinct.len() > 1
        })
        .map(|(package, requests)| DependencyConflict {
            package: package.to_string(),
            requests,
        })
        .collect()
}

/// Convenience wrapper over [`DependencyResolver`].
pub fn resolve_dependencies(
    package: &str,
    version: &str,
    registries: &RegistryConfig,
) -> DependencyResolution {
    DependencyResolver::new(ResolutionContext::new(registries)).resolve(package, version)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;
    use crate::model::registry::{
        PackageRecord, Registry, RegistryDescriptor, TrustLevel, VersionRecord,
    };

    fn version(v: &str, deps: &[(&str, &str)]) -> VersionRecord {
        VersionRecord {
            version: v.to_string(),
            files: Vec::new(),
            integrity: "sha256-AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=".to_string(),
            size: 1,
            published: Utc::now(),
            dependencies: deps
                .iter()
                .map(|(n, c)| (n.to_string(), c.to_string()))
                .collect(),
            deprecated: false,
            deprecation_message: None,
        }
    }

    fn package(name: &str, versions: Vec<VersionRecord>) -> PackageRecord {
        let latest = versions.last().map(|v| v.version.clone()).unwrap_or_default();
        PackageRecord {
            name: name.to_string(),
            title: name.to_string(),
            description: None,
            versions: versions
                .into_iter()
                .map(|v| (v.version.clone(), v))
                .collect::<BTreeMap<_, _>>(),
            latest,
        }
    }

    fn registries(packages: Vec<PackageRecord>) -> RegistryConfig {
        RegistryConfig {
            registries: vec![Registry {
                descriptor: RegistryDescriptor {
                    name: "core".into(),
                    url: "https://registry.example.org".into(),
                    api_version: "v1".into(),
                    trust_level: TrustLevel::Community,
                    public_key: None,
                    public: false,
                    authentication: None,
                },
                packages,
            }],
        }
    }

    #[test]
    fn cycle_is_reported_once_and_terminates() {
        let regs = registries(vec![
            package("a", vec![version("1.0.0", &[("b", "^1.0.0")])]),
            package("b", vec![version("1.0.0", &[("c", "^1.0.0")])]),
            package("c", vec![version("1.0.0", &[("a", "^1.0.0")])]),
        ]);
        let result = resolve_dependencies("a", "1.0.0", &regs);
        let cycles: Vec<_> = result
            .errors
            .iter()
            .filter(|e| e.code == ErrorCode::CircularDependency)
            .collect();
        assert_eq!(cycles.len(), 1);
        assert_eq!(
            cycles[0].path,
            vec!["a@1.0.0", "b@1.0.0", "c@1.0.0", "a@1.0.0"]
        );
        let graph = result.graph.unwrap();
        assert_eq!(graph.count(), 3);
        assert_eq!(result.flattened.len(), 3);
    }

    #[test]
    fn shared_dependency_in_two_branches_is_not_a_cycle() {
        let regs = registries(vec![
            package(
                "app",
                vec![version("1.0.0", &[("left", "^1.0.0"), ("right", "^1.0.0")])],
            ),
            package("left", vec![version("1.0.0", &[("shared", "~1.2.0")])]),
            package("right", vec![version("1.0.0", &[("shared", "^1.0.0")])]),
            package("shared", vec![version("1.2.0", &[]), version("1.2.3", &[])]),
        ]);
        let result = resolve_dependencies("app", "latest", &regs);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let graph = result.graph.unwrap();
        assert_eq!(graph.count(), 5);
        assert_eq!(graph.dependencies[0].dependencies[0].depth, 2);
        assert!(result.conflicts.is_empty());
        let order: Vec<_> = result.flattened.iter().map(|f| f.package.as_str()).collect();
        assert_eq!(order, vec!["left", "shared", "right", "shared"]);
    }

    #[test]
    fn siblings_are_discovered_in_name_order() {
        let regs = registries(vec![
            package(
                "app",
                vec![version("1.0.0", &[("zeta", "^1.0.0"), ("alpha", "^1.0.0"), ("mid", "^1.0.0")])],
            ),
            package("zeta", vec![version("1.0.0", &[])]),
            package("alpha", vec![version("1.0.0", &[])]),
            package("mid", vec![version("1.0.0", &[])]),
        ]);
        let result = resolve_dependencies("app", "1.0.0", &regs);
        let order: Vec<_> = result.flattened.iter().map(|f| f.package.as_str()).collect();
        assert_eq!(order, vec!["alpha", "mid", "zeta"]);
        let graph = result.graph.unwrap();
        let children: Vec<_> = graph.dependencies.iter().map(|d| d.package.as_str()).collect();
        assert_eq!(children, order);
    }

    #[test]
    fn unresolvable_dependency_does_not_stop_siblings() {
        let regs = registries(vec![
            package(
                "app",
                vec![version(
                    "2.0.0",
                    &[("ghost", "^1.0.0"), ("old", "3.0.0"), ("real", ">=1.0.0")],
                )],
            ),
            package("old", vec![version("1.0.0", &[])]),
            package("real", vec![version("1.4.0", &[])]),
        ]);
        let result = resolve_dependencies("app", "2.0.0", &regs);
        let codes: Vec<_> = result.errors.iter().map(|e| e.code).collect();
        assert_eq!(
            codes,
            vec![ErrorCode::PackageNotFound, ErrorCode::VersionNotFound]
        );
        assert_eq!(result.flattened.len(), 1);
        assert_eq!(result.flattened[0].resolved_version, "1.4.0");
        assert_eq!(result.graph.unwrap().dependencies.len(), 1);
    }

    #[test]
    fn diverging_versions_are_reported_as_conflicts() {
        let regs = registries(vec![
            package("app", vec![version("1.0.0", &[("x", "^1.0.0"), ("y", "^1.0.0")])]),
            package("x", vec![version("1.0.0", &[("z", "~1.0.0")])]),
            package("y", vec![version("1.0.0", &[("z", "^2.0.0")])]),
            package("z", vec![version("1.0.1", &[]), version("2.1.0", &[])]),
        ]);
        let result = resolve_dependencies("app", "1.0.0", &regs);
        assert_eq!(result.conflicts.len(), 1);
        let conflict = &result.conflicts[0];
        assert_eq!(conflict.package, "z");
        let versions: Vec<_> = conflict.requests.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, vec!["1.0.1", "2.1.0"]);
    }

    #[test]
    fn missing_root_yields_no_graph() {
        let regs = registries(vec![package("a", vec![version("1.0.0", &[])])]);
        let result = resolve_dependencies("a", "9.9.9", &regs);
        assert!(result.graph.is_none());
        assert_eq!(result.errors[0].code, ErrorCode::VersionNotFound);
    }

    #[test]
    fn depth_guard_cuts_long_chains() {
        let mut packages = Vec::new();
        for i in 0..5 {
            let next = format!("p{}", i + 1);
            packages.push(package(
                &format!("p{i}"),
                vec![version("1.0.0", &[(next.as_str(), "^1.0.0")])],
            ));
        }
        packages.push(package("p5", vec![version("1.0.0", &[])]));
        let regs = registries(packages);
        let mut resolver = DependencyResolver::new(ResolutionContext {
            registries: &regs,
            max_depth: 2,
        });
        let result = resolver.resolve("p0", "1.0.0");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, ErrorCode::DepthLimitExceeded);
        assert_eq!(result.graph.unwrap().count(), 3);
    }
}

//! Dependency closure resolution.
//!
//! Expands root packages into themselves plus every package reachable
//! through declared runtime dependencies. The walk uses an explicit queue
//! and a visited set keyed by `name@version`, so cycles terminate and depth
//! is not bounded by the call stack. Each packument is fetched once.

use super::deps::{dep_target, manifest_deps, DepTarget};
use super::error::{codes, PkgError};
use super::registry::{get_version_manifest, get_versions, RegistryClient};
use super::set::PackageSet;
use super::spec::PackageSpec;
use super::version::resolve_version;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};

/// Options for dependency resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Follow optionalDependencies as well as dependencies.
    pub include_optional: bool,
}

/// A dependency waiting to be visited.
#[derive(Debug, Clone)]
struct PendingDep {
    name: String,
    range: Option<String>,
    required_by: Option<String>,
}

impl PendingDep {
    fn context(&self) -> String {
        match &self.required_by {
            Some(parent) => format!("Failed to resolve '{}' (required by {parent})", self.name),
            None => format!("Failed to resolve '{}'", self.name),
        }
    }
}

/// Resolve the roots and their transitive dependencies into a package set.
///
/// Roots come first, followed by dependencies in breadth-first discovery
/// order.
///
/// # Errors
/// Any fetch failure or unsatisfiable range anywhere in the graph fails the
/// whole resolution with `PKG_RESOLUTION_FAILED`; no partial set is
/// returned. The registry's HTTP status is preserved on the error.
pub async fn resolve_package_set(
    roots: &[PackageSpec],
    registry: &RegistryClient,
    options: &ResolveOptions,
) -> Result<PackageSet, PkgError> {
    let mut packuments: HashMap<String, Value> = HashMap::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut set = PackageSet::new();

    let mut pending: VecDeque<PendingDep> = roots
        .iter()
        .map(|spec| PendingDep {
            name: spec.name.clone(),
            range: spec.range.clone(),
            required_by: None,
        })
        .collect();

    while let Some(dep) = pending.pop_front() {
        if !packuments.contains_key(&dep.name) {
            let packument = registry
                .fetch_packument(&dep.name)
                .await
                .map_err(|e| e.wrap(codes::PKG_RESOLUTION_FAILED, dep.context()))?;
            packuments.insert(dep.name.clone(), packument);
        }
        set.insert(dep.name.as_str());

        let Some(packument) = packuments.get(&dep.name) else {
            continue;
        };

        // Nothing published: the package is audited but has no edges.
        if get_versions(packument).is_empty() {
            tracing::debug!(package = %dep.name, "no published versions, not traversing");
            continue;
        }

        let version = resolve_version(packument, dep.range.as_deref())
            .map_err(|e| e.wrap(codes::PKG_RESOLUTION_FAILED, dep.context()))?;
        let key = format!("{}@{version}", dep.name);
        if !visited.insert(key.clone()) {
            continue;
        }

        let Some(manifest) = get_version_manifest(packument, &version) else {
            return Err(PkgError::version_not_found(&dep.name, &version)
                .wrap(codes::PKG_RESOLUTION_FAILED, dep.context()));
        };

        let deps = manifest_deps(manifest, options.include_optional);
        for err in &deps.errors {
            tracing::warn!(package = %key, error = %err, "skipping malformed dependency entry");
        }

        tracing::trace!(package = %key, count = deps.deps.len(), "visiting");
        for (name, spec) in deps.deps {
            match dep_target(&name, &spec) {
                DepTarget::Registry { name, range } => pending.push_back(PendingDep {
                    name,
                    range: Some(range),
                    required_by: Some(key.clone()),
                }),
                DepTarget::External => {
                    tracing::debug!(package = %key, dependency = %name, spec = %spec, "not a registry dependency");
                }
            }
        }
    }

    Ok(set)
}

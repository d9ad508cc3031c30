//! Dependency extraction from published version manifests.

use super::error::{codes, PkgError};
use serde_json::Value;
use std::collections::BTreeMap;

/// Where a declared dependency points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepTarget {
    /// A registry package and the range it must satisfy.
    Registry { name: String, range: String },
    /// Something outside the registry (git, tarball URL, local path,
    /// workspace link). Not followed.
    External,
}

/// Dependencies declared by one manifest.
#[derive(Debug, Clone, Default)]
pub struct ManifestDeps {
    /// Valid dependencies as (name, range) pairs, sorted by name.
    pub deps: Vec<(String, String)>,
    /// Entries that could not be read.
    pub errors: Vec<PkgError>,
}

/// Extract the runtime dependencies declared by a version manifest.
///
/// `dependencies` always counts; `optionalDependencies` only when
/// `include_optional` is set. When a name appears in both, `dependencies`
/// wins.
#[must_use]
pub fn manifest_deps(manifest: &Value, include_optional: bool) -> ManifestDeps {
    let mut result = ManifestDeps::default();
    let Some(root) = manifest.as_object() else {
        result
            .errors
            .push(PkgError::manifest_invalid("version manifest must be a JSON object"));
        return result;
    };

    let mut deps_map: BTreeMap<String, String> = BTreeMap::new();
    if include_optional {
        extract_section(root, "optionalDependencies", &mut deps_map, &mut result.errors);
    }
    extract_section(root, "dependencies", &mut deps_map, &mut result.errors);

    result.deps = deps_map.into_iter().collect();
    result
}

/// Classify a declared dependency.
///
/// `npm:` aliases resolve to the aliased package.
#[must_use]
pub fn dep_target(name: &str, spec: &str) -> DepTarget {
    let spec = spec.trim();

    if let Some(alias) = spec.strip_prefix("npm:") {
        // `npm:@scope/real@^1` or `npm:real@^1` or `npm:real`
        let search_from = usize::from(alias.starts_with('@'));
        return match alias[search_from..].find('@') {
            Some(pos) => DepTarget::Registry {
                name: alias[..search_from + pos].to_string(),
                range: alias[search_from + pos + 1..].to_string(),
            },
            None => DepTarget::Registry {
                name: alias.to_string(),
                range: String::new(),
            },
        };
    }

    let external_prefixes = [
        "file:",
        "link:",
        "workspace:",
        "portal:",
        "git:",
        "git+",
        "github:",
        "gitlab:",
        "bitbucket:",
        "http:",
        "https:",
    ];
    if external_prefixes.iter().any(|p| spec.starts_with(p)) {
        return DepTarget::External;
    }

    // `user/repo` GitHub shorthand
    if spec.contains('/') && !spec.starts_with('@') {
        return DepTarget::External;
    }

    DepTarget::Registry {
        name: name.to_string(),
        range: spec.to_string(),
    }
}

fn extract_section(
    root: &serde_json::Map<String, Value>,
    section: &str,
    deps_map: &mut BTreeMap<String, String>,
    errors: &mut Vec<PkgError>,
) {
    let Some(section_value) = root.get(section) else {
        return;
    };

    let Some(section_obj) = section_value.as_object() else {
        errors.push(PkgError::new(
            codes::PKG_MANIFEST_INVALID,
            format!(
                "'{section}' must be an object, got {}",
                json_type_name(section_value)
            ),
        ));
        return;
    };

    for (name, range_value) in section_obj {
        if let Some(range) = range_value.as_str() {
            deps_map.insert(name.clone(), range.to_string());
        } else {
            errors.push(PkgError::dep_range_invalid(
                name,
                json_type_name(range_value),
            ));
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

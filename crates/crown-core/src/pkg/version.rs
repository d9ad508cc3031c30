//! SemVer precedence and npm range resolution.

use super::error::PkgError;
use super::registry::{get_dist_tag, get_latest_tag, get_versions};
use semver::{Version, VersionReq};
use std::cmp::Ordering;

/// Compare two versions by SemVer precedence.
///
/// Build metadata does not take part in precedence, unlike
/// `Version`'s own `Ord`, which uses it as a tie-breaker.
#[must_use]
pub fn cmp_precedence(a: &Version, b: &Version) -> Ordering {
    a.major
        .cmp(&b.major)
        .then(a.minor.cmp(&b.minor))
        .then(a.patch.cmp(&b.patch))
        .then_with(|| a.pre.cmp(&b.pre))
}

/// Parse a version the way the registry publishes it.
///
/// Tolerates a leading `v` or `=` and surrounding whitespace.
#[must_use]
pub fn parse_version(input: &str) -> Option<Version> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('='))
        .unwrap_or(trimmed);
    Version::parse(trimmed).ok()
}

/// Highest version in the set by SemVer precedence.
///
/// Strings that are not valid versions are skipped.
#[must_use]
pub fn highest_version<'a, I>(versions: I) -> Option<Version>
where
    I: IntoIterator<Item = &'a str>,
{
    versions
        .into_iter()
        .filter_map(|v| {
            let parsed = parse_version(v);
            if parsed.is_none() {
                tracing::debug!(version = v, "ignoring unparseable version");
            }
            parsed
        })
        .max_by(cmp_precedence)
}

/// Resolve a version range, tag or exact version against a packument.
///
/// # Rules
/// - `None`, `""` and `"latest"` follow `dist-tags.latest` when it names a
///   published version, otherwise the highest published version
/// - any other dist-tag name resolves to the tagged version
/// - an exact published version resolves to itself
/// - otherwise the highest version satisfying the npm range wins; OR ranges
///   (`^1.0.0 || ^2.0.0`) are supported
///
/// # Errors
/// Returns an error if no version satisfies the range.
pub fn resolve_version(packument: &serde_json::Value, range: Option<&str>) -> Result<String, PkgError> {
    let name = packument
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    let published = get_versions(packument);

    let range = range.map(str::trim).unwrap_or("");
    if range.is_empty() || range == "latest" {
        if let Some(tagged) = get_latest_tag(packument) {
            if published.contains(&tagged) {
                return Ok(tagged.to_string());
            }
        }
        return highest_version(published.iter().copied())
            .map(|v| v.to_string())
            .ok_or_else(|| PkgError::version_not_found(name, "latest"));
    }

    if published.contains(&range) {
        return Ok(range.to_string());
    }
    // `semver` reads a bare version as a caret range; npm means exactly that version.
    if Version::parse(range).is_ok() {
        return Err(PkgError::version_not_found(name, range));
    }

    if let Some(tagged) = get_dist_tag(packument, range) {
        if published.contains(&tagged) {
            return Ok(tagged.to_string());
        }
    }

    let mut candidates: Vec<(Version, &str)> = published
        .iter()
        .filter_map(|v| Version::parse(v).ok().map(|parsed| (parsed, *v)))
        .collect();
    candidates.sort_by(|a, b| cmp_precedence(&b.0, &a.0));

    let reqs = parse_or_range(range)?;
    candidates
        .iter()
        .find(|(version, _)| reqs.iter().any(|req| req.matches(version)))
        .map(|(_, raw)| (*raw).to_string())
        .ok_or_else(|| PkgError::version_not_found(name, range))
}

/// Parse `a || b || c` into its alternatives, skipping invalid ones.
fn parse_or_range(range: &str) -> Result<Vec<VersionReq>, PkgError> {
    let reqs: Vec<VersionReq> = range
        .split("||")
        .map(str::trim)
        .filter(|alt| !alt.is_empty())
        .filter_map(|alt| parse_range(alt).ok())
        .collect();

    if reqs.is_empty() {
        return Err(PkgError::spec_invalid(format!(
            "Invalid version range '{range}'"
        )));
    }
    Ok(reqs)
}

/// Parse a single npm range into a `VersionReq`.
///
/// Handles hyphen ranges (`1.0.0 - 2.0.0`) and space-separated comparators
/// (`>= 2.1.2 < 3.0.0`) on top of what `semver` accepts natively. X-ranges
/// (`1.x`, `^1.x`, `~1.0.x`) are left to `semver`, which reads a wildcard
/// after an operator as a missing component.
fn parse_range(range: &str) -> Result<VersionReq, PkgError> {
    let mut comparators: Vec<String> = if let Some((start, end)) = range.split_once(" - ") {
        vec![
            format!(">={}", start.trim()),
            format!("<={}", end.trim()),
        ]
    } else {
        split_comparators(range)
            .iter()
            .map(|c| normalize_comparator(c))
            .collect()
    };

    // `semver` only accepts `*` as the sole comparator.
    comparators.retain(|c| c != "*");
    if comparators.is_empty() {
        comparators.push("*".to_string());
    }

    VersionReq::parse(&comparators.join(", "))
        .map_err(|e| PkgError::spec_invalid(format!("Invalid version range '{range}': {e}")))
}

/// Split npm's whitespace-separated comparator set.
///
/// An operator separated from its version by a space (`>= 2.1.2`) is glued
/// back onto it.
fn split_comparators(range: &str) -> Vec<String> {
    let mut comparators: Vec<String> = Vec::new();
    let mut pending_op = String::new();

    for token in range.split_whitespace() {
        if token.chars().any(|c| c.is_ascii_digit() || matches!(c, 'x' | 'X' | '*')) {
            comparators.push(format!("{pending_op}{token}"));
            pending_op.clear();
        } else {
            pending_op.push_str(token);
        }
    }
    if !pending_op.is_empty() {
        comparators.push(pending_op);
    }

    comparators
}

/// Rewrite one npm comparator in `semver` syntax.
///
/// npm reads an operator-less version as exact (`1.0.0`) or as an x-range
/// (`1.0` is `1.0.x`); `semver` reads both as caret, so they get an explicit
/// `=`, which `semver` treats the same way npm does.
fn normalize_comparator(comparator: &str) -> String {
    let body_start = comparator
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '^' | '~'))
        .unwrap_or(comparator.len());
    let (op, body) = comparator.split_at(body_start);
    let body = body.strip_prefix('v').unwrap_or(body);

    if matches!(body, "" | "*" | "x" | "X") {
        return "*".to_string();
    }
    if op.is_empty() {
        format!("={body}")
    } else {
        format!("{op}{body}")
    }
}

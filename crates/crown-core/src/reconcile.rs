//! Latest-tag reconciliation.
//!
//! For one package: read its published versions and its `latest` dist-tag,
//! decide whether the tag is right, and move it to the highest version when
//! it is not.

use crate::log::Logger;
use crate::pkg::registry::{get_latest_tag, get_versions, RegistryClient};
use crate::pkg::version::{cmp_precedence, highest_version, parse_version};
use crate::pkg::PkgError;
use semver::Version;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// State of a package's `latest` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    /// The tag names the highest version.
    Correct,
    /// No tag, but there are versions to point it at.
    Missing,
    /// A higher version than the tagged one exists.
    Stale,
    /// The tag names something above every published version, or
    /// something that is not a version at all.
    Dangling,
    /// Nothing is published; there is nothing to tag.
    MissingVersions,
}

impl Verdict {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::Missing => "missing",
            Self::Stale => "stale",
            Self::Dangling => "dangling",
            Self::MissingVersions => "missing-versions",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying a (version set, latest tag) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub verdict: Verdict,
    /// Highest published version, if any.
    pub highest: Option<Version>,
}

impl Classification {
    /// Version the tag should be moved to, if it needs moving.
    #[must_use]
    pub fn target(&self) -> Option<&Version> {
        match self.verdict {
            Verdict::Missing | Verdict::Stale | Verdict::Dangling => self.highest.as_ref(),
            Verdict::Correct | Verdict::MissingVersions => None,
        }
    }
}

/// Classify a package's `latest` tag against its published versions.
///
/// Pure: the verdict depends on nothing but the arguments. Versions that do
/// not parse are ignored; a tag that does not parse is `Dangling`.
#[must_use]
pub fn classify<'a, I>(versions: I, latest: Option<&str>) -> Classification
where
    I: IntoIterator<Item = &'a str>,
{
    let highest = highest_version(versions);

    let verdict = match (&highest, latest) {
        (None, _) => Verdict::MissingVersions,
        (Some(_), None) => Verdict::Missing,
        (Some(highest), Some(tag)) => match parse_version(tag) {
            None => Verdict::Dangling,
            Some(tagged) => match cmp_precedence(highest, &tagged) {
                Ordering::Equal => Verdict::Correct,
                Ordering::Greater => Verdict::Stale,
                Ordering::Less => Verdict::Dangling,
            },
        },
    };

    Classification { verdict, highest }
}

/// What was done about a package's tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Nothing to do.
    None,
    /// The tag was moved.
    Applied,
    /// The tag would have been moved, but this is a dry run.
    Simulated,
}

/// Outcome for one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub package: String,
    pub verdict: Verdict,
    /// Tag value before this run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    /// Version the tag was (or would be) moved to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub action: Action,
}

/// Options for reconciliation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    pub dry_run: bool,
}

/// Check and repair the `latest` tag of one package.
///
/// # Errors
/// Returns the registry error if the packument cannot be read or the tag
/// write fails. An empty version set is not an error.
pub async fn reconcile(
    pkg: &str,
    registry: &RegistryClient,
    options: ReconcileOptions,
    logger: &Logger,
) -> Result<Reconciliation, PkgError> {
    let packument = registry.fetch_packument(pkg).await?;
    let current = get_latest_tag(&packument).map(String::from);
    let classification = classify(get_versions(&packument), current.as_deref());
    tracing::debug!(package = pkg, verdict = %classification.verdict, "classified");

    let tagged = current.as_deref().unwrap_or_default();
    let success = match classification.verdict {
        Verdict::MissingVersions => {
            logger.error(format_args!("{pkg}: No published versions, nothing to tag."));
            None
        }
        Verdict::Correct => {
            logger.verbose(format_args!("{pkg}: {tagged} is correctly tagged as latest."));
            None
        }
        Verdict::Missing => {
            logger.warn(format_args!(
                "{pkg}: No latest tag. Tagging the highest version right away."
            ));
            Some("latest restored.")
        }
        Verdict::Stale => {
            logger.info(format_args!(
                "{pkg}: {tagged} is no longer the highest version and steps down."
            ));
            Some("latest updated.")
        }
        Verdict::Dangling => {
            logger.warn(format_args!(
                "{pkg}: latest points at {tagged}, which is not a published version. Replacing it."
            ));
            Some("dangling latest replaced.")
        }
    };

    let mut outcome = Reconciliation {
        package: pkg.to_string(),
        verdict: classification.verdict,
        current,
        target: None,
        action: Action::None,
    };

    let (Some(target), Some(success)) = (classification.target(), success) else {
        return Ok(outcome);
    };
    let target = target.to_string();
    outcome.target = Some(target.clone());

    logger.info(format_args!("{pkg}: Setting latest to {target}."));
    if options.dry_run {
        logger.info(format_args!("{pkg}: {success} (dry run, nothing written)"));
        outcome.action = Action::Simulated;
        return Ok(outcome);
    }

    if let Err(e) = registry.set_latest_tag(pkg, &target).await {
        logger.error(format_args!("{pkg}: Failed to set latest tag."));
        tracing::debug!(package = pkg, error = %e, "dist-tag write failed");
        return Err(e);
    }

    logger.info(format_args!("{pkg}: {success}"));
    outcome.action = Action::Applied;
    Ok(outcome)
}

//! One full audit run: resolve the package set, then reconcile each package
//! in turn.
//!
//! The run is fail-fast. The first registry error stops it and is returned
//! to the caller; packages already handled keep whatever was written.

use crate::config::Config;
use crate::error::Error;
use crate::log::Logger;
use crate::pkg::{list_all_packages, resolve_package_set, PackageSet, PackageSpec, RegistryClient, ResolveOptions};
use crate::reconcile::{reconcile, Action, Reconciliation, ReconcileOptions, Verdict};
use serde::Serialize;

/// Options for one run.
#[derive(Debug, Clone, Default)]
pub struct AuditOptions {
    pub dry_run: bool,
    pub resolve: ResolveOptions,
}

impl From<&Config> for AuditOptions {
    fn from(config: &Config) -> Self {
        Self {
            dry_run: config.dry_run,
            resolve: config.resolve_options(),
        }
    }
}

/// Per-verdict counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    pub correct: usize,
    pub missing: usize,
    pub stale: usize,
    pub dangling: usize,
    pub missing_versions: usize,
    /// Tags moved (or, in a dry run, that would have been moved).
    pub corrected: usize,
}

/// Everything one run did, in processing order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    pub dry_run: bool,
    pub packages: Vec<Reconciliation>,
}

impl AuditReport {
    #[must_use]
    pub fn summary(&self) -> AuditSummary {
        let mut summary = AuditSummary::default();
        for outcome in &self.packages {
            match outcome.verdict {
                Verdict::Correct => summary.correct += 1,
                Verdict::Missing => summary.missing += 1,
                Verdict::Stale => summary.stale += 1,
                Verdict::Dangling => summary.dangling += 1,
                Verdict::MissingVersions => summary.missing_versions += 1,
            }
            if outcome.action != Action::None {
                summary.corrected += 1;
            }
        }
        summary
    }

    /// Outcome for one package, if it was audited.
    #[must_use]
    pub fn get(&self, package: &str) -> Option<&Reconciliation> {
        self.packages.iter().find(|r| r.package == package)
    }
}

/// Work out which packages to audit.
///
/// No roots means every package in the registry; otherwise the roots plus
/// their dependency closure.
///
/// # Errors
/// Returns the listing or resolution error.
pub async fn resolve_targets(
    roots: &[PackageSpec],
    registry: &RegistryClient,
    options: &ResolveOptions,
) -> Result<PackageSet, Error> {
    if roots.is_empty() {
        let names = list_all_packages(registry).await?;
        Ok(names.into_iter().collect())
    } else {
        Ok(resolve_package_set(roots, registry, options).await?)
    }
}

/// Audit against an already configured registry client.
///
/// # Errors
/// Returns the first resolution or registry error; the run stops there.
pub async fn audit_with_client(
    roots: &[PackageSpec],
    registry: &RegistryClient,
    options: &AuditOptions,
    logger: &Logger,
) -> Result<AuditReport, Error> {
    logger.info("Resolving packages...");
    let packages = resolve_targets(roots, registry, &options.resolve).await?;
    tracing::debug!(count = packages.len(), "package set resolved");

    logger.info("Inspecting latest tags...");
    let reconcile_options = ReconcileOptions {
        dry_run: options.dry_run,
    };
    let mut report = AuditReport {
        dry_run: options.dry_run,
        packages: Vec::with_capacity(packages.len()),
    };
    for pkg in packages.iter() {
        let outcome = reconcile(pkg, registry, reconcile_options, logger).await?;
        report.packages.push(outcome);
    }

    logger.info("Done.");
    Ok(report)
}

/// Load the registry configuration and run a full audit.
///
/// # Errors
/// Returns a configuration error before anything is fetched, or the first
/// registry error during the run.
pub async fn run(config: &Config, roots: &[PackageSpec], logger: &Logger) -> Result<AuditReport, Error> {
    let registry = config.registry_client()?;
    audit_with_client(roots, &registry, &AuditOptions::from(config), logger).await
}

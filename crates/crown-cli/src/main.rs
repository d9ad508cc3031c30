#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

mod logging;
mod output;

use clap::Parser;
use crown_core::log::Logger;
use crown_core::pkg::PackageSpec;
use crown_core::version::version_string;
use crown_core::{audit, Config, Error};
use miette::{IntoDiagnostic, MietteDiagnostic, Result};
use std::path::PathBuf;
use std::sync::Arc;

const LONG_ABOUT: &str = "\
Keeps the `latest` dist-tag of npm packages on their highest published version.

With no packages given, every package in the registry is inspected. Otherwise
the given packages and all of their dependencies (recursively) are inspected.
A `latest` tag that is behind, missing, or points at a version that was never
published is moved to the highest version.

Registry and credentials are read from the .npmrc in your home directory.";

const AUTH_HINT: &str = "There is likely something wrong with your credentials. \
Use `npm adduser` (or `npm login`) to add credentials.";

#[derive(Parser, Debug)]
#[command(name = "crown")]
#[command(author, version, about = "Keeps the latest dist-tag on the highest published version", long_about = LONG_ABOUT)]
struct Cli {
    /// Packages to inspect, as `name` or `name@range` (default: the whole registry)
    #[arg(value_name = "PACKAGE", value_parser = parse_package)]
    packages: Vec<PackageSpec>,

    /// Print packages that are already correct (-vv for DEBUG, -vvv for TRACE diagnostics)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Report what would change without updating any tag
    #[arg(long)]
    dry_run: bool,

    /// Hide info output
    #[arg(long)]
    no_info: bool,

    /// Hide warnings
    #[arg(long)]
    no_warn: bool,

    /// Hide errors
    #[arg(long)]
    no_error: bool,

    /// Print a JSON report on stdout (status lines move to stderr)
    #[arg(long)]
    json: bool,

    /// Registry URL, overriding .npmrc
    #[arg(long, value_name = "URL", env = crown_core::pkg::REGISTRY_ENV)]
    registry: Option<String>,

    /// Read this .npmrc instead of the one in your home directory
    #[arg(long, value_name = "PATH")]
    npmrc: Option<PathBuf>,

    /// Follow optionalDependencies too
    #[arg(long)]
    optional: bool,
}

fn parse_package(input: &str) -> std::result::Result<PackageSpec, String> {
    PackageSpec::parse(input).map_err(|e| e.message().to_string())
}

impl Cli {
    fn config(&self) -> Config {
        Config::new()
            .with_dry_run(self.dry_run)
            .with_verbosity(self.verbose)
            .with_json(self.json)
            .with_channels(!self.no_info, !self.no_warn, !self.no_error)
            .with_registry(self.registry.clone())
            .with_npmrc_path(self.npmrc.clone())
            .with_include_optional(self.optional)
    }
}

/// Turn a core error into a diagnostic, attaching the credentials hint when
/// the registry answered 401.
fn diagnostic(err: &Error) -> miette::Report {
    let mut diag = MietteDiagnostic::new(err.to_string()).with_code(err.code());
    if err.is_auth_failure() {
        diag = diag.with_help(AUTH_HINT);
    }
    miette::Report::new(diag)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json);
    tracing::debug!(version = %version_string(), "starting");

    let config = cli.config();
    let logger = Logger::new(config.channels, Arc::new(output::ConsoleSink::new(config.json)));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;

    match runtime.block_on(audit::run(&config, &cli.packages, &logger)) {
        Ok(report) => {
            if config.json {
                output::print_report(&report);
            }
            Ok(())
        }
        Err(err) => {
            tracing::debug!(code = err.code(), "run failed");
            if config.json {
                output::print_failure(&err);
                std::process::exit(1);
            }
            Err(diagnostic(&err))
        }
    }
}

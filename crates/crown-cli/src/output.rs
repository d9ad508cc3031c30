//! Console rendering: status lines and the `--json` report.

use crown_core::log::{Channel, LogSink};
use crown_core::{AuditReport, AuditSummary, Error, VERSION};
use serde::Serialize;
use std::io::Write;

/// Writes status lines to the terminal.
///
/// Verbose and info go to stdout, warnings and errors to stderr. In JSON
/// mode stdout is reserved for the report, so everything goes to stderr.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleSink {
    json: bool,
}

impl ConsoleSink {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn to_stdout(self, channel: Channel) -> bool {
        !self.json && matches!(channel, Channel::Verbose | Channel::Info)
    }
}

impl LogSink for ConsoleSink {
    fn emit(&self, channel: Channel, line: &str) {
        // A closed pipe is not worth dying over.
        if self.to_stdout(channel) {
            let _ = writeln!(std::io::stdout().lock(), "{line}");
        } else {
            let _ = writeln!(std::io::stderr().lock(), "{line}");
        }
    }
}

/// JSON report for a finished run (locked format: { ok, version, dry_run, summary, packages }).
#[derive(Serialize)]
struct AuditOutput<'a> {
    ok: bool,
    version: &'static str,
    dry_run: bool,
    summary: AuditSummary,
    packages: &'a [crown_core::Reconciliation],
}

/// JSON report for a failed run (locked format: { ok, version, error }).
#[derive(Serialize)]
struct FailureOutput<'a> {
    ok: bool,
    version: &'static str,
    error: ErrorInfo<'a>,
}

#[derive(Serialize)]
struct ErrorInfo<'a> {
    code: &'a str,
    message: String,
    auth_failure: bool,
}

pub fn print_report(report: &AuditReport) {
    let output = AuditOutput {
        ok: true,
        version: VERSION,
        dry_run: report.dry_run,
        summary: report.summary(),
        packages: &report.packages,
    };
    print_json(&output);
}

pub fn print_failure(err: &Error) {
    let output = FailureOutput {
        ok: false,
        version: VERSION,
        error: ErrorInfo {
            code: err.code(),
            message: err.to_string(),
            auth_failure: err.is_auth_failure(),
        },
    };
    print_json(&output);
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            let _ = writeln!(std::io::stdout().lock(), "{json}");
        }
        Err(e) => tracing::error!(error = %e, "failed to serialize report"),
    }
}

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod audit;
pub mod config;
pub mod error;
pub mod log;
pub mod pkg;
pub mod reconcile;
pub mod version;

pub use audit::{audit_with_client, AuditOptions, AuditReport, AuditSummary};
pub use config::Config;
pub use error::Error;
pub use log::{Channel, Channels, Logger};
pub use reconcile::{classify, reconcile, Action, Classification, Reconciliation, ReconcileOptions, Verdict};
pub use version::VERSION;

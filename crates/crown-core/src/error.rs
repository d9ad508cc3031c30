use crate::pkg::PkgError;
use std::path::PathBuf;
use thiserror::Error;

/// Error code for configuration failures.
pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

/// Core error type for crown operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read registry config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid registry config at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    #[error("Invalid registry URL '{url}': {message}")]
    RegistryUrl { url: String, message: String },

    #[error(transparent)]
    Pkg(#[from] PkgError),
}

impl Error {
    /// Stable code for machine-readable output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigRead { .. } | Self::ConfigInvalid { .. } | Self::RegistryUrl { .. } => {
                CONFIG_INVALID
            }
            Self::Pkg(e) => e.code(),
        }
    }

    /// Whether the registry rejected our credentials (HTTP 401).
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Pkg(e) if e.is_auth_failure())
    }
}

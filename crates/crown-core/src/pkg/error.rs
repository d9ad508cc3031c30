//! Registry and package error types.

use std::fmt;

/// Package error codes.
pub mod codes {
    pub const PKG_SPEC_INVALID: &str = "PKG_SPEC_INVALID";
    pub const PKG_NOT_FOUND: &str = "PKG_NOT_FOUND";
    pub const PKG_VERSION_NOT_FOUND: &str = "PKG_VERSION_NOT_FOUND";
    pub const PKG_REGISTRY_READ_FAILED: &str = "PKG_REGISTRY_READ_FAILED";
    pub const PKG_REGISTRY_WRITE_FAILED: &str = "PKG_REGISTRY_WRITE_FAILED";
    pub const PKG_AUTH_FAILED: &str = "PKG_AUTH_FAILED";
    pub const PKG_RESOLUTION_FAILED: &str = "PKG_RESOLUTION_FAILED";
    pub const PKG_MANIFEST_INVALID: &str = "PKG_MANIFEST_INVALID";
    pub const PKG_DEP_RANGE_INVALID: &str = "PKG_DEP_RANGE_INVALID";
}

/// HTTP status the registry uses for rejected credentials.
pub const STATUS_UNAUTHORIZED: u16 = 401;

/// Package error.
///
/// Carries a stable code, a human message and, when the failure came from
/// an HTTP response, the status the registry returned. The status survives
/// [`PkgError::wrap`] so callers can still detect credential problems after
/// the resolver has re-labelled the error.
#[derive(Debug, Clone)]
pub struct PkgError {
    code: &'static str,
    message: String,
    status: Option<u16>,
}

impl PkgError {
    /// Create a new error with the given code and message.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
        }
    }

    /// Attach the HTTP status that caused this error.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status returned by the registry, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Whether the registry rejected our credentials.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        self.code == codes::PKG_AUTH_FAILED || self.status == Some(STATUS_UNAUTHORIZED)
    }

    /// Re-label this error under a new code, prefixing the message.
    ///
    /// The HTTP status is kept.
    #[must_use]
    pub fn wrap(self, code: &'static str, context: impl fmt::Display) -> Self {
        Self {
            code,
            message: format!("{context}: {}", self.message),
            status: self.status,
        }
    }

    pub fn spec_invalid(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_SPEC_INVALID, msg)
    }

    #[must_use]
    pub fn not_found(name: &str) -> Self {
        Self::new(codes::PKG_NOT_FOUND, format!("Package not found: {name}")).with_status(404)
    }

    #[must_use]
    pub fn version_not_found(name: &str, range: &str) -> Self {
        Self::new(
            codes::PKG_VERSION_NOT_FOUND,
            format!("No version of {name} satisfies range: {range}"),
        )
    }

    pub fn registry_read(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_REGISTRY_READ_FAILED, msg)
    }

    pub fn registry_write(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_REGISTRY_WRITE_FAILED, msg)
    }

    /// Create an authentication failure (HTTP 401).
    pub fn auth_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_AUTH_FAILED, msg).with_status(STATUS_UNAUTHORIZED)
    }

    pub fn manifest_invalid(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_MANIFEST_INVALID, msg)
    }

    #[must_use]
    pub fn dep_range_invalid(name: &str, actual_type: &str) -> Self {
        Self::new(
            codes::PKG_DEP_RANGE_INVALID,
            format!("Invalid range for '{name}': expected string, got {actual_type}"),
        )
    }
}

impl fmt::Display for PkgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PkgError {}

impl From<reqwest::Error> for PkgError {
    fn from(e: reqwest::Error) -> Self {
        let err = if e.is_timeout() {
            Self::registry_read(format!("Request timed out: {e}"))
        } else if e.is_connect() {
            Self::registry_read(format!("Connection failed: {e}"))
        } else {
            Self::registry_read(e.to_string())
        };
        match e.status() {
            Some(status) => err.with_status(status.as_u16()),
            None => err,
        }
    }
}

impl From<serde_json::Error> for PkgError {
    fn from(e: serde_json::Error) -> Self {
        Self::registry_read(format!("Invalid JSON: {e}"))
    }
}

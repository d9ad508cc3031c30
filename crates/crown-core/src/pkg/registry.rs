//! npm registry client.
//!
//! Reads packuments and the full package listing, and moves the `latest`
//! dist-tag. Scoped packages are routed to their scope's registry when the
//! `.npmrc` configures one.

use super::error::PkgError;
use super::npmrc::{NpmrcConfig, RegistryEndpoint};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Environment variable to override the default registry URL.
pub const REGISTRY_ENV: &str = "CROWN_NPM_REGISTRY";

/// Dist-tag this tool maintains.
pub const LATEST_TAG: &str = "latest";

/// Registry client.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    default: RegistryEndpoint,
    scoped: HashMap<String, RegistryEndpoint>,
    http: Client,
}

impl RegistryClient {
    /// Create a client for a single registry without credentials.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be created.
    pub fn new(base_url: &str) -> Result<Self, PkgError> {
        let url = super::npmrc::normalize_registry_url(base_url)
            .map_err(|e| PkgError::registry_read(format!("Invalid registry URL '{base_url}': {e}")))?;
        Self::with_endpoints(
            RegistryEndpoint {
                url,
                credential: None,
            },
            HashMap::new(),
        )
    }

    /// Create a client from parsed `.npmrc` settings.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn from_npmrc(config: &NpmrcConfig) -> Result<Self, PkgError> {
        Self::with_endpoints(config.default_endpoint(), config.scoped_endpoints())
    }

    fn with_endpoints(
        default: RegistryEndpoint,
        scoped: HashMap<String, RegistryEndpoint>,
    ) -> Result<Self, PkgError> {
        // Only connecting is bounded; a large `/-/all` download may take as long as it takes.
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("crown/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PkgError::registry_read(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            default,
            scoped,
            http,
        })
    }

    /// Base URL of the default registry.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.default.url
    }

    /// Endpoint serving the given package.
    #[must_use]
    pub fn endpoint_for(&self, name: &str) -> &RegistryEndpoint {
        name.split_once('/')
            .filter(|(scope, _)| scope.starts_with('@'))
            .and_then(|(scope, _)| self.scoped.get(scope))
            .unwrap_or(&self.default)
    }

    /// Fetch the packument (package metadata) for a package.
    ///
    /// # Errors
    /// Returns an error if the request fails, the package is not found, or
    /// the registry rejects our credentials.
    pub async fn fetch_packument(&self, name: &str) -> Result<Value, PkgError> {
        let endpoint = self.endpoint_for(name);
        let url = join(&endpoint.url, &encode_name(name), name)?;

        tracing::debug!(package = name, url = %url, "fetching packument");
        let response = self.authorize(self.http.get(url.as_str()), endpoint).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(PkgError::not_found(name));
        }
        let response = check_read_status(response, &format!("'{name}'"))?;

        let json: Value = response.json().await?;
        Ok(json)
    }

    /// Fetch the registry's full package listing (`/-/all`).
    ///
    /// The document is returned as-is, first entry included.
    ///
    /// # Errors
    /// Returns an error if the request fails or the registry rejects our
    /// credentials.
    pub async fn fetch_all(&self) -> Result<Value, PkgError> {
        let url = join(&self.default.url, "-/all", "-/all")?;

        tracing::debug!(url = %url, "fetching package listing");
        let response = self
            .authorize(self.http.get(url.as_str()), &self.default)
            .send()
            .await?;
        let response = check_read_status(response, "the package listing")?;

        let json: Value = response.json().await?;
        Ok(json)
    }

    /// Point the `latest` dist-tag of `name` at `version`.
    ///
    /// # Errors
    /// Returns an auth error for HTTP 401 and a write error for any other
    /// failure.
    pub async fn set_latest_tag(&self, name: &str, version: &str) -> Result<(), PkgError> {
        let endpoint = self.endpoint_for(name);
        let path = format!("-/package/{}/dist-tags/{LATEST_TAG}", encode_name(name));
        let url = join(&endpoint.url, &path, name)?;
        let body = serde_json::to_string(version)?;

        tracing::debug!(package = name, version, url = %url, "setting dist-tag");
        let response = self
            .authorize(self.http.put(url.as_str()), endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| PkgError::from(e).wrap(super::error::codes::PKG_REGISTRY_WRITE_FAILED, name))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(PkgError::auth_failed(format!(
                "Registry returned status {status} when tagging '{name}'"
            )));
        }
        if !status.is_success() {
            return Err(PkgError::registry_write(format!(
                "Registry returned status {status} when tagging '{name}'"
            ))
            .with_status(status.as_u16()));
        }

        Ok(())
    }

    fn authorize(&self, request: RequestBuilder, endpoint: &RegistryEndpoint) -> RequestBuilder {
        match &endpoint.credential {
            Some(credential) => request.header(AUTHORIZATION, credential.header_value()),
            None => request,
        }
    }
}

fn check_read_status(response: Response, what: &str) -> Result<Response, PkgError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(PkgError::auth_failed(format!(
            "Registry returned status {status} for {what}"
        )));
    }
    if !status.is_success() {
        return Err(PkgError::registry_read(format!(
            "Registry returned status {status} for {what}"
        ))
        .with_status(status.as_u16()));
    }
    Ok(response)
}

fn join(base: &Url, path: &str, name: &str) -> Result<Url, PkgError> {
    base.join(path)
        .map_err(|e| PkgError::registry_read(format!("Failed to build URL for '{name}': {e}")))
}

/// URL-encode the `/` of a scoped name.
fn encode_name(name: &str) -> String {
    if name.starts_with('@') {
        name.replace('/', "%2F")
    } else {
        name.to_string()
    }
}

/// Extract the `latest` dist-tag from a packument.
#[must_use]
pub fn get_latest_tag(packument: &Value) -> Option<&str> {
    packument.get("dist-tags")?.get(LATEST_TAG)?.as_str()
}

/// Extract an arbitrary dist-tag from a packument.
#[must_use]
pub fn get_dist_tag<'a>(packument: &'a Value, tag: &str) -> Option<&'a str> {
    packument.get("dist-tags")?.get(tag)?.as_str()
}

/// Get all published version strings from a packument.
#[must_use]
pub fn get_versions(packument: &Value) -> Vec<&str> {
    packument
        .get("versions")
        .and_then(|v| v.as_object())
        .map(|obj| obj.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

/// Get the manifest of one published version.
#[must_use]
pub fn get_version_manifest<'a>(packument: &'a Value, version: &str) -> Option<&'a Value> {
    packument.get("versions")?.get(version)
}

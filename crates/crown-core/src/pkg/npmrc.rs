//! `.npmrc` parser for registry routing and credentials.
//!
//! Understands:
//! - `registry=URL` for the default registry
//! - `@scope:registry=URL` for routing scoped packages
//! - `//host/:_authToken=TOKEN` and `//host/:_auth=BASE64` for credentials
//! - a bare `_authToken=TOKEN` that applies to the default registry
//! - `${ENV_VAR}` expansion in values

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::Error;

/// Default npm registry URL.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Error raised for a malformed `.npmrc` line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct NpmrcParseError {
    pub line: usize,
    pub message: String,
}

/// Parsed `.npmrc` configuration.
#[derive(Debug, Clone, Default)]
pub struct NpmrcConfig {
    /// Default registry (`registry=`), if set.
    pub registry: Option<Url>,
    /// Top-level `_authToken`, used for the default registry.
    pub default_auth_token: Option<String>,
    /// Scope → registry URL mapping (e.g., `@acme` → `https://npm.acme.dev/`).
    pub scoped_registries: HashMap<String, Url>,
    /// Host (optionally with path) → bearer token.
    pub auth_tokens: HashMap<String, String>,
    /// Host (optionally with path) → pre-encoded basic credentials.
    pub basic_auth: HashMap<String, String>,
}

/// Credentials presented to a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Bearer(String),
    Basic(String),
}

impl Credential {
    /// Value for the `Authorization` header.
    #[must_use]
    pub fn header_value(&self) -> String {
        match self {
            Self::Bearer(token) => format!("Bearer {token}"),
            Self::Basic(auth) => format!("Basic {auth}"),
        }
    }
}

/// A registry base URL together with the credentials to use against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEndpoint {
    pub url: Url,
    pub credential: Option<Credential>,
}

/// Parse `.npmrc` content.
///
/// Comments (`#`, `;`) and blank lines are skipped, as are keys this tool
/// has no use for.
///
/// # Errors
/// Returns an error if a registry URL cannot be parsed.
pub fn parse_npmrc(content: &str) -> Result<NpmrcConfig, NpmrcParseError> {
    let mut config = NpmrcConfig::default();

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = expand_env_vars(unquote(value.trim()));
        let bad_url = |e: url::ParseError| NpmrcParseError {
            line: idx + 1,
            message: format!("invalid registry URL '{value}': {e}"),
        };

        if key == "registry" {
            config.registry = Some(normalize_registry_url(&value).map_err(bad_url)?);
        } else if key == "_authToken" {
            if !value.is_empty() {
                config.default_auth_token = Some(value);
            }
        } else if let Some(scope) = key.strip_suffix(":registry") {
            if scope.starts_with('@') {
                let url = normalize_registry_url(&value).map_err(bad_url)?;
                config.scoped_registries.insert(scope.to_string(), url);
            }
        } else if let Some(rest) = key.strip_prefix("//") {
            if value.is_empty() {
                continue;
            }
            if let Some(host) = rest.strip_suffix(":_authToken") {
                config
                    .auth_tokens
                    .insert(host.trim_end_matches('/').to_string(), value);
            } else if let Some(host) = rest.strip_suffix(":_auth") {
                config
                    .basic_auth
                    .insert(host.trim_end_matches('/').to_string(), value);
            }
        }
    }

    Ok(config)
}

/// Load a `.npmrc` file.
///
/// A missing file is not an error; the defaults apply.
///
/// # Errors
/// Returns [`Error::ConfigRead`] if the file exists but cannot be read, and
/// [`Error::ConfigInvalid`] if it cannot be parsed.
pub fn load_npmrc(path: &Path) -> Result<NpmrcConfig, Error> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no .npmrc found, using defaults");
            return Ok(NpmrcConfig::default());
        }
        Err(source) => {
            return Err(Error::ConfigRead {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    parse_npmrc(&content).map_err(|e| Error::ConfigInvalid {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Location of the per-user `.npmrc`.
#[must_use]
pub fn user_npmrc_path() -> Option<PathBuf> {
    dirs_next::home_dir().map(|home| home.join(".npmrc"))
}

/// Ensure a registry URL parses and ends with `/` so relative joins work.
///
/// # Errors
/// Returns the URL parse error.
pub fn normalize_registry_url(value: &str) -> Result<Url, url::ParseError> {
    if value.ends_with('/') {
        Url::parse(value)
    } else {
        Url::parse(&format!("{value}/"))
    }
}

impl NpmrcConfig {
    /// Replace the default registry.
    pub fn set_registry(&mut self, url: Url) {
        self.registry = Some(url);
    }

    /// The default registry, falling back to the public npm registry.
    #[must_use]
    pub fn default_registry(&self) -> Url {
        self.registry.clone().unwrap_or_else(|| {
            Url::parse(DEFAULT_REGISTRY).expect("DEFAULT_REGISTRY is a valid URL")
        })
    }

    /// Endpoint to use for the default registry.
    #[must_use]
    pub fn default_endpoint(&self) -> RegistryEndpoint {
        let url = self.default_registry();
        let credential = self
            .credential_for(&url)
            .or_else(|| self.default_auth_token.clone().map(Credential::Bearer));
        RegistryEndpoint { url, credential }
    }

    /// Endpoints for every configured scope, keyed by scope (`@acme`).
    #[must_use]
    pub fn scoped_endpoints(&self) -> HashMap<String, RegistryEndpoint> {
        self.scoped_registries
            .iter()
            .map(|(scope, url)| {
                let endpoint = RegistryEndpoint {
                    url: url.clone(),
                    credential: self.credential_for(url),
                };
                (scope.clone(), endpoint)
            })
            .collect()
    }

    /// Look up credentials for a registry URL.
    ///
    /// `host/path` entries win over bare `host` entries; bearer tokens win
    /// over basic auth.
    #[must_use]
    pub fn credential_for(&self, url: &Url) -> Option<Credential> {
        let host = url.host_str()?;
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let path = url.path().trim_end_matches('/');
        let mut keys = Vec::with_capacity(2);
        if !path.is_empty() {
            keys.push(format!("{host}{path}"));
        }
        keys.push(host);

        keys.iter().find_map(|key| {
            self.auth_tokens
                .get(key)
                .map(|t| Credential::Bearer(t.clone()))
                .or_else(|| self.basic_auth.get(key).map(|a| Credential::Basic(a.clone())))
        })
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Expand `${ENV_VAR}` patterns in a string.
///
/// Unknown variables expand to the empty string, as npm does.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
            if let Ok(val) = std::env::var(&var_name) {
                result.push_str(&val);
            }
        } else {
            result.push(ch);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_default_registry() {
        let config = parse_npmrc("registry=https://npm.acme.dev\n").unwrap();
        assert_eq!(
            config.default_registry().as_str(),
            "https://npm.acme.dev/"
        );
    }

    #[test]
    fn test_default_registry_fallback() {
        let config = NpmrcConfig::default();
        assert_eq!(config.default_registry().as_str(), DEFAULT_REGISTRY);
        assert_eq!(config.default_endpoint().credential, None);
    }

    #[test]
    fn test_parse_scoped_registry() {
        let config = parse_npmrc("@acme:registry=https://npm.acme.dev/\n").unwrap();
        assert_eq!(config.scoped_registries.len(), 1);
        assert_eq!(
            config.scoped_registries["@acme"].as_str(),
            "https://npm.acme.dev/"
        );
    }

    #[test]
    fn test_parse_combined() {
        let content = "\
# company registry
registry=https://npm.acme.dev/
//npm.acme.dev/:_authToken=acme-token

; GitHub Packages
@myorg:registry=https://npm.pkg.github.com/
//npm.pkg.github.com/:_authToken=ghp_abc123
always-auth=true
";
        let config = parse_npmrc(content).unwrap();
        assert_eq!(config.scoped_registries.len(), 1);
        assert_eq!(config.auth_tokens.len(), 2);

        let endpoint = config.default_endpoint();
        assert_eq!(endpoint.url.as_str(), "https://npm.acme.dev/");
        assert_eq!(
            endpoint.credential,
            Some(Credential::Bearer("acme-token".to_string()))
        );

        let scoped = config.scoped_endpoints();
        assert_eq!(
            scoped["@myorg"].credential,
            Some(Credential::Bearer("ghp_abc123".to_string()))
        );
    }

    #[test]
    fn test_top_level_auth_token_applies_to_default_registry() {
        let config = parse_npmrc("_authToken=abc\n").unwrap();
        assert_eq!(
            config.default_endpoint().credential,
            Some(Credential::Bearer("abc".to_string()))
        );
    }

    #[test]
    fn test_basic_auth() {
        let content = "\
registry=https://npm.acme.dev/
//npm.acme.dev/:_auth=dXNlcjpwYXNz
";
        let config = parse_npmrc(content).unwrap();
        let credential = config.default_endpoint().credential.unwrap();
        assert_eq!(credential.header_value(), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_host_with_path_wins() {
        let content = "\
registry=https://acme.dev/npm/
//acme.dev/:_authToken=host-token
//acme.dev/npm/:_authToken=path-token
";
        let config = parse_npmrc(content).unwrap();
        assert_eq!(
            config.default_endpoint().credential,
            Some(Credential::Bearer("path-token".to_string()))
        );
    }

    #[test]
    fn test_host_with_port() {
        let content = "\
registry=http://127.0.0.1:4873
//127.0.0.1:4873/:_authToken=local
";
        let config = parse_npmrc(content).unwrap();
        assert_eq!(
            config.default_endpoint().credential,
            Some(Credential::Bearer("local".to_string()))
        );
    }

    #[test]
    fn test_invalid_registry_url() {
        let err = parse_npmrc("\n\nregistry=not a url\n").unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.message.contains("invalid registry URL"));
    }

    #[test]
    fn test_quoted_value() {
        let config = parse_npmrc("registry=\"https://npm.acme.dev/\"\n").unwrap();
        assert_eq!(config.default_registry().as_str(), "https://npm.acme.dev/");
    }

    #[test]
    #[serial]
    fn test_env_var_expansion() {
        std::env::set_var("CROWN_TEST_NPMRC_TOKEN", "expanded_value");
        let config = parse_npmrc("//npm.acme.dev/:_authToken=${CROWN_TEST_NPMRC_TOKEN}\n").unwrap();
        assert_eq!(config.auth_tokens["npm.acme.dev"], "expanded_value");
        std::env::remove_var("CROWN_TEST_NPMRC_TOKEN");
    }

    #[test]
    fn test_env_var_missing() {
        assert_eq!(expand_env_vars("${NONEXISTENT_VAR_12345}"), "");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_npmrc(&dir.path().join(".npmrc")).unwrap();
        assert!(config.registry.is_none());
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".npmrc");
        std::fs::write(&path, "registry=::::\n").unwrap();
        let err = load_npmrc(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }
}

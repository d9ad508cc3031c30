use crate::error::Error;
use crate::log::Channels;
use crate::pkg::npmrc::{self, NpmrcConfig};
use crate::pkg::registry::{RegistryClient, REGISTRY_ENV};
use crate::pkg::ResolveOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Runtime configuration for one audit run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Compute corrections without writing them.
    pub dry_run: bool,

    /// Verbosity level (0 = quiet diagnostics, 1 = verbose channel, 2 = DEBUG, 3+ = TRACE).
    pub verbosity: u8,

    /// Emit a JSON report on stdout.
    pub json: bool,

    /// Status channels that are switched on.
    pub channels: Channels,

    /// `.npmrc` to read instead of the per-user one.
    pub npmrc_path: Option<PathBuf>,

    /// Registry URL that overrides the `.npmrc` default.
    pub registry: Option<String>,

    /// Follow optionalDependencies during resolution.
    pub include_optional: bool,
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set verbosity level. Any level above zero turns on the verbose channel.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self.channels.verbose = verbosity > 0;
        self
    }

    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Switch the info, warn and error channels.
    #[must_use]
    pub fn with_channels(mut self, info: bool, warn: bool, error: bool) -> Self {
        self.channels.info = info;
        self.channels.warn = warn;
        self.channels.error = error;
        self
    }

    #[must_use]
    pub fn with_npmrc_path(mut self, path: Option<PathBuf>) -> Self {
        self.npmrc_path = path;
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Option<String>) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_include_optional(mut self, include_optional: bool) -> Self {
        self.include_optional = include_optional;
        self
    }

    /// The `.npmrc` this run reads, if a home directory can be found.
    #[must_use]
    pub fn npmrc_location(&self) -> Option<PathBuf> {
        self.npmrc_path.clone().or_else(npmrc::user_npmrc_path)
    }

    /// Load registry settings.
    ///
    /// The default registry comes from, in order: [`Config::registry`],
    /// the `CROWN_NPM_REGISTRY` environment variable, the `.npmrc`
    /// `registry=` line, the public npm registry.
    ///
    /// # Errors
    /// Returns a configuration error if the `.npmrc` cannot be read or
    /// parsed, or if the override URL is invalid.
    pub fn load_registry_config(&self) -> Result<NpmrcConfig, Error> {
        let mut config = match self.npmrc_location() {
            Some(path) => npmrc::load_npmrc(&path)?,
            None => NpmrcConfig::default(),
        };

        let override_url = self
            .registry
            .clone()
            .or_else(|| std::env::var(REGISTRY_ENV).ok().filter(|v| !v.is_empty()));
        if let Some(raw) = override_url {
            let url = npmrc::normalize_registry_url(&raw).map_err(|e| Error::RegistryUrl {
                url: raw.clone(),
                message: e.to_string(),
            })?;
            config.set_registry(url);
        }

        Ok(config)
    }

    /// Build a registry client from the loaded settings.
    ///
    /// # Errors
    /// See [`Config::load_registry_config`].
    pub fn registry_client(&self) -> Result<RegistryClient, Error> {
        let npmrc = self.load_registry_config()?;
        let client = RegistryClient::from_npmrc(&npmrc)?;
        tracing::debug!(registry = %client.base_url(), "registry configured");
        Ok(client)
    }

    #[must_use]
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            include_optional: self.include_optional,
        }
    }
}

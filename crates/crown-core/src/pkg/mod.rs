//! Registry-facing package functionality.
//!
//! Provides utilities for:
//! - Reading registry routing and credentials from `.npmrc`
//! - Fetching packuments and the full package listing
//! - Moving the `latest` dist-tag
//! - SemVer precedence and npm range resolution
//! - Parsing root package arguments (name@range)
//! - Expanding roots into their dependency closure

pub mod deps;
pub mod enumerate;
pub mod error;
pub mod npmrc;
pub mod registry;
pub mod resolve;
pub mod set;
pub mod spec;
pub mod version;

pub use deps::{dep_target, manifest_deps, DepTarget, ManifestDeps};
pub use enumerate::{list_all_packages, package_names_from_listing};
pub use error::{codes as pkg_codes, PkgError};
pub use npmrc::{
    load_npmrc, parse_npmrc, user_npmrc_path, Credential, NpmrcConfig, RegistryEndpoint,
    DEFAULT_REGISTRY,
};
pub use registry::{get_latest_tag, get_versions, RegistryClient, LATEST_TAG, REGISTRY_ENV};
pub use resolve::{resolve_package_set, ResolveOptions};
pub use set::PackageSet;
pub use spec::PackageSpec;
pub use version::{cmp_precedence, highest_version, parse_version, resolve_version};

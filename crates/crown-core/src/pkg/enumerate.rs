//! Listing every package the registry knows about.

use super::error::PkgError;
use super::registry::RegistryClient;
use serde_json::Value;

/// Fetch the names of all packages in the default registry.
///
/// # Errors
/// Returns an error if the listing cannot be fetched or is not a JSON object.
pub async fn list_all_packages(registry: &RegistryClient) -> Result<Vec<String>, PkgError> {
    let listing = registry.fetch_all().await?;
    let names = package_names_from_listing(&listing)?;
    tracing::debug!(count = names.len(), "package listing received");
    Ok(names)
}

/// Extract package names from a `/-/all` document.
///
/// The first entry is registry metadata (`_updated` on npm) and is always
/// dropped. Each remaining entry contributes its `name` field, or its key
/// when the summary has none.
///
/// # Errors
/// Returns an error if the document is not a JSON object.
pub fn package_names_from_listing(listing: &Value) -> Result<Vec<String>, PkgError> {
    let entries = listing
        .as_object()
        .ok_or_else(|| PkgError::registry_read("Package listing is not a JSON object"))?;

    Ok(entries
        .iter()
        .skip(1)
        .map(|(key, summary)| {
            summary
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(key)
                .to_string()
        })
        .collect())
}

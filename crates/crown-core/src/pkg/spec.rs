//! Root package argument parsing.
//!
//! Accepts:
//! - `react`
//! - `react@18.2.0`, `react@^18.0.0`, `react@next`
//! - `@types/node`
//! - `@types/node@^20`

use super::error::PkgError;
use std::fmt;

/// A parsed package specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    /// Full package name (e.g., "@scope/name" or "name").
    pub name: String,
    /// Version range or dist-tag (None means the `latest` manifest).
    pub range: Option<String>,
}

impl PackageSpec {
    /// Parse a package specification string.
    ///
    /// # Errors
    /// Returns an error if the spec is invalid.
    pub fn parse(input: &str) -> Result<Self, PkgError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(PkgError::spec_invalid("Empty package spec"));
        }

        // The range delimiter is the first `@` after a scope's leading one.
        let search_from = usize::from(input.starts_with('@'));
        let (name, range) = match input[search_from..].find('@') {
            Some(pos) => {
                let at = search_from + pos;
                let range = &input[at + 1..];
                if range.is_empty() {
                    return Err(PkgError::spec_invalid(format!(
                        "Invalid package spec: empty version range in '{input}'"
                    )));
                }
                (&input[..at], Some(range.to_string()))
            }
            None => (input, None),
        };

        validate_name(name, input)?;

        Ok(Self {
            name: name.to_string(),
            range,
        })
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.range {
            Some(range) => write!(f, "{}@{range}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

fn validate_name(name: &str, input: &str) -> Result<(), PkgError> {
    let bare = if let Some(scoped) = name.strip_prefix('@') {
        let Some((scope, bare)) = scoped.split_once('/') else {
            return Err(PkgError::spec_invalid(format!(
                "Invalid scoped package: missing '/' in '{input}'"
            )));
        };
        if scope.is_empty() {
            return Err(PkgError::spec_invalid(format!(
                "Invalid scoped package: empty scope in '{input}'"
            )));
        }
        check_chars(scope, input)?;
        bare
    } else {
        name
    };

    if bare.is_empty() {
        return Err(PkgError::spec_invalid(format!(
            "Invalid package spec: empty name in '{input}'"
        )));
    }
    check_chars(bare, input)
}

fn check_chars(part: &str, input: &str) -> Result<(), PkgError> {
    match part
        .chars()
        .find(|c| !c.is_alphanumeric() && !matches!(c, '-' | '_' | '.' | '~'))
    {
        Some(c) => Err(PkgError::spec_invalid(format!(
            "Invalid character '{c}' in package name '{input}'"
        ))),
        None => Ok(()),
    }
}

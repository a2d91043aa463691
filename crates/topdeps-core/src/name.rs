//! Package names and scopes
//!
//! Registry package names are either plain (`lodash`) or scoped
//! (`@babel/core`). A scoped name is laid out on disk as `@babel/core` by the
//! archive fetcher and flattened to `@babel-core` by the layout normalizer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Leading character of a scope
pub const SCOPE_PREFIX: char = '@';

/// Separator between a scope and the local package name
pub const SCOPE_SEPARATOR: char = '/';

/// Separator used when a scoped name is flattened into a single directory name
pub const FLATTEN_SEPARATOR: char = '-';

/// A registry package name, optionally scoped
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageName {
    /// Scope including the leading `@`, e.g. `@babel`
    scope: Option<String>,
    /// Local name, e.g. `core`
    local: String,
}

impl PackageName {
    /// Parse a package name as it appears in listings and manifests
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CoreError::InvalidName {
                name: raw.to_string(),
            });
        }

        if raw.starts_with(SCOPE_PREFIX) {
            let (scope, local) =
                raw.split_once(SCOPE_SEPARATOR)
                    .ok_or_else(|| CoreError::InvalidName {
                        name: raw.to_string(),
                    })?;

            if !is_path_segment(&scope[1..]) || !is_path_segment(local) {
                return Err(CoreError::InvalidName {
                    name: raw.to_string(),
                });
            }

            return Ok(Self {
                scope: Some(scope.to_string()),
                local: local.to_string(),
            });
        }

        if !is_path_segment(raw) {
            return Err(CoreError::InvalidName {
                name: raw.to_string(),
            });
        }

        Ok(Self {
            scope: None,
            local: raw.to_string(),
        })
    }

    /// Scope including the leading `@`, if any
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Local part of the name
    pub fn local(&self) -> &str {
        &self.local
    }

    pub fn is_scoped(&self) -> bool {
        self.scope.is_some()
    }

    /// Name with the scope separator percent-encoded, for registry URL paths
    ///
    /// `@babel/core` becomes `@babel%2Fcore`.
    #[must_use]
    pub fn encoded(&self) -> String {
        match &self.scope {
            Some(scope) => format!("{}%2F{}", scope, self.local),
            None => self.local.clone(),
        }
    }

    /// Single-level directory name: `@babel/core` becomes `@babel-core`
    #[must_use]
    pub fn flattened(&self) -> String {
        match &self.scope {
            Some(scope) => flattened_dir_name(scope, &self.local),
            None => self.local.clone(),
        }
    }
}

/// Whether `part` can stand alone as one directory name below the destination
fn is_path_segment(part: &str) -> bool {
    !part.is_empty()
        && part != "."
        && part != ".."
        && !part.contains([SCOPE_SEPARATOR, '\\', '\0'])
}

/// Directory name for a local package hoisted out of its scope directory
#[must_use]
pub fn flattened_dir_name(scope: &str, local: &str) -> String {
    format!("{}{}{}", scope, FLATTEN_SEPARATOR, local)
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{}{}{}", scope, SCOPE_SEPARATOR, self.local),
            None => f.write_str(&self.local),
        }
    }
}

impl std::str::FromStr for PackageName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PackageName {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<PackageName> for String {
    fn from(name: PackageName) -> Self {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain() {
        let name = PackageName::parse("lodash").unwrap();
        assert_eq!(name.scope(), None);
        assert_eq!(name.local(), "lodash");
        assert!(!name.is_scoped());
        assert_eq!(name.to_string(), "lodash");
    }

    #[test]
    fn test_parse_scoped() {
        let name = PackageName::parse("@babel/core").unwrap();
        assert_eq!(name.scope(), Some("@babel"));
        assert_eq!(name.local(), "core");
        assert!(name.is_scoped());
        assert_eq!(name.to_string(), "@babel/core");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let name = PackageName::parse("  react\n").unwrap();
        assert_eq!(name.local(), "react");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(PackageName::parse("").is_err());
        assert!(PackageName::parse("@").is_err());
        assert!(PackageName::parse("@scope").is_err());
        assert!(PackageName::parse("@scope/").is_err());
        assert!(PackageName::parse("@/name").is_err());
        assert!(PackageName::parse("a/b").is_err());
        assert!(PackageName::parse("@a/b/c").is_err());
    }

    #[test]
    fn test_parse_rejects_path_traversal() {
        for raw in [".", "..", "@scope/..", "@scope/.", "@../x", "@./x", "a\\b", "@s/a\\b", "a\0b"] {
            assert!(PackageName::parse(raw).is_err(), "accepted {:?}", raw);
        }
        assert!(PackageName::parse("..foo").is_ok());
        assert!(PackageName::parse("@scope/.bin").is_ok());
    }

    #[test]
    fn test_encoded() {
        assert_eq!(PackageName::parse("express").unwrap().encoded(), "express");
        assert_eq!(
            PackageName::parse("@types/node").unwrap().encoded(),
            "@types%2Fnode"
        );
    }

    #[test]
    fn test_flattened() {
        assert_eq!(PackageName::parse("chalk").unwrap().flattened(), "chalk");
        assert_eq!(
            PackageName::parse("@types/node").unwrap().flattened(),
            "@types-node"
        );
    }

    #[test]
    fn test_serde_as_string() {
        let name = PackageName::parse("@scope/pkg").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"@scope/pkg\"");

        let parsed: PackageName = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, name);
    }
}

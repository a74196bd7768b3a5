//! Schema catalog: the current and oldest supported version of every record
//! type, plus engine configuration, loaded from TOML.
//!
//! ```toml
//! [upgrade]
//! write_back_on_read = true
//!
//! [[schema]]
//! type = "human_donor"
//! current_version = 21
//! min_version = 1
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::registry::StepRegistry;

/// Error loading a catalog file.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid catalog: {0}")]
    Invalid(String),
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpgradeConfig {
    /// Write the upgraded record back to storage after an upgrading read.
    #[serde(default = "default_write_back")]
    pub write_back_on_read: bool,
}

fn default_write_back() -> bool {
    true
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            write_back_on_read: default_write_back(),
        }
    }
}

/// Versions of one record type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchemaEntry {
    /// Record type name (e.g. `"human_donor"`).
    #[serde(rename = "type")]
    pub type_name: String,
    /// Version new records are written at.
    pub current_version: u32,
    /// Oldest stored version that can still be upgraded.
    #[serde(default = "default_min_version")]
    pub min_version: u32,
}

fn default_min_version() -> u32 {
    1
}

/// Current schema versions per record type, as published by the schema
/// registry, plus engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SchemaCatalog {
    #[serde(default)]
    pub upgrade: UpgradeConfig,
    #[serde(default, rename = "schema")]
    pub schemas: Vec<SchemaEntry>,
}

impl SchemaCatalog {
    /// Create an empty catalog with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the entry for `type_name`.
    pub fn with_schema(mut self, type_name: &str, current_version: u32, min_version: u32) -> Self {
        self.schemas.retain(|s| s.type_name != type_name);
        self.schemas.push(SchemaEntry {
            type_name: type_name.to_string(),
            current_version,
            min_version,
        });
        self
    }

    /// Replace the engine configuration.
    pub fn with_config(mut self, config: UpgradeConfig) -> Self {
        self.upgrade = config;
        self
    }

    /// Parse a catalog from TOML text.
    ///
    /// A type listed twice is rejected here, since lookups would silently
    /// pick the first entry. Chain completeness needs a registry and is left
    /// to [`validate_catalog`].
    pub fn from_toml_str(text: &str) -> Result<Self, CatalogError> {
        let catalog: Self = toml::from_str(text)?;
        let mut seen = HashSet::new();
        for entry in &catalog.schemas {
            if !seen.insert(entry.type_name.as_str()) {
                return Err(CatalogError::Invalid(format!(
                    "type `{}` is listed more than once",
                    entry.type_name
                )));
            }
        }
        Ok(catalog)
    }

    /// Read and parse a catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Look up the entry for a type.
    pub fn entry(&self, type_name: &str) -> Option<&SchemaEntry> {
        self.schemas.iter().find(|s| s.type_name == type_name)
    }

    /// Current version of a type.
    pub fn current_version(&self, type_name: &str) -> Option<u32> {
        self.entry(type_name).map(|s| s.current_version)
    }

    /// Oldest upgradable version of a type.
    pub fn min_version(&self, type_name: &str) -> Option<u32> {
        self.entry(type_name).map(|s| s.min_version)
    }

    /// Type names in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.schemas.iter().map(|s| s.type_name.as_str())
    }
}

/// A single problem found while validating a catalog against a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogIssue {
    pub type_name: Option<String>,
    pub version: Option<u32>,
    pub message: String,
}

impl fmt::Display for CatalogIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ctx = Vec::new();
        if let Some(t) = &self.type_name {
            ctx.push(format!("type={t}"));
        }
        if let Some(v) = self.version {
            ctx.push(format!("v{v}"));
        }
        if ctx.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "[{}] {}", ctx.join(", "), self.message)
        }
    }
}

/// Check that every catalogued type can be upgraded from its minimum to its
/// current version with the steps in `registry`.
pub fn validate_catalog(
    catalog: &SchemaCatalog,
    registry: &StepRegistry,
) -> Result<(), Vec<CatalogIssue>> {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();

    for entry in &catalog.schemas {
        let issue = |version: Option<u32>, message: String| CatalogIssue {
            type_name: Some(entry.type_name.clone()),
            version,
            message,
        };

        if entry.type_name.is_empty() {
            issues.push(issue(None, "type name must not be empty".into()));
            continue;
        }
        if !seen.insert(entry.type_name.as_str()) {
            issues.push(issue(None, "duplicate type".into()));
            continue;
        }
        if entry.min_version == 0 || entry.min_version > entry.current_version {
            issues.push(issue(
                None,
                format!(
                    "expected 1 <= min_version <= current_version, got min {} and current {}",
                    entry.min_version, entry.current_version
                ),
            ));
            continue;
        }
        for version in entry.min_version..entry.current_version {
            if registry.lookup(&entry.type_name, version).is_none() {
                issues.push(issue(
                    Some(version),
                    format!("no upgrade step to v{}", version + 1),
                ));
            }
        }
        if let Some(last) = registry.registered_steps(&entry.type_name).last() {
            if last.source_version >= entry.current_version {
                issues.push(issue(
                    Some(last.source_version),
                    format!(
                        "step `{}` upgrades past current version {}",
                        last.name, entry.current_version
                    ),
                ));
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

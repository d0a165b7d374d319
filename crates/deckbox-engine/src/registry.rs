//! Read-only catalog of named box configurations.
//!
//! A registry is built once (from the built-in catalog or a JSON file) and
//! never mutated afterwards, so it can be shared freely across builds.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::dimensions::derive;
use crate::errors::{BuildError, RegistryLoadError};
use crate::params::{BoxParams, BoxStyle, ParamOverrides};

/// Version of the built-in catalog.
pub const BUILTIN_CATALOG_VERSION: u32 = 1;

/// Known model versions and what changed in each.
const CHANGELOG: &[(&str, &str)] = &[(
    "v1.0.0",
    "Stable baseline: shelled tray with finger notch and friction-fit lid.",
)];

/// Changelog note for a model version, when one is recorded.
pub fn changelog(version: &str) -> Option<&'static str> {
    CHANGELOG
        .iter()
        .find(|(v, _)| *v == version)
        .map(|(_, note)| *note)
}

/// One catalog entry: identity plus the fields it changes from the base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelEntry {
    pub slug: String,
    pub label: String,
    /// Inherits the base version when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub overrides: ParamOverrides,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    catalog_version: u32,
    models: Vec<ModelEntry>,
}

/// The catalog. Plain data: `Send + Sync`, no interior mutability.
#[derive(Debug, Clone, PartialEq)]
pub struct Registry {
    catalog_version: u32,
    base: BoxParams,
    entries: Vec<ModelEntry>,
}

impl Registry {
    /// The catalog shipped with the tool.
    pub fn builtin() -> Self {
        let unsleeved = |card_count: u32, stack_height: f64| ParamOverrides {
            card_count: Some(card_count),
            card_width: Some(56.0),
            card_height: Some(87.0),
            card_thickness: Some(stack_height / f64::from(card_count)),
            sleeve_allowance: Some(0.0),
            side_clearance: Some(1.0),
            top_clearance: Some(2.0),
            ..Default::default()
        };

        let entries = vec![
            ModelEntry {
                slug: "commander_100".to_string(),
                label: "Commander 100".to_string(),
                version: None,
                overrides: ParamOverrides {
                    card_count: Some(100),
                    ..Default::default()
                },
            },
            ModelEntry {
                slug: "constructed_60_15".to_string(),
                label: "Constructed 60 + Sideboard 15".to_string(),
                version: None,
                overrides: ParamOverrides {
                    card_count: Some(75),
                    ..Default::default()
                },
            },
            ModelEntry {
                slug: "constructed_60_15_split".to_string(),
                label: "Constructed 60 + Sideboard 15 (split)".to_string(),
                version: None,
                overrides: ParamOverrides {
                    card_count: Some(75),
                    divider_count: Some(1),
                    style: Some(BoxStyle::Compartmented),
                    ..Default::default()
                },
            },
            ModelEntry {
                slug: "uno_36".to_string(),
                label: "UNO 36mm".to_string(),
                version: None,
                overrides: unsleeved(108, 34.0),
            },
            ModelEntry {
                slug: "color_addicted_40".to_string(),
                label: "Color Addicted 40mm".to_string(),
                version: None,
                overrides: ParamOverrides {
                    style: Some(BoxStyle::Minimalist),
                    ..unsleeved(121, 38.0)
                },
            },
        ];

        Self {
            catalog_version: BUILTIN_CATALOG_VERSION,
            base: BoxParams::base(),
            entries,
        }
    }

    /// Build a catalog from explicit entries. Every entry is resolved and
    /// derived up front so a broken catalog fails here, not mid-build.
    pub fn from_entries(
        catalog_version: u32,
        base: BoxParams,
        entries: Vec<ModelEntry>,
    ) -> Result<Self, RegistryLoadError> {
        if entries.is_empty() {
            return Err(RegistryLoadError::Empty);
        }
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.slug.as_str()) {
                return Err(RegistryLoadError::DuplicateSlug {
                    slug: entry.slug.clone(),
                });
            }
        }

        let registry = Self {
            catalog_version,
            base,
            entries,
        };
        for entry in &registry.entries {
            let params = registry.resolve(&entry.slug)?;
            derive(&params)?;
        }
        debug!(
            catalog_version,
            models = registry.entries.len(),
            "catalog loaded"
        );
        Ok(registry)
    }

    /// Parse a JSON catalog file on top of the built-in base parameters.
    pub fn from_json(json: &str) -> Result<Self, RegistryLoadError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::from_entries(file.catalog_version, BoxParams::base(), file.models)
    }

    pub fn catalog_version(&self) -> u32 {
        self.catalog_version
    }

    /// Slugs in catalog order.
    pub fn slugs(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.slug.as_str()).collect()
    }

    pub fn entries(&self) -> &[ModelEntry] {
        &self.entries
    }

    pub fn get(&self, slug: &str) -> Option<&ModelEntry> {
        self.entries.iter().find(|e| e.slug == slug)
    }

    /// Resolve a slug to its full parameter set: base, then the entry's
    /// overrides field by field, then validation.
    #[instrument(skip(self), fields(catalog_version = self.catalog_version))]
    pub fn resolve(&self, slug: &str) -> Result<BoxParams, BuildError> {
        let entry = self.get(slug).ok_or_else(|| BuildError::UnknownModel {
            slug: slug.to_string(),
            known: self.slugs().iter().map(|s| s.to_string()).collect(),
        })?;

        let mut params = self.base.clone();
        params.slug = entry.slug.clone();
        params.label = entry.label.clone();
        if let Some(version) = &entry.version {
            params.version = version.clone();
        }
        entry.overrides.apply_to(&mut params);

        params
            .validate()
            .map_err(|v| BuildError::InvalidConfiguration {
                slug: slug.to_string(),
                field: v.field.to_string(),
                rule: v.rule,
            })?;
        debug!(
            version = %params.version,
            card_count = params.card_count,
            style = ?params.style,
            "model resolved"
        );
        Ok(params)
    }
}

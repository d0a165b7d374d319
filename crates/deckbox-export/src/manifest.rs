use deckbox_engine::{changelog, BoxStyle, BuiltBox, Compartment, DerivedDimensions};
use serde::{Deserialize, Serialize};

/// Build record written next to the geometry files. Carries no timestamps
/// so repeated exports stay byte-identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildManifest {
    pub slug: String,
    pub label: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,
    pub catalog_version: u32,
    pub style: BoxStyle,
    pub card_count: u32,
    pub dimensions: DerivedDimensions,
    pub compartments: Vec<Compartment>,
    pub solids: Vec<ManifestSolid>,
    pub files: Vec<String>,
}

/// One solid of the build and its kernel-measured volume (mm³).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestSolid {
    pub part: String,
    pub volume: f64,
}

impl BuildManifest {
    pub fn new(built: &BuiltBox, files: Vec<String>) -> Self {
        let params = &built.params;
        Self {
            slug: params.slug.clone(),
            label: params.label.clone(),
            version: params.version.clone(),
            changelog: changelog(&params.version).map(str::to_string),
            catalog_version: built.catalog_version,
            style: params.style,
            card_count: params.card_count,
            dimensions: built.dims.clone(),
            compartments: built.dims.compartments.clone(),
            solids: built
                .solids
                .iter()
                .map(|s| ManifestSolid {
                    part: s.role.part_name(),
                    volume: s.volume,
                })
                .collect(),
            files,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

use std::fmt;

use deckbox_types::SolidRole;
use serde::{Deserialize, Serialize};

/// Output file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// STEP AP203 solid model of the whole assembly.
    Step,
    StlBinary,
    StlAscii,
}

impl ExportFormat {
    /// File extension. The two STL flavours differ so both can be written
    /// side by side.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Step => "step",
            ExportFormat::StlBinary => "stl",
            ExportFormat::StlAscii => "ascii.stl",
        }
    }

    pub fn is_mesh(self) -> bool {
        !matches!(self, ExportFormat::Step)
    }
}

/// What a file holds: every solid together, or one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Part {
    Assembly,
    Solid(SolidRole),
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Part::Assembly => f.write_str("assembly"),
            Part::Solid(role) => f.write_str(&role.part_name()),
        }
    }
}

/// `{slug}_{version}_{part}.{ext}`
pub fn file_name(slug: &str, version: &str, part: Part, format: ExportFormat) -> String {
    format!("{slug}_{version}_{part}.{}", format.extension())
}

/// `{slug}_{version}_manifest.json`
pub fn manifest_name(slug: &str, version: &str) -> String {
    format!("{slug}_{version}_manifest.json")
}

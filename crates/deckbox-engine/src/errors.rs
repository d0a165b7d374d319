use deckbox_types::SolidRole;

/// Everything that can stop a box build. Each variant names the slug it
/// was building; none are recovered or retried.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BuildError {
    #[error("unknown model '{slug}' (known: {})", known.join(", "))]
    UnknownModel { slug: String, known: Vec<String> },

    #[error("model '{slug}' has an invalid configuration: {field} {rule}")]
    InvalidConfiguration {
        slug: String,
        field: String,
        rule: String,
    },

    #[error("model '{slug}' derives a degenerate {dimension} ({value})")]
    DegenerateGeometry {
        slug: String,
        dimension: String,
        value: f64,
    },

    #[error("model '{slug}': kernel rejected {role} operation {op_index}: {reason}")]
    KernelRejected {
        slug: String,
        role: SolidRole,
        op_index: usize,
        reason: String,
    },

    #[error("model '{slug}': export failed: {reason}")]
    ExportFailure { slug: String, reason: String },

    #[error("model '{slug}': build cancelled before {role} was constructed")]
    Cancelled { slug: String, role: SolidRole },

    #[error("model '{slug}': invalid {role} plan at operation {op_index}: {reason}")]
    InvalidPlan {
        slug: String,
        role: SolidRole,
        op_index: usize,
        reason: String,
    },
}

impl BuildError {
    /// The slug the failing build was for.
    pub fn slug(&self) -> &str {
        match self {
            BuildError::UnknownModel { slug, .. }
            | BuildError::InvalidConfiguration { slug, .. }
            | BuildError::DegenerateGeometry { slug, .. }
            | BuildError::KernelRejected { slug, .. }
            | BuildError::ExportFailure { slug, .. }
            | BuildError::Cancelled { slug, .. }
            | BuildError::InvalidPlan { slug, .. } => slug,
        }
    }
}

/// Errors loading a catalog from JSON or from entries.
#[derive(Debug, thiserror::Error)]
pub enum RegistryLoadError {
    #[error("catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("slug '{slug}' appears more than once")]
    DuplicateSlug { slug: String },

    #[error("catalog has no models")]
    Empty,

    #[error(transparent)]
    Invalid(#[from] BuildError),
}

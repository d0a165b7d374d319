use std::path::PathBuf;

use deckbox_engine::BuildError;

/// Errors while rendering or writing export files.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("{part} is not a valid solid: {reason}")]
    InvalidSolid { part: String, reason: String },

    #[error("kernel failed on {part}: {source}")]
    Kernel {
        part: String,
        #[source]
        source: deckbox_kernel::KernelError,
    },

    #[error("STL for {part}: {reason}")]
    Stl { part: String, reason: String },

    #[error("manifest serialization failed: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    /// Fold into the build taxonomy, keeping the message.
    pub fn into_build_error(self, slug: &str) -> BuildError {
        BuildError::ExportFailure {
            slug: slug.to_string(),
            reason: self.to_string(),
        }
    }
}

//! Static pod storage errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while storing or rendering manifests
#[derive(Debug, Error)]
pub enum StaticPodError {
    /// Filesystem operation failed
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// File or directory the operation targeted
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File name is not a single plain path component
    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),

    /// Template is not a valid pod document
    #[error("Invalid manifest template: {0}")]
    Template(#[from] serde_yaml::Error),

    /// Template parsed but is missing required fields
    #[error("Invalid manifest template: {0}")]
    InvalidTemplate(String),

    /// Rendered manifest could not be encoded
    #[error("Failed to encode manifest: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StaticPodError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

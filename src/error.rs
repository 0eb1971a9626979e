use std::path::PathBuf;
use thiserror::Error;

/// The main error type for viamask operations.
#[derive(Debug, Error)]
pub enum ViamaskError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse annotation JSON from {path}: {source}")]
    AnnotationParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The annotation document does not have the required structure.
    ///
    /// Raised during normalization; no masks are written when this occurs.
    #[error("Schema error in {location}: {message}")]
    Schema { location: String, message: String },

    #[error("Source image not found: {path}")]
    SourceImageNotFound { path: PathBuf },

    #[error("Failed to read image dimensions from {path}: {source}")]
    ImageDimensionRead {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Failed to write mask to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to export region records: {message}")]
    RecordsExport { message: String },

    #[error("Failed to serialize report: {source}")]
    ReportWrite {
        #[source]
        source: serde_json::Error,
    },

    #[error("Mask generation failed for {failed} of {total} region(s)")]
    RenderFailed { failed: usize, total: usize },
}

impl ViamaskError {
    pub(crate) fn schema(location: impl Into<String>, message: impl Into<String>) -> Self {
        ViamaskError::Schema {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Returns true for errors raised while validating the annotation document.
    pub fn is_schema_error(&self) -> bool {
        matches!(self, ViamaskError::Schema { .. })
    }
}

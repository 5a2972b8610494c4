//! Errors surfaced by the `maskring` binary.

use std::path::PathBuf;

use maskring_pipeline::PipelineError;

/// Everything that can go wrong between reading a mask file and writing
/// the JSON output.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// A file or directory could not be read or written.
    #[error("{}: {source}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A mask file is not a decodable image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// `--config-json` or output serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Preprocessing options are out of range.
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// The mask-to-polygon pipeline rejected its input.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl CliError {
    /// Attach a path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

//! Batch driver: run every mask in a directory through the pipeline.

use std::path::{Path, PathBuf};

use maskring_pipeline::{BoundingBox, PipelineConfig, PolygonRecord, ProcessSummary};
use rayon::prelude::*;
use serde::Serialize;

use crate::error::CliError;
use crate::prepare::{self, PrepareOptions};

/// Output entry for one mask file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaskRecord {
    /// Position in the sorted file list.
    pub id: usize,
    /// File name without directory.
    pub file_name: String,
    /// What the pipeline produced, or why it failed.
    #[serde(flatten)]
    pub outcome: MaskOutcome,
}

/// Result of processing one mask file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MaskOutcome {
    /// The mask was traced.
    Traced {
        /// Native image width.
        width: u32,
        /// Native image height.
        height: u32,
        /// One entry per single-ring polygon.
        polygons: Vec<PolygonRecord>,
        /// Sum of polygon areas.
        area: f64,
        /// Union of polygon bounding boxes; `null` for a blank mask.
        bbox: Option<BoundingBox>,
        /// Drop and merge counts.
        summary: ProcessSummary,
    },
    /// Reading, decoding or tracing failed.
    Failed {
        /// Human-readable cause.
        error: String,
    },
}

impl MaskRecord {
    /// Returns `true` if this mask could not be processed.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self.outcome, MaskOutcome::Failed { .. })
    }
}

/// Files with a `.png` extension (any case) directly inside `dir`,
/// sorted by file name.
///
/// # Errors
///
/// Returns [`CliError::Io`] if the directory cannot be listed.
pub fn collect_masks(dir: &Path) -> Result<Vec<PathBuf>, CliError> {
    let entries = std::fs::read_dir(dir).map_err(|e| CliError::io(dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| CliError::io(dir, e))?.path();
        let is_png = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if is_png && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Read, prepare and trace one mask file.
///
/// The configured working scale is replaced by the upscale factor
/// actually applied to this file.
///
/// # Errors
///
/// Returns [`CliError`] if the file cannot be read or decoded, or the
/// pipeline rejects it.
pub fn process_file(
    path: &Path,
    options: &PrepareOptions,
    config: &PipelineConfig,
) -> Result<MaskOutcome, CliError> {
    let bytes = std::fs::read(path).map_err(|e| CliError::io(path, e))?;
    let gray = prepare::decode_gray(&bytes)?;
    let prepared = prepare::prepare(&gray, options)?;
    if prepared.mask.is_blank() {
        tracing::debug!(path = %path.display(), "mask has no foreground");
    }

    let config = PipelineConfig {
        scale_x: prepared.scale_x,
        scale_y: prepared.scale_y,
        ..config.clone()
    };
    let result = maskring_pipeline::process(&prepared.mask, &config)?;

    Ok(MaskOutcome::Traced {
        width: prepared.native.width,
        height: prepared.native.height,
        area: result.total_area(),
        bbox: result.bbox(),
        summary: result.summary,
        polygons: result.polygons,
    })
}

/// Process `paths` in parallel, keeping input order.
///
/// A failing file yields a [`MaskOutcome::Failed`] record and does not
/// stop the others.
#[must_use]
pub fn run_batch(
    paths: &[PathBuf],
    options: &PrepareOptions,
    config: &PipelineConfig,
) -> Vec<MaskRecord> {
    paths
        .par_iter()
        .enumerate()
        .map(|(id, path)| {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let outcome = match process_file(path, options, config) {
                Ok(outcome) => {
                    if let MaskOutcome::Traced { polygons, .. } = &outcome {
                        tracing::debug!(id, file = %file_name, polygons = polygons.len(), "mask traced");
                    }
                    outcome
                }
                Err(e) => {
                    tracing::warn!(id, file = %file_name, error = %e, "mask failed");
                    MaskOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            MaskRecord {
                id,
                file_name,
                outcome,
            }
        })
        .collect()
}

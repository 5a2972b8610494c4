//! maskring-pipeline: binary mask to single-ring polygon pipeline (sans-IO).
//!
//! Converts a binary segmentation mask into polygon annotations through:
//! contour tracing -> closed-curve simplification -> hole merging ->
//! area, bounding box, scaling and normalization.
//!
//! Every emitted polygon is one closed ring. Holes are folded into their
//! enclosing outer boundary through a zero-width bridge, so the result
//! fits annotation formats that store a flat `[x0, y0, x1, y1, …]` list
//! per polygon and have no notion of interior rings.
//!
//! This crate has **no I/O dependencies**: it operates on an in-memory
//! [`Mask`] and returns structured data. Decoding, thresholding and any
//! upscaling of mask images live in the `maskring` binary.

pub mod contour;
pub mod geometry;
pub mod mask;
pub mod merge;
pub mod simplify;
pub mod types;

pub use contour::{ContourTracer, ContourTracerKind, ContourTree};
pub use geometry::{BoundingBox, GeometryError, Polygon};
pub use mask::Mask;
pub use merge::OrphanPolicy;
pub use types::{
    Contour, Dimensions, PipelineConfig, PipelineError, Point, PolygonRecord, ProcessResult,
    ProcessSummary,
};

/// Trace, simplify and merge the contours of `mask`.
///
/// Returns one clockwise ring per surviving root in working (mask pixel)
/// coordinates, plus the drop and merge counts. The configuration is not
/// validated here; see [`process`].
#[must_use]
pub fn trace_rings(mask: &Mask, config: &PipelineConfig) -> (Vec<Contour>, ProcessSummary) {
    // 1. Contour tracing.
    let tree = config.contour_tracer.trace(mask);
    let traced = tree.traced();

    // 2. Closed-curve simplification; collapsed contours leave the tree.
    let simplified = simplify::simplify_tree(tree, config.epsilon_factor);
    let degenerate = traced.saturating_sub(simplified.len());

    // 3. Hole merging.
    let outcome = merge::merge_tree(&simplified, config.orphan_policy);

    let summary = ProcessSummary {
        traced,
        degenerate,
        holes_merged: outcome.holes_merged,
        orphans_dropped: outcome.orphans_dropped,
        orphans_promoted: outcome.orphans_promoted,
    };
    (outcome.rings, summary)
}

/// Run the full mask-to-polygon pipeline.
///
/// Produces one [`PolygonRecord`] per merged ring. Its `segmentation` is
/// the ring divided by the configured working scale and `normalized` is
/// the ring divided by the mask's dimensions. `area` and `bbox` describe
/// `segmentation`.
///
/// # Pipeline steps
///
/// 1. Contour tracing with hierarchy (pluggable strategy)
/// 2. Closed-curve Ramer-Douglas-Peucker simplification
/// 3. Hole merging into single clockwise rings
/// 4. Normalization, scaling, area and bounding box
///
/// A blank mask is not an error: it yields an empty result.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` fails
/// [`PipelineConfig::validate`].
/// Returns [`PipelineError::Geometry`] if the mask has a zero dimension,
/// even when it would produce no polygons.
pub fn process(mask: &Mask, config: &PipelineConfig) -> Result<ProcessResult, PipelineError> {
    config.validate()?;
    let dimensions = mask.dimensions();
    if dimensions.width == 0 || dimensions.height == 0 {
        return Err(GeometryError::InvalidDimensions {
            width: dimensions.width,
            height: dimensions.height,
        }
        .into());
    }

    let (rings, summary) = trace_rings(mask, config);

    // 4. Per-ring coordinates and properties.
    let mut polygons = Vec::with_capacity(rings.len());
    for ring in &rings {
        let working = Polygon::from_contour(ring);
        let normalized = working.normalized(dimensions)?;
        let segmentation = working.scaled(config.scale_x, config.scale_y)?;
        let Some(bbox) = segmentation.bbox() else {
            continue;
        };
        let area = segmentation.area();
        polygons.push(PolygonRecord {
            segmentation,
            normalized,
            area,
            bbox,
        });
    }

    tracing::debug!(
        width = dimensions.width,
        height = dimensions.height,
        polygons = polygons.len(),
        traced = summary.traced,
        degenerate = summary.degenerate,
        holes_merged = summary.holes_merged,
        "mask processed"
    );

    Ok(ProcessResult {
        polygons,
        dimensions,
        summary,
    })
}

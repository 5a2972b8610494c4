//! Shared types for the maskring pipeline.

use serde::{Deserialize, Serialize};

use crate::contour::ContourTracerKind;
use crate::geometry::{BoundingBox, GeometryError, Polygon};
use crate::merge::OrphanPolicy;

/// Re-export `GrayImage` so downstream crates can build masks without
/// depending on `image` directly.
pub use image::GrayImage;

/// Fewest vertices a ring may have and still enclose an area.
pub const MIN_RING_POINTS: usize = 3;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// Traversal direction of a closed ring in image (y-down) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winding {
    /// Clockwise as seen on screen.
    Clockwise,
    /// Counter-clockwise as seen on screen.
    CounterClockwise,
}

/// A closed boundary: an ordered point sequence whose last point
/// connects back to the first.
///
/// The closing edge is implicit, so the first point is never repeated
/// at the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contour(Vec<Point>);

impl Contour {
    /// Create a contour from its vertices.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the contour has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of vertices.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the contour has too few vertices to enclose an
    /// area (fewer than [`MIN_RING_POINTS`]).
    #[must_use]
    pub const fn is_degenerate(&self) -> bool {
        self.0.len() < MIN_RING_POINTS
    }

    /// Returns a slice of all vertices.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the contour and returns the underlying vertices.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// Iterate over the ring's edges `(p_i, p_{i+1})`, including the
    /// closing edge from the last vertex back to the first.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.0
            .iter()
            .zip(self.0.iter().cycle().skip(1))
            .map(|(&a, &b)| (a, b))
    }

    /// Closed arc length, including the closing edge.
    #[must_use]
    pub fn perimeter(&self) -> f64 {
        if self.0.len() < 2 {
            return 0.0;
        }
        self.edges().map(|(a, b)| a.distance(b)).sum()
    }

    /// Orientation sum `Σ (x_{i+1} − x_i)(y_{i+1} + y_i)` over all edges.
    ///
    /// Negative for clockwise rings in y-down coordinates, positive for
    /// counter-clockwise ones, zero for rings without area.
    #[must_use]
    pub fn winding_sum(&self) -> f64 {
        self.edges().map(|(a, b)| (b.x - a.x) * (b.y + a.y)).sum()
    }

    /// Traversal direction of the ring.
    ///
    /// Rings with a zero orientation sum report
    /// [`Winding::CounterClockwise`].
    #[must_use]
    pub fn winding(&self) -> Winding {
        if self.winding_sum() < 0.0 {
            Winding::Clockwise
        } else {
            Winding::CounterClockwise
        }
    }

    /// Returns `true` if the ring runs clockwise in y-down coordinates.
    #[must_use]
    pub fn is_clockwise(&self) -> bool {
        self.winding() == Winding::Clockwise
    }

    /// Same ring, traversed in the opposite direction.
    #[must_use]
    pub fn reversed(mut self) -> Self {
        self.0.reverse();
        self
    }

    /// Same ring, reversed if needed so it runs in `winding` direction.
    #[must_use]
    pub fn with_winding(self, winding: Winding) -> Self {
        if self.winding() == winding {
            self
        } else {
            self.reversed()
        }
    }
}

impl FromIterator<Point> for Contour {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Configuration for the mask-to-polygon pipeline.
///
/// Use [`PipelineConfig::validate`] (called by [`crate::process`]) to
/// reject values that would produce corrupt coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Which contour tracing algorithm to use.
    pub contour_tracer: ContourTracerKind,

    /// Simplification tolerance as a fraction of each contour's closed
    /// perimeter (`epsilon = epsilon_factor * perimeter`).
    pub epsilon_factor: f64,

    /// What to do with holes whose enclosing contour was discarded.
    pub orphan_policy: OrphanPolicy,

    /// Horizontal factor by which the mask was upscaled before tracing.
    /// Output coordinates are divided by it.
    pub scale_x: f64,

    /// Vertical factor by which the mask was upscaled before tracing.
    /// Output coordinates are divided by it.
    pub scale_y: f64,
}

impl PipelineConfig {
    /// Default simplification factor.
    pub const DEFAULT_EPSILON_FACTOR: f64 = 0.0007;

    /// Default working scale (mask traced at native resolution).
    pub const DEFAULT_SCALE: f64 = 1.0;

    /// Check the configuration for values the pipeline cannot honour.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `epsilon_factor` is
    /// negative or not finite, or if either scale factor is not a finite
    /// positive number.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.epsilon_factor.is_finite() || self.epsilon_factor < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "epsilon_factor must be finite and non-negative, got {}",
                self.epsilon_factor
            )));
        }
        for (name, value) in [("scale_x", self.scale_x), ("scale_y", self.scale_y)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PipelineError::InvalidConfig(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            contour_tracer: ContourTracerKind::default(),
            epsilon_factor: Self::DEFAULT_EPSILON_FACTOR,
            orphan_policy: OrphanPolicy::default(),
            scale_x: Self::DEFAULT_SCALE,
            scale_y: Self::DEFAULT_SCALE,
        }
    }
}

/// One single-ring polygon with its derived properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonRecord {
    /// Ring coordinates mapped back to native resolution (divided by
    /// the configured scale factors).
    pub segmentation: Polygon,
    /// Ring coordinates divided by the traced mask's width and height,
    /// in `[0, 1]`.
    pub normalized: Polygon,
    /// Enclosed area of `segmentation`.
    pub area: f64,
    /// Bounding box of `segmentation`.
    pub bbox: BoundingBox,
}

/// Counts of what happened to the traced contours of one mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSummary {
    /// Borders found by the tracer, including degenerate ones.
    pub traced: usize,
    /// Contours discarded for having fewer than [`MIN_RING_POINTS`]
    /// vertices after tracing or simplification.
    pub degenerate: usize,
    /// Holes spliced into their enclosing contour.
    pub holes_merged: usize,
    /// Holes discarded because their enclosing contour was discarded.
    pub orphans_dropped: usize,
    /// Holes emitted as polygons of their own because their enclosing
    /// contour was discarded.
    pub orphans_promoted: usize,
}

/// Result of running the pipeline on one mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    /// One record per merged ring, ordered by discovery of the ring's
    /// outer contour.
    pub polygons: Vec<PolygonRecord>,
    /// Dimensions of the traced mask in pixels.
    pub dimensions: Dimensions,
    /// Drop and merge counts.
    pub summary: ProcessSummary,
}

impl ProcessResult {
    /// Returns `true` if no polygon was produced (e.g. a blank mask).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Sum of all polygon areas.
    #[must_use]
    pub fn total_area(&self) -> f64 {
        self.polygons.iter().map(|p| p.area).sum()
    }

    /// Union of all polygon bounding boxes, `None` when there are no
    /// polygons.
    #[must_use]
    pub fn bbox(&self) -> Option<BoundingBox> {
        self.polygons
            .iter()
            .map(|p| p.bbox)
            .reduce(BoundingBox::union)
    }
}

/// Errors that can occur during pipeline processing.
///
/// Blank masks, degenerate contours and orphaned holes are not errors:
/// they shrink the result and are reported in [`ProcessSummary`].
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// A coordinate transform was given unusable parameters.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

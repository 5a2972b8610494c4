//! Polygon geometry: area, bounding box, scaling and normalization of
//! flat `[x0, y0, x1, y1, …]` coordinate lists.
//!
//! The flat form is what single-ring annotation formats store, so the
//! free functions here take plain `&[f64]` slices. [`Polygon`] wraps the
//! same layout and serializes as a bare number array.

use serde::{Deserialize, Serialize};

use crate::types::{Contour, Dimensions, Point};

/// Errors from coordinate transforms.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// Normalization against a raster with no extent.
    #[error("cannot normalize against a {width}x{height} raster: width and height must be positive")]
    InvalidDimensions {
        /// Reference width in pixels.
        width: u32,
        /// Reference height in pixels.
        height: u32,
    },

    /// Scaling by a zero or non-finite factor.
    #[error("scale factors must be finite and non-zero, got ({scale_x}, {scale_y})")]
    InvalidScale {
        /// Horizontal factor.
        scale_x: f64,
        /// Vertical factor.
        scale_y: f64,
    },
}

/// One ring as a flat coordinate list.
///
/// A trailing unpaired value, if any, is ignored by every operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon(Vec<f64>);

impl Polygon {
    /// Wrap a flat coordinate list.
    #[must_use]
    pub const fn new(coords: Vec<f64>) -> Self {
        Self(coords)
    }

    /// Flatten a contour's vertices.
    #[must_use]
    pub fn from_contour(contour: &Contour) -> Self {
        Self(contour.points().iter().flat_map(|p| [p.x, p.y]).collect())
    }

    /// The flat coordinates.
    #[must_use]
    pub fn coords(&self) -> &[f64] {
        &self.0
    }

    /// Consumes the polygon and returns the flat coordinates.
    #[must_use]
    pub fn into_coords(self) -> Vec<f64> {
        self.0
    }

    /// Returns `true` if the polygon has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_points() == 0
    }

    /// Number of vertices.
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.0.len() / 2
    }

    /// Iterate over the vertices.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.0.chunks_exact(2).map(|xy| Point::new(xy[0], xy[1]))
    }

    /// Enclosed area, see [`area`].
    #[must_use]
    pub fn area(&self) -> f64 {
        area(&self.0)
    }

    /// Bounding box, see [`bounding_box`].
    #[must_use]
    pub fn bbox(&self) -> Option<BoundingBox> {
        bounding_box(&self.0)
    }

    /// Divide coordinates by per-axis factors, see [`scale`].
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidScale`] for a zero or non-finite
    /// factor.
    pub fn scaled(&self, scale_x: f64, scale_y: f64) -> Result<Self, GeometryError> {
        scale(&self.0, scale_x, scale_y).map(Self)
    }

    /// Map into `[0, 1]` relative to a raster, see [`normalize`].
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidDimensions`] if either dimension is
    /// zero.
    pub fn normalized(&self, dimensions: Dimensions) -> Result<Self, GeometryError> {
        normalize(&self.0, dimensions).map(Self)
    }
}

impl From<Vec<f64>> for Polygon {
    fn from(coords: Vec<f64>) -> Self {
        Self(coords)
    }
}

/// Axis-aligned bounding box in min/max form.
///
/// Serializes as `[min_x, min_y, max_x, max_y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    /// Smallest x.
    pub min_x: f64,
    /// Smallest y.
    pub min_y: f64,
    /// Largest x.
    pub max_x: f64,
    /// Largest y.
    pub max_y: f64,
}

impl BoundingBox {
    /// Horizontal extent.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Vertical extent.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// `[x, y, width, height]`, the convention of COCO-style consumers.
    #[must_use]
    pub fn to_xywh(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.width(), self.height()]
    }

    /// Smallest box containing both boxes.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([min_x, min_y, max_x, max_y]: [f64; 4]) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.min_x, b.min_y, b.max_x, b.max_y]
    }
}

/// Shoelace sum `½ Σ (x_i·y_{i+1} − x_{i+1}·y_i)` over the closed ring.
///
/// Positive for rings that run clockwise in image (y-down) coordinates.
#[must_use]
pub fn signed_area(coords: &[f64]) -> f64 {
    let pairs = coords.chunks_exact(2);
    let n = pairs.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = pairs
        .clone()
        .zip(pairs.cycle().skip(1))
        .map(|(a, b)| a[0].mul_add(b[1], -(b[0] * a[1])))
        .sum();
    twice / 2.0
}

/// Enclosed area `½ |Σ x_i·y_{i+1} − x_{i+1}·y_i|`, independent of
/// winding. Zero for fewer than three vertices.
#[must_use]
pub fn area(coords: &[f64]) -> f64 {
    signed_area(coords).abs()
}

/// Componentwise min/max over all vertices, `None` for an empty list.
#[must_use]
pub fn bounding_box(coords: &[f64]) -> Option<BoundingBox> {
    coords
        .chunks_exact(2)
        .map(|xy| BoundingBox {
            min_x: xy[0],
            min_y: xy[1],
            max_x: xy[0],
            max_y: xy[1],
        })
        .reduce(BoundingBox::union)
}

/// Divide every x by `scale_x` and every y by `scale_y`.
///
/// Maps coordinates traced on an upscaled mask back to the native
/// resolution.
///
/// # Errors
///
/// Returns [`GeometryError::InvalidScale`] if either factor is zero or
/// not finite.
pub fn scale(coords: &[f64], scale_x: f64, scale_y: f64) -> Result<Vec<f64>, GeometryError> {
    let valid = |s: f64| s.is_finite() && s != 0.0;
    if !valid(scale_x) || !valid(scale_y) {
        return Err(GeometryError::InvalidScale { scale_x, scale_y });
    }
    Ok(coords
        .chunks_exact(2)
        .flat_map(|xy| [xy[0] / scale_x, xy[1] / scale_y])
        .collect())
}

/// Divide every x by the raster width and every y by its height.
///
/// # Errors
///
/// Returns [`GeometryError::InvalidDimensions`] if either dimension is
/// zero.
pub fn normalize(coords: &[f64], dimensions: Dimensions) -> Result<Vec<f64>, GeometryError> {
    let Dimensions { width, height } = dimensions;
    if width == 0 || height == 0 {
        return Err(GeometryError::InvalidDimensions { width, height });
    }
    let (w, h) = (f64::from(width), f64::from(height));
    Ok(coords
        .chunks_exact(2)
        .flat_map(|xy| [xy[0] / w, xy[1] / h])
        .collect())
}

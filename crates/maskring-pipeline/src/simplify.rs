//! Contour simplification using a closed-curve Ramer-Douglas-Peucker.
//!
//! Border following on a raster yields a vertex per boundary pixel, most
//! of them collinear. The ring is reduced to the vertices that deviate
//! more than `epsilon` from the chords between their neighbours, with
//! `epsilon` proportional to the ring's perimeter.
//!
//! Plain RDP treats its input as an open path with fixed endpoints. For
//! a ring, vertex 0 and the vertex farthest from it are pinned instead,
//! and each of the two arcs between them is simplified as an open chain.
//! The output is again a ring with no repeated closing vertex.

use crate::contour::ContourTree;
use crate::types::{Contour, Point};

/// Simplification tolerance for `contour`: `epsilon_factor` times its
/// closed perimeter.
#[must_use]
pub fn tolerance_for(contour: &Contour, epsilon_factor: f64) -> f64 {
    epsilon_factor * contour.perimeter()
}

/// Simplify a ring with a tolerance derived from its perimeter.
#[must_use = "returns the simplified contour"]
pub fn simplify_contour(contour: &Contour, epsilon_factor: f64) -> Contour {
    simplify_closed(contour, tolerance_for(contour, epsilon_factor))
}

/// Simplify a ring so that every removed vertex lies within `tolerance`
/// pixels of the chord that replaces it.
///
/// Rings with fewer than 3 vertices are returned unchanged. A ring whose
/// vertices all coincide collapses to a single vertex.
#[must_use = "returns the simplified contour"]
pub fn simplify_closed(contour: &Contour, tolerance: f64) -> Contour {
    let points = contour.points();
    let n = points.len();
    if n < 3 {
        return contour.clone();
    }

    let anchor = points[0];
    let far = farthest_from(points, anchor);
    if far == 0 {
        return Contour::new(vec![anchor]);
    }

    let mut kept = vec![false; n];
    kept[0] = true;
    kept[far] = true;
    simplify_arc(points, 0, far, tolerance, &mut kept);
    simplify_arc(points, far, n - far, tolerance, &mut kept);

    points
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect()
}

/// Simplify every contour of a tree, dropping those that collapse below
/// three vertices.
#[must_use = "returns the simplified tree"]
pub fn simplify_tree(tree: ContourTree, epsilon_factor: f64) -> ContourTree {
    tree.map_contours(|contour| simplify_contour(contour, epsilon_factor))
}

/// Index of the vertex farthest from `anchor`; the first one on ties.
/// Returns 0 when every vertex coincides with `anchor`.
fn farthest_from(points: &[Point], anchor: Point) -> usize {
    let mut best = 0;
    let mut best_dist = 0.0;
    for (i, &p) in points.iter().enumerate().skip(1) {
        let d = anchor.distance_squared(p);
        if d > best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// Mark the vertices of the arc running `span` steps forward from
/// `start` that stray more than `tolerance` from the arc's chord.
///
/// Indices wrap modulo the ring length, so the arc ending back at vertex
/// 0 needs no copy of the ring. Ties keep the first farthest vertex.
fn simplify_arc(points: &[Point], start: usize, span: usize, tolerance: f64, kept: &mut [bool]) {
    if span < 2 {
        return;
    }
    let n = points.len();
    let (a, b) = (points[start % n], points[(start + span) % n]);

    let (offset, dist) = (1..span)
        .map(|k| (k, distance_to_chord(points[(start + k) % n], a, b)))
        .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });

    if dist > tolerance {
        kept[(start + offset) % n] = true;
        simplify_arc(points, start, offset, tolerance, kept);
        simplify_arc(points, start + offset, span - offset, tolerance, kept);
    }
}

/// Distance from `p` to the chord through `a` and `b`, or to `a` when
/// the chord has zero length.
fn distance_to_chord(p: Point, a: Point, b: Point) -> f64 {
    let chord = a.distance(b);
    if chord == 0.0 {
        return p.distance(a);
    }
    let cross = (b.x - a.x).mul_add(p.y - a.y, -((b.y - a.y) * (p.x - a.x)));
    cross.abs() / chord
}

//! Hole merging: fold every hole of an outer contour into a single ring.
//!
//! Many polygon annotation formats store one ring per shape and have no
//! notion of interior rings. A hole can still be expressed in one ring by
//! walking the outer boundary up to a *bridge* vertex, crossing to the
//! nearest hole vertex, walking all the way around the hole, crossing
//! back, and finishing the outer boundary. The two bridge edges coincide
//! and are traversed in opposite directions, so they add no area.
//!
//! The bridge only yields a non-self-intersecting ring when the outer
//! ring and the hole run in opposite directions, so [`merge`] first
//! forces the outer ring clockwise and the hole counter-clockwise.
//!
//! ```text
//! outer[0..=i] + hole[j..] + hole[0..=j] + outer[i..]
//! ```

use serde::{Deserialize, Serialize};

use crate::contour::{BorderKind, ContourTree};
use crate::types::{Contour, Point, Winding};

/// What to do with a hole whose enclosing contour was discarded as
/// degenerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrphanPolicy {
    /// Discard the hole: it is neither merged nor emitted.
    #[default]
    Drop,
    /// Emit the hole ring as a polygon of its own, clockwise like any
    /// other emitted ring.
    Promote,
}

/// Rings produced from one contour tree, with merge counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// One clockwise ring per surviving root, in ascending id order.
    pub rings: Vec<Contour>,
    /// Holes spliced into their parent.
    pub holes_merged: usize,
    /// Orphaned holes discarded.
    pub orphans_dropped: usize,
    /// Orphaned holes emitted on their own.
    pub orphans_promoted: usize,
}

/// Find the bridge between `outer` and `hole`: the index pair `(i, j)`
/// minimizing the squared distance between `outer[i]` and `hole[j]`.
///
/// Exhaustive scan with outer index ascending, then hole index
/// ascending. Only a strictly shorter distance replaces the current best,
/// so ties resolve to the first pair found. Returns `None` if either
/// slice is empty.
#[must_use]
pub fn find_bridge(outer: &[Point], hole: &[Point]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize, f64)> = None;
    for (i, &p) in outer.iter().enumerate() {
        for (j, &q) in hole.iter().enumerate() {
            let d = p.distance_squared(q);
            if best.is_none_or(|(_, _, best_d)| d < best_d) {
                best = Some((i, j, d));
            }
        }
    }
    best.map(|(i, j, _)| (i, j))
}

/// Splice `hole` into `outer` across the bridge `(i, j)`.
///
/// The result has `outer.len() + hole.len() + 2` vertices: both bridge
/// vertices appear twice. Indices past the end are clamped to the last
/// vertex.
#[must_use]
pub fn splice(outer: &[Point], hole: &[Point], (i, j): (usize, usize)) -> Contour {
    let i = i.min(outer.len().saturating_sub(1));
    let j = j.min(hole.len().saturating_sub(1));

    let mut points = Vec::with_capacity(outer.len() + hole.len() + 2);
    points.extend_from_slice(outer.get(..=i).unwrap_or_default());
    points.extend_from_slice(hole.get(j..).unwrap_or_default());
    points.extend_from_slice(hole.get(..=j).unwrap_or_default());
    points.extend_from_slice(outer.get(i..).unwrap_or_default());
    Contour::new(points)
}

/// Merge one hole into an outer ring.
///
/// The outer ring is made clockwise and the hole counter-clockwise before
/// the bridge is chosen, so the result is clockwise and encloses the
/// outer area minus the hole area. Inputs are left untouched.
#[must_use = "returns the merged contour"]
pub fn merge(outer: &Contour, hole: &Contour) -> Contour {
    let outer = outer.clone().with_winding(Winding::Clockwise);
    let hole = hole.clone().with_winding(Winding::CounterClockwise);

    match find_bridge(outer.points(), hole.points()) {
        Some(bridge) => splice(outer.points(), hole.points(), bridge),
        None => outer,
    }
}

/// Merge all holes of `outer`, one at a time, each merge treating the
/// ring grown so far as the new outer ring.
#[must_use = "returns the merged contour"]
pub fn merge_all<'a>(outer: &Contour, holes: impl IntoIterator<Item = &'a Contour>) -> Contour {
    holes
        .into_iter()
        .fold(outer.clone().with_winding(Winding::Clockwise), |ring, hole| {
            merge(&ring, hole)
        })
}

/// Turn a contour tree into single rings: every outer border absorbs its
/// holes (in ascending id order), and orphaned holes are handled by
/// `policy`.
///
/// Outer borders nested inside a hole (islands) are roots of their own.
#[must_use]
pub fn merge_tree(tree: &ContourTree, policy: OrphanPolicy) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for node in tree.nodes() {
        match node.kind {
            BorderKind::Outer => {
                let holes: Vec<&Contour> = tree.holes_of(node.id).map(|h| &h.contour).collect();
                outcome.holes_merged += holes.len();
                if !holes.is_empty() {
                    tracing::trace!(
                        id = node.id.index(),
                        holes = holes.len(),
                        "merging holes into outer contour"
                    );
                }
                outcome.rings.push(merge_all(&node.contour, holes));
            }
            BorderKind::Hole if tree.is_orphan(node) => match policy {
                OrphanPolicy::Drop => {
                    tracing::debug!(id = node.id.index(), "dropping orphaned hole");
                    outcome.orphans_dropped += 1;
                }
                OrphanPolicy::Promote => {
                    tracing::debug!(id = node.id.index(), "promoting orphaned hole");
                    outcome.orphans_promoted += 1;
                    outcome
                        .rings
                        .push(node.contour.clone().with_winding(Winding::Clockwise));
                }
            },
            BorderKind::Hole => {}
        }
    }

    outcome
}

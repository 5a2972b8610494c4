//! Contour extraction: trace outer and hole boundaries of a binary mask
//! together with their nesting.
//!
//! This module defines the [`ContourTracer`] trait for pluggable tracing
//! algorithms, the [`ContourTracerKind`] enum for selecting one at
//! runtime, and the [`ContourTree`] arena the tracers produce.
//!
//! # Hierarchy
//!
//! Every traced border gets a [`ContourId`] equal to its raster discovery
//! index. Parent links refer to ids, never to positions in a vector, so
//! nodes can be dropped (e.g. degenerate contours) without re-aliasing
//! the links of the survivors. A hole whose parent is gone is *orphaned*;
//! see [`crate::merge::OrphanPolicy`].

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::mask::Mask;
use crate::types::{Contour, Point};

/// Stable identifier of a traced border: its discovery index in raster
/// scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContourId(usize);

impl ContourId {
    /// Wrap a discovery index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The discovery index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Whether a border separates foreground from the outside world or from
/// an enclosed background region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BorderKind {
    /// Outer border of a connected foreground component.
    Outer,
    /// Border of a background region enclosed by foreground.
    Hole,
}

/// A traced border and its place in the nesting hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourNode {
    /// Discovery id.
    pub id: ContourId,
    /// Outer or hole border.
    pub kind: BorderKind,
    /// Immediately enclosing border, if any.
    pub parent: Option<ContourId>,
    /// Boundary vertices.
    pub contour: Contour,
}

/// Arena of traced borders, sorted by [`ContourId`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContourTree {
    nodes: Vec<ContourNode>,
    traced: usize,
}

impl ContourTree {
    /// Build a tree from nodes in any order.
    ///
    /// `traced` is the number of borders the tracer discovered, including
    /// any that were dropped before reaching the tree.
    #[must_use]
    pub fn new(mut nodes: Vec<ContourNode>, traced: usize) -> Self {
        nodes.sort_by_key(|node| node.id);
        Self { nodes, traced }
    }

    /// Number of borders discovered by the tracer.
    #[must_use]
    pub const fn traced(&self) -> usize {
        self.traced
    }

    /// Number of nodes currently in the tree.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree has no nodes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in ascending id order.
    #[must_use]
    pub fn nodes(&self) -> &[ContourNode] {
        &self.nodes
    }

    /// Look up a node by id.
    #[must_use]
    pub fn get(&self, id: ContourId) -> Option<&ContourNode> {
        self.nodes
            .binary_search_by_key(&id, |node| node.id)
            .ok()
            .map(|index| &self.nodes[index])
    }

    /// Outer borders, in ascending id order.
    pub fn outers(&self) -> impl Iterator<Item = &ContourNode> {
        self.nodes.iter().filter(|node| node.kind == BorderKind::Outer)
    }

    /// Hole borders whose parent is `id`, in ascending id order.
    pub fn holes_of(&self, id: ContourId) -> impl Iterator<Item = &ContourNode> {
        self.nodes
            .iter()
            .filter(move |node| node.kind == BorderKind::Hole && node.parent == Some(id))
    }

    /// Returns `true` if `node` is a hole whose parent is not an outer
    /// border present in this tree.
    #[must_use]
    pub fn is_orphan(&self, node: &ContourNode) -> bool {
        node.kind == BorderKind::Hole
            && !node
                .parent
                .and_then(|parent| self.get(parent))
                .is_some_and(|parent| parent.kind == BorderKind::Outer)
    }

    /// Replace every contour with `f(contour)`, dropping nodes whose new
    /// contour is degenerate. Ids and parent links are kept as they are.
    #[must_use]
    pub fn map_contours(self, mut f: impl FnMut(&Contour) -> Contour) -> Self {
        let nodes = self
            .nodes
            .into_iter()
            .filter_map(|node| {
                let contour = f(&node.contour);
                if contour.is_degenerate() {
                    tracing::debug!(
                        id = node.id.index(),
                        points = contour.len(),
                        "dropping contour that collapsed during simplification"
                    );
                    return None;
                }
                Some(ContourNode { contour, ..node })
            })
            .collect();
        Self {
            nodes,
            traced: self.traced,
        }
    }
}

/// Selects which contour tracing algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContourTracerKind {
    /// Suzuki-Abe border following via `imageproc::contours::find_contours`.
///
/// The border follower never starts a border on the image frame, so the
/// mask is traced inside a one-pixel background margin and every vertex
/// is shifted back afterwards.
///
/// Borders are discovered in raster-scan order, which fixes their ids.
/// Vertices sit on pixel centres (integer coordinates).
fn trace_border_following(image: &GrayImage) -> ContourTree {
    let mut padded = GrayImage::new(
        image.width().saturating_add(2),
        image.height().saturating_add(2),
    );
    image::imageops::replace(&mut padded, image, 1, 1);

    let borders: Vec<imageproc::contours::Contour<u32>> =
        imageproc::contours::find_contours(&padded);
    let traced = borders.len();

    let nodes = borders
        .into_iter()
        .enumerate()
        .filter_map(|(index, border)| {
            if border.points.len() < crate::types::MIN_RING_POINTS {
                tracing::debug!(
                    id = index,
                    points = border.points.len(),
                    "dropping degenerate border"
                );
                return None;
            }
            let kind = match border.border_type {
                imageproc::contours::BorderType::Outer => BorderKind::Outer,
                imageproc::contours::BorderType::Hole => BorderKind::Hole,
            };
            let contour = border
                .points
                .into_iter()
                .map(|p| Point::new(f64::from(p.x) - 1.0, f64::from(p.y) - 1.0))
                .collect();
            Some(ContourNode {
                id: ContourId::new(index),
                kind,
                parent: border.parent.map(ContourId::new),
                contour,
            })
        })
        .collect();

    ContourTree::new(nodes, traced)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn square_contour(min: f64, max: f64) -> Contour {
        Contour::new(vec![
            Point::new(min, min),
            Point::new(max, min),
            Point::new(max, max),
            Point::new(min, max),
        ])
    }

    fn node(id: usize, kind: BorderKind, parent: Option<usize>) -> ContourNode {
        ContourNode {
            id: ContourId::new(id),
            kind,
            parent: parent.map(ContourId::new),
            contour: square_contour(0.0, 1.0),
        }
    }

    #[test]
    fn default_is_border_following() {
        assert_eq!(
            ContourTracerKind::default(),
            ContourTracerKind::BorderFollowing
        );
    }

    #[test]
    fn empty_mask_produces_no_contours() {
        let tree = ContourTracerKind::BorderFollowing.trace(&Mask::new(10, 10));
        assert!(tree.is_empty());
        assert_eq!(tree.traced(), 0);
    }

    #[test]
    fn single_pixel_is_degenerate() {
        let mask = Mask::from_fn(10, 10, |x, y| x == 5 && y == 5);
        let tree = ContourTracerKind::BorderFollowing.trace(&mask);
        assert_eq!(tree.traced(), 1);
        assert!(tree.is_empty());
    }

    #[test]
    fn filled_rectangle_is_one_outer_root() {
        let mask = Mask::from_fn(20, 20, |x, y| (5..15).contains(&x) && (5..12).contains(&y));
        let tree = ContourTracerKind::BorderFollowing.trace(&mask);
        assert_eq!(tree.len(), 1);
        let root = &tree.nodes()[0];
        assert_eq!(root.kind, BorderKind::Outer);
        assert_eq!(root.parent, None);
        // Raster scan meets the top-left pixel first.
        assert_eq!(root.contour.points()[0], Point::new(5.0, 5.0));
        for p in root.contour.points() {
            assert!((5.0..=14.0).contains(&p.x) && (5.0..=11.0).contains(&p.y));
        }
    }

    #[test]
    fn square_with_hole_links_hole_to_outer() {
        let mask = Mask::from_fn(40, 40, |x, y| {
            let outer = (5..35).contains(&x) && (5..35).contains(&y);
            let hole = (15..25).contains(&x) && (15..25).contains(&y);
            outer && !hole
        });
        let tree = ContourTracerKind::BorderFollowing.trace(&mask);
        assert_eq!(tree.len(), 2);

        let outer = tree.outers().next().unwrap();
        let holes: Vec<_> = tree.holes_of(outer.id).collect();
        assert_eq!(holes.len(), 1);
        assert_eq!(holes[0].kind, BorderKind::Hole);
        assert!(!tree.is_orphan(holes[0]));
    }

    #[test]
    fn tracing_is_deterministic() {
        let mask = Mask::from_fn(30, 30, |x, y| {
            (x + y) % 7 != 0 && (3..27).contains(&x) && (3..27).contains(&y)
        });
        let a = ContourTracerKind::BorderFollowing.trace(&mask);
        let b = ContourTracerKind::BorderFollowing.trace(&mask);
        assert_eq!(a, b);
    }

    #[test]
    fn tree_sorts_nodes_by_id() {
        let tree = ContourTree::new(
            vec![
                node(4, BorderKind::Hole, Some(0)),
                node(0, BorderKind::Outer, None),
            ],
            5,
        );
        let ids: Vec<_> = tree.nodes().iter().map(|n| n.id.index()).collect();
        assert_eq!(ids, vec![0, 4]);
        assert_eq!(tree.traced(), 5);
    }

    #[test]
    fn get_finds_by_id_not_position() {
        let tree = ContourTree::new(
            vec![
                node(2, BorderKind::Outer, None),
                node(7, BorderKind::Hole, Some(2)),
            ],
            8,
        );
        assert_eq!(tree.get(ContourId::new(7)).unwrap().kind, BorderKind::Hole);
        assert!(tree.get(ContourId::new(1)).is_none());
    }

    #[test]
    fn hole_with_missing_parent_is_orphan() {
        let tree = ContourTree::new(vec![node(3, BorderKind::Hole, Some(1))], 4);
        assert!(tree.is_orphan(&tree.nodes()[0]));
    }

    #[test]
    fn outer_is_never_orphan() {
        let tree = ContourTree::new(vec![node(3, BorderKind::Outer, Some(1))], 4);
        assert!(!tree.is_orphan(&tree.nodes()[0]));
    }

    #[test]
    fn map_contours_drops_degenerate_and_keeps_ids() {
        let outer = ContourNode {
            contour: square_contour(0.0, 10.0),
            ..node(0, BorderKind::Outer, None)
        };
        let tree = ContourTree::new(vec![outer, node(1, BorderKind::Hole, Some(0))], 2);

        // Collapse only the small ring.
        let mapped = tree.map_contours(|c| {
            if c.perimeter() < 10.0 {
                Contour::new(c.points()[..2].to_vec())
            } else {
                c.clone()
            }
        });
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped.nodes()[0].id, ContourId::new(0));
        assert_eq!(mapped.traced(), 2);
    }

    #[test]
    fn region_touching_left_edge_is_traced() {
        let mask = Mask::from_fn(30, 20, |x, y| x < 10 && (5..15).contains(&y));
        let tree = ContourTracerKind::BorderFollowing.trace(&mask);
        assert_eq!(tree.len(), 1);
        let root = &tree.nodes()[0];
        assert_eq!(root.kind, BorderKind::Outer);
        assert_eq!(root.contour.points()[0], Point::new(0.0, 5.0));
        for p in root.contour.points() {
            assert!((0.0..=9.0).contains(&p.x) && (5.0..=14.0).contains(&p.y));
        }
    }

    #[test]
    fn full_mask_traces_its_frame() {
        let tree = ContourTracerKind::BorderFollowing.trace(&Mask::from_fn(8, 6, |_, _| true));
        assert_eq!(tree.len(), 1);
        let points = tree.nodes()[0].contour.points();
        assert_eq!(points[0], Point::new(0.0, 0.0));
        assert!(points.contains(&Point::new(7.0, 5.0)));
    }

    #[test]
    fn frame_filling_ring_keeps_its_hole() {
        let mask = Mask::from_fn(20, 20, |x, y| !((6..14).contains(&x) && (6..14).contains(&y)));
        let tree = ContourTracerKind::BorderFollowing.trace(&mask);
        assert_eq!(tree.len(), 2);
        let outer = tree.outers().next().unwrap();
        let holes: Vec<_> = tree.holes_of(outer.id).collect();
        assert_eq!(holes.len(), 1);
        assert!(!tree.is_orphan(holes[0]));
    }
}

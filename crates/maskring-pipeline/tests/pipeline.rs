//! End-to-end tests for the mask-to-polygon pipeline on synthetic masks.

#![allow(clippy::unwrap_used)]

use geo::Area;
use maskring_pipeline::contour::BorderKind;
use maskring_pipeline::simplify::simplify_tree;
use maskring_pipeline::{
    ContourTracer, Mask, PipelineConfig, Point, Polygon, ProcessResult, process,
};

/// 30x30 block of foreground pixels at 5..35 with a 10x10 background
/// hole at 15..25.
fn square_with_hole() -> Mask {
    Mask::from_fn(40, 40, |x, y| {
        let outer = (5..35).contains(&x) && (5..35).contains(&y);
        let hole = (15..25).contains(&x) && (15..25).contains(&y);
        outer && !hole
    })
}

fn run(mask: &Mask) -> ProcessResult {
    process(mask, &PipelineConfig::default()).unwrap()
}

fn properly_cross(a: Point, b: Point, c: Point, d: Point) -> bool {
    let orient =
        |p: Point, q: Point, r: Point| (q.x - p.x).mul_add(r.y - p.y, -((q.y - p.y) * (r.x - p.x)));
    let (d1, d2) = (orient(c, d, a), orient(c, d, b));
    let (d3, d4) = (orient(a, b, c), orient(a, b, d));
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

fn has_proper_crossing(polygon: &Polygon) -> bool {
    let points: Vec<Point> = polygon.points().collect();
    let n = points.len();
    let edges: Vec<(Point, Point)> = (0..n).map(|i| (points[i], points[(i + 1) % n])).collect();
    edges.iter().enumerate().any(|(k, &(a, b))| {
        edges[k + 1..]
            .iter()
            .any(|&(c, d)| properly_cross(a, b, c, d))
    })
}

fn line_string(points: &[Point]) -> geo::LineString<f64> {
    points.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>().into()
}

#[test]
fn blank_mask_produces_no_polygons() {
    let result = run(&Mask::new(64, 48));
    assert!(result.is_empty());
    assert_eq!(result.summary.traced, 0);
}

#[test]
fn filled_rectangle_area_and_bbox() {
    let mask = Mask::from_fn(50, 40, |x, y| (10..40).contains(&x) && (8..28).contains(&y));
    let result = run(&mask);
    assert_eq!(result.polygons.len(), 1);

    let record = &result.polygons[0];
    // Pixel-centre contour: 30x20 pixels span 29x19 units.
    assert!((record.area - 29.0 * 19.0).abs() < 1e-9);
    assert_eq!(<[f64; 4]>::from(record.bbox), [10.0, 8.0, 39.0, 27.0]);
    assert_eq!(record.bbox.to_xywh(), [10.0, 8.0, 29.0, 19.0]);
}

#[test]
fn square_with_hole_becomes_one_ring() {
    let result = run(&square_with_hole());
    assert_eq!(result.polygons.len(), 1);
    assert_eq!(result.summary.holes_merged, 1);

    let record = &result.polygons[0];
    // Outer ring spans 29x29; the hole ring lies between the 10x10 hole
    // and the 12x12 square of its bordering pixels.
    assert!(record.area >= 841.0 - 121.0 && record.area < 841.0 - 81.0);
    assert!(!has_proper_crossing(&record.segmentation));
    assert_eq!(<[f64; 4]>::from(record.bbox), [5.0, 5.0, 34.0, 34.0]);
}

#[test]
fn merged_area_matches_polygon_with_interior() {
    let mask = square_with_hole();
    let config = PipelineConfig::default();
    let tree = simplify_tree(config.contour_tracer.trace(&mask), config.epsilon_factor);

    let outer = tree.outers().next().unwrap();
    let hole = tree.holes_of(outer.id).next().unwrap();
    assert_eq!(hole.kind, BorderKind::Hole);
    let reference = geo::Polygon::new(
        line_string(outer.contour.points()),
        vec![line_string(hole.contour.points())],
    );

    let merged = &run(&mask).polygons[0];
    assert!((merged.area - reference.unsigned_area()).abs() < 1e-9);
}

#[test]
fn island_inside_hole_is_its_own_polygon() {
    let mask = Mask::from_fn(40, 40, |x, y| {
        let ring = (0..40).contains(&x) && (0..40).contains(&y);
        let hole = (10..30).contains(&x) && (10..30).contains(&y);
        let island = (15..25).contains(&x) && (15..25).contains(&y);
        (ring && !hole) || island
    });
    let result = run(&mask);
    assert_eq!(result.polygons.len(), 2);
    assert_eq!(result.summary.holes_merged, 1);

    // Ordered by discovery: the enclosing ring first, then the island.
    assert_eq!(<[f64; 4]>::from(result.polygons[0].bbox), [0.0, 0.0, 39.0, 39.0]);
    assert_eq!(<[f64; 4]>::from(result.polygons[1].bbox), [15.0, 15.0, 24.0, 24.0]);
    assert!((result.polygons[1].area - 81.0).abs() < 1e-9);

    let union = result.bbox().unwrap();
    assert_eq!(<[f64; 4]>::from(union), [0.0, 0.0, 39.0, 39.0]);
    let total: f64 = result.polygons.iter().map(|p| p.area).sum();
    assert!((result.total_area() - total).abs() < 1e-9);
}

#[test]
fn every_emitted_ring_is_clockwise() {
    let mask = Mask::from_fn(60, 30, |x, y| {
        let left = (2..20).contains(&x) && (2..20).contains(&y);
        let right = (30..55).contains(&x) && (5..25).contains(&y);
        let hole = (40..45).contains(&x) && (12..18).contains(&y);
        left || (right && !hole)
    });
    let result = run(&mask);
    assert_eq!(result.polygons.len(), 2);
    for record in &result.polygons {
        assert!(maskring_pipeline::geometry::signed_area(record.segmentation.coords()) > 0.0);
    }
}

#[test]
fn pipeline_is_deterministic() {
    let mask = Mask::from_fn(48, 48, |x, y| {
        let dx = f64::from(x) - 24.0;
        let dy = f64::from(y) - 24.0;
        let r = dx.hypot(dy);
        (6.0..20.0).contains(&r)
    });
    assert_eq!(run(&mask), run(&mask));
}

#[test]
fn working_scale_maps_back_to_native_resolution() {
    let mask = square_with_hole();
    let native = run(&mask);
    let config = PipelineConfig {
        scale_x: 2.0,
        scale_y: 4.0,
        ..PipelineConfig::default()
    };
    let scaled = process(&mask, &config).unwrap();

    let (a, b) = (&native.polygons[0], &scaled.polygons[0]);
    for (p, q) in a.segmentation.points().zip(b.segmentation.points()) {
        assert!((p.x / 2.0 - q.x).abs() < 1e-12);
        assert!((p.y / 4.0 - q.y).abs() < 1e-12);
    }
    assert!((a.area / 8.0 - b.area).abs() < 1e-9);
}

#[test]
fn record_serializes_to_flat_arrays() {
    let mask = Mask::from_fn(10, 10, |x, y| (2..6).contains(&x) && (2..6).contains(&y));
    let result = run(&mask);
    let value = serde_json::to_value(&result.polygons[0]).unwrap();

    let segmentation = value["segmentation"].as_array().unwrap();
    assert_eq!(segmentation.len(), 8);
    assert!(segmentation.iter().all(serde_json::Value::is_f64));
    assert_eq!(value["bbox"], serde_json::json!([2.0, 2.0, 5.0, 5.0]));
    assert_eq!(value["area"], serde_json::json!(9.0));
}

#[test]
fn config_deserializes_with_defaults() {
    let config: PipelineConfig =
        serde_json::from_str(r#"{"epsilon_factor": 0.01, "orphan_policy": "Promote"}"#).unwrap();
    assert!((config.epsilon_factor - 0.01).abs() < f64::EPSILON);
    assert_eq!(config.orphan_policy, maskring_pipeline::OrphanPolicy::Promote);
    assert!((config.scale_x - PipelineConfig::DEFAULT_SCALE).abs() < f64::EPSILON);
    assert!(config.validate().is_ok());
}

#[test]
fn rectangle_touching_left_edge() {
    let mask = Mask::from_fn(30, 20, |x, y| x < 10 && (5..15).contains(&y));
    let result = run(&mask);
    assert_eq!(result.polygons.len(), 1);
    assert_eq!(<[f64; 4]>::from(result.polygons[0].bbox), [0.0, 5.0, 9.0, 14.0]);
    assert!((result.polygons[0].area - 81.0).abs() < 1e-9);
}

#[test]
fn fully_foreground_mask_is_one_polygon() {
    let result = run(&Mask::from_fn(12, 9, |_, _| true));
    assert_eq!(result.polygons.len(), 1);
    assert_eq!(<[f64; 4]>::from(result.polygons[0].bbox), [0.0, 0.0, 11.0, 8.0]);
    assert!((result.polygons[0].area - 88.0).abs() < 1e-9);
}

#[test]
fn frame_filling_ring_merges_its_hole() {
    let mask = Mask::from_fn(20, 20, |x, y| !((6..14).contains(&x) && (6..14).contains(&y)));
    let result = run(&mask);
    assert_eq!(result.polygons.len(), 1);
    assert_eq!(result.summary.holes_merged, 1);
    assert_eq!(result.summary.orphans_dropped, 0);
    assert_eq!(<[f64; 4]>::from(result.polygons[0].bbox), [0.0, 0.0, 19.0, 19.0]);
    assert!(result.polygons[0].area < 19.0 * 19.0);
}

//! Overlap detection between a candidate boundary and previously approved
//! ones.
//!
//! Exact polygon intersection is far more expensive than a box comparison,
//! so every stored boundary carries a bounding box and the cheap 4-way
//! exclusion test runs first; the clipping step only sees box-overlapping
//! survivors. An empty result set is a valid "no overlap" outcome, not an
//! error.

use serde::Serialize;

use super::domain::{CoordinateSet, GeoPoint};
use crate::workflows::acceptance::domain::ApplicationId;

const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Area below which an intersection is treated as numerically empty.
const AREA_EPSILON_SQM: f64 = 1e-6;

/// A previously approved boundary, parsed from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovedBoundary {
    pub application_id: ApplicationId,
    pub coordinates: CoordinateSet,
}

/// One overlapping approved boundary, with the intersection ring retained
/// for admin display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlapResult {
    pub application_id: ApplicationId,
    /// Intersection area over the smaller of the two polygon areas, as a
    /// percentage rounded to two decimals.
    pub overlap_percent: f64,
    pub overlap_area_sqm: f64,
    /// Explicitly closed ring (first vertex repeated last).
    pub intersection: Vec<GeoPoint>,
}

/// Result of the minimum-footprint check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MinimumAreaCheck {
    pub is_valid: bool,
    pub area_sqm: f64,
}

/// Compares a candidate boundary against every approved boundary, excluding
/// the one owned by `exclude` when re-checking an application against the
/// rest of the register.
pub fn detect_overlaps(
    candidate: &CoordinateSet,
    existing: &[ApprovedBoundary],
    exclude: Option<&ApplicationId>,
) -> Vec<OverlapResult> {
    let candidate_box = candidate.bounding_box();
    let candidate_area = polygon_area_sqm(candidate.points());

    let mut results = Vec::new();
    for boundary in existing {
        if exclude == Some(&boundary.application_id) {
            continue;
        }
        if !candidate_box.overlaps(&boundary.coordinates.bounding_box()) {
            continue;
        }

        let intersection =
            intersection_polygon(boundary.coordinates.points(), candidate.points());
        if intersection.len() < 3 {
            continue;
        }

        let overlap_area = polygon_area_sqm(&intersection);
        if overlap_area <= AREA_EPSILON_SQM {
            continue;
        }

        let existing_area = polygon_area_sqm(boundary.coordinates.points());
        let denominator = candidate_area.min(existing_area);
        if denominator <= AREA_EPSILON_SQM {
            continue;
        }

        let mut ring = intersection;
        if let Some(&first) = ring.first() {
            ring.push(first);
        }

        results.push(OverlapResult {
            application_id: boundary.application_id.clone(),
            overlap_percent: round2(overlap_area / denominator * 100.0),
            overlap_area_sqm: round2(overlap_area),
            intersection: ring,
        });
    }

    results
}

/// Whether an overlap percentage crosses the human-consent threshold.
/// Percentages below the threshold are ignored as negligible.
pub fn is_significant_overlap(percent: f64, threshold: f64) -> bool {
    percent >= threshold
}

/// Rejects boundaries below the configured minimum footprint.
pub fn validate_minimum_area(points: &[GeoPoint], minimum_sqm: f64) -> MinimumAreaCheck {
    let area_sqm = polygon_area_sqm(points);
    MinimumAreaCheck {
        is_valid: area_sqm >= minimum_sqm,
        area_sqm,
    }
}

/// Polygon area in square meters via an equirectangular projection around
/// the polygon's mean latitude, then the shoelace formula. Adequate for the
/// parcel-sized footprints this portal handles.
pub fn polygon_area_sqm(points: &[GeoPoint]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let mean_lat = points.iter().map(|p| p.lat).sum::<f64>() / points.len() as f64;
    let meters_per_degree_lng = METERS_PER_DEGREE_LAT * mean_lat.to_radians().cos();

    let projected: Vec<(f64, f64)> = points
        .iter()
        .map(|p| {
            (
                p.lng * meters_per_degree_lng,
                p.lat * METERS_PER_DEGREE_LAT,
            )
        })
        .collect();

    shoelace(&projected).abs()
}

fn shoelace(points: &[(f64, f64)]) -> f64 {
    let n = points.len();
    let mut area = 0.0;
    for i in 0..n {
        let (x1, y1) = points[i];
        let (x2, y2) = points[(i + 1) % n];
        area += x1 * y2 - x2 * y1;
    }
    area / 2.0
}

fn signed_area_deg(points: &[GeoPoint]) -> f64 {
    let n = points.len();
    let mut area = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        area += a.lng * b.lat - b.lng * a.lat;
    }
    area / 2.0
}

/// Sutherland–Hodgman clip of `subject` against `clip`. The clip ring is
/// reoriented counter-clockwise; parcel boundaries here are simple convex
/// rings, which the algorithm requires of the clip polygon.
fn intersection_polygon(subject: &[GeoPoint], clip: &[GeoPoint]) -> Vec<GeoPoint> {
    let mut clip_ring = clip.to_vec();
    if signed_area_deg(&clip_ring) < 0.0 {
        clip_ring.reverse();
    }

    let mut output = subject.to_vec();
    let n = clip_ring.len();
    for i in 0..n {
        if output.is_empty() {
            break;
        }
        let edge_start = clip_ring[i];
        let edge_end = clip_ring[(i + 1) % n];

        let input = std::mem::take(&mut output);
        let len = input.len();
        for j in 0..len {
            let current = input[j];
            let previous = input[(j + len - 1) % len];
            let current_inside = is_left_or_on(edge_start, edge_end, current);
            let previous_inside = is_left_or_on(edge_start, edge_end, previous);

            if current_inside {
                if !previous_inside {
                    output.push(line_intersection(previous, current, edge_start, edge_end));
                }
                output.push(current);
            } else if previous_inside {
                output.push(line_intersection(previous, current, edge_start, edge_end));
            }
        }
    }

    output
}

fn is_left_or_on(a: GeoPoint, b: GeoPoint, p: GeoPoint) -> bool {
    (b.lng - a.lng) * (p.lat - a.lat) - (b.lat - a.lat) * (p.lng - a.lng) >= 0.0
}

fn line_intersection(p: GeoPoint, q: GeoPoint, a: GeoPoint, b: GeoPoint) -> GeoPoint {
    let denominator =
        (p.lng - q.lng) * (a.lat - b.lat) - (p.lat - q.lat) * (a.lng - b.lng);
    if denominator.abs() < f64::EPSILON {
        return q;
    }

    let t = ((p.lng - a.lng) * (a.lat - b.lat) - (p.lat - a.lat) * (a.lng - b.lng)) / denominator;
    GeoPoint::new(p.lat + t * (q.lat - p.lat), p.lng + t * (q.lng - p.lng))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::geometry::validator::validated_coordinate_set;

    fn set(points: Vec<GeoPoint>) -> CoordinateSet {
        let (set, _) = validated_coordinate_set(points, None).expect("fixture validates");
        set
    }

    fn square(min_lat: f64, min_lng: f64, size: f64) -> CoordinateSet {
        set(vec![
            GeoPoint::new(min_lat, min_lng),
            GeoPoint::new(min_lat, min_lng + size),
            GeoPoint::new(min_lat + size, min_lng + size),
            GeoPoint::new(min_lat + size, min_lng),
        ])
    }

    fn boundary(id: &str, coordinates: CoordinateSet) -> ApprovedBoundary {
        ApprovedBoundary {
            application_id: ApplicationId(id.to_string()),
            coordinates,
        }
    }

    #[test]
    fn area_of_square_matches_projection() {
        let square = square(14.0, 121.0, 0.1);
        let area = polygon_area_sqm(square.points());
        let side_lat = 0.1 * METERS_PER_DEGREE_LAT;
        let side_lng = 0.1 * METERS_PER_DEGREE_LAT * (14.05f64).to_radians().cos();
        let expected = side_lat * side_lng;
        assert!(
            (area - expected).abs() / expected < 0.01,
            "area {area} differs from expected {expected}"
        );
    }

    #[test]
    fn identical_squares_overlap_fully() {
        let candidate = square(14.0, 121.0, 0.1);
        let existing = vec![boundary("app-1", square(14.0, 121.0, 0.1))];

        let results = detect_overlaps(&candidate, &existing, None);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].application_id, ApplicationId("app-1".to_string()));
        assert!((results[0].overlap_percent - 100.0).abs() < 0.5);
        // Intersection ring comes back explicitly closed.
        let ring = &results[0].intersection;
        assert!(ring.len() >= 4);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn half_shifted_squares_overlap_fifty_percent() {
        let candidate = square(14.0, 121.0, 0.1);
        let existing = vec![boundary("app-2", square(14.0, 121.05, 0.1))];

        let results = detect_overlaps(&candidate, &existing, None);
        assert_eq!(results.len(), 1);
        assert!(
            (results[0].overlap_percent - 50.0).abs() < 0.5,
            "got {}",
            results[0].overlap_percent
        );
    }

    #[test]
    fn disjoint_squares_produce_no_results() {
        let candidate = square(14.0, 121.0, 0.1);
        let existing = vec![boundary("app-3", square(15.0, 122.0, 0.1))];
        assert!(detect_overlaps(&candidate, &existing, None).is_empty());
    }

    #[test]
    fn excluded_application_is_skipped() {
        let candidate = square(14.0, 121.0, 0.1);
        let existing = vec![boundary("app-4", square(14.0, 121.0, 0.1))];
        let exclude = ApplicationId("app-4".to_string());
        assert!(detect_overlaps(&candidate, &existing, Some(&exclude)).is_empty());
    }

    #[test]
    fn overlap_detection_is_symmetric_in_area() {
        let a = square(14.0, 121.0, 0.1);
        let b = square(14.05, 121.05, 0.1);

        let forward = detect_overlaps(&a, &[boundary("b", b.clone())], None);
        let reverse = detect_overlaps(&b, &[boundary("a", a.clone())], None);

        assert_eq!(forward.len(), 1);
        assert_eq!(reverse.len(), 1);
        let ratio = forward[0].overlap_area_sqm / reverse[0].overlap_area_sqm;
        assert!((ratio - 1.0).abs() < 0.01, "asymmetric areas: {ratio}");
    }

    #[test]
    fn intersecting_polygons_always_share_bounding_boxes() {
        let pairs = vec![
            (square(14.0, 121.0, 0.1), square(14.05, 121.05, 0.1)),
            (square(14.0, 121.0, 0.1), square(14.0, 121.05, 0.1)),
            (square(14.0, 121.0, 0.2), square(14.05, 121.05, 0.05)),
        ];
        for (a, b) in pairs {
            let intersection = intersection_polygon(a.points(), b.points());
            if intersection.len() >= 3 {
                assert!(a.bounding_box().overlaps(&b.bounding_box()));
            }
        }
    }

    #[test]
    fn significance_threshold_is_inclusive() {
        assert!(is_significant_overlap(1.0, 1.0));
        assert!(is_significant_overlap(2.5, 1.0));
        assert!(!is_significant_overlap(0.99, 1.0));
    }

    #[test]
    fn minimum_area_rejects_small_footprints() {
        // Roughly 11m x 11m.
        let tiny = vec![
            GeoPoint::new(14.0, 121.0),
            GeoPoint::new(14.0, 121.0001),
            GeoPoint::new(14.0001, 121.0001),
            GeoPoint::new(14.0001, 121.0),
        ];
        let check = validate_minimum_area(&tiny, 1000.0);
        assert!(!check.is_valid);
        assert!(check.area_sqm > 0.0);

        let check = validate_minimum_area(&tiny, 50.0);
        assert!(check.is_valid);
    }

    #[test]
    fn degenerate_point_lists_have_zero_area() {
        assert_eq!(polygon_area_sqm(&[]), 0.0);
        assert_eq!(
            polygon_area_sqm(&[GeoPoint::new(14.0, 121.0), GeoPoint::new(14.1, 121.1)]),
            0.0
        );
    }
}

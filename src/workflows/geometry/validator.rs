//! Validation for submitted boundary point sequences.
//!
//! Basic checks (count, ranges, duplicates) run first and short-circuit the
//! geometric checks; collinearity and self-intersection are evaluated
//! together so the submitter sees both failures in one pass.

use serde::Serialize;
use std::fmt;

use super::domain::{BoundingBox, CoordinateSet, GeoPoint};

/// Minimum vertices for a polygon. The legacy wizard always sent four
/// corners; the portal now accepts any simple ring of three or more.
pub const MIN_POLYGON_POINTS: usize = 3;

/// Tolerance for treating cross products as zero in the collinearity test.
pub const COLLINEARITY_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateField {
    Latitude,
    Longitude,
}

impl CoordinateField {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
        }
    }
}

impl fmt::Display for CoordinateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single validation failure, tagged with the point and field it concerns
/// so the portal can render inline messages.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum CoordinateIssue {
    #[error("a boundary requires at least {minimum} points, found {found}")]
    TooFewPoints { minimum: usize, found: usize },
    #[error("point {index}: {field} must be a finite number")]
    NotFinite { index: usize, field: CoordinateField },
    #[error("point {index}: {field} {value} is outside the allowed range")]
    OutOfRange {
        index: usize,
        field: CoordinateField,
        value: f64,
    },
    #[error("points {first} and {second} coincide")]
    DuplicatePoints { first: usize, second: usize },
    #[error("the points are collinear and do not enclose an area")]
    Collinear,
    #[error("the boundary ring self-intersects")]
    SelfIntersecting,
    #[error("boundary area {area_sqm:.2} sqm is below the minimum of {minimum_sqm:.2} sqm")]
    BelowMinimumArea { area_sqm: f64, minimum_sqm: f64 },
}

/// Advisory finding that does not fail validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum CoordinateWarning {
    #[error("point {index} lies outside the configured service area")]
    OutsideServiceArea { index: usize },
}

/// Outcome of validating a point sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ValidationReport {
    pub errors: Vec<CoordinateIssue>,
    pub warnings: Vec<CoordinateWarning>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.errors.is_empty() {
            return "valid".to_string();
        }
        self.errors
            .iter()
            .map(CoordinateIssue::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Runs the basic (non-geometric) checks: point count, finite values,
/// absolute coordinate ranges, duplicate vertices, and the advisory
/// service-area containment check.
pub fn validate_points(points: &[GeoPoint], service_area: Option<&BoundingBox>) -> ValidationReport {
    let mut report = ValidationReport::default();

    if points.len() < MIN_POLYGON_POINTS {
        report.errors.push(CoordinateIssue::TooFewPoints {
            minimum: MIN_POLYGON_POINTS,
            found: points.len(),
        });
    }

    for (index, point) in points.iter().enumerate() {
        check_field(&mut report, index, CoordinateField::Latitude, point.lat, 90.0);
        check_field(
            &mut report,
            index,
            CoordinateField::Longitude,
            point.lng,
            180.0,
        );

        if let Some(area) = service_area {
            if point.lat.is_finite() && point.lng.is_finite() && !area.contains(*point) {
                report
                    .warnings
                    .push(CoordinateWarning::OutsideServiceArea { index });
            }
        }
    }

    for first in 0..points.len() {
        for second in (first + 1)..points.len() {
            if points[first].lat == points[second].lat && points[first].lng == points[second].lng {
                report
                    .errors
                    .push(CoordinateIssue::DuplicatePoints { first, second });
            }
        }
    }

    report
}

fn check_field(
    report: &mut ValidationReport,
    index: usize,
    field: CoordinateField,
    value: f64,
    bound: f64,
) {
    if !value.is_finite() {
        report.errors.push(CoordinateIssue::NotFinite { index, field });
    } else if value < -bound || value > bound {
        report
            .errors
            .push(CoordinateIssue::OutOfRange { index, field, value });
    }
}

/// True when every point lies on the line through the first two. Fewer than
/// three points are trivially collinear.
pub fn are_collinear(points: &[GeoPoint]) -> bool {
    if points.len() < 3 {
        return true;
    }

    let origin = points[0];
    let anchor = points[1];
    points[2..]
        .iter()
        .all(|point| cross(origin, anchor, *point).abs() < COLLINEARITY_EPSILON)
}

/// Tests the point list as a closed ring for crossing non-adjacent edges.
/// Fewer than four points cannot self-intersect.
pub fn is_self_intersecting(points: &[GeoPoint]) -> bool {
    let n = points.len();
    if n < 4 {
        return false;
    }

    for i in 0..n {
        for j in (i + 1)..n {
            // Edges sharing a vertex are adjacent, including the closing pair.
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }

            let (a1, a2) = (points[i], points[(i + 1) % n]);
            let (b1, b2) = (points[j], points[(j + 1) % n]);
            if segments_cross(a1, a2, b1, b2) {
                return true;
            }
        }
    }

    false
}

/// Composes the basic and geometric checks. Basic failures short-circuit;
/// collinearity and self-intersection are both reported when both fail.
pub fn validate_polygon_geometry(
    points: &[GeoPoint],
    service_area: Option<&BoundingBox>,
) -> ValidationReport {
    let mut report = validate_points(points, service_area);
    if !report.is_valid() {
        return report;
    }

    if are_collinear(points) {
        report.errors.push(CoordinateIssue::Collinear);
    }
    if is_self_intersecting(points) {
        report.errors.push(CoordinateIssue::SelfIntersecting);
    }

    report
}

/// Validates a point sequence and wraps it into a [`CoordinateSet`] with its
/// cached bounding box. Warnings survive alongside the validated set.
pub fn validated_coordinate_set(
    points: Vec<GeoPoint>,
    service_area: Option<&BoundingBox>,
) -> Result<(CoordinateSet, Vec<CoordinateWarning>), ValidationReport> {
    let report = validate_polygon_geometry(&points, service_area);
    if !report.is_valid() {
        return Err(report);
    }
    Ok((CoordinateSet::from_validated(points), report.warnings))
}

fn cross(origin: GeoPoint, a: GeoPoint, b: GeoPoint) -> f64 {
    (a.lng - origin.lng) * (b.lat - origin.lat) - (a.lat - origin.lat) * (b.lng - origin.lng)
}

fn ccw(a: GeoPoint, b: GeoPoint, c: GeoPoint) -> bool {
    cross(a, b, c) > 0.0
}

fn segments_cross(a1: GeoPoint, a2: GeoPoint, b1: GeoPoint, b2: GeoPoint) -> bool {
    ccw(a1, b1, b2) != ccw(a2, b1, b2) && ccw(a1, a2, b1) != ccw(a1, a2, b2)
}

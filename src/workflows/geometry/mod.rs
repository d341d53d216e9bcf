//! Geospatial validation and overlap detection for submitted lot boundaries.
//!
//! Inbound coordinate payloads are normalized at the edge ([`normalize`]),
//! validated into a [`CoordinateSet`] with a cached bounding box
//! ([`validator`]), and compared against previously approved boundaries
//! ([`overlap`]). Everything here is a pure function over its inputs; the
//! lifecycle engine decides what the results mean for a requirement.

pub mod domain;
pub mod normalize;
pub mod overlap;
pub mod validator;

pub use domain::{BoundingBox, CoordinateSet, GeoPoint};
pub use normalize::CoordinatePayload;
pub use overlap::{
    detect_overlaps, is_significant_overlap, validate_minimum_area, ApprovedBoundary,
    MinimumAreaCheck, OverlapResult,
};
pub use validator::{
    are_collinear, is_self_intersecting, validate_points, validate_polygon_geometry,
    CoordinateField, CoordinateIssue, CoordinateWarning, ValidationReport,
};

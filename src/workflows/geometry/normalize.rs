//! Boundary adapter for inbound coordinate payloads.
//!
//! The portal's legacy wizard posted four explicitly named corner fields;
//! newer clients post an ordered point array. Both shapes are normalized here
//! into the canonical point sequence before any validation or geometry code
//! sees them, keeping the legacy parser out of the core.

use serde::Deserialize;

use super::domain::GeoPoint;

/// Inbound coordinate payload in either supported wire shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CoordinatePayload {
    Points(Vec<GeoPoint>),
    LegacyCorners(LegacyCorners),
}

/// The fixed four-corner shape produced by the original application wizard.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyCorners {
    pub north_west: GeoPoint,
    pub north_east: GeoPoint,
    pub south_east: GeoPoint,
    pub south_west: GeoPoint,
}

impl CoordinatePayload {
    /// Converts either wire shape into the canonical ordered point sequence.
    pub fn into_points(self) -> Vec<GeoPoint> {
        match self {
            CoordinatePayload::Points(points) => points,
            CoordinatePayload::LegacyCorners(corners) => vec![
                corners.north_west,
                corners.north_east,
                corners.south_east,
                corners.south_west,
            ],
        }
    }
}

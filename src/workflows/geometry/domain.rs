use serde::{Deserialize, Serialize};

/// A single boundary vertex as submitted by the applicant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Axis-aligned rectangle enclosing a polygon, used as a cheap overlap
/// pre-filter before exact intersection runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Computes the box for a point sequence. `None` for an empty sequence.
    pub fn of(points: &[GeoPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let min_lat = points.iter().map(|p| p.lat).fold(f64::INFINITY, f64::min);
        let max_lat = points
            .iter()
            .map(|p| p.lat)
            .fold(f64::NEG_INFINITY, f64::max);
        let min_lng = points.iter().map(|p| p.lng).fold(f64::INFINITY, f64::min);
        let max_lng = points
            .iter()
            .map(|p| p.lng)
            .fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// True unless one box lies strictly north, south, east, or west of the
    /// other. Boxes that merely touch are treated as overlapping so the
    /// pre-filter can never reject a pair whose exact geometries intersect.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        !(self.max_lat < other.min_lat
            || self.min_lat > other.max_lat
            || self.max_lng < other.min_lng
            || self.min_lng > other.max_lng)
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lng >= self.min_lng
            && point.lng <= self.max_lng
    }
}

/// A validated polygon boundary: the ordered vertex ring plus its bounding
/// box, computed once at validation time and cached for pre-filtering.
///
/// Construction goes through [`crate::workflows::geometry::validator`]; the
/// serde impls exist so stored payloads round-trip through the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSet {
    points: Vec<GeoPoint>,
    bounding_box: BoundingBox,
}

impl CoordinateSet {
    /// Wraps an already-validated point sequence.
    ///
    /// Callers must have run `validate_polygon_geometry` first; the only
    /// invariant enforced here is non-emptiness for the bounding box.
    pub(crate) fn from_validated(points: Vec<GeoPoint>) -> Self {
        let bounding_box = BoundingBox::of(&points).unwrap_or(BoundingBox {
            min_lat: 0.0,
            max_lat: 0.0,
            min_lng: 0.0,
            max_lng: 0.0,
        });
        Self {
            points,
            bounding_box,
        }
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    /// The vertex sequence explicitly closed (first point repeated last),
    /// the representation geometric operations work on.
    pub fn closed_ring(&self) -> Vec<GeoPoint> {
        let mut ring = self.points.clone();
        if let (Some(first), Some(last)) = (self.points.first(), self.points.last()) {
            if first != last {
                ring.push(*first);
            }
        }
        ring
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_of_square() {
        let points = vec![
            GeoPoint::new(14.0, 121.0),
            GeoPoint::new(14.0, 121.1),
            GeoPoint::new(14.1, 121.1),
            GeoPoint::new(14.1, 121.0),
        ];
        let bbox = BoundingBox::of(&points).expect("non-empty");
        assert_eq!(bbox.min_lat, 14.0);
        assert_eq!(bbox.max_lat, 14.1);
        assert_eq!(bbox.min_lng, 121.0);
        assert_eq!(bbox.max_lng, 121.1);
    }

    #[test]
    fn bounding_box_of_empty_is_none() {
        assert_eq!(BoundingBox::of(&[]), None);
    }

    #[test]
    fn disjoint_boxes_do_not_overlap() {
        let a = BoundingBox::of(&[GeoPoint::new(14.0, 121.0), GeoPoint::new(14.1, 121.1)]).unwrap();
        let east = BoundingBox::of(&[GeoPoint::new(14.0, 121.2), GeoPoint::new(14.1, 121.3)])
            .unwrap();
        let north = BoundingBox::of(&[GeoPoint::new(14.2, 121.0), GeoPoint::new(14.3, 121.1)])
            .unwrap();
        assert!(!a.overlaps(&east));
        assert!(!a.overlaps(&north));
        assert!(!east.overlaps(&a));
    }

    #[test]
    fn touching_boxes_overlap() {
        let a = BoundingBox::of(&[GeoPoint::new(14.0, 121.0), GeoPoint::new(14.1, 121.1)]).unwrap();
        let b = BoundingBox::of(&[GeoPoint::new(14.1, 121.1), GeoPoint::new(14.2, 121.2)]).unwrap();
        assert!(a.overlaps(&b));
    }

    #[test]
    fn closed_ring_repeats_first_point() {
        let set = CoordinateSet::from_validated(vec![
            GeoPoint::new(14.0, 121.0),
            GeoPoint::new(14.0, 121.1),
            GeoPoint::new(14.1, 121.05),
        ]);
        let ring = set.closed_ring();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring[0], ring[3]);
    }
}

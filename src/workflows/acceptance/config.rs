use serde::{Deserialize, Serialize};

use super::domain::{PermitCategory, RequirementKind, RequirementType};
use crate::workflows::geometry::BoundingBox;

/// Knobs consumed by the lifecycle engine and overlap checks. Always passed
/// in explicitly so the engine stays reproducible under injected values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Working days an admin has to review a submission before it
    /// auto-accepts.
    pub admin_review_deadline_days: u32,
    /// Working days an applicant has to resubmit after rejection.
    pub revision_deadline_days: u32,
    /// Overlap percentage at or above which human consent is required.
    pub overlap_threshold_percent: f64,
    /// Minimum boundary footprint in square meters.
    pub minimum_area_sqm: f64,
    /// Advisory regional bounds; points outside produce warnings only.
    pub service_area: Option<BoundingBox>,
    pub catalog: RequirementCatalog,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            admin_review_deadline_days: 10,
            revision_deadline_days: 7,
            overlap_threshold_percent: 1.0,
            minimum_area_sqm: 100.0,
            service_area: Some(BoundingBox {
                min_lat: 4.0,
                max_lat: 21.0,
                min_lng: 116.0,
                max_lng: 127.0,
            }),
            catalog: RequirementCatalog::standard(),
        }
    }
}

/// Ordered requirement types per permit category and kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementCatalog {
    entries: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CatalogEntry {
    category: PermitCategory,
    kind: RequirementKind,
    types: Vec<RequirementType>,
}

impl RequirementCatalog {
    /// The catalog the portal ships with.
    pub fn standard() -> Self {
        use PermitCategory::*;
        use RequirementKind::*;
        use RequirementType::*;

        let entries = vec![
            CatalogEntry {
                category: Building,
                kind: Acceptance,
                types: vec![
                    ProofOfOwnership,
                    TaxDeclaration,
                    SiteDevelopmentPlan,
                    LotBoundaryCoordinates,
                ],
            },
            CatalogEntry {
                category: Building,
                kind: OtherDocument,
                types: vec![
                    StructuralDesignPlans,
                    FireSafetyClearance,
                    EnvironmentalClearance,
                ],
            },
            CatalogEntry {
                category: Fencing,
                kind: Acceptance,
                types: vec![ProofOfOwnership, TaxDeclaration, LotBoundaryCoordinates],
            },
            CatalogEntry {
                category: Fencing,
                kind: OtherDocument,
                types: vec![StructuralDesignPlans],
            },
            CatalogEntry {
                category: Demolition,
                kind: Acceptance,
                types: vec![ProofOfOwnership, TaxDeclaration, LotBoundaryCoordinates],
            },
            CatalogEntry {
                category: Demolition,
                kind: OtherDocument,
                types: vec![DemolitionPlan, FireSafetyClearance],
            },
        ];

        Self { entries }
    }

    pub fn types_for(&self, category: PermitCategory, kind: RequirementKind) -> &[RequirementType] {
        self.entries
            .iter()
            .find(|entry| entry.category == category && entry.kind == kind)
            .map(|entry| entry.types.as_slice())
            .unwrap_or(&[])
    }
}

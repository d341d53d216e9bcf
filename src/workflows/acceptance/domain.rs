use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::geometry::CoordinateSet;

/// Identifier wrapper for permit applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for individual reviewable requirements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequirementId(pub String);

/// Identity of whoever recorded a review decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerId(pub String);

const SYSTEM_REVIEWER: &str = "system";

impl ReviewerId {
    /// Sentinel identity recorded on deadline auto-accepts.
    pub fn system() -> Self {
        Self(SYSTEM_REVIEWER.to_string())
    }

    pub fn is_system(&self) -> bool {
        self.0 == SYSTEM_REVIEWER
    }
}

/// The two parallel document sets an application moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    Acceptance,
    OtherDocument,
}

impl RequirementKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Acceptance => "acceptance",
            Self::OtherDocument => "other_document",
        }
    }

    pub const fn slug(self) -> &'static str {
        match self {
            Self::Acceptance => "acceptance",
            Self::OtherDocument => "other-documents",
        }
    }

    pub fn from_slug(raw: &str) -> Option<Self> {
        match raw {
            "acceptance" => Some(Self::Acceptance),
            "other-documents" => Some(Self::OtherDocument),
            _ => None,
        }
    }

    /// Phase transition this kind's completion unlocks.
    pub const fn phase_transition(self) -> (ApplicationPhase, ApplicationPhase) {
        match self {
            Self::Acceptance => (ApplicationPhase::Acceptance, ApplicationPhase::OtherDocuments),
            Self::OtherDocument => (ApplicationPhase::OtherDocuments, ApplicationPhase::Assessment),
        }
    }
}

/// Permit categories with distinct requirement catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermitCategory {
    Building,
    Fencing,
    Demolition,
}

impl PermitCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Building => "Building Permit",
            Self::Fencing => "Fencing Permit",
            Self::Demolition => "Demolition Permit",
        }
    }
}

/// Enumerated requirement types across all permit categories. Exactly one
/// type carries a structured coordinate payload instead of a file upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementType {
    ProofOfOwnership,
    TaxDeclaration,
    SiteDevelopmentPlan,
    LotBoundaryCoordinates,
    StructuralDesignPlans,
    FireSafetyClearance,
    EnvironmentalClearance,
    DemolitionPlan,
}

impl RequirementType {
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::ProofOfOwnership => "Proof of Lot Ownership",
            Self::TaxDeclaration => "Latest Tax Declaration",
            Self::SiteDevelopmentPlan => "Site Development Plan",
            Self::LotBoundaryCoordinates => "Lot Boundary Coordinates",
            Self::StructuralDesignPlans => "Structural Design Plans",
            Self::FireSafetyClearance => "Fire Safety Clearance",
            Self::EnvironmentalClearance => "Environmental Clearance",
            Self::DemolitionPlan => "Demolition Plan",
        }
    }

    pub const fn is_geometry(self) -> bool {
        matches!(self, Self::LotBoundaryCoordinates)
    }
}

/// Per-requirement lifecycle state.
///
/// `Accepted` is terminal. Rejection always routes through
/// `RevisionRequired` so the applicant can resubmit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    PendingSubmission,
    PendingReview,
    Accepted,
    RevisionRequired,
}

impl RequirementStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::PendingSubmission => "pending_submission",
            Self::PendingReview => "pending_review",
            Self::Accepted => "accepted",
            Self::RevisionRequired => "revision_required",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Application phase tag, advanced only by the aggregate controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationPhase {
    Acceptance,
    OtherDocuments,
    Assessment,
}

impl ApplicationPhase {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Acceptance => "acceptance",
            Self::OtherDocuments => "other_documents",
            Self::Assessment => "assessment",
        }
    }
}

/// Uploaded file pointer (storage is an external collaborator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    pub url: String,
    pub name: String,
}

/// What the applicant submitted for a requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "payload", rename_all = "snake_case")]
pub enum SubmissionPayload {
    File(FileReference),
    Coordinates(CoordinateSet),
}

/// Review metadata recorded on every accept/reject decision, including the
/// automatic ones made by the deadline sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub reviewer_id: ReviewerId,
    pub reviewed_at: DateTime<Utc>,
    pub remarks: String,
    pub attachment: Option<FileReference>,
    pub compliant: bool,
}

/// One reviewable item within an application's acceptance or
/// other-documents phase.
///
/// At most one of `revision_deadline` / `auto_accept_deadline` is live at a
/// time: the record is either waiting on the applicant or waiting on the
/// reviewer, never both. `version` backs the repository's optimistic
/// concurrency check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub id: RequirementId,
    pub application_id: ApplicationId,
    pub kind: RequirementKind,
    pub requirement_type: RequirementType,
    pub display_name: String,
    pub sequence: u32,
    pub status: RequirementStatus,
    pub payload: Option<SubmissionPayload>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub submitted_by: Option<String>,
    pub review: Option<ReviewRecord>,
    pub revision_deadline: Option<NaiveDate>,
    pub auto_accept_deadline: Option<NaiveDate>,
    pub version: u32,
}

impl Requirement {
    /// True when acceptance came from the deadline sweep rather than a
    /// human reviewer; audit trails render these distinctly.
    pub fn is_auto_accepted(&self) -> bool {
        self.status == RequirementStatus::Accepted
            && self
                .review
                .as_ref()
                .is_some_and(|record| record.reviewer_id.is_system())
    }

    pub fn status_view(&self) -> RequirementView {
        RequirementView {
            id: self.id.clone(),
            application_id: self.application_id.clone(),
            kind: self.kind.label(),
            display_name: self.display_name.clone(),
            sequence: self.sequence,
            status: self.status.label(),
            submitted_at: self.submitted_at,
            revision_deadline: self.revision_deadline,
            auto_accept_deadline: self.auto_accept_deadline,
            auto_accepted: self.is_auto_accepted(),
            remarks: self.review.as_ref().map(|record| record.remarks.clone()),
        }
    }
}

/// Decision recorded by an admin reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Accept,
    Reject,
}

/// Sanitized requirement representation for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct RequirementView {
    pub id: RequirementId,
    pub application_id: ApplicationId,
    pub kind: &'static str,
    pub display_name: String,
    pub sequence: u32,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision_deadline: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_accept_deadline: Option<NaiveDate>,
    pub auto_accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

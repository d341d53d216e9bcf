use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::acceptance::config::WorkflowConfig;
use crate::workflows::acceptance::domain::{
    ApplicationId, ApplicationPhase, FileReference, PermitCategory, Requirement, RequirementId,
    RequirementKind, RequirementType,
};
use crate::workflows::acceptance::memory::{
    InMemoryApplicationDirectory, InMemoryNotificationPublisher, InMemoryRequirementRepository,
};
use crate::workflows::acceptance::repository::{
    RepositoryError, RequirementRepository, StoredBoundary,
};
use crate::workflows::acceptance::service::{
    AcceptanceWorkflowService, InitializeCommand, SubmissionInput, SubmitCommand,
};
use crate::workflows::geometry::{CoordinatePayload, GeoPoint};

pub(super) type MemoryService = AcceptanceWorkflowService<
    InMemoryRequirementRepository,
    InMemoryApplicationDirectory,
    InMemoryNotificationPublisher,
>;

pub(super) fn workflow_config() -> WorkflowConfig {
    WorkflowConfig {
        admin_review_deadline_days: 10,
        revision_deadline_days: 7,
        ..WorkflowConfig::default()
    }
}

pub(super) fn build_service() -> (
    Arc<MemoryService>,
    Arc<InMemoryRequirementRepository>,
    Arc<InMemoryApplicationDirectory>,
    Arc<InMemoryNotificationPublisher>,
) {
    let repository = Arc::new(InMemoryRequirementRepository::default());
    let directory = Arc::new(InMemoryApplicationDirectory::default());
    let notices = Arc::new(InMemoryNotificationPublisher::default());
    let service = Arc::new(AcceptanceWorkflowService::new(
        repository.clone(),
        directory.clone(),
        notices.clone(),
        workflow_config(),
    ));
    (service, repository, directory, notices)
}

/// A Monday morning, so deadline arithmetic in assertions stays readable.
pub(super) fn monday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 31, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn application(id: &str) -> ApplicationId {
    ApplicationId(id.to_string())
}

pub(super) fn register_application(
    directory: &InMemoryApplicationDirectory,
    id: &ApplicationId,
    kind: RequirementKind,
) {
    let (from, _) = kind.phase_transition();
    directory.register(id.clone(), from);
}

pub(super) fn initialize_command(
    application_id: &ApplicationId,
    kind: RequirementKind,
    category: PermitCategory,
) -> InitializeCommand {
    InitializeCommand {
        application_id: application_id.clone(),
        kind,
        category,
        already_uploaded: BTreeMap::new(),
        approved_coordinates: None,
        now: monday_morning(),
    }
}

pub(super) fn file_reference(name: &str) -> FileReference {
    FileReference {
        url: format!("https://storage.permits.local/uploads/{name}"),
        name: name.to_string(),
    }
}

/// Roughly a 1.1km square near Manila, comfortably above the minimum area.
pub(super) fn boundary_payload() -> CoordinatePayload {
    shifted_boundary_payload(0.0)
}

/// Same square shifted east; a shift of 0.005 overlaps [`boundary_payload`]
/// by half, 0.02 or more is disjoint.
pub(super) fn shifted_boundary_payload(lng_offset: f64) -> CoordinatePayload {
    CoordinatePayload::Points(vec![
        GeoPoint::new(14.0, 121.0 + lng_offset),
        GeoPoint::new(14.0, 121.01 + lng_offset),
        GeoPoint::new(14.01, 121.01 + lng_offset),
        GeoPoint::new(14.01, 121.0 + lng_offset),
    ])
}

pub(super) fn find_requirement(
    requirements: &[Requirement],
    requirement_type: RequirementType,
) -> &Requirement {
    requirements
        .iter()
        .find(|requirement| requirement.requirement_type == requirement_type)
        .expect("requirement type present in set")
}

pub(super) fn submit_file(
    service: &MemoryService,
    requirement_id: &RequirementId,
    name: &str,
) -> Requirement {
    service
        .submit(SubmitCommand {
            requirement_id: requirement_id.clone(),
            submitter_id: "applicant-1".to_string(),
            input: SubmissionInput::File(file_reference(name)),
            now: monday_morning(),
        })
        .expect("file submission succeeds")
}

pub(super) fn submit_boundary(
    service: &MemoryService,
    requirement_id: &RequirementId,
) -> Requirement {
    service
        .submit(SubmitCommand {
            requirement_id: requirement_id.clone(),
            submitter_id: "applicant-1".to_string(),
            input: SubmissionInput::Coordinates(boundary_payload()),
            now: monday_morning(),
        })
        .expect("boundary submission succeeds")
}

pub(super) async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Repository wrapper whose approved-geometry listing includes one record
/// with corrupt stored geometry, for exercising the skip-and-continue path.
pub(super) struct CorruptBoundaryRepository {
    pub(super) inner: InMemoryRequirementRepository,
}

impl RequirementRepository for CorruptBoundaryRepository {
    fn insert_all(
        &self,
        requirements: Vec<Requirement>,
    ) -> Result<Vec<Requirement>, RepositoryError> {
        self.inner.insert_all(requirements)
    }

    fn fetch(&self, id: &RequirementId) -> Result<Option<Requirement>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn update(&self, requirement: Requirement) -> Result<Requirement, RepositoryError> {
        self.inner.update(requirement)
    }

    fn for_application(
        &self,
        application_id: &ApplicationId,
        kind: RequirementKind,
    ) -> Result<Vec<Requirement>, RepositoryError> {
        self.inner.for_application(application_id, kind)
    }

    fn pending_review(&self) -> Result<Vec<Requirement>, RepositoryError> {
        self.inner.pending_review()
    }

    fn approved_geometries(&self) -> Result<Vec<StoredBoundary>, RepositoryError> {
        let mut boundaries = self.inner.approved_geometries()?;
        boundaries.push(StoredBoundary {
            application_id: application("app-corrupt"),
            geometry: serde_json::json!({ "points": "not-a-ring" }),
        });
        Ok(boundaries)
    }
}

pub(super) fn phase_of(
    directory: &InMemoryApplicationDirectory,
    id: &ApplicationId,
) -> Option<ApplicationPhase> {
    use crate::workflows::acceptance::repository::ApplicationDirectory;
    directory.phase(id).expect("directory reachable")
}

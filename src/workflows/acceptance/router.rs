use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    ApplicationId, FileReference, PermitCategory, RequirementId, RequirementKind,
    RequirementType, ReviewDecision, ReviewerId,
};
use super::repository::{
    ApplicationDirectory, NotificationPublisher, RepositoryError, RequirementRepository,
};
use super::service::{
    AcceptanceWorkflowService, InitializeCommand, ReviewCommand, SubmitCommand, SubmissionInput,
    WorkflowError,
};
use crate::workflows::geometry::{validator, CoordinatePayload};

/// Router builder exposing the acceptance workflow over HTTP.
pub fn acceptance_router<R, D, N>(service: Arc<AcceptanceWorkflowService<R, D, N>>) -> Router
where
    R: RequirementRepository + 'static,
    D: ApplicationDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/applications/:application_id/requirements/:kind",
            post(initialize_handler::<R, D, N>).get(list_handler::<R, D, N>),
        )
        .route(
            "/api/v1/applications/:application_id/overlaps",
            post(overlap_check_handler::<R, D, N>),
        )
        .route(
            "/api/v1/requirements/sweep",
            post(sweep_handler::<R, D, N>),
        )
        .route(
            "/api/v1/requirements/:requirement_id",
            get(status_handler::<R, D, N>),
        )
        .route(
            "/api/v1/requirements/:requirement_id/submission",
            post(submit_handler::<R, D, N>),
        )
        .route(
            "/api/v1/requirements/:requirement_id/review",
            post(review_handler::<R, D, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct InitializeRequest {
    pub category: PermitCategory,
    #[serde(default)]
    pub already_uploaded: BTreeMap<RequirementType, FileReference>,
    #[serde(default)]
    pub approved_coordinates: Option<CoordinatePayload>,
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitRequest {
    pub submitter_id: String,
    #[serde(default)]
    pub file: Option<FileReference>,
    #[serde(default)]
    pub coordinates: Option<CoordinatePayload>,
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewRequest {
    pub reviewer_id: String,
    pub decision: ReviewDecision,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub attachment: Option<FileReference>,
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OverlapCheckRequest {
    pub coordinates: CoordinatePayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SweepRequest {
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

pub(crate) async fn initialize_handler<R, D, N>(
    State(service): State<Arc<AcceptanceWorkflowService<R, D, N>>>,
    Path((application_id, kind)): Path<(String, String)>,
    axum::Json(request): axum::Json<InitializeRequest>,
) -> Response
where
    R: RequirementRepository + 'static,
    D: ApplicationDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    let Some(kind) = RequirementKind::from_slug(&kind) else {
        return unknown_kind_response(&kind);
    };

    let approved_coordinates = match request.approved_coordinates {
        Some(payload) => {
            match validator::validated_coordinate_set(
                payload.into_points(),
                service.config().service_area.as_ref(),
            ) {
                Ok((set, _)) => Some(set),
                Err(report) => {
                    return workflow_error_response(WorkflowError::Validation(report))
                }
            }
        }
        None => None,
    };

    let command = InitializeCommand {
        application_id: ApplicationId(application_id),
        kind,
        category: request.category,
        already_uploaded: request.already_uploaded,
        approved_coordinates,
        now: request.now.unwrap_or_else(Utc::now),
    };

    match service.initialize(command) {
        Ok(requirements) => {
            let views: Vec<_> = requirements
                .iter()
                .map(|requirement| requirement.status_view())
                .collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn list_handler<R, D, N>(
    State(service): State<Arc<AcceptanceWorkflowService<R, D, N>>>,
    Path((application_id, kind)): Path<(String, String)>,
) -> Response
where
    R: RequirementRepository + 'static,
    D: ApplicationDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    let Some(kind) = RequirementKind::from_slug(&kind) else {
        return unknown_kind_response(&kind);
    };

    match service.list(&ApplicationId(application_id), kind) {
        Ok(requirements) => {
            let views: Vec<_> = requirements
                .iter()
                .map(|requirement| requirement.status_view())
                .collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn submit_handler<R, D, N>(
    State(service): State<Arc<AcceptanceWorkflowService<R, D, N>>>,
    Path(requirement_id): Path<String>,
    axum::Json(request): axum::Json<SubmitRequest>,
) -> Response
where
    R: RequirementRepository + 'static,
    D: ApplicationDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    let input = match (request.file, request.coordinates) {
        (Some(file), None) => SubmissionInput::File(file),
        (None, Some(coordinates)) => SubmissionInput::Coordinates(coordinates),
        _ => {
            let payload = json!({
                "error": "exactly one of `file` or `coordinates` must be provided",
            });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
    };

    let command = SubmitCommand {
        requirement_id: RequirementId(requirement_id),
        submitter_id: request.submitter_id,
        input,
        now: request.now.unwrap_or_else(Utc::now),
    };

    match service.submit(command) {
        Ok(requirement) => {
            (StatusCode::ACCEPTED, axum::Json(requirement.status_view())).into_response()
        }
        Err(error) => workflow_error_response(error),
    }
}

/// Review endpoint. For the geometry requirement the overlap verdict is
/// fetched here and handed to the engine, so acceptance always happens with
/// the conflict register on record; the verdict rides along in the response
/// for the admin UI.
pub(crate) async fn review_handler<R, D, N>(
    State(service): State<Arc<AcceptanceWorkflowService<R, D, N>>>,
    Path(requirement_id): Path<String>,
    axum::Json(request): axum::Json<ReviewRequest>,
) -> Response
where
    R: RequirementRepository + 'static,
    D: ApplicationDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    let requirement_id = RequirementId(requirement_id);

    let needs_verdict = match service.get(&requirement_id) {
        Ok(requirement) => {
            requirement.requirement_type.is_geometry()
                && request.decision == ReviewDecision::Accept
        }
        Err(error) => return workflow_error_response(error),
    };

    let overlap_verdict = if needs_verdict {
        match service.overlap_verdict_for_requirement(&requirement_id) {
            Ok(verdict) => Some(verdict),
            Err(error) => return workflow_error_response(error),
        }
    } else {
        None
    };

    let command = ReviewCommand {
        requirement_id,
        reviewer_id: ReviewerId(request.reviewer_id),
        decision: request.decision,
        remarks: request.remarks,
        attachment: request.attachment,
        overlap_verdict: overlap_verdict.clone(),
        now: request.now.unwrap_or_else(Utc::now),
    };

    match service.review(command) {
        Ok(requirement) => {
            let payload = json!({
                "requirement": requirement.status_view(),
                "overlap_verdict": overlap_verdict,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn status_handler<R, D, N>(
    State(service): State<Arc<AcceptanceWorkflowService<R, D, N>>>,
    Path(requirement_id): Path<String>,
) -> Response
where
    R: RequirementRepository + 'static,
    D: ApplicationDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    match service.get(&RequirementId(requirement_id)) {
        Ok(requirement) => {
            (StatusCode::OK, axum::Json(requirement.status_view())).into_response()
        }
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn overlap_check_handler<R, D, N>(
    State(service): State<Arc<AcceptanceWorkflowService<R, D, N>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<OverlapCheckRequest>,
) -> Response
where
    R: RequirementRepository + 'static,
    D: ApplicationDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    match service.overlap_verdict(&ApplicationId(application_id), request.coordinates) {
        Ok(verdict) => (StatusCode::OK, axum::Json(verdict)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn sweep_handler<R, D, N>(
    State(service): State<Arc<AcceptanceWorkflowService<R, D, N>>>,
    axum::Json(request): axum::Json<SweepRequest>,
) -> Response
where
    R: RequirementRepository + 'static,
    D: ApplicationDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    match service.auto_accept_expired(request.now.unwrap_or_else(Utc::now)) {
        Ok(transitioned) => {
            let views: Vec<_> = transitioned
                .iter()
                .map(|requirement| requirement.status_view())
                .collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => workflow_error_response(error),
    }
}

fn unknown_kind_response(raw: &str) -> Response {
    let payload = json!({
        "error": format!("unknown requirement kind '{raw}'"),
    });
    (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
}

fn workflow_error_response(error: WorkflowError) -> Response {
    let status = match &error {
        WorkflowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WorkflowError::Conflict { .. } => StatusCode::CONFLICT,
        WorkflowError::RequirementNotFound(_) => StatusCode::NOT_FOUND,
        WorkflowError::Precondition(_) => StatusCode::PRECONDITION_FAILED,
        WorkflowError::Repository(RepositoryError::StaleVersion) => StatusCode::CONFLICT,
        WorkflowError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        WorkflowError::Repository(_) | WorkflowError::Notification(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let body = match &error {
        WorkflowError::Validation(report) => json!({
            "error": error.to_string(),
            "details": report,
        }),
        _ => json!({ "error": error.to_string() }),
    };

    (status, axum::Json(body)).into_response()
}

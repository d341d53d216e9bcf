use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::aggregate::PhaseController;
use super::calendar::add_working_days;
use super::config::WorkflowConfig;
use super::domain::{
    ApplicationId, FileReference, PermitCategory, Requirement, RequirementId, RequirementKind,
    RequirementStatus, RequirementType, ReviewDecision, ReviewRecord, ReviewerId,
    SubmissionPayload,
};
use super::repository::{
    ApplicationDirectory, NotificationError, NotificationPublisher, RepositoryError,
    RequirementNotice, RequirementRepository,
};
use crate::workflows::geometry::{
    detect_overlaps, is_significant_overlap, validate_minimum_area, validator,
    ApprovedBoundary, CoordinateIssue, CoordinatePayload, CoordinateSet, OverlapResult,
    ValidationReport,
};

/// Service composing the lifecycle engine, the overlap detector, and the
/// aggregate phase controller over injected collaborators.
pub struct AcceptanceWorkflowService<R, D, N> {
    repository: Arc<R>,
    phases: PhaseController<R, D>,
    notifications: Arc<N>,
    config: WorkflowConfig,
}

static REQUIREMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_requirement_id() -> RequirementId {
    let id = REQUIREMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RequirementId(format!("req-{id:06}"))
}

/// Creates-or-returns the requirement set for one phase of an application.
#[derive(Debug, Clone)]
pub struct InitializeCommand {
    pub application_id: ApplicationId,
    pub kind: RequirementKind,
    pub category: PermitCategory,
    /// Documents already uploaded during an earlier wizard step; their
    /// requirements start directly in review.
    pub already_uploaded: BTreeMap<RequirementType, FileReference>,
    /// Boundary already approved earlier in the flow; the geometry
    /// requirement starts accepted when present.
    pub approved_coordinates: Option<CoordinateSet>,
    pub now: DateTime<Utc>,
}

/// Applicant-supplied payload for a submission.
#[derive(Debug, Clone)]
pub enum SubmissionInput {
    File(FileReference),
    Coordinates(CoordinatePayload),
}

#[derive(Debug, Clone)]
pub struct SubmitCommand {
    pub requirement_id: RequirementId,
    pub submitter_id: String,
    pub input: SubmissionInput,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ReviewCommand {
    pub requirement_id: RequirementId,
    pub reviewer_id: ReviewerId,
    pub decision: ReviewDecision,
    pub remarks: Option<String>,
    pub attachment: Option<FileReference>,
    /// Required when accepting the geometry requirement: proof the caller
    /// fetched and surfaced the overlap verdict before deciding.
    pub overlap_verdict: Option<OverlapVerdict>,
    pub now: DateTime<Utc>,
}

/// The overlap detector's findings for one candidate boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlapVerdict {
    pub results: Vec<OverlapResult>,
    /// True when any overlap percentage reaches the configured threshold.
    pub significant: bool,
}

/// Caller contract violations surfaced before any state mutation.
#[derive(Debug, thiserror::Error)]
pub enum PreconditionError {
    #[error("rejection requires non-empty remarks")]
    RemarksRequired,
    #[error("accepting a boundary requirement requires the overlap verdict")]
    OverlapVerdictRequired,
    #[error("requirement expects a {expected} payload")]
    PayloadMismatch { expected: &'static str },
}

/// Error raised by the acceptance workflow service. Every operation either
/// returns the fully applied new state or fails with one of these, leaving
/// prior state untouched.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("coordinate validation failed: {}", .0.summary())]
    Validation(ValidationReport),
    #[error("requirement {} cannot {attempted} while {}", id.0, current.label())]
    Conflict {
        id: RequirementId,
        attempted: &'static str,
        current: RequirementStatus,
    },
    #[error("requirement {} not found", .0 .0)]
    RequirementNotFound(RequirementId),
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
}

impl<R, D, N> AcceptanceWorkflowService<R, D, N>
where
    R: RequirementRepository + 'static,
    D: ApplicationDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(
        repository: Arc<R>,
        directory: Arc<D>,
        notifications: Arc<N>,
        config: WorkflowConfig,
    ) -> Self {
        let phases = PhaseController::new(repository.clone(), directory);
        Self {
            repository,
            phases,
            notifications,
            config,
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Idempotent bulk creation of one phase's requirement set. When any
    /// requirement of the kind already exists the existing set is returned
    /// unchanged instead of creating duplicates.
    pub fn initialize(
        &self,
        command: InitializeCommand,
    ) -> Result<Vec<Requirement>, WorkflowError> {
        let existing = self
            .repository
            .for_application(&command.application_id, command.kind)?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        let today = command.now.date_naive();
        let types = self
            .config
            .catalog
            .types_for(command.category, command.kind);

        let mut requirements = Vec::with_capacity(types.len());
        for (sequence, requirement_type) in types.iter().enumerate() {
            let mut requirement = Requirement {
                id: next_requirement_id(),
                application_id: command.application_id.clone(),
                kind: command.kind,
                requirement_type: *requirement_type,
                display_name: requirement_type.display_name().to_string(),
                sequence: sequence as u32,
                status: RequirementStatus::PendingSubmission,
                payload: None,
                submitted_at: None,
                submitted_by: None,
                review: None,
                revision_deadline: None,
                auto_accept_deadline: None,
                version: 0,
            };

            if let (true, Some(coordinates)) = (
                requirement_type.is_geometry(),
                command.approved_coordinates.as_ref(),
            ) {
                requirement.status = RequirementStatus::Accepted;
                requirement.payload = Some(SubmissionPayload::Coordinates(coordinates.clone()));
                requirement.submitted_at = Some(command.now);
                requirement.review = Some(ReviewRecord {
                    reviewer_id: ReviewerId::system(),
                    reviewed_at: command.now,
                    remarks: "boundary approved during application intake".to_string(),
                    attachment: None,
                    compliant: true,
                });
            } else if let Some(file) = command.already_uploaded.get(requirement_type) {
                requirement.status = RequirementStatus::PendingReview;
                requirement.payload = Some(SubmissionPayload::File(file.clone()));
                requirement.submitted_at = Some(command.now);
                requirement.auto_accept_deadline = Some(add_working_days(
                    today,
                    self.config.admin_review_deadline_days,
                ));
            }

            requirements.push(requirement);
        }

        let stored = self.repository.insert_all(requirements)?;
        info!(
            application = %command.application_id.0,
            kind = command.kind.label(),
            count = stored.len(),
            "requirement set initialized"
        );
        Ok(stored)
    }

    /// Records a submission, moving the requirement into review with a
    /// fresh auto-accept deadline. Legal only from `PendingSubmission` or
    /// `RevisionRequired`.
    pub fn submit(&self, command: SubmitCommand) -> Result<Requirement, WorkflowError> {
        let mut requirement = self.fetch(&command.requirement_id)?;
        match requirement.status {
            RequirementStatus::PendingSubmission | RequirementStatus::RevisionRequired => {}
            current => {
                return Err(WorkflowError::Conflict {
                    id: requirement.id,
                    attempted: "submit",
                    current,
                })
            }
        }

        let payload = self.build_payload(&requirement, command.input)?;

        requirement.payload = Some(payload);
        requirement.status = RequirementStatus::PendingReview;
        requirement.submitted_at = Some(command.now);
        requirement.submitted_by = Some(command.submitter_id);
        requirement.review = None;
        requirement.revision_deadline = None;
        requirement.auto_accept_deadline = Some(add_working_days(
            command.now.date_naive(),
            self.config.admin_review_deadline_days,
        ));

        let updated = self.repository.update(requirement)?;
        self.notify("requirement_submitted", &updated, BTreeMap::new())?;
        Ok(updated)
    }

    fn build_payload(
        &self,
        requirement: &Requirement,
        input: SubmissionInput,
    ) -> Result<SubmissionPayload, WorkflowError> {
        if requirement.requirement_type.is_geometry() {
            let SubmissionInput::Coordinates(payload) = input else {
                return Err(PreconditionError::PayloadMismatch {
                    expected: "coordinate",
                }
                .into());
            };

            let points = payload.into_points();
            let (set, warnings) = validator::validated_coordinate_set(
                points,
                self.config.service_area.as_ref(),
            )
            .map_err(WorkflowError::Validation)?;
            for warning in &warnings {
                warn!(requirement = %requirement.id.0, %warning, "advisory boundary warning");
            }

            let check = validate_minimum_area(set.points(), self.config.minimum_area_sqm);
            if !check.is_valid {
                return Err(WorkflowError::Validation(ValidationReport {
                    errors: vec![CoordinateIssue::BelowMinimumArea {
                        area_sqm: check.area_sqm,
                        minimum_sqm: self.config.minimum_area_sqm,
                    }],
                    warnings: warnings.clone(),
                }));
            }

            Ok(SubmissionPayload::Coordinates(set))
        } else {
            let SubmissionInput::File(file) = input else {
                return Err(PreconditionError::PayloadMismatch { expected: "file" }.into());
            };
            Ok(SubmissionPayload::File(file))
        }
    }

    /// Compares a candidate boundary against every approved boundary other
    /// than the application's own. Stored records whose geometry fails to
    /// parse are logged and skipped rather than aborting the scan.
    pub fn overlap_verdict(
        &self,
        application_id: &ApplicationId,
        payload: CoordinatePayload,
    ) -> Result<OverlapVerdict, WorkflowError> {
        let (set, _) = validator::validated_coordinate_set(
            payload.into_points(),
            self.config.service_area.as_ref(),
        )
        .map_err(WorkflowError::Validation)?;
        self.verdict_for(application_id, &set)
    }

    /// Verdict for a requirement's already-stored boundary payload, used by
    /// the review surface so an admin sees conflicts before deciding.
    pub fn overlap_verdict_for_requirement(
        &self,
        requirement_id: &RequirementId,
    ) -> Result<OverlapVerdict, WorkflowError> {
        let requirement = self.fetch(requirement_id)?;
        let Some(SubmissionPayload::Coordinates(set)) = &requirement.payload else {
            return Err(PreconditionError::PayloadMismatch {
                expected: "coordinate",
            }
            .into());
        };
        self.verdict_for(&requirement.application_id, set)
    }

    fn verdict_for(
        &self,
        application_id: &ApplicationId,
        candidate: &CoordinateSet,
    ) -> Result<OverlapVerdict, WorkflowError> {
        let mut existing = Vec::new();
        for stored in self.repository.approved_geometries()? {
            match serde_json::from_value::<CoordinateSet>(stored.geometry) {
                Ok(coordinates) => existing.push(ApprovedBoundary {
                    application_id: stored.application_id,
                    coordinates,
                }),
                Err(err) => warn!(
                    application = %stored.application_id.0,
                    %err,
                    "skipping stored boundary with unparseable geometry"
                ),
            }
        }

        let results = detect_overlaps(candidate, &existing, Some(application_id));
        let significant = results.iter().any(|result| {
            is_significant_overlap(result.overlap_percent, self.config.overlap_threshold_percent)
        });
        Ok(OverlapVerdict {
            results,
            significant,
        })
    }

    /// Records an admin decision. Legal only from `PendingReview`.
    ///
    /// Rejection requires remarks; accepting the geometry requirement
    /// requires the overlap verdict to have been fetched and attached. A
    /// significant verdict does not block acceptance, it stays on record.
    pub fn review(&self, command: ReviewCommand) -> Result<Requirement, WorkflowError> {
        let mut requirement = self.fetch(&command.requirement_id)?;
        if requirement.status != RequirementStatus::PendingReview {
            return Err(WorkflowError::Conflict {
                id: requirement.id,
                attempted: "review",
                current: requirement.status,
            });
        }

        match command.decision {
            ReviewDecision::Accept => {
                if requirement.requirement_type.is_geometry() && command.overlap_verdict.is_none()
                {
                    return Err(PreconditionError::OverlapVerdictRequired.into());
                }

                requirement.status = RequirementStatus::Accepted;
                requirement.review = Some(ReviewRecord {
                    reviewer_id: command.reviewer_id,
                    reviewed_at: command.now,
                    remarks: command.remarks.unwrap_or_default(),
                    attachment: command.attachment,
                    compliant: true,
                });
                requirement.auto_accept_deadline = None;

                let updated = self.repository.update(requirement)?;
                let mut details = BTreeMap::new();
                if let Some(verdict) = &command.overlap_verdict {
                    details.insert(
                        "significant_overlaps".to_string(),
                        verdict
                            .results
                            .iter()
                            .filter(|result| {
                                is_significant_overlap(
                                    result.overlap_percent,
                                    self.config.overlap_threshold_percent,
                                )
                            })
                            .count()
                            .to_string(),
                    );
                }
                self.notify("requirement_accepted", &updated, details)?;

                if let Some(phase) = self
                    .phases
                    .on_requirement_accepted(&updated.application_id, updated.kind)?
                {
                    self.notify_phase(&updated.application_id, phase)?;
                }
                Ok(updated)
            }
            ReviewDecision::Reject => {
                let remarks = command
                    .remarks
                    .filter(|remarks| !remarks.trim().is_empty())
                    .ok_or(PreconditionError::RemarksRequired)?;

                requirement.status = RequirementStatus::RevisionRequired;
                requirement.review = Some(ReviewRecord {
                    reviewer_id: command.reviewer_id,
                    reviewed_at: command.now,
                    remarks,
                    attachment: command.attachment,
                    compliant: false,
                });
                requirement.auto_accept_deadline = None;
                requirement.revision_deadline = Some(add_working_days(
                    command.now.date_naive(),
                    self.config.revision_deadline_days,
                ));

                let updated = self.repository.update(requirement)?;
                self.notify("requirement_revision_required", &updated, BTreeMap::new())?;
                Ok(updated)
            }
        }
    }

    /// Deadline sweep: auto-accepts every `PendingReview` requirement whose
    /// deadline has elapsed. Idempotent and safe to re-run; records that
    /// fail individually (including ones a human reviewer decided
    /// concurrently) are logged and skipped so the rest of the sweep
    /// proceeds.
    pub fn auto_accept_expired(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Requirement>, WorkflowError> {
        let today = now.date_naive();
        let mut transitioned = Vec::new();

        for mut requirement in self.repository.pending_review()? {
            let Some(deadline) = requirement.auto_accept_deadline else {
                continue;
            };
            if deadline > today {
                continue;
            }

            requirement.status = RequirementStatus::Accepted;
            requirement.review = Some(ReviewRecord {
                reviewer_id: ReviewerId::system(),
                reviewed_at: now,
                remarks: format!(
                    "automatically accepted: review deadline {deadline} elapsed without a decision"
                ),
                attachment: None,
                compliant: true,
            });
            requirement.auto_accept_deadline = None;

            let id = requirement.id.clone();
            match self.repository.update(requirement) {
                Ok(updated) => {
                    info!(requirement = %updated.id.0, "auto-accepted after review deadline");
                    if let Err(err) =
                        self.notify("requirement_auto_accepted", &updated, BTreeMap::new())
                    {
                        warn!(requirement = %updated.id.0, %err, "auto-accept notice failed");
                    }
                    match self
                        .phases
                        .on_requirement_accepted(&updated.application_id, updated.kind)
                    {
                        Ok(Some(phase)) => {
                            if let Err(err) = self.notify_phase(&updated.application_id, phase) {
                                warn!(
                                    application = %updated.application_id.0,
                                    %err,
                                    "phase advance notice failed"
                                );
                            }
                        }
                        Ok(None) => {}
                        Err(err) => warn!(
                            application = %updated.application_id.0,
                            %err,
                            "phase check failed during sweep"
                        ),
                    }
                    transitioned.push(updated);
                }
                Err(RepositoryError::StaleVersion) => {
                    warn!(requirement = %id.0, "skipping requirement decided concurrently");
                }
                Err(err) => {
                    warn!(requirement = %id.0, %err, "sweep skipped requirement");
                }
            }
        }

        Ok(transitioned)
    }

    pub fn get(&self, requirement_id: &RequirementId) -> Result<Requirement, WorkflowError> {
        self.fetch(requirement_id)
    }

    pub fn list(
        &self,
        application_id: &ApplicationId,
        kind: RequirementKind,
    ) -> Result<Vec<Requirement>, WorkflowError> {
        Ok(self.repository.for_application(application_id, kind)?)
    }

    /// Pure aggregate query exposed for the caller's transaction boundary.
    pub fn all_accepted(
        &self,
        application_id: &ApplicationId,
        kind: RequirementKind,
    ) -> Result<bool, WorkflowError> {
        Ok(self.phases.all_accepted(application_id, kind)?)
    }

    fn fetch(&self, requirement_id: &RequirementId) -> Result<Requirement, WorkflowError> {
        self.repository
            .fetch(requirement_id)?
            .ok_or_else(|| WorkflowError::RequirementNotFound(requirement_id.clone()))
    }

    fn notify(
        &self,
        template: &str,
        requirement: &Requirement,
        mut details: BTreeMap<String, String>,
    ) -> Result<(), WorkflowError> {
        details.insert("status".to_string(), requirement.status.label().to_string());
        details.insert(
            "display_name".to_string(),
            requirement.display_name.clone(),
        );
        self.notifications.publish(RequirementNotice {
            template: template.to_string(),
            application_id: requirement.application_id.clone(),
            requirement_id: Some(requirement.id.clone()),
            details,
        })?;
        Ok(())
    }

    fn notify_phase(
        &self,
        application_id: &ApplicationId,
        phase: super::domain::ApplicationPhase,
    ) -> Result<(), WorkflowError> {
        let mut details = BTreeMap::new();
        details.insert("phase".to_string(), phase.label().to_string());
        self.notifications.publish(RequirementNotice {
            template: "phase_advanced".to_string(),
            application_id: application_id.clone(),
            requirement_id: None,
            details,
        })?;
        Ok(())
    }
}

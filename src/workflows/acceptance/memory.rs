//! In-memory collaborator implementations used by the server wiring, the
//! demo CLI, and tests. A relational store fills these roles in production.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::domain::{
    ApplicationId, ApplicationPhase, Requirement, RequirementId, RequirementKind,
    RequirementStatus, SubmissionPayload,
};
use super::repository::{
    ApplicationDirectory, NotificationError, NotificationPublisher, RepositoryError,
    RequirementNotice, RequirementRepository, StoredBoundary,
};

#[derive(Default, Clone)]
pub struct InMemoryRequirementRepository {
    records: Arc<Mutex<HashMap<RequirementId, Requirement>>>,
}

impl RequirementRepository for InMemoryRequirementRepository {
    fn insert_all(
        &self,
        requirements: Vec<Requirement>,
    ) -> Result<Vec<Requirement>, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        for requirement in &requirements {
            if guard.contains_key(&requirement.id) {
                return Err(RepositoryError::Unavailable(format!(
                    "requirement {} already present",
                    requirement.id.0
                )));
            }
        }
        for requirement in &requirements {
            guard.insert(requirement.id.clone(), requirement.clone());
        }
        Ok(requirements)
    }

    fn fetch(&self, id: &RequirementId) -> Result<Option<Requirement>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(&self, mut requirement: Requirement) -> Result<Requirement, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let stored = guard
            .get(&requirement.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != requirement.version {
            return Err(RepositoryError::StaleVersion);
        }
        requirement.version += 1;
        guard.insert(requirement.id.clone(), requirement.clone());
        Ok(requirement)
    }

    fn for_application(
        &self,
        application_id: &ApplicationId,
        kind: RequirementKind,
    ) -> Result<Vec<Requirement>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut records: Vec<Requirement> = guard
            .values()
            .filter(|record| record.application_id == *application_id && record.kind == kind)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.sequence);
        Ok(records)
    }

    fn pending_review(&self) -> Result<Vec<Requirement>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.status == RequirementStatus::PendingReview)
            .cloned()
            .collect())
    }

    fn approved_geometries(&self) -> Result<Vec<StoredBoundary>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut boundaries = Vec::new();
        for record in guard.values() {
            if record.status != RequirementStatus::Accepted
                || !record.requirement_type.is_geometry()
            {
                continue;
            }
            if let Some(SubmissionPayload::Coordinates(set)) = &record.payload {
                let geometry = serde_json::to_value(set)
                    .map_err(|err| RepositoryError::Unavailable(err.to_string()))?;
                boundaries.push(StoredBoundary {
                    application_id: record.application_id.clone(),
                    geometry,
                });
            }
        }
        Ok(boundaries)
    }
}

impl InMemoryRequirementRepository {
    /// Test/demo hook for seeding records directly, bypassing the engine.
    pub fn seed(&self, requirement: Requirement) {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(requirement.id.clone(), requirement);
    }
}

#[derive(Default, Clone)]
pub struct InMemoryApplicationDirectory {
    phases: Arc<Mutex<HashMap<ApplicationId, ApplicationPhase>>>,
}

impl InMemoryApplicationDirectory {
    pub fn register(&self, id: ApplicationId, phase: ApplicationPhase) {
        let mut guard = self.phases.lock().expect("directory mutex poisoned");
        guard.insert(id, phase);
    }
}

impl ApplicationDirectory for InMemoryApplicationDirectory {
    fn phase(&self, id: &ApplicationId) -> Result<Option<ApplicationPhase>, RepositoryError> {
        let guard = self.phases.lock().expect("directory mutex poisoned");
        Ok(guard.get(id).copied())
    }

    fn advance_phase(
        &self,
        id: &ApplicationId,
        from: ApplicationPhase,
        to: ApplicationPhase,
    ) -> Result<bool, RepositoryError> {
        let mut guard = self.phases.lock().expect("directory mutex poisoned");
        let current = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if *current != from {
            return Ok(false);
        }
        *current = to;
        Ok(true)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryNotificationPublisher {
    events: Arc<Mutex<Vec<RequirementNotice>>>,
}

impl InMemoryNotificationPublisher {
    pub fn events(&self) -> Vec<RequirementNotice> {
        self.events.lock().expect("notice mutex poisoned").clone()
    }
}

impl NotificationPublisher for InMemoryNotificationPublisher {
    fn publish(&self, notice: RequirementNotice) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notice mutex poisoned")
            .push(notice);
        Ok(())
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{
    ApplicationId, ApplicationPhase, Requirement, RequirementId, RequirementKind,
};

/// Storage abstraction for requirement records.
///
/// `update` must apply only when the stored version matches the record's
/// `version` field, bumping it on success; that optimistic check is how
/// concurrent mutations of the same requirement are serialized.
pub trait RequirementRepository: Send + Sync {
    fn insert_all(&self, requirements: Vec<Requirement>)
        -> Result<Vec<Requirement>, RepositoryError>;
    fn fetch(&self, id: &RequirementId) -> Result<Option<Requirement>, RepositoryError>;
    fn update(&self, requirement: Requirement) -> Result<Requirement, RepositoryError>;
    fn for_application(
        &self,
        application_id: &ApplicationId,
        kind: RequirementKind,
    ) -> Result<Vec<Requirement>, RepositoryError>;
    /// Every requirement currently awaiting review, for the deadline sweep.
    fn pending_review(&self) -> Result<Vec<Requirement>, RepositoryError>;
    /// Raw geometry payloads of accepted boundary requirements. Returned
    /// unparsed; records with corrupt payloads become non-candidates at the
    /// call site instead of aborting the scan.
    fn approved_geometries(&self) -> Result<Vec<StoredBoundary>, RepositoryError>;
}

/// An accepted boundary as it sits in storage, geometry still serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBoundary {
    pub application_id: ApplicationId,
    pub geometry: serde_json::Value,
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("requirement was modified concurrently")]
    StaleVersion,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Phase store for the application aggregate, owned elsewhere; the engine
/// only reads the phase tag and advances it through a compare-and-swap.
pub trait ApplicationDirectory: Send + Sync {
    fn phase(&self, id: &ApplicationId) -> Result<Option<ApplicationPhase>, RepositoryError>;
    /// Advances `from -> to` atomically. Returns `false` without mutating
    /// when the application is no longer in `from`.
    fn advance_phase(
        &self,
        id: &ApplicationId,
        from: ApplicationPhase,
        to: ApplicationPhase,
    ) -> Result<bool, RepositoryError>;
}

/// Outbound notification hook (e-mail/SMS adapters live behind it).
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notice: RequirementNotice) -> Result<(), NotificationError>;
}

/// Notification payload so routes and tests can assert integration
/// boundaries without a real transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementNotice {
    pub template: String,
    pub application_id: ApplicationId,
    pub requirement_id: Option<RequirementId>,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

//! Document acceptance workflow: per-requirement lifecycle state machine,
//! working-day deadline arithmetic, the deadline auto-accept sweep, and the
//! aggregate phase controller that unlocks the next document set.

pub mod aggregate;
pub mod calendar;
pub mod config;
pub mod domain;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use aggregate::PhaseController;
pub use config::{RequirementCatalog, WorkflowConfig};
pub use domain::{
    ApplicationId, ApplicationPhase, FileReference, PermitCategory, Requirement, RequirementId,
    RequirementKind, RequirementStatus, RequirementType, RequirementView, ReviewDecision,
    ReviewRecord, ReviewerId, SubmissionPayload,
};
pub use memory::{
    InMemoryApplicationDirectory, InMemoryNotificationPublisher, InMemoryRequirementRepository,
};
pub use repository::{
    ApplicationDirectory, NotificationError, NotificationPublisher, RepositoryError,
    RequirementNotice, RequirementRepository, StoredBoundary,
};
pub use router::acceptance_router;
pub use service::{
    AcceptanceWorkflowService, InitializeCommand, OverlapVerdict, PreconditionError,
    ReviewCommand, SubmissionInput, SubmitCommand, WorkflowError,
};

//! Cross-requirement consistency for the application aggregate.
//!
//! No requirement knows about its siblings; this controller is the single
//! place the "all accepted" condition is evaluated, after every individual
//! acceptance, and the only code path that advances the application's phase
//! tag.

use std::sync::Arc;

use tracing::info;

use super::domain::{ApplicationId, ApplicationPhase, RequirementKind, RequirementStatus};
use super::repository::{ApplicationDirectory, RepositoryError, RequirementRepository};

pub struct PhaseController<R, D> {
    repository: Arc<R>,
    directory: Arc<D>,
}

impl<R, D> PhaseController<R, D>
where
    R: RequirementRepository,
    D: ApplicationDirectory,
{
    pub fn new(repository: Arc<R>, directory: Arc<D>) -> Self {
        Self {
            repository,
            directory,
        }
    }

    /// Pure query: are all requirements of `kind` accepted? False for an
    /// uninitialized (empty) set.
    pub fn all_accepted(
        &self,
        application_id: &ApplicationId,
        kind: RequirementKind,
    ) -> Result<bool, RepositoryError> {
        let requirements = self.repository.for_application(application_id, kind)?;
        Ok(!requirements.is_empty()
            && requirements
                .iter()
                .all(|record| record.status == RequirementStatus::Accepted))
    }

    /// Re-evaluates the completion condition after an acceptance and
    /// advances the phase at most once. The compare-and-swap in the
    /// directory makes a re-check of an already-advanced application a
    /// no-op, so concurrent sibling completions cannot double-advance.
    pub fn on_requirement_accepted(
        &self,
        application_id: &ApplicationId,
        kind: RequirementKind,
    ) -> Result<Option<ApplicationPhase>, RepositoryError> {
        if !self.all_accepted(application_id, kind)? {
            return Ok(None);
        }

        let (from, to) = kind.phase_transition();
        if self.directory.advance_phase(application_id, from, to)? {
            info!(
                application = %application_id.0,
                phase = to.label(),
                "application phase advanced"
            );
            Ok(Some(to))
        } else {
            Ok(None)
        }
    }
}

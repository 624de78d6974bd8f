use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::accounts::validation::{require, ValidationError};
use crate::accounts::{Actor, DirectoryError, Role, UserId, UserRepository};
use crate::notify::{NotificationSink, Notice};

use super::domain::{
    PlacementEdit, PlacementId, PlacementRecord, PlacementStatus, PlacementSubmission, StatusTally,
};
use super::notices::{created_notice, transition_notices, Recipients};
use super::repository::{PlacementRepository, RepositoryError};
use super::transition::{transition, PlacementAction, TransitionError};

/// Service composing the placement repository, user directory, and
/// notification sink. Every status mutation goes through the transition
/// function and the repository's conditional apply.
pub struct PlacementService<R, D, N> {
    repository: Arc<R>,
    directory: Arc<D>,
    notifier: Arc<N>,
}

static PLACEMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_placement_id() -> PlacementId {
    let id = PLACEMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    PlacementId(format!("plc-{id:06}"))
}

/// Error raised by the placement service.
#[derive(Debug, thiserror::Error)]
pub enum PlacementServiceError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error("you don't have permission to view this placement")]
    NotVisible,
    #[error("unknown or inactive provider account")]
    UnknownProvider,
    #[error("account not found or inactive")]
    UnknownActor,
}

impl<R, D, N> PlacementService<R, D, N>
where
    R: PlacementRepository + 'static,
    D: UserRepository + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(repository: Arc<R>, directory: Arc<D>, notifier: Arc<N>) -> Self {
        Self {
            repository,
            directory,
            notifier,
        }
    }

    /// Resolve a raw user id into an acting identity. Inactive accounts
    /// cannot act.
    pub fn actor(&self, user_id: &UserId) -> Result<Actor, PlacementServiceError> {
        let record = self
            .directory
            .fetch(user_id)?
            .ok_or(PlacementServiceError::UnknownActor)?;
        if !record.user.is_active {
            return Err(PlacementServiceError::UnknownActor);
        }
        Ok(record.actor())
    }

    /// Create a new placement request on behalf of a student.
    pub fn submit(
        &self,
        actor: &Actor,
        submission: PlacementSubmission,
    ) -> Result<PlacementRecord, PlacementServiceError> {
        if actor.role != Role::Student {
            return Err(TransitionError::WrongRole { role: actor.role }.into());
        }
        require("company_name", &submission.company_name)?;
        require("job_title", &submission.job_title)?;
        require("location", &submission.location)?;
        if submission.end_date <= submission.start_date {
            return Err(ValidationError::InvalidDateRange.into());
        }

        let provider = self
            .directory
            .fetch(&submission.provider)?
            .filter(|record| record.user.role == Role::Provider && record.user.is_active)
            .ok_or(PlacementServiceError::UnknownProvider)?;

        let now = Utc::now();
        let record = PlacementRecord {
            id: next_placement_id(),
            student: actor.user_id.clone(),
            provider: provider.user.id.clone(),
            tutor: None,
            company_name: submission.company_name,
            job_title: submission.job_title,
            job_description: submission.job_description,
            start_date: submission.start_date,
            end_date: submission.end_date,
            location: submission.location,
            geo: submission.geo,
            document: submission.document,
            status: PlacementStatus::Pending,
            provider_approved_at: None,
            tutor_approved_at: None,
            approved_by_tutor: None,
            provider_comments: String::new(),
            tutor_comments: String::new(),
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.insert(record)?;
        info!(placement = %stored.id.0, student = %stored.student.0, "placement request created");

        if let Some(recipients) = self.recipients_for(&stored) {
            self.deliver(created_notice(&stored, &recipients));
        }
        Ok(stored)
    }

    /// Approve the request. Providers approve pending requests they own;
    /// tutors approve provider-approved requests.
    pub fn approve(
        &self,
        actor: &Actor,
        id: &PlacementId,
        comments: String,
    ) -> Result<PlacementRecord, PlacementServiceError> {
        let action = match actor.role {
            Role::Provider => PlacementAction::ProviderApprove { comments },
            Role::Tutor => PlacementAction::TutorApprove { comments },
            Role::Student => return Err(TransitionError::WrongRole { role: actor.role }.into()),
        };
        self.run_transition(actor, id, action)
    }

    /// Reject the request, symmetric to [`Self::approve`].
    pub fn reject(
        &self,
        actor: &Actor,
        id: &PlacementId,
        comments: String,
    ) -> Result<PlacementRecord, PlacementServiceError> {
        let action = match actor.role {
            Role::Provider => PlacementAction::ProviderReject { comments },
            Role::Tutor => PlacementAction::TutorReject { comments },
            Role::Student => return Err(TransitionError::WrongRole { role: actor.role }.into()),
        };
        self.run_transition(actor, id, action)
    }

    /// Mark a tutor-approved placement as completed. Any actor who can
    /// view the record may do this.
    pub fn complete(
        &self,
        actor: &Actor,
        id: &PlacementId,
    ) -> Result<PlacementRecord, PlacementServiceError> {
        let record = self.fetch(id)?;
        if !visible_to(&record, actor) {
            return Err(PlacementServiceError::NotVisible);
        }
        self.apply(actor, &record, PlacementAction::MarkCompleted)
    }

    /// Edit the descriptive fields of a still-pending request. Only the
    /// owning student may edit.
    pub fn edit(
        &self,
        actor: &Actor,
        id: &PlacementId,
        edit: PlacementEdit,
    ) -> Result<PlacementRecord, PlacementServiceError> {
        if actor.role != Role::Student {
            return Err(TransitionError::WrongRole { role: actor.role }.into());
        }
        let record = self.fetch(id)?;
        if record.student != actor.user_id {
            return Err(PlacementServiceError::NotVisible);
        }
        if record.status != PlacementStatus::Pending {
            return Err(TransitionError::InvalidState {
                expected: PlacementStatus::Pending,
                found: record.status,
            }
            .into());
        }

        let start = edit.start_date.unwrap_or(record.start_date);
        let end = edit.end_date.unwrap_or(record.end_date);
        if end <= start {
            return Err(ValidationError::InvalidDateRange.into());
        }

        match self.repository.apply_edit(id, edit, Utc::now()) {
            Ok(updated) => Ok(updated),
            Err(RepositoryError::StatusConflict { found }) => Err(TransitionError::InvalidState {
                expected: PlacementStatus::Pending,
                found,
            }
            .into()),
            Err(other) => Err(other.into()),
        }
    }

    /// Fetch a single request, enforcing role visibility: the owning
    /// student, the owning provider, or any tutor.
    pub fn get(
        &self,
        actor: &Actor,
        id: &PlacementId,
    ) -> Result<PlacementRecord, PlacementServiceError> {
        let record = self.fetch(id)?;
        if !visible_to(&record, actor) {
            return Err(PlacementServiceError::NotVisible);
        }
        Ok(record)
    }

    /// The actor's visible requests, optionally filtered by status,
    /// newest first.
    pub fn list(
        &self,
        actor: &Actor,
        status: Option<PlacementStatus>,
    ) -> Result<Vec<PlacementRecord>, PlacementServiceError> {
        let mut records = self.visible(actor)?;
        if let Some(status) = status {
            records.retain(|record| record.status == status);
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Counts by status over the actor's visible subset.
    pub fn statistics(&self, actor: &Actor) -> Result<StatusTally, PlacementServiceError> {
        Ok(StatusTally::count(&self.visible(actor)?))
    }

    fn visible(&self, actor: &Actor) -> Result<Vec<PlacementRecord>, PlacementServiceError> {
        let records = match actor.role {
            Role::Student => self.repository.for_student(&actor.user_id)?,
            Role::Provider => self.repository.for_provider(&actor.user_id)?,
            Role::Tutor => self.repository.all()?,
        };
        Ok(records)
    }

    fn fetch(&self, id: &PlacementId) -> Result<PlacementRecord, PlacementServiceError> {
        Ok(self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?)
    }

    fn run_transition(
        &self,
        actor: &Actor,
        id: &PlacementId,
        action: PlacementAction,
    ) -> Result<PlacementRecord, PlacementServiceError> {
        let record = self.fetch(id)?;
        self.apply(actor, &record, action)
    }

    fn apply(
        &self,
        actor: &Actor,
        record: &PlacementRecord,
        action: PlacementAction,
    ) -> Result<PlacementRecord, PlacementServiceError> {
        let now = Utc::now();
        let patch = transition(record, &action, actor, now)?;
        let expected = patch.from;
        let updated = match self.repository.apply_transition(&record.id, patch, now) {
            Ok(updated) => updated,
            // A concurrent reviewer won the race; report it exactly like
            // a stale-state attempt.
            Err(RepositoryError::StatusConflict { found }) => {
                return Err(TransitionError::InvalidState { expected, found }.into());
            }
            Err(other) => return Err(other.into()),
        };

        info!(
            placement = %updated.id.0,
            actor = %actor.user_id.0,
            status = updated.status.label(),
            "placement status changed"
        );

        if let Some(recipients) = self.recipients_for(&updated) {
            for notice in transition_notices(&updated, updated.status, &recipients) {
                self.deliver(notice);
            }
        }
        Ok(updated)
    }

    // Recipient resolution is part of the best-effort notification path:
    // a missing account is logged and skipped, never an error.
    fn recipients_for(&self, record: &PlacementRecord) -> Option<Recipients> {
        let student = match self.directory.fetch(&record.student) {
            Ok(Some(found)) => found.user.email,
            _ => {
                warn!(placement = %record.id.0, "student account missing; skipping notices");
                return None;
            }
        };
        let provider = match self.directory.fetch(&record.provider) {
            Ok(Some(found)) => found.user.email,
            _ => {
                warn!(placement = %record.id.0, "provider account missing; skipping notices");
                return None;
            }
        };
        let tutor_pool = match self.directory.tutors() {
            Ok(tutors) => tutors.into_iter().map(|tutor| tutor.user.email).collect(),
            Err(err) => {
                warn!(error = %err, "tutor pool lookup failed; skipping pool notices");
                Vec::new()
            }
        };
        let approving_tutor = record
            .approved_by_tutor
            .as_ref()
            .and_then(|id| self.directory.fetch(id).ok().flatten())
            .map(|tutor| tutor.user.email);

        Some(Recipients {
            student,
            provider,
            tutor_pool,
            approving_tutor,
        })
    }

    fn deliver(&self, notice: Notice) {
        if notice.recipients.is_empty() {
            return;
        }
        if let Err(err) = self.notifier.deliver(notice) {
            warn!(error = %err, "notification delivery failed");
        }
    }
}

/// Visibility rule shared by read and complete paths.
pub(crate) fn visible_to(record: &PlacementRecord, actor: &Actor) -> bool {
    match actor.role {
        Role::Tutor => true,
        Role::Student => record.student == actor.user_id,
        Role::Provider => record.provider == actor.user_id,
    }
}

//! Tutor visit scheduling for approved placements.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::accounts::{Actor, Role, UserId};

use super::domain::{PlacementId, PlacementStatus};
use super::repository::{PlacementRepository, RepositoryError};
use super::transition::TransitionError;

/// Identifier wrapper for scheduled visits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisitId(pub String);

/// A scheduled company visit tied to one placement and one tutor.
///
/// `completed` is monotonic: once true it is never reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitSchedule {
    pub id: VisitId,
    pub placement_request: PlacementId,
    pub tutor: UserId,
    pub visit_date: DateTime<Utc>,
    pub purpose: String,
    pub notes: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisitSubmission {
    pub placement_request: PlacementId,
    pub visit_date: DateTime<Utc>,
    pub purpose: String,
    #[serde(default)]
    pub notes: String,
}

/// Storage abstraction for visit schedules.
pub trait VisitRepository: Send + Sync {
    fn insert(&self, record: VisitSchedule) -> Result<VisitSchedule, RepositoryError>;
    fn fetch(&self, id: &VisitId) -> Result<Option<VisitSchedule>, RepositoryError>;
    /// Set `completed = true`; applying it twice is a no-op.
    fn complete(&self, id: &VisitId) -> Result<VisitSchedule, RepositoryError>;
    fn for_tutor(&self, tutor: &UserId) -> Result<Vec<VisitSchedule>, RepositoryError>;
    fn all(&self) -> Result<Vec<VisitSchedule>, RepositoryError>;
}

static VISIT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_visit_id() -> VisitId {
    let id = VISIT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    VisitId(format!("visit-{id:06}"))
}

/// Error raised by the visit service.
#[derive(Debug, thiserror::Error)]
pub enum VisitServiceError {
    #[error("you can only schedule visits for approved placements (currently {found})")]
    PlacementNotReady { found: PlacementStatus },
    #[error("placement request not found")]
    PlacementMissing,
    #[error("only the visiting tutor may update this visit")]
    NotVisitOwner,
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Service gating visit creation on the owning placement's status.
pub struct VisitService<V, P> {
    visits: Arc<V>,
    placements: Arc<P>,
}

impl<V, P> VisitService<V, P>
where
    V: VisitRepository + 'static,
    P: PlacementRepository + 'static,
{
    pub fn new(visits: Arc<V>, placements: Arc<P>) -> Self {
        Self { visits, placements }
    }

    /// Schedule a visit. Tutors only, and only once the placement has
    /// reached final approval (or completion).
    pub fn schedule(
        &self,
        actor: &Actor,
        submission: VisitSubmission,
    ) -> Result<VisitSchedule, VisitServiceError> {
        if actor.role != Role::Tutor {
            return Err(TransitionError::WrongRole { role: actor.role }.into());
        }
        let placement = self
            .placements
            .fetch(&submission.placement_request)?
            .ok_or(VisitServiceError::PlacementMissing)?;
        if !matches!(
            placement.status,
            PlacementStatus::ApprovedByTutor | PlacementStatus::Completed
        ) {
            return Err(VisitServiceError::PlacementNotReady {
                found: placement.status,
            });
        }

        let record = VisitSchedule {
            id: next_visit_id(),
            placement_request: submission.placement_request,
            tutor: actor.user_id.clone(),
            visit_date: submission.visit_date,
            purpose: submission.purpose,
            notes: submission.notes,
            completed: false,
            created_at: Utc::now(),
        };
        let stored = self.visits.insert(record)?;
        info!(visit = %stored.id.0, tutor = %actor.user_id.0, "visit scheduled");
        Ok(stored)
    }

    /// Visits visible to the actor: a tutor sees their own, a student
    /// sees visits attached to their placements.
    pub fn list(&self, actor: &Actor) -> Result<Vec<VisitSchedule>, VisitServiceError> {
        let mut visits = match actor.role {
            Role::Tutor => self.visits.for_tutor(&actor.user_id)?,
            Role::Student => {
                let owned: Vec<PlacementId> = self
                    .placements
                    .for_student(&actor.user_id)?
                    .into_iter()
                    .map(|placement| placement.id)
                    .collect();
                self.visits
                    .all()?
                    .into_iter()
                    .filter(|visit| owned.contains(&visit.placement_request))
                    .collect()
            }
            Role::Provider => Vec::new(),
        };
        visits.sort_by(|a, b| a.visit_date.cmp(&b.visit_date));
        Ok(visits)
    }

    /// Visible visits still open and dated `now` or later.
    pub fn upcoming(
        &self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Vec<VisitSchedule>, VisitServiceError> {
        let mut visits = self.list(actor)?;
        visits.retain(|visit| !visit.completed && visit.visit_date >= now);
        Ok(visits)
    }

    /// Mark a visit completed. Only the recorded visiting tutor may do
    /// this; the flag never resets.
    pub fn complete(&self, actor: &Actor, id: &VisitId) -> Result<VisitSchedule, VisitServiceError> {
        let visit = self
            .visits
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        if visit.tutor != actor.user_id {
            return Err(VisitServiceError::NotVisitOwner);
        }
        Ok(self.visits.complete(id)?)
    }
}

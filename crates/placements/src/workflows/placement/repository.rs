use chrono::{DateTime, Utc};

use crate::accounts::UserId;

use super::domain::{PlacementEdit, PlacementId, PlacementRecord, PlacementStatus};

/// Field updates produced by a successful transition.
///
/// `from` carries the status the patch was computed against; the
/// repository must refuse to apply the patch if the stored status has
/// moved on in the meantime. Timestamp and comment fields are written
/// only when `Some`, so earlier audit values are never cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPatch {
    pub from: PlacementStatus,
    pub to: PlacementStatus,
    pub provider_approved_at: Option<DateTime<Utc>>,
    pub tutor_approved_at: Option<DateTime<Utc>>,
    pub approved_by_tutor: Option<UserId>,
    pub provider_comments: Option<String>,
    pub tutor_comments: Option<String>,
}

impl TransitionPatch {
    pub fn default_to(from: PlacementStatus, to: PlacementStatus) -> Self {
        Self {
            from,
            to,
            provider_approved_at: None,
            tutor_approved_at: None,
            approved_by_tutor: None,
            provider_comments: None,
            tutor_comments: None,
        }
    }

    /// Merge this patch into `record`, stamping `updated_at`.
    pub fn apply_to(&self, record: &mut PlacementRecord, now: DateTime<Utc>) {
        record.status = self.to;
        if let Some(at) = self.provider_approved_at {
            record.provider_approved_at = Some(at);
        }
        if let Some(at) = self.tutor_approved_at {
            record.tutor_approved_at = Some(at);
        }
        if let Some(tutor) = &self.approved_by_tutor {
            record.approved_by_tutor = Some(tutor.clone());
        }
        if let Some(comments) = &self.provider_comments {
            record.provider_comments = comments.clone();
        }
        if let Some(comments) = &self.tutor_comments {
            record.tutor_comments = comments.clone();
        }
        record.updated_at = now;
    }
}

/// Storage abstraction for placement requests.
pub trait PlacementRepository: Send + Sync {
    fn insert(&self, record: PlacementRecord) -> Result<PlacementRecord, RepositoryError>;
    fn fetch(&self, id: &PlacementId) -> Result<Option<PlacementRecord>, RepositoryError>;

    /// Atomically apply `patch` if the stored status still equals
    /// `patch.from`; otherwise fail with [`RepositoryError::StatusConflict`]
    /// and leave the record untouched.
    fn apply_transition(
        &self,
        id: &PlacementId,
        patch: TransitionPatch,
        now: DateTime<Utc>,
    ) -> Result<PlacementRecord, RepositoryError>;

    /// Atomically apply a descriptive edit if the record is still
    /// pending.
    fn apply_edit(
        &self,
        id: &PlacementId,
        edit: PlacementEdit,
        now: DateTime<Utc>,
    ) -> Result<PlacementRecord, RepositoryError>;

    fn for_student(&self, student: &UserId) -> Result<Vec<PlacementRecord>, RepositoryError>;
    fn for_provider(&self, provider: &UserId) -> Result<Vec<PlacementRecord>, RepositoryError>;
    fn all(&self) -> Result<Vec<PlacementRecord>, RepositoryError>;
}

/// Error enumeration for placement storage failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("status changed concurrently (currently {found})")]
    StatusConflict { found: PlacementStatus },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

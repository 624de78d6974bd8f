//! Placement report submission by students.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::accounts::{Actor, Role, UserRepository};
use crate::notify::{NotificationSink, Notice, NoticeEvent};

use super::domain::{PlacementId, PlacementStatus};
use super::repository::{PlacementRepository, RepositoryError};
use super::transition::TransitionError;

/// Identifier wrapper for submitted reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportId(pub String);

/// A report artifact submitted against an approved placement.
/// `submitted_at` is set once and never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementReport {
    pub id: ReportId,
    pub placement_request: PlacementId,
    pub file: String,
    pub comments: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportSubmission {
    pub placement_request: PlacementId,
    pub file: String,
    #[serde(default)]
    pub comments: String,
}

/// Storage abstraction for placement reports.
pub trait ReportRepository: Send + Sync {
    fn insert(&self, record: PlacementReport) -> Result<PlacementReport, RepositoryError>;
    fn for_placement(&self, id: &PlacementId) -> Result<Vec<PlacementReport>, RepositoryError>;
    fn all(&self) -> Result<Vec<PlacementReport>, RepositoryError>;
}

static REPORT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_report_id() -> ReportId {
    let id = REPORT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ReportId(format!("rpt-{id:06}"))
}

/// Error raised by the report service.
#[derive(Debug, thiserror::Error)]
pub enum ReportServiceError {
    #[error("you can only submit reports for approved placements (currently {found})")]
    PlacementNotReady { found: PlacementStatus },
    #[error("placement request not found")]
    PlacementMissing,
    #[error("you can only submit reports for your own placements")]
    NotPlacementOwner,
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Service gating report submission on placement ownership and status.
pub struct ReportService<T, P, D, N> {
    reports: Arc<T>,
    placements: Arc<P>,
    directory: Arc<D>,
    notifier: Arc<N>,
}

impl<T, P, D, N> ReportService<T, P, D, N>
where
    T: ReportRepository + 'static,
    P: PlacementRepository + 'static,
    D: UserRepository + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(reports: Arc<T>, placements: Arc<P>, directory: Arc<D>, notifier: Arc<N>) -> Self {
        Self {
            reports,
            placements,
            directory,
            notifier,
        }
    }

    /// Submit a report. Students only, only against their own placement,
    /// and only once it has reached final approval (or completion). The
    /// approving tutor is notified best-effort.
    pub fn submit(
        &self,
        actor: &Actor,
        submission: ReportSubmission,
    ) -> Result<PlacementReport, ReportServiceError> {
        if actor.role != Role::Student {
            return Err(TransitionError::WrongRole { role: actor.role }.into());
        }
        let placement = self
            .placements
            .fetch(&submission.placement_request)?
            .ok_or(ReportServiceError::PlacementMissing)?;
        if placement.student != actor.user_id {
            return Err(ReportServiceError::NotPlacementOwner);
        }
        if !matches!(
            placement.status,
            PlacementStatus::ApprovedByTutor | PlacementStatus::Completed
        ) {
            return Err(ReportServiceError::PlacementNotReady {
                found: placement.status,
            });
        }

        let record = PlacementReport {
            id: next_report_id(),
            placement_request: submission.placement_request,
            file: submission.file,
            comments: submission.comments,
            submitted_at: Utc::now(),
        };
        let stored = self.reports.insert(record)?;
        info!(report = %stored.id.0, student = %actor.user_id.0, "placement report submitted");

        if let Some(tutor) = &placement.approved_by_tutor {
            match self.directory.fetch(tutor) {
                Ok(Some(tutor)) => {
                    let notice = Notice {
                        event: NoticeEvent::ReportSubmitted,
                        recipients: vec![tutor.user.email],
                        subject: format!("New report submitted - {}", placement.company_name),
                        details: Default::default(),
                    };
                    if let Err(err) = self.notifier.deliver(notice) {
                        warn!(error = %err, "report notice delivery failed");
                    }
                }
                _ => warn!(report = %stored.id.0, "approving tutor missing; skipping notice"),
            }
        }
        Ok(stored)
    }

    /// Reports visible to the actor: students see reports on their own
    /// placements, tutors see reports on placements they approved.
    pub fn list(&self, actor: &Actor) -> Result<Vec<PlacementReport>, ReportServiceError> {
        let placements = match actor.role {
            Role::Student => self.placements.for_student(&actor.user_id)?,
            Role::Tutor => {
                let mut all = self.placements.all()?;
                all.retain(|placement| {
                    placement.approved_by_tutor.as_ref() == Some(&actor.user_id)
                });
                all
            }
            Role::Provider => Vec::new(),
        };
        let owned: Vec<&PlacementId> = placements.iter().map(|placement| &placement.id).collect();

        let mut reports = self.reports.all()?;
        reports.retain(|report| owned.contains(&&report.placement_request));
        reports.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(reports)
    }
}

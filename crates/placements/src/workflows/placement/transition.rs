//! The placement status state machine.
//!
//! Every mutating endpoint funnels through [`transition`]: given the
//! current record, the attempted action, and the acting user, it either
//! returns the patch to persist or an error, and never touches the
//! record itself. Guard failures therefore cannot leave partial writes.

use chrono::{DateTime, Utc};

use crate::accounts::{Actor, Role};

use super::domain::{PlacementRecord, PlacementStatus};
use super::repository::TransitionPatch;

/// An action attempted against a placement request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementAction {
    ProviderApprove { comments: String },
    ProviderReject { comments: String },
    TutorApprove { comments: String },
    TutorReject { comments: String },
    MarkCompleted,
}

impl PlacementAction {
    /// The status a record must hold for this action to apply.
    pub const fn expected_from(&self) -> PlacementStatus {
        match self {
            PlacementAction::ProviderApprove { .. } | PlacementAction::ProviderReject { .. } => {
                PlacementStatus::Pending
            }
            PlacementAction::TutorApprove { .. } | PlacementAction::TutorReject { .. } => {
                PlacementStatus::ApprovedByProvider
            }
            PlacementAction::MarkCompleted => PlacementStatus::ApprovedByTutor,
        }
    }
}

/// Guard failure for an attempted transition. No variant implies any
/// mutation took place.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("this placement request is not ready for that action (currently {found})")]
    InvalidState {
        expected: PlacementStatus,
        found: PlacementStatus,
    },
    #[error("{} accounts cannot perform this action", role.label())]
    WrongRole { role: Role },
    #[error("only the provider this request was sent to may review it")]
    NotOwner,
}

/// Compute the patch for `action` against `record`, or the guard error.
///
/// Provider actions require ownership of the request; tutor actions
/// require only the tutor role (any tutor may review any
/// provider-approved request). Completion is open to any actor allowed
/// to see the record; the caller enforces visibility.
pub fn transition(
    record: &PlacementRecord,
    action: &PlacementAction,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<TransitionPatch, TransitionError> {
    let expected = action.expected_from();
    if record.status != expected {
        return Err(TransitionError::InvalidState {
            expected,
            found: record.status,
        });
    }

    match action {
        PlacementAction::ProviderApprove { comments } => {
            guard_owning_provider(record, actor)?;
            Ok(TransitionPatch {
                provider_approved_at: Some(now),
                provider_comments: Some(comments.clone()),
                ..TransitionPatch::default_to(expected, PlacementStatus::ApprovedByProvider)
            })
        }
        PlacementAction::ProviderReject { comments } => {
            guard_owning_provider(record, actor)?;
            Ok(TransitionPatch {
                provider_comments: Some(comments.clone()),
                ..TransitionPatch::default_to(expected, PlacementStatus::Rejected)
            })
        }
        PlacementAction::TutorApprove { comments } => {
            guard_tutor(actor)?;
            Ok(TransitionPatch {
                tutor_approved_at: Some(now),
                approved_by_tutor: Some(actor.user_id.clone()),
                tutor_comments: Some(comments.clone()),
                ..TransitionPatch::default_to(expected, PlacementStatus::ApprovedByTutor)
            })
        }
        PlacementAction::TutorReject { comments } => {
            guard_tutor(actor)?;
            Ok(TransitionPatch {
                tutor_comments: Some(comments.clone()),
                ..TransitionPatch::default_to(expected, PlacementStatus::Rejected)
            })
        }
        PlacementAction::MarkCompleted => Ok(TransitionPatch::default_to(
            expected,
            PlacementStatus::Completed,
        )),
    }
}

fn guard_owning_provider(record: &PlacementRecord, actor: &Actor) -> Result<(), TransitionError> {
    if actor.role != Role::Provider {
        return Err(TransitionError::WrongRole { role: actor.role });
    }
    if record.provider != actor.user_id {
        return Err(TransitionError::NotOwner);
    }
    Ok(())
}

fn guard_tutor(actor: &Actor) -> Result<(), TransitionError> {
    if actor.role != Role::Tutor {
        return Err(TransitionError::WrongRole { role: actor.role });
    }
    Ok(())
}

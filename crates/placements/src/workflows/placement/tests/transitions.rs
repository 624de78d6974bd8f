//! Unit coverage for the pure transition function.

use chrono::Utc;

use crate::accounts::{Actor, Role, UserId};
use crate::workflows::placement::domain::{PlacementId, PlacementRecord, PlacementStatus};
use crate::workflows::placement::transition::{transition, PlacementAction, TransitionError};

use super::common::submission;

fn record_with_status(status: PlacementStatus) -> PlacementRecord {
    let submission = submission(&UserId("prov-1".to_string()));
    let now = Utc::now();
    PlacementRecord {
        id: PlacementId("plc-test".to_string()),
        student: UserId("stu-1".to_string()),
        provider: submission.provider.clone(),
        tutor: None,
        company_name: submission.company_name,
        job_title: submission.job_title,
        job_description: submission.job_description,
        start_date: submission.start_date,
        end_date: submission.end_date,
        location: submission.location,
        geo: None,
        document: None,
        status,
        provider_approved_at: None,
        tutor_approved_at: None,
        approved_by_tutor: None,
        provider_comments: String::new(),
        tutor_comments: String::new(),
        created_at: now,
        updated_at: now,
    }
}

fn actor(id: &str, role: Role) -> Actor {
    Actor {
        user_id: UserId(id.to_string()),
        role,
    }
}

#[test]
fn owning_provider_approval_sets_timestamp_and_comments() {
    let record = record_with_status(PlacementStatus::Pending);
    let now = Utc::now();
    let patch = transition(
        &record,
        &PlacementAction::ProviderApprove {
            comments: "ok".to_string(),
        },
        &actor("prov-1", Role::Provider),
        now,
    )
    .expect("transition allowed");

    assert_eq!(patch.from, PlacementStatus::Pending);
    assert_eq!(patch.to, PlacementStatus::ApprovedByProvider);
    assert_eq!(patch.provider_approved_at, Some(now));
    assert_eq!(patch.provider_comments.as_deref(), Some("ok"));
    assert!(patch.tutor_approved_at.is_none());
    assert!(patch.approved_by_tutor.is_none());
}

#[test]
fn non_owning_provider_cannot_review() {
    let record = record_with_status(PlacementStatus::Pending);
    let result = transition(
        &record,
        &PlacementAction::ProviderApprove {
            comments: String::new(),
        },
        &actor("prov-2", Role::Provider),
        Utc::now(),
    );
    assert_eq!(result, Err(TransitionError::NotOwner));
}

#[test]
fn any_tutor_may_approve_a_provider_approved_request() {
    let record = record_with_status(PlacementStatus::ApprovedByProvider);
    let now = Utc::now();
    let patch = transition(
        &record,
        &PlacementAction::TutorApprove {
            comments: "looks solid".to_string(),
        },
        &actor("tut-2", Role::Tutor),
        now,
    )
    .expect("transition allowed");

    assert_eq!(patch.to, PlacementStatus::ApprovedByTutor);
    assert_eq!(patch.tutor_approved_at, Some(now));
    assert_eq!(
        patch.approved_by_tutor,
        Some(UserId("tut-2".to_string()))
    );
    assert!(patch.provider_approved_at.is_none());
}

#[test]
fn students_cannot_review() {
    let record = record_with_status(PlacementStatus::Pending);
    let result = transition(
        &record,
        &PlacementAction::ProviderApprove {
            comments: String::new(),
        },
        &actor("stu-1", Role::Student),
        Utc::now(),
    );
    assert_eq!(
        result,
        Err(TransitionError::WrongRole {
            role: Role::Student
        })
    );
}

#[test]
fn wrong_state_attempts_are_rejected_for_every_action() {
    let tutor = actor("tut-1", Role::Tutor);
    let provider = actor("prov-1", Role::Provider);
    let attempts: Vec<(PlacementStatus, PlacementAction, &Actor)> = vec![
        (
            PlacementStatus::ApprovedByProvider,
            PlacementAction::ProviderApprove {
                comments: String::new(),
            },
            &provider,
        ),
        (
            PlacementStatus::Pending,
            PlacementAction::TutorApprove {
                comments: String::new(),
            },
            &tutor,
        ),
        (
            PlacementStatus::Pending,
            PlacementAction::MarkCompleted,
            &tutor,
        ),
        (
            PlacementStatus::Rejected,
            PlacementAction::TutorApprove {
                comments: String::new(),
            },
            &tutor,
        ),
        (
            PlacementStatus::Completed,
            PlacementAction::MarkCompleted,
            &tutor,
        ),
        (
            PlacementStatus::Rejected,
            PlacementAction::MarkCompleted,
            &tutor,
        ),
    ];

    for (status, action, who) in attempts {
        let record = record_with_status(status);
        match transition(&record, &action, who, Utc::now()) {
            Err(TransitionError::InvalidState { found, .. }) => assert_eq!(found, status),
            other => panic!("expected invalid-state for {status:?}, got {other:?}"),
        }
    }
}

#[test]
fn rejection_is_terminal() {
    let record = record_with_status(PlacementStatus::Rejected);
    for action in [
        PlacementAction::ProviderApprove {
            comments: String::new(),
        },
        PlacementAction::TutorApprove {
            comments: String::new(),
        },
        PlacementAction::MarkCompleted,
    ] {
        let result = transition(
            &record,
            &action,
            &actor("tut-1", Role::Tutor),
            Utc::now(),
        );
        assert!(matches!(
            result,
            Err(TransitionError::InvalidState { .. })
        ));
    }
}

#[test]
fn state_check_runs_before_ownership_check() {
    // A stale reviewer gets the not-ready message, not a permission one.
    let record = record_with_status(PlacementStatus::ApprovedByTutor);
    let result = transition(
        &record,
        &PlacementAction::ProviderApprove {
            comments: String::new(),
        },
        &actor("prov-2", Role::Provider),
        Utc::now(),
    );
    assert!(matches!(result, Err(TransitionError::InvalidState { .. })));
}

//! Visit, report, and message rules around the workflow.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::accounts::UserId;
use crate::notify::NoticeEvent;
use crate::workflows::placement::domain::{PlacementId, PlacementStatus};
use crate::workflows::placement::messaging::{MessageService, MessageServiceError, MessageSubmission};
use crate::workflows::placement::reports::{ReportService, ReportServiceError, ReportSubmission};
use crate::workflows::placement::visits::{VisitService, VisitServiceError, VisitSubmission};

use super::common::{
    build_service, submission, MemoryMessages, MemoryReports, MemoryVisits, Service,
};

fn uid(raw: &str) -> UserId {
    UserId(raw.to_string())
}

struct Fixture {
    service: Arc<Service>,
    visits: VisitService<MemoryVisits, super::common::MemoryPlacements>,
    reports: ReportService<
        MemoryReports,
        super::common::MemoryPlacements,
        super::common::MemoryUsers,
        super::common::RecordingSink,
    >,
    messages: MessageService<MemoryMessages, super::common::MemoryUsers>,
    sink: Arc<super::common::RecordingSink>,
    pending: PlacementId,
    approved: PlacementId,
}

/// One pending and one tutor-approved placement, plus the satellite
/// services wired over the same stores.
fn fixture() -> Fixture {
    let (service, placements, users, sink) = build_service();
    let student = service.actor(&uid("stu-1")).expect("actor");
    let provider = service.actor(&uid("prov-1")).expect("actor");
    let tutor = service.actor(&uid("tut-1")).expect("actor");

    let pending = service
        .submit(&student, submission(&uid("prov-1")))
        .expect("stored");
    let approved = service
        .submit(&student, submission(&uid("prov-1")))
        .expect("stored");
    service
        .approve(&provider, &approved.id, String::new())
        .expect("provider approval");
    service
        .approve(&tutor, &approved.id, String::new())
        .expect("tutor approval");

    Fixture {
        visits: VisitService::new(Arc::new(MemoryVisits::default()), placements.clone()),
        reports: ReportService::new(
            Arc::new(MemoryReports::default()),
            placements,
            users,
            sink.clone(),
        ),
        messages: MessageService::new(
            Arc::new(MemoryMessages::default()),
            Arc::new(super::common::MemoryUsers::default()),
        ),
        service,
        sink,
        pending: pending.id,
        approved: approved.id,
    }
}

fn visit_submission(placement: &PlacementId) -> VisitSubmission {
    VisitSubmission {
        placement_request: placement.clone(),
        visit_date: Utc::now() + Duration::days(7),
        purpose: "Mid-placement check-in".to_string(),
        notes: String::new(),
    }
}

#[test]
fn visits_require_final_approval() {
    let fx = fixture();
    let tutor = fx.service.actor(&uid("tut-1")).expect("actor");

    let denied = fx.visits.schedule(&tutor, visit_submission(&fx.pending));
    assert!(matches!(
        denied,
        Err(VisitServiceError::PlacementNotReady {
            found: PlacementStatus::Pending
        })
    ));

    let visit = fx
        .visits
        .schedule(&tutor, visit_submission(&fx.approved))
        .expect("visit scheduled");
    assert!(!visit.completed);
}

#[test]
fn only_tutors_schedule_visits() {
    let fx = fixture();
    let student = fx.service.actor(&uid("stu-1")).expect("actor");
    let denied = fx.visits.schedule(&student, visit_submission(&fx.approved));
    assert!(matches!(denied, Err(VisitServiceError::Transition(_))));
}

#[test]
fn visit_completion_is_owner_gated_and_monotonic() {
    let fx = fixture();
    let tutor = fx.service.actor(&uid("tut-1")).expect("actor");
    let other_tutor = fx.service.actor(&uid("tut-2")).expect("actor");

    let visit = fx
        .visits
        .schedule(&tutor, visit_submission(&fx.approved))
        .expect("scheduled");

    assert!(matches!(
        fx.visits.complete(&other_tutor, &visit.id),
        Err(VisitServiceError::NotVisitOwner)
    ));

    let done = fx.visits.complete(&tutor, &visit.id).expect("completed");
    assert!(done.completed);
    // Completing twice stays completed.
    let again = fx.visits.complete(&tutor, &visit.id).expect("idempotent");
    assert!(again.completed);
}

#[test]
fn upcoming_excludes_completed_and_past_visits() {
    let fx = fixture();
    let tutor = fx.service.actor(&uid("tut-1")).expect("actor");

    let mut past = visit_submission(&fx.approved);
    past.visit_date = Utc::now() - Duration::days(2);
    fx.visits.schedule(&tutor, past).expect("scheduled");

    let future = fx
        .visits
        .schedule(&tutor, visit_submission(&fx.approved))
        .expect("scheduled");

    let upcoming = fx.visits.upcoming(&tutor, Utc::now()).expect("upcoming");
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].id, future.id);
}

#[test]
fn reports_are_gated_on_status_and_ownership() {
    let fx = fixture();
    let student = fx.service.actor(&uid("stu-1")).expect("actor");
    let tutor = fx.service.actor(&uid("tut-1")).expect("actor");

    let early = fx.reports.submit(
        &student,
        ReportSubmission {
            placement_request: fx.pending.clone(),
            file: "placement_reports/week1.pdf".to_string(),
            comments: String::new(),
        },
    );
    assert!(matches!(
        early,
        Err(ReportServiceError::PlacementNotReady {
            found: PlacementStatus::Pending
        })
    ));

    let not_owner = fx.reports.submit(
        &tutor,
        ReportSubmission {
            placement_request: fx.approved.clone(),
            file: "placement_reports/week1.pdf".to_string(),
            comments: String::new(),
        },
    );
    assert!(matches!(not_owner, Err(ReportServiceError::Transition(_))));

    let stored = fx
        .reports
        .submit(
            &student,
            ReportSubmission {
                placement_request: fx.approved.clone(),
                file: "placement_reports/week1.pdf".to_string(),
                comments: "First month summary".to_string(),
            },
        )
        .expect("report stored");
    assert_eq!(stored.placement_request, fx.approved);

    // The approving tutor hears about it.
    let notices = fx.sink.notices();
    let report_notice = notices
        .iter()
        .find(|notice| notice.event == NoticeEvent::ReportSubmitted)
        .expect("report notice");
    assert_eq!(report_notice.recipients, vec!["tutor-tut-1@uni.example"]);
}

#[test]
fn message_read_flags_belong_to_the_recipient() {
    let fx = fixture();
    // The message service in this fixture has its own empty directory;
    // seed the two parties there.
    let users = super::common::MemoryUsers::default();
    users.seed(super::common::student("stu-1"));
    users.seed(super::common::tutor("tut-1"));
    let messages = MessageService::new(Arc::new(MemoryMessages::default()), Arc::new(users));

    let student = fx.service.actor(&uid("stu-1")).expect("actor");
    let tutor = fx.service.actor(&uid("tut-1")).expect("actor");

    let sent = messages
        .send(
            &student,
            MessageSubmission {
                recipient: uid("tut-1"),
                subject: "Visit timing".to_string(),
                content: "Could we move the visit to Friday?".to_string(),
                placement_request: Some(fx.approved.clone()),
            },
        )
        .expect("message sent");
    assert!(!sent.is_read);

    // Sender cannot mark it read.
    assert!(matches!(
        messages.mark_read(&student, &sent.id),
        Err(MessageServiceError::NotRecipient)
    ));

    let read = messages.mark_read(&tutor, &sent.id).expect("marked read");
    assert!(read.is_read);
    assert_eq!(messages.unread_count(&tutor).expect("count"), 0);

    // Only the sender may delete.
    assert!(matches!(
        messages.delete(&tutor, &sent.id),
        Err(MessageServiceError::NotSender)
    ));
    messages.delete(&student, &sent.id).expect("deleted");
}

#[test]
fn unknown_recipients_are_rejected() {
    let fx = fixture();
    let student = fx.service.actor(&uid("stu-1")).expect("actor");
    let result = fx.messages.send(
        &student,
        MessageSubmission {
            recipient: uid("ghost"),
            subject: "Hello".to_string(),
            content: "Anyone there?".to_string(),
            placement_request: None,
        },
    );
    assert!(matches!(result, Err(MessageServiceError::UnknownRecipient)));
}

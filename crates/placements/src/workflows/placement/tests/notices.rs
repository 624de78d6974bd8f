//! Notification routing and best-effort delivery semantics.

use crate::accounts::UserId;
use crate::notify::NoticeEvent;
use crate::workflows::placement::domain::PlacementStatus;
use crate::workflows::placement::repository::PlacementRepository;

use super::common::{build_service, submission};

fn uid(raw: &str) -> UserId {
    UserId(raw.to_string())
}

#[test]
fn creation_notifies_the_provider_only() {
    let (service, _, _, sink) = build_service();
    let student = service.actor(&uid("stu-1")).expect("actor");
    service
        .submit(&student, submission(&uid("prov-1")))
        .expect("stored");

    let notices = sink.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].event, NoticeEvent::RequestCreated);
    assert_eq!(notices[0].recipients, vec!["provider-prov-1@uni.example"]);
}

#[test]
fn each_transition_notifies_its_role_set() {
    let (service, _, _, sink) = build_service();
    let student = service.actor(&uid("stu-1")).expect("actor");
    let provider = service.actor(&uid("prov-1")).expect("actor");
    let tutor = service.actor(&uid("tut-1")).expect("actor");

    let record = service
        .submit(&student, submission(&uid("prov-1")))
        .expect("stored");
    service
        .approve(&provider, &record.id, String::new())
        .expect("provider approval");
    service
        .approve(&tutor, &record.id, String::new())
        .expect("tutor approval");
    service.complete(&tutor, &record.id).expect("completion");

    let notices = sink.notices();
    assert_eq!(notices.len(), 4);

    let provider_approved = &notices[1];
    assert_eq!(provider_approved.event, NoticeEvent::ProviderApproved);
    // The tutor pool, not any single tutor.
    assert_eq!(provider_approved.recipients.len(), 2);
    assert!(provider_approved
        .recipients
        .iter()
        .all(|address| address.starts_with("tutor-")));

    let tutor_approved = &notices[2];
    assert_eq!(tutor_approved.event, NoticeEvent::TutorApproved);
    assert_eq!(
        tutor_approved.recipients,
        vec![
            "student-stu-1@uni.example".to_string(),
            "provider-prov-1@uni.example".to_string()
        ]
    );

    let completed = &notices[3];
    assert_eq!(completed.event, NoticeEvent::Completed);
    assert_eq!(completed.recipients.len(), 3);
    assert!(completed
        .recipients
        .contains(&"tutor-tut-1@uni.example".to_string()));
}

#[test]
fn rejection_notifies_the_student_only() {
    let (service, _, _, sink) = build_service();
    let student = service.actor(&uid("stu-1")).expect("actor");
    let provider = service.actor(&uid("prov-1")).expect("actor");

    let record = service
        .submit(&student, submission(&uid("prov-1")))
        .expect("stored");
    service
        .reject(&provider, &record.id, "no capacity".to_string())
        .expect("rejected");

    let notices = sink.notices();
    let rejection = notices.last().expect("rejection notice");
    assert_eq!(rejection.event, NoticeEvent::Rejected);
    assert_eq!(rejection.recipients, vec!["student-stu-1@uni.example"]);
}

#[test]
fn sink_failure_never_blocks_the_transition() {
    let (service, placements, _, sink) = build_service();
    let student = service.actor(&uid("stu-1")).expect("actor");
    let provider = service.actor(&uid("prov-1")).expect("actor");

    let record = service
        .submit(&student, submission(&uid("prov-1")))
        .expect("stored");

    sink.fail_next_deliveries();
    let approved = service
        .approve(&provider, &record.id, "ok".to_string())
        .expect("approval persists despite sink failure");
    assert_eq!(approved.status, PlacementStatus::ApprovedByProvider);

    let stored = placements
        .fetch(&record.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(stored.status, PlacementStatus::ApprovedByProvider);
}

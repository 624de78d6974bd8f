//! End-to-end CLI demo: registers the three parties, walks one request
//! through the full approval chain, and prints each step.

use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate, Utc};
use clap::Args;

use placements::accounts::registration::{
    BaseRegistration, ProviderRegistration, StudentRegistration, TutorRegistration,
};
use placements::accounts::RegistrationService;
use placements::error::AppError;
use placements::notify::{NotificationSink, Notice, NotifyError};
use placements::workflows::placement::{
    MessageService, MessageSubmission, PlacementService, PlacementSubmission, ReportService,
    ReportSubmission, VisitService, VisitSubmission,
};

use crate::infra::{
    InMemoryMessageRepository, InMemoryPlacementRepository, InMemoryReportRepository,
    InMemoryUserRepository, InMemoryVerificationStore, InMemoryVisitRepository,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Also demonstrate the provider-rejection path on a second request
    #[arg(long)]
    pub(crate) include_rejection: bool,
}

/// Sink that captures notices so the demo can read the verification code
/// and summarize outbound traffic.
#[derive(Default, Clone)]
struct CapturingSink {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl CapturingSink {
    fn notices(&self) -> Vec<Notice> {
        self.notices.lock().expect("notice mutex poisoned").clone()
    }
}

impl NotificationSink for CapturingSink {
    fn deliver(&self, notice: Notice) -> Result<(), NotifyError> {
        println!(
            "  [notice] {} -> {}",
            notice.event.label(),
            notice.recipients.join(", ")
        );
        self.notices.lock().expect("notice mutex poisoned").push(notice);
        Ok(())
    }
}

fn demo_error(err: impl std::fmt::Display) -> AppError {
    AppError::Io(std::io::Error::other(err.to_string()))
}

fn base(username: &str, email: &str, phone: &str) -> BaseRegistration {
    BaseRegistration {
        username: username.to_string(),
        first_name: username.to_string(),
        last_name: "Demo".to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
        password: "Str0ng!Pass".to_string(),
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("Placement workflow demo");

    let directory = Arc::new(InMemoryUserRepository::default());
    let verifications = Arc::new(InMemoryVerificationStore::default());
    let placements_repo = Arc::new(InMemoryPlacementRepository::default());
    let sink = Arc::new(CapturingSink::default());

    let registration = RegistrationService::new(directory.clone(), verifications, sink.clone());
    let placements = PlacementService::new(placements_repo.clone(), directory.clone(), sink.clone());
    let visits = VisitService::new(
        Arc::new(InMemoryVisitRepository::default()),
        placements_repo.clone(),
    );
    let reports = ReportService::new(
        Arc::new(InMemoryReportRepository::default()),
        placements_repo,
        directory.clone(),
        sink.clone(),
    );
    let messages = MessageService::new(Arc::new(InMemoryMessageRepository::default()), directory);

    println!("\nRegistering parties");
    let tutor = registration
        .register_tutor(TutorRegistration {
            base: base("tutor", "tutor@uni.example", "9876500001"),
            employee_id: "EMP101".to_string(),
            department: "Engineering".to_string(),
            designation: "Senior Lecturer".to_string(),
            office_location: "B-204".to_string(),
        })
        .map_err(demo_error)?;
    let student = registration
        .register_student(StudentRegistration {
            base: base("student", "student@uni.example", "9876500002"),
            student_id: "CS1234".to_string(),
            course: "Computer Science".to_string(),
            year: 3,
            cgpa: Some(8.4),
            tutor: None,
            address: String::new(),
        })
        .map_err(demo_error)?;
    let provider = registration
        .register_provider(ProviderRegistration {
            base: base("provider", "hiring@acme.example", "9876500003"),
            company_name: "Acme Robotics".to_string(),
            company_address: "12 Canal Street".to_string(),
            contact_person: "Pat Morgan".to_string(),
            website: None,
            industry: "Robotics".to_string(),
        })
        .map_err(demo_error)?;
    println!(
        "- provider registered inactive (is_active = {})",
        provider.user.is_active
    );

    let code = sink
        .notices()
        .iter()
        .rev()
        .find_map(|notice| notice.details.get("code").cloned())
        .expect("verification code issued");
    let provider = registration
        .verify_provider(&provider.user.id, &code)
        .map_err(demo_error)?;
    println!(
        "- provider verified with emailed code (is_active = {})",
        provider.user.is_active
    );

    let student_actor = student.actor();
    let provider_actor = provider.actor();
    let tutor_actor = tutor.actor();

    println!("\nWalking the approval chain");
    let start = NaiveDate::from_ymd_opt(2026, 6, 1).expect("valid date");
    let submission = PlacementSubmission {
        provider: provider.user.id.clone(),
        company_name: "Acme Robotics".to_string(),
        job_title: "Junior Controls Engineer".to_string(),
        job_description: "PLC programming and commissioning support.".to_string(),
        start_date: start,
        end_date: start + Duration::days(90),
        location: "Leeds".to_string(),
        geo: None,
        document: None,
    };

    let record = placements
        .submit(&student_actor, submission.clone())
        .map_err(demo_error)?;
    println!("- {} created ({})", record.id.0, record.status);

    let record = placements
        .approve(&provider_actor, &record.id, "Happy to host.".to_string())
        .map_err(demo_error)?;
    println!("- provider approved ({})", record.status);

    let record = placements
        .approve(&tutor_actor, &record.id, "Meets the brief.".to_string())
        .map_err(demo_error)?;
    println!("- tutor approved ({})", record.status);

    let visit = visits
        .schedule(
            &tutor_actor,
            VisitSubmission {
                placement_request: record.id.clone(),
                visit_date: Utc::now() + Duration::days(30),
                purpose: "Mid-placement check-in".to_string(),
                notes: String::new(),
            },
        )
        .map_err(demo_error)?;
    println!("- visit {} scheduled for {}", visit.id.0, visit.visit_date);

    let report = reports
        .submit(
            &student_actor,
            ReportSubmission {
                placement_request: record.id.clone(),
                file: "placement_reports/month-1.pdf".to_string(),
                comments: "First month summary".to_string(),
            },
        )
        .map_err(demo_error)?;
    println!("- report {} submitted", report.id.0);

    messages
        .send(
            &student_actor,
            MessageSubmission {
                recipient: tutor.user.id.clone(),
                subject: "Visit timing".to_string(),
                content: "Could the visit land on a Friday?".to_string(),
                placement_request: Some(record.id.clone()),
            },
        )
        .map_err(demo_error)?;
    println!("- message sent to {}", tutor.user.username);

    let record = placements
        .complete(&tutor_actor, &record.id)
        .map_err(demo_error)?;
    println!("- placement completed ({})", record.status);

    if args.include_rejection {
        println!("\nRejection path");
        let second = placements
            .submit(&student_actor, submission)
            .map_err(demo_error)?;
        let second = placements
            .reject(
                &provider_actor,
                &second.id,
                "No capacity this term.".to_string(),
            )
            .map_err(demo_error)?;
        println!("- {} rejected ({})", second.id.0, second.status);
    }

    let tally = placements
        .statistics(&tutor_actor)
        .map_err(demo_error)?;
    println!(
        "\nTutor-visible tally: {} total / {} completed / {} rejected",
        tally.total, tally.completed, tally.rejected
    );
    println!("Outbound notices: {}", sink.notices().len());

    Ok(())
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};

use crate::accounts::{
    DirectoryError, ProviderProfile, Role, RoleProfile, StudentProfile, TutorProfile, User,
    UserId, UserRecord, UserRepository,
};
use crate::notify::{NotificationSink, Notice, NotifyError};
use crate::workflows::placement::domain::{
    PlacementEdit, PlacementId, PlacementRecord, PlacementStatus, PlacementSubmission,
};
use crate::workflows::placement::messaging::{Message, MessageId, MessageRepository};
use crate::workflows::placement::reports::{PlacementReport, ReportRepository};
use crate::workflows::placement::repository::{
    PlacementRepository, RepositoryError, TransitionPatch,
};
use crate::workflows::placement::service::PlacementService;
use crate::workflows::placement::visits::{VisitId, VisitRepository, VisitSchedule};

#[derive(Default, Clone)]
pub(super) struct MemoryUsers {
    records: Arc<Mutex<HashMap<UserId, UserRecord>>>,
}

impl MemoryUsers {
    pub(super) fn seed(&self, record: UserRecord) {
        self.records
            .lock()
            .expect("lock")
            .insert(record.user.id.clone(), record);
    }
}

impl UserRepository for MemoryUsers {
    fn insert(&self, record: UserRecord) -> Result<UserRecord, DirectoryError> {
        let mut guard = self.records.lock().expect("lock");
        if guard.contains_key(&record.user.id) {
            return Err(DirectoryError::Conflict);
        }
        guard.insert(record.user.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: UserRecord) -> Result<(), DirectoryError> {
        let mut guard = self.records.lock().expect("lock");
        if !guard.contains_key(&record.user.id) {
            return Err(DirectoryError::NotFound);
        }
        guard.insert(record.user.id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &UserId) -> Result<Option<UserRecord>, DirectoryError> {
        Ok(self.records.lock().expect("lock").get(id).cloned())
    }

    fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, DirectoryError> {
        Ok(self
            .records
            .lock()
            .expect("lock")
            .values()
            .find(|record| record.user.username == username)
            .cloned())
    }

    fn email_taken(&self, email: &str) -> Result<bool, DirectoryError> {
        Ok(self
            .records
            .lock()
            .expect("lock")
            .values()
            .any(|record| record.user.email == email))
    }

    fn phone_taken(&self, phone: &str) -> Result<bool, DirectoryError> {
        Ok(self
            .records
            .lock()
            .expect("lock")
            .values()
            .any(|record| record.user.phone == phone))
    }

    fn external_id_taken(&self, role: Role, external_id: &str) -> Result<bool, DirectoryError> {
        Ok(self
            .records
            .lock()
            .expect("lock")
            .values()
            .any(|record| {
                record.user.role == role && record.profile.external_id() == Some(external_id)
            }))
    }

    fn tutors(&self) -> Result<Vec<UserRecord>, DirectoryError> {
        Ok(self
            .records
            .lock()
            .expect("lock")
            .values()
            .filter(|record| record.user.role == Role::Tutor && record.user.is_active)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryPlacements {
    records: Arc<Mutex<HashMap<PlacementId, PlacementRecord>>>,
}

impl PlacementRepository for MemoryPlacements {
    fn insert(&self, record: PlacementRecord) -> Result<PlacementRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("lock");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &PlacementId) -> Result<Option<PlacementRecord>, RepositoryError> {
        Ok(self.records.lock().expect("lock").get(id).cloned())
    }

    fn apply_transition(
        &self,
        id: &PlacementId,
        patch: TransitionPatch,
        now: DateTime<Utc>,
    ) -> Result<PlacementRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("lock");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if record.status != patch.from {
            return Err(RepositoryError::StatusConflict {
                found: record.status,
            });
        }
        patch.apply_to(record, now);
        Ok(record.clone())
    }

    fn apply_edit(
        &self,
        id: &PlacementId,
        edit: PlacementEdit,
        now: DateTime<Utc>,
    ) -> Result<PlacementRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("lock");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if record.status != PlacementStatus::Pending {
            return Err(RepositoryError::StatusConflict {
                found: record.status,
            });
        }
        edit.apply_to(record);
        record.updated_at = now;
        Ok(record.clone())
    }

    fn for_student(&self, student: &UserId) -> Result<Vec<PlacementRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("lock")
            .values()
            .filter(|record| &record.student == student)
            .cloned()
            .collect())
    }

    fn for_provider(&self, provider: &UserId) -> Result<Vec<PlacementRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("lock")
            .values()
            .filter(|record| &record.provider == provider)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<PlacementRecord>, RepositoryError> {
        Ok(self.records.lock().expect("lock").values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryVisits {
    records: Arc<Mutex<HashMap<VisitId, VisitSchedule>>>,
}

impl VisitRepository for MemoryVisits {
    fn insert(&self, record: VisitSchedule) -> Result<VisitSchedule, RepositoryError> {
        let mut guard = self.records.lock().expect("lock");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &VisitId) -> Result<Option<VisitSchedule>, RepositoryError> {
        Ok(self.records.lock().expect("lock").get(id).cloned())
    }

    fn complete(&self, id: &VisitId) -> Result<VisitSchedule, RepositoryError> {
        let mut guard = self.records.lock().expect("lock");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.completed = true;
        Ok(record.clone())
    }

    fn for_tutor(&self, tutor: &UserId) -> Result<Vec<VisitSchedule>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("lock")
            .values()
            .filter(|record| &record.tutor == tutor)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<VisitSchedule>, RepositoryError> {
        Ok(self.records.lock().expect("lock").values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryReports {
    records: Arc<Mutex<Vec<PlacementReport>>>,
}

impl ReportRepository for MemoryReports {
    fn insert(&self, record: PlacementReport) -> Result<PlacementReport, RepositoryError> {
        self.records.lock().expect("lock").push(record.clone());
        Ok(record)
    }

    fn for_placement(&self, id: &PlacementId) -> Result<Vec<PlacementReport>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("lock")
            .iter()
            .filter(|record| &record.placement_request == id)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<PlacementReport>, RepositoryError> {
        Ok(self.records.lock().expect("lock").clone())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryMessages {
    records: Arc<Mutex<HashMap<MessageId, Message>>>,
}

impl MessageRepository for MemoryMessages {
    fn insert(&self, record: Message) -> Result<Message, RepositoryError> {
        self.records
            .lock()
            .expect("lock")
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &MessageId) -> Result<Option<Message>, RepositoryError> {
        Ok(self.records.lock().expect("lock").get(id).cloned())
    }

    fn mark_read(&self, id: &MessageId) -> Result<Message, RepositoryError> {
        let mut guard = self.records.lock().expect("lock");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.is_read = true;
        Ok(record.clone())
    }

    fn delete(&self, id: &MessageId) -> Result<(), RepositoryError> {
        self.records
            .lock()
            .expect("lock")
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn for_recipient(&self, user: &UserId) -> Result<Vec<Message>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("lock")
            .values()
            .filter(|record| &record.recipient == user)
            .cloned()
            .collect())
    }

    fn for_sender(&self, user: &UserId) -> Result<Vec<Message>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("lock")
            .values()
            .filter(|record| &record.sender == user)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct RecordingSink {
    notices: Arc<Mutex<Vec<Notice>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingSink {
    pub(super) fn notices(&self) -> Vec<Notice> {
        self.notices.lock().expect("lock").clone()
    }

    pub(super) fn fail_next_deliveries(&self) {
        self.failing.store(true, Ordering::Relaxed);
    }
}

impl NotificationSink for RecordingSink {
    fn deliver(&self, notice: Notice) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(NotifyError::Transport("smtp down".to_string()));
        }
        self.notices.lock().expect("lock").push(notice);
        Ok(())
    }
}

fn base_user(id: &str, username: &str, role: Role) -> User {
    User {
        id: UserId(id.to_string()),
        username: username.to_string(),
        first_name: username.to_string(),
        last_name: "Example".to_string(),
        email: format!("{username}@uni.example"),
        phone: format!("98765432{:02}", username.len()),
        role,
        is_active: true,
        is_verified: true,
        created_at: Utc::now(),
    }
}

pub(super) fn student(id: &str) -> UserRecord {
    UserRecord {
        user: base_user(id, &format!("student-{id}"), Role::Student),
        profile: RoleProfile::Student(StudentProfile {
            student_id: format!("CS{}", 1000 + id.len()),
            course: "Computer Science".to_string(),
            year: 3,
            cgpa: Some(8.2),
            tutor: None,
            resume: None,
            address: String::new(),
        }),
    }
}

pub(super) fn provider(id: &str) -> UserRecord {
    UserRecord {
        user: base_user(id, &format!("provider-{id}"), Role::Provider),
        profile: RoleProfile::Provider(ProviderProfile {
            company_name: "Acme Robotics".to_string(),
            company_address: "12 Canal Street".to_string(),
            contact_person: "Pat Morgan".to_string(),
            website: None,
            industry: "Robotics".to_string(),
        }),
    }
}

pub(super) fn tutor(id: &str) -> UserRecord {
    UserRecord {
        user: base_user(id, &format!("tutor-{id}"), Role::Tutor),
        profile: RoleProfile::Tutor(TutorProfile {
            employee_id: format!("EMP{}", 100 + id.len()),
            department: "Engineering".to_string(),
            designation: "Senior Lecturer".to_string(),
            office_location: "B-204".to_string(),
        }),
    }
}

pub(super) fn submission(provider: &UserId) -> PlacementSubmission {
    PlacementSubmission {
        provider: provider.clone(),
        company_name: "Acme Robotics".to_string(),
        job_title: "Junior Controls Engineer".to_string(),
        job_description: "PLC programming and commissioning support.".to_string(),
        start_date: NaiveDate::from_ymd_opt(2026, 6, 1).expect("valid date"),
        end_date: NaiveDate::from_ymd_opt(2026, 9, 1).expect("valid date"),
        location: "Leeds".to_string(),
        geo: None,
        document: None,
    }
}

pub(super) type Service = PlacementService<MemoryPlacements, MemoryUsers, RecordingSink>;

/// Service over fresh in-memory stores, seeded with one student, one
/// provider, and two tutors.
pub(super) fn build_service() -> (
    Arc<Service>,
    Arc<MemoryPlacements>,
    Arc<MemoryUsers>,
    Arc<RecordingSink>,
) {
    let placements = Arc::new(MemoryPlacements::default());
    let users = Arc::new(MemoryUsers::default());
    let sink = Arc::new(RecordingSink::default());

    users.seed(student("stu-1"));
    users.seed(provider("prov-1"));
    users.seed(provider("prov-2"));
    users.seed(tutor("tut-1"));
    users.seed(tutor("tut-2"));

    let service = Arc::new(PlacementService::new(
        placements.clone(),
        users.clone(),
        sink.clone(),
    ));
    (service, placements, users, sink)
}

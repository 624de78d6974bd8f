//! In-memory adapters behind the library's repository and notification
//! seams, plus shared HTTP state. A database-backed deployment swaps
//! these for persistent implementations without touching the services.

use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

use placements::accounts::{
    DirectoryError, Role, UserId, UserRecord, UserRepository, VerificationStore,
};
use placements::notify::{NotificationSink, Notice, NotifyError};
use placements::workflows::placement::{
    Message, MessageId, MessageRepository, PlacementEdit, PlacementId, PlacementRecord,
    PlacementReport, PlacementRepository, PlacementStatus, ReportRepository, RepositoryError,
    TransitionPatch, VisitId, VisitRepository, VisitSchedule,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryUserRepository {
    records: Arc<Mutex<HashMap<UserId, UserRecord>>>,
}

impl UserRepository for InMemoryUserRepository {
    fn insert(&self, record: UserRecord) -> Result<UserRecord, DirectoryError> {
        let mut guard = self.records.lock().expect("directory mutex poisoned");
        if guard.contains_key(&record.user.id) {
            return Err(DirectoryError::Conflict);
        }
        guard.insert(record.user.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: UserRecord) -> Result<(), DirectoryError> {
        let mut guard = self.records.lock().expect("directory mutex poisoned");
        if !guard.contains_key(&record.user.id) {
            return Err(DirectoryError::NotFound);
        }
        guard.insert(record.user.id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &UserId) -> Result<Option<UserRecord>, DirectoryError> {
        Ok(self
            .records
            .lock()
            .expect("directory mutex poisoned")
            .get(id)
            .cloned())
    }

    fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, DirectoryError> {
        Ok(self
            .records
            .lock()
            .expect("directory mutex poisoned")
            .values()
            .find(|record| record.user.username == username)
            .cloned())
    }

    fn email_taken(&self, email: &str) -> Result<bool, DirectoryError> {
        Ok(self
            .records
            .lock()
            .expect("directory mutex poisoned")
            .values()
            .any(|record| record.user.email == email))
    }

    fn phone_taken(&self, phone: &str) -> Result<bool, DirectoryError> {
        Ok(self
            .records
            .lock()
            .expect("directory mutex poisoned")
            .values()
            .any(|record| record.user.phone == phone))
    }

    fn external_id_taken(&self, role: Role, external_id: &str) -> Result<bool, DirectoryError> {
        Ok(self
            .records
            .lock()
            .expect("directory mutex poisoned")
            .values()
            .any(|record| {
                record.user.role == role && record.profile.external_id() == Some(external_id)
            }))
    }

    fn tutors(&self) -> Result<Vec<UserRecord>, DirectoryError> {
        Ok(self
            .records
            .lock()
            .expect("directory mutex poisoned")
            .values()
            .filter(|record| record.user.role == Role::Tutor && record.user.is_active)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryVerificationStore {
    codes: Arc<Mutex<HashMap<UserId, String>>>,
}

impl VerificationStore for InMemoryVerificationStore {
    fn put(&self, user: &UserId, code: String) -> Result<(), DirectoryError> {
        self.codes
            .lock()
            .expect("verification mutex poisoned")
            .insert(user.clone(), code);
        Ok(())
    }

    fn confirm(&self, user: &UserId, code: &str) -> Result<bool, DirectoryError> {
        let mut guard = self.codes.lock().expect("verification mutex poisoned");
        match guard.get(user) {
            Some(stored) if stored == code => {
                guard.remove(user);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryPlacementRepository {
    records: Arc<Mutex<HashMap<PlacementId, PlacementRecord>>>,
}

impl PlacementRepository for InMemoryPlacementRepository {
    fn insert(&self, record: PlacementRecord) -> Result<PlacementRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("placement mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &PlacementId) -> Result<Option<PlacementRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("placement mutex poisoned")
            .get(id)
            .cloned())
    }

    fn apply_transition(
        &self,
        id: &PlacementId,
        patch: TransitionPatch,
        now: DateTime<Utc>,
    ) -> Result<PlacementRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("placement mutex poisoned");
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
        let mut guard = self.records.lock().expect("placement mutex poisoned");
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
            .expect("placement mutex poisoned")
            .values()
            .filter(|record| &record.student == student)
            .cloned()
            .collect())
    }

    fn for_provider(&self, provider: &UserId) -> Result<Vec<PlacementRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("placement mutex poisoned")
            .values()
            .filter(|record| &record.provider == provider)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<PlacementRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("placement mutex poisoned")
            .values()
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryVisitRepository {
    records: Arc<Mutex<HashMap<VisitId, VisitSchedule>>>,
}

impl VisitRepository for InMemoryVisitRepository {
    fn insert(&self, record: VisitSchedule) -> Result<VisitSchedule, RepositoryError> {
        let mut guard = self.records.lock().expect("visit mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &VisitId) -> Result<Option<VisitSchedule>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("visit mutex poisoned")
            .get(id)
            .cloned())
    }

    fn complete(&self, id: &VisitId) -> Result<VisitSchedule, RepositoryError> {
        let mut guard = self.records.lock().expect("visit mutex poisoned");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.completed = true;
        Ok(record.clone())
    }

    fn for_tutor(&self, tutor: &UserId) -> Result<Vec<VisitSchedule>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("visit mutex poisoned")
            .values()
            .filter(|record| &record.tutor == tutor)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<VisitSchedule>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("visit mutex poisoned")
            .values()
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryReportRepository {
    records: Arc<Mutex<Vec<PlacementReport>>>,
}

impl ReportRepository for InMemoryReportRepository {
    fn insert(&self, record: PlacementReport) -> Result<PlacementReport, RepositoryError> {
        self.records
            .lock()
            .expect("report mutex poisoned")
            .push(record.clone());
        Ok(record)
    }

    fn for_placement(&self, id: &PlacementId) -> Result<Vec<PlacementReport>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("report mutex poisoned")
            .iter()
            .filter(|record| &record.placement_request == id)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<PlacementReport>, RepositoryError> {
        Ok(self.records.lock().expect("report mutex poisoned").clone())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryMessageRepository {
    records: Arc<Mutex<HashMap<MessageId, Message>>>,
}

impl MessageRepository for InMemoryMessageRepository {
    fn insert(&self, record: Message) -> Result<Message, RepositoryError> {
        self.records
            .lock()
            .expect("message mutex poisoned")
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &MessageId) -> Result<Option<Message>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("message mutex poisoned")
            .get(id)
            .cloned())
    }

    fn mark_read(&self, id: &MessageId) -> Result<Message, RepositoryError> {
        let mut guard = self.records.lock().expect("message mutex poisoned");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.is_read = true;
        Ok(record.clone())
    }

    fn delete(&self, id: &MessageId) -> Result<(), RepositoryError> {
        self.records
            .lock()
            .expect("message mutex poisoned")
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn for_recipient(&self, user: &UserId) -> Result<Vec<Message>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("message mutex poisoned")
            .values()
            .filter(|record| &record.recipient == user)
            .cloned()
            .collect())
    }

    fn for_sender(&self, user: &UserId) -> Result<Vec<Message>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("message mutex poisoned")
            .values()
            .filter(|record| &record.sender == user)
            .cloned()
            .collect())
    }
}

/// Sink that logs outbound notices instead of delivering mail. SMTP
/// delivery is an external collaborator; this keeps the payloads
/// observable in development.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotificationSink;

impl NotificationSink for LoggingNotificationSink {
    fn deliver(&self, notice: Notice) -> Result<(), NotifyError> {
        info!(
            event = notice.event.label(),
            recipients = notice.recipients.len(),
            subject = %notice.subject,
            "outbound notice"
        );
        Ok(())
    }
}

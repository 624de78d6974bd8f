//! Self-registration flows for the three account roles.
//!
//! Each flow validates field formats and uniqueness, then creates the
//! base user and its role profile in one step. Provider registration is
//! deferred-activation: the account starts inactive and is unlocked by a
//! single-use 6-digit verification code.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use serde::Deserialize;
use tracing::{info, warn};

use crate::notify::{NotificationSink, Notice, NoticeEvent};

use super::domain::{
    ProviderProfile, Role, RoleProfile, StudentProfile, TutorProfile, User, UserId, UserRecord,
};
use super::repository::{DirectoryError, UserRepository, VerificationStore};
use super::validation::{
    require, validate_email, validate_employee_id, validate_phone_number, validate_strong_password,
    validate_student_id, ValidationError,
};

/// Fields shared by every registration flow.
#[derive(Debug, Clone, Deserialize)]
pub struct BaseRegistration {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudentRegistration {
    #[serde(flatten)]
    pub base: BaseRegistration,
    pub student_id: String,
    pub course: String,
    pub year: u8,
    #[serde(default)]
    pub cgpa: Option<f32>,
    #[serde(default)]
    pub tutor: Option<UserId>,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TutorRegistration {
    #[serde(flatten)]
    pub base: BaseRegistration,
    pub employee_id: String,
    pub department: String,
    pub designation: String,
    #[serde(default)]
    pub office_location: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderRegistration {
    #[serde(flatten)]
    pub base: BaseRegistration,
    pub company_name: String,
    #[serde(default)]
    pub company_address: String,
    #[serde(default)]
    pub contact_person: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub industry: String,
}

/// Error raised by the registration service.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a user with this username already exists")]
    UsernameTaken,
    #[error("a user with this email already exists")]
    EmailTaken,
    #[error("a user with this phone number already exists")]
    PhoneTaken,
    #[error("an account with this ID already exists")]
    ExternalIdTaken,
    #[error("verification code does not match")]
    VerificationMismatch,
    #[error("account is already verified")]
    AlreadyVerified,
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

static USER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_user_id() -> UserId {
    let id = USER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    UserId(format!("user-{id:06}"))
}

fn verification_code<R: Rng>(rng: &mut R) -> String {
    format!("{:06}", rng.gen_range(0..1_000_000u32))
}

/// Service composing the user directory, verification store, and
/// notification sink.
pub struct RegistrationService<U, V, N> {
    directory: Arc<U>,
    verifications: Arc<V>,
    notifier: Arc<N>,
}

impl<U, V, N> RegistrationService<U, V, N>
where
    U: UserRepository + 'static,
    V: VerificationStore + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(directory: Arc<U>, verifications: Arc<V>, notifier: Arc<N>) -> Self {
        Self {
            directory,
            verifications,
            notifier,
        }
    }

    pub fn register_student(
        &self,
        registration: StudentRegistration,
    ) -> Result<UserRecord, RegistrationError> {
        self.validate_base(&registration.base)?;
        validate_student_id(&registration.student_id)?;
        require("course", &registration.course)?;
        if !(1..=4).contains(&registration.year) {
            return Err(ValidationError::InvalidYear.into());
        }
        if let Some(cgpa) = registration.cgpa {
            if !(0.0..=10.0).contains(&cgpa) {
                return Err(ValidationError::InvalidCgpa.into());
            }
        }
        let student_id = registration.student_id.to_ascii_uppercase();
        if self
            .directory
            .external_id_taken(Role::Student, &student_id)?
        {
            return Err(RegistrationError::ExternalIdTaken);
        }

        let profile = RoleProfile::Student(StudentProfile {
            student_id,
            course: registration.course,
            year: registration.year,
            cgpa: registration.cgpa,
            tutor: registration.tutor,
            resume: None,
            address: registration.address,
        });
        self.create(registration.base, Role::Student, profile, true)
    }

    pub fn register_tutor(
        &self,
        registration: TutorRegistration,
    ) -> Result<UserRecord, RegistrationError> {
        self.validate_base(&registration.base)?;
        validate_employee_id(&registration.employee_id)?;
        require("department", &registration.department)?;
        require("designation", &registration.designation)?;
        let employee_id = registration.employee_id.to_ascii_uppercase();
        if self.directory.external_id_taken(Role::Tutor, &employee_id)? {
            return Err(RegistrationError::ExternalIdTaken);
        }

        let profile = RoleProfile::Tutor(TutorProfile {
            employee_id,
            department: registration.department,
            designation: registration.designation,
            office_location: registration.office_location,
        });
        self.create(registration.base, Role::Tutor, profile, true)
    }

    /// Deferred-activation variant: the account is created inactive and a
    /// verification code is issued to the registered email address.
    pub fn register_provider(
        &self,
        registration: ProviderRegistration,
    ) -> Result<UserRecord, RegistrationError> {
        self.validate_base(&registration.base)?;
        require("company_name", &registration.company_name)?;

        let profile = RoleProfile::Provider(ProviderProfile {
            company_name: registration.company_name,
            company_address: registration.company_address,
            contact_person: registration.contact_person,
            website: registration.website,
            industry: registration.industry,
        });
        let record = self.create(registration.base, Role::Provider, profile, false)?;

        let code = verification_code(&mut rand::thread_rng());
        self.verifications.put(&record.user.id, code.clone())?;

        let mut details = BTreeMap::new();
        details.insert("code".to_string(), code);
        let notice = Notice {
            event: NoticeEvent::VerificationCode,
            recipients: vec![record.user.email.clone()],
            subject: "Verify your provider account".to_string(),
            details,
        };
        if let Err(err) = self.notifier.deliver(notice) {
            warn!(user = %record.user.username, error = %err, "verification code delivery failed");
        }

        Ok(record)
    }

    /// Compare a submitted code against the stored one; on a match the
    /// account is activated and the code consumed.
    pub fn verify_provider(
        &self,
        user_id: &UserId,
        code: &str,
    ) -> Result<UserRecord, RegistrationError> {
        let mut record = self
            .directory
            .fetch(user_id)?
            .ok_or(DirectoryError::NotFound)?;
        if record.user.is_verified {
            return Err(RegistrationError::AlreadyVerified);
        }
        if !self.verifications.confirm(user_id, code)? {
            return Err(RegistrationError::VerificationMismatch);
        }

        record.user.is_active = true;
        record.user.is_verified = true;
        self.directory.update(record.clone())?;
        info!(user = %record.user.username, "provider account verified");
        Ok(record)
    }

    fn validate_base(&self, base: &BaseRegistration) -> Result<(), RegistrationError> {
        require("username", &base.username)?;
        require("first_name", &base.first_name)?;
        require("last_name", &base.last_name)?;
        validate_email(&base.email)?;
        validate_phone_number(&base.phone)?;
        validate_strong_password(&base.password)?;

        if self.directory.find_by_username(&base.username)?.is_some() {
            return Err(RegistrationError::UsernameTaken);
        }
        if self.directory.email_taken(&base.email)? {
            return Err(RegistrationError::EmailTaken);
        }
        if self.directory.phone_taken(&base.phone)? {
            return Err(RegistrationError::PhoneTaken);
        }
        Ok(())
    }

    fn create(
        &self,
        base: BaseRegistration,
        role: Role,
        profile: RoleProfile,
        active: bool,
    ) -> Result<UserRecord, RegistrationError> {
        let record = UserRecord {
            user: User {
                id: next_user_id(),
                username: base.username,
                first_name: base.first_name,
                last_name: base.last_name,
                email: base.email,
                phone: base.phone,
                role,
                is_active: active,
                is_verified: false,
                created_at: Utc::now(),
            },
            profile,
        };
        let stored = self.directory.insert(record)?;
        info!(user = %stored.user.username, role = role.label(), "new user registered");
        Ok(stored)
    }
}

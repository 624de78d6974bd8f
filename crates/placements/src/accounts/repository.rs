use super::domain::{Role, UserId, UserRecord};

/// Storage abstraction for user accounts so the registration and
/// workflow services can be exercised in isolation.
pub trait UserRepository: Send + Sync {
    fn insert(&self, record: UserRecord) -> Result<UserRecord, DirectoryError>;
    fn update(&self, record: UserRecord) -> Result<(), DirectoryError>;
    fn fetch(&self, id: &UserId) -> Result<Option<UserRecord>, DirectoryError>;
    fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, DirectoryError>;
    fn email_taken(&self, email: &str) -> Result<bool, DirectoryError>;
    fn phone_taken(&self, phone: &str) -> Result<bool, DirectoryError>;
    fn external_id_taken(&self, role: Role, external_id: &str) -> Result<bool, DirectoryError>;
    /// Active tutors, used as the notification pool for provider-approved
    /// requests.
    fn tutors(&self) -> Result<Vec<UserRecord>, DirectoryError>;
}

/// Error enumeration for directory failures.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("account already exists")]
    Conflict,
    #[error("account not found")]
    NotFound,
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Pending provider-verification codes, keyed by user.
///
/// Codes are single-use: `confirm` consumes the stored code on a match
/// and leaves it in place otherwise. No expiry is applied here; an
/// implementation may layer one on.
pub trait VerificationStore: Send + Sync {
    fn put(&self, user: &UserId, code: String) -> Result<(), DirectoryError>;
    fn confirm(&self, user: &UserId, code: &str) -> Result<bool, DirectoryError>;
}

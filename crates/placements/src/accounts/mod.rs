//! User accounts and role provisioning.
//!
//! Every account carries an explicit [`Role`] fixed at registration; the
//! role decides which placement workflow actions the user may perform.
//! Registration validates field formats and uniqueness before creating
//! the base user and its 1:1 role profile in one step.

pub mod domain;
pub mod registration;
pub mod repository;
pub mod router;
pub mod validation;

pub use domain::{
    Actor, ProviderProfile, Role, RoleProfile, StudentProfile, TutorProfile, User, UserId,
    UserRecord,
};
pub use registration::{
    ProviderRegistration, RegistrationError, RegistrationService, StudentRegistration,
    TutorRegistration,
};
pub use repository::{DirectoryError, UserRepository, VerificationStore};
pub use router::accounts_router;
pub use validation::ValidationError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for user accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Account role, fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Tutor,
    Provider,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Tutor => "tutor",
            Role::Provider => "provider",
        }
    }
}

/// Base account shared by all roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Student-side profile joined 1:1 to a [`User`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub student_id: String,
    pub course: String,
    pub year: u8,
    pub cgpa: Option<f32>,
    pub tutor: Option<UserId>,
    pub resume: Option<String>,
    pub address: String,
}

/// University-staff profile joined 1:1 to a [`User`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorProfile {
    pub employee_id: String,
    pub department: String,
    pub designation: String,
    pub office_location: String,
}

/// Employer-side profile joined 1:1 to a [`User`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub company_name: String,
    pub company_address: String,
    pub contact_person: String,
    pub website: Option<String>,
    pub industry: String,
}

/// Role-specific profile as an explicit tagged union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum RoleProfile {
    Student(StudentProfile),
    Tutor(TutorProfile),
    Provider(ProviderProfile),
}

impl RoleProfile {
    pub const fn role(&self) -> Role {
        match self {
            RoleProfile::Student(_) => Role::Student,
            RoleProfile::Tutor(_) => Role::Tutor,
            RoleProfile::Provider(_) => Role::Provider,
        }
    }

    /// The role-specific external identifier, if the role carries one.
    pub fn external_id(&self) -> Option<&str> {
        match self {
            RoleProfile::Student(profile) => Some(&profile.student_id),
            RoleProfile::Tutor(profile) => Some(&profile.employee_id),
            RoleProfile::Provider(_) => None,
        }
    }
}

/// Repository record joining the base user with its role profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user: User,
    pub profile: RoleProfile,
}

impl UserRecord {
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user.id.clone(),
            role: self.user.role,
        }
    }
}

/// The authenticated identity performing a workflow action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

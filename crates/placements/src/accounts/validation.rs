//! Field-format validators shared by the registration flows.

/// Validation failure surfaced to the caller as a field-level message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("password must be at least 8 characters long")]
    PasswordTooShort,
    #[error("password must contain an uppercase letter")]
    PasswordMissingUppercase,
    #[error("password must contain a lowercase letter")]
    PasswordMissingLowercase,
    #[error("password must contain a digit")]
    PasswordMissingDigit,
    #[error("password must contain a special character")]
    PasswordMissingSpecial,
    #[error("password is too common")]
    PasswordTooCommon,
    #[error("password must not repeat the same characters or sequence")]
    PasswordRepeatedCharacters,
    #[error("enter a valid 10-digit phone number starting with 6-9")]
    InvalidPhone,
    #[error("student ID must be 2-3 letters followed by 4-6 digits (e.g. CS1234)")]
    InvalidStudentId,
    #[error("employee ID must be EMP followed by 3-6 digits (e.g. EMP123)")]
    InvalidEmployeeId,
    #[error("enter a valid email address")]
    InvalidEmail,
    #[error("end date must be after start date")]
    InvalidDateRange,
    #[error("year of study must be between 1 and 4")]
    InvalidYear,
    #[error("CGPA must be between 0 and 10")]
    InvalidCgpa,
    #[error("{field} is required")]
    Required { field: &'static str },
}

const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";

const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "12345678",
    "123456789",
    "qwerty123",
    "abc12345",
    "admin123",
    "letmein1",
    "welcome1",
    "iloveyou",
];

/// Strong-password policy: length, character classes, a common-password
/// denylist, and a bound on identical consecutive characters.
pub fn validate_strong_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < 8 {
        return Err(ValidationError::PasswordTooShort);
    }
    if COMMON_PASSWORDS.contains(&password.to_ascii_lowercase().as_str()) {
        return Err(ValidationError::PasswordTooCommon);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::PasswordMissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(ValidationError::PasswordMissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::PasswordMissingDigit);
    }
    if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        return Err(ValidationError::PasswordMissingSpecial);
    }
    if has_repeated_run(password, 3) || has_repeated_block(password) {
        return Err(ValidationError::PasswordRepeatedCharacters);
    }
    Ok(())
}

fn has_repeated_run(value: &str, limit: usize) -> bool {
    let mut run = 0usize;
    let mut previous: Option<char> = None;
    for c in value.chars() {
        if previous == Some(c) {
            run += 1;
            if run >= limit {
                return true;
            }
        } else {
            run = 1;
            previous = Some(c);
        }
    }
    false
}

// An immediately repeated block of 3+ characters ("Aa1!Aa1!") reads as a
// keyboard pattern, not entropy.
fn has_repeated_block(value: &str) -> bool {
    let chars: Vec<char> = value.chars().collect();
    for len in 3..=chars.len() / 2 {
        for start in 0..=chars.len() - 2 * len {
            if chars[start..start + len] == chars[start + len..start + 2 * len] {
                return true;
            }
        }
    }
    false
}

/// 10 digits, first digit 6-9.
pub fn validate_phone_number(value: &str) -> Result<(), ValidationError> {
    let mut chars = value.chars();
    let first = chars.next().ok_or(ValidationError::InvalidPhone)?;
    if !('6'..='9').contains(&first) {
        return Err(ValidationError::InvalidPhone);
    }
    if value.len() != 10 || !chars.all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidPhone);
    }
    Ok(())
}

/// 2-3 uppercase letters followed by 4-6 digits. Input is upcased first,
/// so `cs1234` and `CS1234` are both accepted.
pub fn validate_student_id(value: &str) -> Result<(), ValidationError> {
    let upper = value.to_ascii_uppercase();
    let letters = upper.chars().take_while(|c| c.is_ascii_uppercase()).count();
    let digits = upper.chars().skip(letters).count();
    let all_digits = upper.chars().skip(letters).all(|c| c.is_ascii_digit());
    if !(2..=3).contains(&letters) || !(4..=6).contains(&digits) || !all_digits {
        return Err(ValidationError::InvalidStudentId);
    }
    Ok(())
}

/// `EMP` followed by 3-6 digits, case-insensitive.
pub fn validate_employee_id(value: &str) -> Result<(), ValidationError> {
    let upper = value.to_ascii_uppercase();
    let digits = upper.strip_prefix("EMP").ok_or(ValidationError::InvalidEmployeeId)?;
    if !(3..=6).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidEmployeeId);
    }
    Ok(())
}

/// Minimal shape check; real mailbox validation belongs to delivery.
pub fn validate_email(value: &str) -> Result<(), ValidationError> {
    let Some((local, host)) = value.split_once('@') else {
        return Err(ValidationError::InvalidEmail);
    };
    if local.is_empty() || host.is_empty() || !host.contains('.') || value.contains(char::is_whitespace)
    {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

pub fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(())
}

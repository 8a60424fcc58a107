// core/common/src/validation.rs
// Input validation for accounts, topics, documents and scores

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid username: {0}")]
    InvalidUsername(String),
    #[error("Invalid password: {0}")]
    InvalidPassword(String),
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),
    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),
    #[error("Invalid score: {0}")]
    InvalidScore(String),
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),
    #[error("Input too long: {field} exceeds {max} characters")]
    InputTooLong { field: String, max: usize },
    #[error("XSS attempt detected: potentially dangerous content found")]
    XssAttempt,
    #[error("Required field missing: {0}")]
    MissingField(String),
}

// Input length limits
pub const MAX_USERNAME_LENGTH: usize = 32;
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 64;
pub const MAX_EMAIL_LENGTH: usize = 255;
pub const MAX_NAME_LENGTH: usize = 64;
pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_TEXT_LENGTH: usize = 5000;
pub const MAX_FILE_NAME_LENGTH: usize = 255;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.]+$").expect("username regex"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email regex")
});
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9-]{5,19}$").expect("phone regex"));

/// XSS prevention
pub fn validate_no_xss(input: &str) -> Result<(), ValidationError> {
    let dangerous_patterns = [
        "<script", "javascript:", "onerror=", "onclick=",
        "onload=", "<iframe", "document.cookie", "eval(",
    ];

    let input_lower = input.to_lowercase();
    for pattern in &dangerous_patterns {
        if input_lower.contains(pattern) {
            return Err(ValidationError::XssAttempt);
        }
    }
    Ok(())
}

/// Length validation, counted in characters
pub fn validate_max_length(field: &str, input: &str, max: usize) -> Result<(), ValidationError> {
    if input.chars().count() > max {
        return Err(ValidationError::InputTooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

pub fn validate_required(field: &str, input: &str) -> Result<(), ValidationError> {
    if input.trim().is_empty() {
        return Err(ValidationError::MissingField(field.to_string()));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len) {
        return Err(ValidationError::InvalidUsername(format!(
            "must be {} to {} characters",
            MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
        )));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(ValidationError::InvalidUsername(
            "only letters, digits, '_' and '.' are allowed".to_string(),
        ));
    }
    Ok(())
}

/// At least one letter and one digit
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&len) {
        return Err(ValidationError::InvalidPassword(format!(
            "must be {} to {} characters",
            MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH
        )));
    }
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(ValidationError::InvalidPassword(
            "must contain letters and digits".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    validate_max_length("email", email, MAX_EMAIL_LENGTH)?;
    validate_no_xss(email)?;

    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::InvalidEmail(
            "Must be in format: user@domain.tld".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if !PHONE_RE.is_match(phone) {
        return Err(ValidationError::InvalidPhone(
            "digits and '-' only, 6 to 20 characters".to_string(),
        ));
    }
    Ok(())
}

/// Required single-line text such as a topic title or department name
pub fn validate_title(field: &str, input: &str, max: usize) -> Result<(), ValidationError> {
    validate_required(field, input)?;
    validate_max_length(field, input, max)?;
    validate_no_xss(input)
}

/// Optional free text such as descriptions, review comments, notice content
pub fn validate_text(field: &str, input: &str, max: usize) -> Result<(), ValidationError> {
    validate_max_length(field, input, max)?;
    validate_no_xss(input)
}

pub fn validate_score(field: &str, score: f64) -> Result<(), ValidationError> {
    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        return Err(ValidationError::InvalidScore(format!(
            "{} must be between 0 and 100",
            field
        )));
    }
    Ok(())
}

pub fn validate_file_name(name: &str) -> Result<(), ValidationError> {
    validate_required("file_name", name)?;
    validate_max_length("file_name", name, MAX_FILE_NAME_LENGTH)?;

    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(ValidationError::InvalidFileName(
            "must not contain path separators".to_string(),
        ));
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidFileName(
            "must not contain control characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_no_xss_safe() {
        assert!(validate_no_xss("Distributed cache design").is_ok());
        assert!(validate_no_xss("user@example.com").is_ok());
    }

    #[test]
    fn test_validate_no_xss_dangerous() {
        assert!(validate_no_xss("<script>alert('xss')</script>").is_err());
        assert!(validate_no_xss("javascript:alert(1)").is_err());
        assert!(validate_no_xss("<img onerror='alert(1)'>").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("zhang.wei").is_ok());
        assert!(validate_username("t_2024").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"a".repeat(33)).is_err());
        assert!(validate_username("bad name").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("Secret123").is_ok());
        assert!(validate_password("short1").is_err());
        assert!(validate_password("lettersonly").is_err());
        assert!(validate_password("1234567890").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("test.user@domain.edu.cn").is_ok());
        assert!(validate_email("notanemail").is_err());
        assert!(validate_email("@example.com").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("13800138000").is_ok());
        assert!(validate_phone("+86-10-62751234").is_ok());
        assert!(validate_phone("12ab").is_err());
    }

    #[test]
    fn test_validate_title() {
        assert!(validate_title("title", "Cache coherence in web services", MAX_TITLE_LENGTH).is_ok());
        assert!(matches!(
            validate_title("title", "   ", MAX_TITLE_LENGTH),
            Err(ValidationError::MissingField(_))
        ));
        assert!(matches!(
            validate_title("title", &"x".repeat(201), MAX_TITLE_LENGTH),
            Err(ValidationError::InputTooLong { .. })
        ));
    }

    #[test]
    fn test_max_length_counts_characters() {
        // Multi-byte characters count once each
        assert!(validate_max_length("name", "计算机学院", 5).is_ok());
        assert!(validate_max_length("name", "计算机科学学院", 5).is_err());
    }

    #[test]
    fn test_validate_score() {
        assert!(validate_score("advisor_score", 0.0).is_ok());
        assert!(validate_score("advisor_score", 100.0).is_ok());
        assert!(validate_score("advisor_score", 100.5).is_err());
        assert!(validate_score("advisor_score", -1.0).is_err());
        assert!(validate_score("advisor_score", f64::NAN).is_err());
    }

    #[test]
    fn test_validate_file_name() {
        assert!(validate_file_name("proposal.pdf").is_ok());
        assert!(validate_file_name("../etc/passwd").is_err());
        assert!(validate_file_name("a/b.pdf").is_err());
        assert!(validate_file_name("").is_err());
    }
}

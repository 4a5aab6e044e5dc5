/// Input validators
/// 1. Length limits on every free-text field
/// 2. Email format and phishing-shape checks
/// 3. Control-character rejection in note titles

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 3;
const MAX_LOCAL_PART_LENGTH: usize = 64;
const MAX_TITLE_LENGTH: usize = 200;
const MAX_CONTENT_LENGTH: usize = 10_000;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).expect("email regex is valid");
}

/// Validates an email address and returns it trimmed
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    if has_suspicious_email_patterns(trimmed) {
        return Err(ValidationError::SuspiciousContent("email".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a note title and returns it trimmed
pub fn is_valid_note_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("title".to_string()));
    }

    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        return Err(ValidationError::TooLong("title".to_string(), MAX_TITLE_LENGTH));
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::SuspiciousContent("title".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates note content; newlines and tabs are allowed, other control characters are not
pub fn is_valid_note_content(content: &str) -> Result<(), ValidationError> {
    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(ValidationError::TooLong("content".to_string(), MAX_CONTENT_LENGTH));
    }

    if content.contains('\0') {
        return Err(ValidationError::SuspiciousContent("content".to_string()));
    }

    Ok(())
}

fn has_suspicious_email_patterns(email: &str) -> bool {
    // Overlong local part is a phishing indicator
    if let Some(at_pos) = email.find('@') {
        if email[..at_pos].len() > MAX_LOCAL_PART_LENGTH {
            return true;
        }
    }

    if email.matches('@').count() != 1 {
        return true;
    }

    email.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(is_valid_email("user@example.com").is_ok());
        assert!(is_valid_email("a@x.com").is_ok());
        assert!(is_valid_email("user+tag@example.com").is_ok());
        assert_eq!(is_valid_email("  user@example.com ").unwrap(), "user@example.com");
    }

    #[test]
    fn test_invalid_email_format() {
        assert!(is_valid_email("invalid").is_err());
        assert!(is_valid_email("user@").is_err());
        assert!(is_valid_email("@example.com").is_err());
        assert!(is_valid_email("user@@example.com").is_err());
        assert!(is_valid_email("").is_err());
    }

    #[test]
    fn test_email_length_limits() {
        let too_long = format!("{}@example.com", "a".repeat(250));
        assert!(is_valid_email(&too_long).is_err());

        let long_local = format!("{}@example.com", "a".repeat(65));
        assert_eq!(
            is_valid_email(&long_local).unwrap_err(),
            ValidationError::SuspiciousContent("email".to_string())
        );
    }

    #[test]
    fn test_note_title() {
        assert_eq!(is_valid_note_title("  Groceries ").unwrap(), "Groceries");
        assert!(is_valid_note_title("   ").is_err());
        assert!(is_valid_note_title("bad\u{7}title").is_err());
        assert!(is_valid_note_title(&"t".repeat(201)).is_err());
    }

    #[test]
    fn test_note_content() {
        assert!(is_valid_note_content("line one\nline two\t").is_ok());
        assert!(is_valid_note_content("").is_ok());
        assert!(is_valid_note_content("nul\0byte").is_err());
        assert!(is_valid_note_content(&"x".repeat(10_001)).is_err());
    }
}

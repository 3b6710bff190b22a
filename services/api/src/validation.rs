//! Input validation for user payloads

use regex::Regex;
use std::sync::OnceLock;

use crate::models::RegisterUser;

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("username is required".to_string());
    }

    if username.len() < 3 {
        return Err("username must be at least 3 characters long".to_string());
    }

    if username.len() > 32 {
        return Err("username must be at most 32 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err("username can only contain letters, numbers, and underscores".to_string());
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("email is required".to_string());
    }

    if email.len() > 254 {
        return Err("email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("email: invalid format".to_string());
    }

    Ok(())
}

/// Validate password.
///
/// Only presence and length are checked; the stored column accepts any text.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("password is required".to_string());
    }

    if password.chars().count() > 128 {
        return Err("password must be at most 128 characters long".to_string());
    }

    Ok(())
}

/// Validate a registration payload, reporting the first failing field
pub fn validate_registration(payload: &RegisterUser) -> Result<(), String> {
    validate_username(&payload.username)?;
    validate_password(&payload.password)?;
    validate_email(&payload.email)?;

    if let Some(role) = &payload.role {
        if role.trim().is_empty() {
            return Err("role must not be blank".to_string());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> RegisterUser {
        RegisterUser {
            username: "ada_lovelace".to_string(),
            password: "hunter2".to_string(),
            email: "ada@example.com".to_string(),
            name: None,
            role: None,
        }
    }

    #[test]
    fn test_valid_registration() {
        assert!(validate_registration(&payload()).is_ok());
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("").is_err());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"a".repeat(33)).is_err());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username("good_name_1").is_ok());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("user@example").is_err());
        assert!(validate_email("user@example.com").is_ok());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("").is_err());
        assert!(validate_password(&"x".repeat(129)).is_err());
        assert!(validate_password("x").is_ok());

        // Length is counted in characters
        assert!(validate_password(&"é".repeat(65)).is_ok());
        assert!(validate_password(&"é".repeat(128)).is_ok());
        assert!(validate_password(&"é".repeat(129)).is_err());
    }

    #[test]
    fn test_first_failing_field_is_reported() {
        let mut invalid = payload();
        invalid.email = "nope".to_string();
        assert_eq!(
            validate_registration(&invalid).unwrap_err(),
            "email: invalid format"
        );

        invalid.role = Some("  ".to_string());
        invalid.email = "ok@example.com".to_string();
        assert_eq!(
            validate_registration(&invalid).unwrap_err(),
            "role must not be blank"
        );
    }
}

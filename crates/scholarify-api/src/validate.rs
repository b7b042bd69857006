//! Input checks shared by the account and contact handlers.

use email_address::EmailAddress;

use crate::error::ApiError;

pub const USERNAME_MAX: usize = 150;
pub const FIRST_NAME_MAX: usize = 150;
pub const PHONE_MAX: usize = 30;
pub const PASSWORD_MIN: usize = 8;

pub fn username(value: &str) -> Result<(), ApiError> {
    let len = value.chars().count();
    if !(3..=USERNAME_MAX).contains(&len) {
        return Err(ApiError::bad_request(format!(
            "Username must be between 3 and {} characters",
            USERNAME_MAX
        )));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '_' | '-');
    if !value.chars().all(allowed) {
        return Err(ApiError::bad_request(
            "Username may only contain letters, digits and @/./+/-/_",
        ));
    }
    Ok(())
}

pub fn password(value: &str, confirm: &str) -> Result<(), ApiError> {
    if value.chars().count() < PASSWORD_MIN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN
        )));
    }
    if value.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::bad_request("Password cannot be entirely numeric"));
    }
    if value != confirm {
        return Err(ApiError::bad_request("Passwords do not match"));
    }
    Ok(())
}

/// Syntax check via `email_address`, plus a dotted domain (`local@domain.tld`).
pub fn email(value: &str) -> Result<(), ApiError> {
    let valid = value
        .parse::<EmailAddress>()
        .is_ok_and(|addr| addr.domain().contains('.'));
    if !valid {
        return Err(ApiError::bad_request("Enter a valid email address"));
    }
    Ok(())
}

/// Rejects values longer than `max` characters.
pub fn max_len(field: &str, value: &str, max: usize) -> Result<(), ApiError> {
    if value.chars().count() > max {
        return Err(ApiError::bad_request(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

pub fn required(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{} is required", field)));
    }
    Ok(())
}

/// `next` if it is a path on this site, otherwise `/`.
pub fn safe_redirect(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(username("ada.lovelace+1@x").is_ok());
        assert!(username("ab").is_err());
        assert!(username("has space").is_err());
        assert!(username(&"a".repeat(151)).is_err());
    }

    #[test]
    fn passwords() {
        assert!(password("s3cret-pass", "s3cret-pass").is_ok());
        assert!(password("short1", "short1").is_err());
        assert!(password("12345678", "12345678").is_err());
        assert!(password("s3cret-pass", "s3cret-pasS").is_err());
    }

    #[test]
    fn emails() {
        assert!(email("me@example.com").is_ok());
        assert!(email("first.last@mail.example.org").is_ok());
        assert!(email("me@example").is_err());
        assert!(email("@example.com").is_err());
        assert!(email("me@@example.com").is_err());
        assert!(email("me @example.com").is_err());
        assert!(email("plain").is_err());
    }

    #[test]
    fn redirects_stay_on_site() {
        assert_eq!(safe_redirect(Some("/listings?type=JOB")), "/listings?type=JOB");
        assert_eq!(safe_redirect(Some("//evil.example")), "/");
        assert_eq!(safe_redirect(Some("https://evil.example")), "/");
        assert_eq!(safe_redirect(Some("/\\evil.example")), "/");
        assert_eq!(safe_redirect(Some("")), "/");
        assert_eq!(safe_redirect(None), "/");
    }
}

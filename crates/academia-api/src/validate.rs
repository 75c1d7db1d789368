//! Form field checks shared by the registration, profile and settings handlers.

use chrono::NaiveDate;

use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Trimmed display name, 2 to 120 characters.
pub fn name(raw: &str) -> Result<String, AppError> {
    let name = raw.trim();
    let len = name.chars().count();
    if !(2..=120).contains(&len) {
        return Err(AppError::validation("Name must be between 2 and 120 characters."));
    }
    Ok(name.to_string())
}

/// Trimmed, lowercased email with a plausible `local@domain.tld` shape.
pub fn email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && domain.split('.').all(|label| !label.is_empty())
                && email.len() <= 120
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(AppError::validation("Please enter a valid email address."));
    }
    Ok(email)
}

pub fn password(raw: &str) -> Result<(), AppError> {
    if raw.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {} characters.",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// `YYYY-MM-DD`
pub fn birth_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::validation("Birth date must look like YYYY-MM-DD."))
}

/// Empty or whitespace-only input counts as absent.
pub fn optional_text(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

use crate::error::{AppError, AppResult};
use regex::Regex;
use std::sync::OnceLock;

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
            .expect("email regex is valid")
    })
}

/// Trimmed and lower-cased; the key participants are compared on.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates and normalizes an email address.
pub fn validate_email(email: &str) -> AppResult<String> {
    let normalized = normalize_email(email);
    if normalized.len() > 254 || !email_regex().is_match(&normalized) {
        return Err(AppError::ValidationError(format!(
            "Invalid email address: {}",
            email.trim()
        )));
    }
    Ok(normalized)
}

/// The part before `@`, used as a greeting when no account exists.
pub fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

use bcrypt::DEFAULT_COST;

use crate::error::{AppError, AppResult};

pub const MIN_PASSWORD_CHARS: usize = 6;

/// Signup only asks for a minimum length; no character classes.
pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::ValidationError(format!(
            "Password must contain at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> AppResult<String> {
    bcrypt::hash(password, DEFAULT_COST)
        .map_err(|e| AppError::InternalError(format!("Unable to hash password: {e}")))
}

/// `Ok(false)` for a wrong password; `Err` only for a malformed hash.
pub fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    bcrypt::verify(password, password_hash)
        .map_err(|e| AppError::InternalError(format!("Unable to check password: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_needs_six_characters() {
        assert!(validate_password("secret").is_ok());
        assert!(validate_password("secret1").is_ok());
        assert!(validate_password("abcde").is_err());
        assert!(validate_password("").is_err());
        // counted in characters, not bytes
        assert!(validate_password("ééééé").is_err());
    }

    #[test]
    fn test_bcrypt_round_trip() {
        let stored = hash_password("secret1").unwrap();
        assert_ne!(stored, "secret1");
        assert!(verify_password("secret1", &stored).unwrap());
        assert!(!verify_password("secret2", &stored).unwrap());
    }
}

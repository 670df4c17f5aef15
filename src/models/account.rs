use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::utils::{validate_email, validate_password};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub nickname: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Validated signup data; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub nickname: String,
    pub password_hash: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignupRequest {
    #[schema(example = "ann@example.com")]
    pub email: String,
    #[schema(example = "Ann")]
    pub firstname: String,
    #[schema(example = "Lee")]
    pub lastname: String,
    #[schema(example = "annie")]
    pub nickname: String,
    #[schema(example = "Password123")]
    pub password: String,
}

fn validate_name(field: &str, value: &str) -> AppResult<String> {
    let value = value.trim();
    if !(2..=30).contains(&value.chars().count()) {
        return Err(AppError::ValidationError(format!(
            "{field} must be between 2 and 30 characters"
        )));
    }
    Ok(value.to_string())
}

/// Normalized email, firstname, lastname and nickname.
pub type ProfileFields = (String, String, String, String);

fn validate_profile(
    email: &str,
    firstname: &str,
    lastname: &str,
    nickname: &str,
) -> AppResult<ProfileFields> {
    Ok((
        validate_email(email)?,
        validate_name("Firstname", firstname)?,
        validate_name("Lastname", lastname)?,
        validate_name("Nickname", nickname)?,
    ))
}

impl SignupRequest {
    /// Normalized email and names; the password is checked but not hashed.
    pub fn validate(&self) -> AppResult<ProfileFields> {
        let fields = validate_profile(&self.email, &self.firstname, &self.lastname, &self.nickname)?;
        validate_password(&self.password)?;
        Ok(fields)
    }
}

/// Full replacement of the editable profile fields.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateAccountRequest {
    #[schema(example = "ann@example.com")]
    pub email: String,
    #[schema(example = "Ann")]
    pub firstname: String,
    #[schema(example = "Lee")]
    pub lastname: String,
    #[schema(example = "annie")]
    pub nickname: String,
}

impl UpdateAccountRequest {
    pub fn validate(&self) -> AppResult<ProfileFields> {
        validate_profile(&self.email, &self.firstname, &self.lastname, &self.nickname)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "ann@example.com")]
    pub email: String,
    #[schema(example = "Password123")]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    pub id: i64,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub nickname: String,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            firstname: account.firstname,
            lastname: account.lastname,
            nickname: account.nickname,
            created_at: account.created_at,
        }
    }
}

/// Public part of an account shown to other participants.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountSummary {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub nickname: String,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            firstname: account.firstname.clone(),
            lastname: account.lastname.clone(),
            nickname: account.nickname.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub account: AccountResponse,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SignupRequest {
        SignupRequest {
            email: " Ann@Example.com ".to_string(),
            firstname: "Ann".to_string(),
            lastname: "Lee".to_string(),
            nickname: " annie ".to_string(),
            password: "Password123".to_string(),
        }
    }

    #[test]
    fn test_signup_validation_normalizes() {
        let (email, firstname, _, nickname) = request().validate().unwrap();
        assert_eq!(email, "ann@example.com");
        assert_eq!(firstname, "Ann");
        assert_eq!(nickname, "annie");
    }

    #[test]
    fn test_signup_validation_rejects() {
        let mut r = request();
        r.firstname = "A".to_string();
        assert!(matches!(r.validate(), Err(AppError::ValidationError(_))));

        let mut r = request();
        r.password = "12345".to_string();
        assert!(r.validate().is_err());

        let mut r = request();
        r.password = "secret1".to_string();
        assert!(r.validate().is_ok());

        let mut r = request();
        r.email = "not-an-email".to_string();
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_update_request_uses_signup_name_rules() {
        let update = UpdateAccountRequest {
            email: "ANN@example.com".to_string(),
            firstname: "Ann".to_string(),
            lastname: " Lee ".to_string(),
            nickname: "annie".to_string(),
        };
        let (email, _, lastname, _) = update.validate().unwrap();
        assert_eq!(email, "ann@example.com");
        assert_eq!(lastname, "Lee");

        let too_long = UpdateAccountRequest {
            nickname: "n".repeat(31),
            ..update
        };
        assert!(matches!(too_long.validate(), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let account = Account {
            id: 1,
            email: "ann@example.com".to_string(),
            firstname: "Ann".to_string(),
            lastname: "Lee".to_string(),
            nickname: "annie".to_string(),
            password_hash: "secret-hash".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}

use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::load_account;
use crate::store::{SharedAccountStore, SharedEventStore, mutate_event};
use crate::utils::*;

#[derive(Clone)]
pub struct AuthService {
    accounts: SharedAccountStore,
    events: SharedEventStore,
    jwt_service: JwtService,
}

impl AuthService {
    pub fn new(accounts: SharedAccountStore, events: SharedEventStore, jwt_service: JwtService) -> Self {
        Self {
            accounts,
            events,
            jwt_service,
        }
    }

    fn issue_tokens(&self, account: Account) -> AppResult<AuthResponse> {
        let access_token = self
            .jwt_service
            .generate_access_token(account.id, &account.email)?;
        let refresh_token = self
            .jwt_service
            .generate_refresh_token(account.id, &account.email)?;

        Ok(AuthResponse {
            account: AccountResponse::from(account),
            access_token,
            refresh_token,
            expires_in: self.jwt_service.get_access_token_expires_in(),
        })
    }

    pub async fn signup(&self, request: SignupRequest) -> AppResult<AuthResponse> {
        let (email, firstname, lastname, nickname) = request.validate()?;

        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        if self.accounts.find_by_nickname(&nickname).await?.is_some() {
            return Err(AppError::Conflict("Nickname already taken".to_string()));
        }

        let account = self
            .accounts
            .insert(NewAccount {
                email,
                firstname,
                lastname,
                nickname,
                password_hash: hash_password(&request.password)?,
            })
            .await?;
        log::info!("Account {} created", account.id);

        // Best-effort: invitations received before signup
        if let Err(e) = self.link_pending_invitations(&account).await {
            log::warn!(
                "Failed to link pending invitations for account {}: {}",
                account.id,
                e
            );
        }

        self.issue_tokens(account)
    }

    /// Attaches the new account to invitations addressed to its email.
    async fn link_pending_invitations(&self, account: &Account) -> AppResult<usize> {
        let events = self.events.find_by_participant_email(&account.email).await?;
        let mut linked = 0;
        for event in events {
            let pending = event
                .participants
                .get(&account.email)
                .is_some_and(|p| p.account_id.is_none());
            if !pending {
                continue;
            }
            let (_, changed) = mutate_event(self.events.as_ref(), event.id, |e| {
                Ok(e.participants.link_pending(&account.email, account.id))
            })
            .await?;
            if changed {
                linked += 1;
            }
        }
        if linked > 0 {
            log::info!("Linked {} pending invitations to account {}", linked, account.id);
        }
        Ok(linked)
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        let account = self
            .accounts
            .find_by_email(&request.email)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

        if !verify_password(&request.password, &account.password_hash)? {
            return Err(AppError::Unauthorized("Invalid email or password".to_string()));
        }

        self.issue_tokens(account)
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthResponse> {
        let claims = self.jwt_service.verify_refresh_token(refresh_token)?;
        let account_id = claims.account_id()?;

        let account = self
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;

        let access_token = self
            .jwt_service
            .generate_access_token(account.id, &account.email)?;

        Ok(AuthResponse {
            account: AccountResponse::from(account),
            access_token,
            refresh_token: refresh_token.to_string(),
            expires_in: self.jwt_service.get_access_token_expires_in(),
        })
    }

    pub async fn me(&self, account_id: i64) -> AppResult<AccountResponse> {
        load_account(self.accounts.as_ref(), account_id)
            .await
            .map(AccountResponse::from)
    }

    /// Replaces email and names. Email and nickname must not belong to
    /// another account.
    pub async fn update_profile(
        &self,
        account_id: i64,
        request: UpdateAccountRequest,
    ) -> AppResult<AccountResponse> {
        let (email, firstname, lastname, nickname) = request.validate()?;
        let mut account = load_account(self.accounts.as_ref(), account_id).await?;

        if let Some(owner) = self.accounts.find_by_email(&email).await?
            && owner.id != account_id
        {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        if let Some(owner) = self.accounts.find_by_nickname(&nickname).await?
            && owner.id != account_id
        {
            return Err(AppError::Conflict("Nickname already taken".to_string()));
        }

        let previous_email = std::mem::replace(&mut account.email, email);
        account.firstname = firstname;
        account.lastname = lastname;
        account.nickname = nickname;
        let account = self.accounts.update(&account).await?;
        log::info!("Account {} updated its profile", account_id);

        if account.email != previous_email
            && let Err(e) = self.move_roster_entries(&account, &previous_email).await
        {
            log::warn!(
                "Failed to move event entries of account {} to its new email: {}",
                account_id,
                e
            );
        }

        Ok(AccountResponse::from(account))
    }

    /// Rosters are keyed by email; follow the account to its new address.
    async fn move_roster_entries(&self, account: &Account, previous_email: &str) -> AppResult<()> {
        for event in self.events.find_by_participant_email(previous_email).await? {
            mutate_event(self.events.as_ref(), event.id, |e| {
                Ok(e.participants.rename_account(account.id, &account.email))
            })
            .await?;
        }
        Ok(())
    }

    /// Public view of any account.
    pub async fn get_account(&self, account_id: i64) -> AppResult<AccountSummary> {
        self.accounts
            .find_by_id(account_id)
            .await?
            .map(|a| AccountSummary::from(&a))
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
    }
}

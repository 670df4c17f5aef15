pub mod auth_service;
pub mod draw_service;
pub mod event_service;
pub mod gift_service;
#[cfg(test)]
pub(crate) mod testing;

pub use auth_service::*;
pub use draw_service::*;
pub use event_service::*;
pub use gift_service::*;

use crate::error::{AppError, AppResult};
use crate::models::Account;
use crate::store::AccountStore;

/// The authenticated account; a token for a deleted account is rejected.
pub(crate) async fn load_account(accounts: &dyn AccountStore, account_id: i64) -> AppResult<Account> {
    accounts
        .find_by_id(account_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account not found".to_string()))
}

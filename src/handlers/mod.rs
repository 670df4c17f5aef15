pub mod auth;
pub mod event;
pub mod gift;

pub use auth::{account_config, auth_config};
pub use event::event_config;

use actix_web::{HttpMessage, HttpRequest};

use crate::error::{AppError, AppResult};

/// Account id stored by the auth middleware.
fn current_account_id(req: &HttpRequest) -> AppResult<i64> {
    req.extensions()
        .get::<i64>()
        .copied()
        .ok_or_else(|| AppError::Unauthorized("Missing access token".to_string()))
}

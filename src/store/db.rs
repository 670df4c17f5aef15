use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, NotSet, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use serde_json::json;
use uuid::Uuid;

use super::{AccountStore, EventStore};
use crate::entities::{account_entity as accounts, event_entity as events};
use crate::error::{AppError, AppResult};
use crate::models::{Account, Event, NewAccount};
use crate::utils::normalize_email;

#[derive(Clone)]
pub struct DbEventStore {
    pool: DatabaseConnection,
}

impl DbEventStore {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for DbEventStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Event>> {
        events::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .map(events::Model::into_event)
            .transpose()
    }

    async fn insert(&self, event: &mut Event) -> AppResult<()> {
        event.version = 1;
        let document = serde_json::to_value(&*event)?;

        events::ActiveModel {
            id: Set(event.id),
            organizer_id: Set(event.organizer_id),
            event_type: Set(event.event_type.as_str().to_string()),
            name: Set(event.name.clone()),
            date: Set(event.date),
            drawn_at: Set(event.drawn_at),
            version: Set(event.version),
            document: Set(document),
            created_at: Set(event.created_at),
            updated_at: Set(event.updated_at),
        }
        .insert(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_if_unchanged(&self, event: &mut Event) -> AppResult<bool> {
        let expected = event.version;
        let mut next = event.clone();
        next.version = expected + 1;
        let document = serde_json::to_value(&next)?;

        // Zero rows means another request saved first
        let result = events::Entity::update_many()
            .col_expr(events::Column::EventType, Expr::value(next.event_type.as_str()))
            .col_expr(events::Column::Name, Expr::value(next.name.clone()))
            .col_expr(events::Column::Date, Expr::value(next.date))
            .col_expr(events::Column::DrawnAt, Expr::value(next.drawn_at))
            .col_expr(events::Column::Version, Expr::value(next.version))
            .col_expr(events::Column::Document, Expr::value(document))
            .col_expr(events::Column::UpdatedAt, Expr::value(next.updated_at))
            .filter(events::Column::Id.eq(event.id))
            .filter(events::Column::Version.eq(expected))
            .exec(&self.pool)
            .await?;

        if result.rows_affected == 1 {
            *event = next;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = events::Entity::delete_by_id(id).exec(&self.pool).await?;
        Ok(result.rows_affected == 1)
    }

    async fn find_by_participant_email(&self, email: &str) -> AppResult<Vec<Event>> {
        let needle = json!([{ "email": normalize_email(email) }]);

        events::Entity::find()
            .filter(Expr::cust_with_values(
                "document -> 'participants' @> ?",
                [needle],
            ))
            .order_by_desc(events::Column::CreatedAt)
            .all(&self.pool)
            .await?
            .into_iter()
            .map(events::Model::into_event)
            .collect()
    }
}

#[derive(Clone)]
pub struct DbAccountStore {
    pool: DatabaseConnection,
}

impl DbAccountStore {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for DbAccountStore {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Account>> {
        Ok(accounts::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .map(Account::from))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        Ok(accounts::Entity::find()
            .filter(accounts::Column::Email.eq(normalize_email(email)))
            .one(&self.pool)
            .await?
            .map(Account::from))
    }

    async fn find_by_nickname(&self, nickname: &str) -> AppResult<Option<Account>> {
        Ok(accounts::Entity::find()
            .filter(accounts::Column::Nickname.eq(nickname))
            .one(&self.pool)
            .await?
            .map(Account::from))
    }

    async fn insert(&self, account: NewAccount) -> AppResult<Account> {
        let now = Utc::now();
        let model = accounts::ActiveModel {
            id: NotSet,
            email: Set(account.email),
            firstname: Set(account.firstname),
            lastname: Set(account.lastname),
            nickname: Set(account.nickname),
            password_hash: Set(account.password_hash),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.pool)
        .await
        .map_err(unique_violation)?;

        Ok(model.into())
    }

    async fn update(&self, account: &Account) -> AppResult<Account> {
        let model = accounts::ActiveModel {
            id: Set(account.id),
            email: Set(account.email.clone()),
            firstname: Set(account.firstname.clone()),
            lastname: Set(account.lastname.clone()),
            nickname: Set(account.nickname.clone()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.pool)
        .await
        .map_err(|e| match e {
            DbErr::RecordNotUpdated => AppError::NotFound("Account not found".to_string()),
            e => unique_violation(e),
        })?;

        Ok(model.into())
    }
}

/// Turns a unique index hit on `accounts` into a `Conflict` naming the column.
fn unique_violation(e: DbErr) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) if detail.contains("nickname") => {
            AppError::Conflict("Nickname already taken".to_string())
        }
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Email already registered".to_string())
        }
        _ => AppError::DatabaseError(e),
    }
}

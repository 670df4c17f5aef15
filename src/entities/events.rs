use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Event;

/// One row per event. `document` holds the serialized [`Event`]; the other
/// columns mirror it for filtering and for the conditional save on `version`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organizer_id: i64,
    pub event_type: String,
    pub name: String,
    pub date: DateTime<Utc>,
    pub drawn_at: Option<DateTime<Utc>>,
    pub version: i64,
    #[sea_orm(column_type = "JsonBinary")]
    pub document: Json,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Decodes the stored document; the row's `version` column wins over the
    /// copy inside the document.
    pub fn into_event(self) -> AppResult<Event> {
        let mut event: Event = serde_json::from_value(self.document).map_err(|e| {
            AppError::InternalError(format!("Corrupt event document {}: {e}", self.id))
        })?;
        event.version = self.version;
        Ok(event)
    }
}

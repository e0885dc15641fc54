//! Ledger entries.
//!
//! A `LedgerEntry` is a single income, expense or budget line owned by one
//! user. The ledger is the source of truth: the running totals stored in
//! [`user_aggregates`](crate::aggregates) are always derivable from it.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Income,
    Expense,
    Budget,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Budget => "budget",
        }
    }
}

impl TryFrom<&str> for EntryKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "budget" => Ok(Self::Budget),
            other => Err(EngineError::Validation(format!(
                "invalid entry kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub user_id: String,
    pub kind: EntryKind,
    pub amount: Money,
    pub title: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub idempotency_key: Option<String>,
    /// Optimistic concurrency token, bumped by every update.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub title: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub occurred_at: DateTimeUtc,
    pub idempotency_key: Option<String>,
    pub version: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::aggregates::Entity",
        from = "Column::UserId",
        to = "super::aggregates::Column::UserId",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Aggregate,
}

impl Related<super::aggregates::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Aggregate.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&LedgerEntry> for ActiveModel {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id),
            user_id: ActiveValue::Set(entry.user_id.clone()),
            kind: ActiveValue::Set(entry.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(entry.amount.minor()),
            title: ActiveValue::Set(entry.title.clone()),
            category: ActiveValue::Set(entry.category.clone()),
            description: ActiveValue::Set(entry.description.clone()),
            occurred_at: ActiveValue::Set(entry.occurred_at),
            idempotency_key: ActiveValue::Set(entry.idempotency_key.clone()),
            version: ActiveValue::Set(entry.version),
            created_at: ActiveValue::Set(entry.created_at),
            updated_at: ActiveValue::Set(entry.updated_at),
        }
    }
}

impl TryFrom<Model> for LedgerEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            kind: EntryKind::try_from(model.kind.as_str())?,
            amount: Money::from_minor(model.amount_minor),
            title: model.title,
            category: model.category,
            description: model.description,
            occurred_at: model.occurred_at,
            idempotency_key: model.idempotency_key,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Loads an entry owned by `user_id`.
///
/// Entries of other users are reported as missing, so callers cannot probe
/// for foreign ids.
pub(crate) async fn find_owned<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    id: Uuid,
) -> ResultEngine<Model> {
    Entity::find_by_id(id)
        .filter(Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("transaction {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_storage_name() {
        for kind in [EntryKind::Income, EntryKind::Expense, EntryKind::Budget] {
            assert_eq!(EntryKind::try_from(kind.as_str()).unwrap(), kind);
        }
        assert!(EntryKind::try_from("refund").is_err());
    }
}

//! Per-user running totals.
//!
//! `user_aggregates` holds one row per user with two denormalized totals:
//! `total_balance` (income minus expense) and `total_budget` (sum of
//! budgets). Rows are mutated through [`increment`] only, a single
//! `SET field = field + delta` statement, so concurrent adjustments for the
//! same user always compose.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, ResultEngine};

/// The aggregate column a delta applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateField {
    TotalBalance,
    TotalBudget,
}

impl AggregateField {
    fn column(self) -> Column {
        match self {
            Self::TotalBalance => Column::TotalBalance,
            Self::TotalBudget => Column::TotalBudget,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub total_balance: Money,
    pub total_budget: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAggregate {
    pub user_id: String,
    pub total_balance: Money,
    pub total_budget: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserAggregate {
    pub fn totals(&self) -> Totals {
        Totals {
            total_balance: self.total_balance,
            total_budget: self.total_budget,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "user_aggregates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub total_balance: i64,
    pub total_budget: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::entries::Entity")]
    Entries,
}

impl Related<super::entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for UserAggregate {
    fn from(model: Model) -> Self {
        Self {
            user_id: model.user_id,
            total_balance: Money::from_minor(model.total_balance),
            total_budget: Money::from_minor(model.total_budget),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl ActiveModel {
    pub(crate) fn opened(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: ActiveValue::Set(user_id.to_string()),
            total_balance: ActiveValue::Set(0),
            total_budget: ActiveValue::Set(0),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        }
    }
}

/// Atomically adds `delta` to one field of the user's aggregate.
///
/// The addition is evaluated by the database; nothing is read back first.
/// The row only matches while `field + delta` stays within `i64`, since
/// SQLite silently turns an overflowing integer sum into a REAL.
/// Fails with `KeyNotFound` when the user has no aggregate row and with
/// `Validation` when the total would leave the representable range.
pub(crate) async fn increment<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    field: AggregateField,
    delta: Money,
) -> ResultEngine<()> {
    let column = field.column();
    let in_range = if delta.minor() >= 0 {
        column.lte(i64::MAX - delta.minor())
    } else {
        column.gte(i64::MIN - delta.minor())
    };
    let result = Entity::update_many()
        .col_expr(column, Expr::col(column).add(delta.minor()))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::UserId.eq(user_id))
        .filter(in_range)
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        find(db, user_id).await?;
        return Err(EngineError::Validation(format!(
            "{field:?} of {user_id} would overflow by {delta}"
        )));
    }
    Ok(())
}

pub(crate) async fn find<C: ConnectionTrait>(db: &C, user_id: &str) -> ResultEngine<Model> {
    Entity::find_by_id(user_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("aggregate of {user_id}")))
}

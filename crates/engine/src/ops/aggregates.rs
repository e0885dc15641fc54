use chrono::Utc;
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, TransactionTrait, prelude::*};
use serde::Serialize;

use crate::{
    AggregateField, Delta, EngineError, LedgerEntry, Money, ResultEngine, Totals, UserAggregate,
    aggregates, entries, util::require_user_id,
};

use super::{Engine, with_tx};

/// Stored totals of a user next to the totals derived from the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AggregateReport {
    pub user_id: String,
    pub stored: Totals,
    pub derived: Totals,
    pub entries: u64,
}

impl AggregateReport {
    pub fn is_consistent(&self) -> bool {
        self.stored == self.derived
    }

    /// `derived - stored` per field.
    pub fn drift(&self) -> Totals {
        Totals {
            total_balance: Money::from_minor(
                self.derived.total_balance.minor() - self.stored.total_balance.minor(),
            ),
            total_budget: Money::from_minor(
                self.derived.total_budget.minor() - self.stored.total_budget.minor(),
            ),
        }
    }
}

/// Replays every live entry of the user through the create sign table.
async fn derive_totals<C: ConnectionTrait>(db: &C, user_id: &str) -> ResultEngine<(Totals, u64)> {
    let models = entries::Entity::find()
        .filter(entries::Column::UserId.eq(user_id))
        .all(db)
        .await?;

    // Partial sums depend on row order, so accumulate wide and narrow once.
    let (mut balance, mut budget) = (0i128, 0i128);
    let count = models.len() as u64;
    for model in models {
        let entry = LedgerEntry::try_from(model)?;
        let delta = Delta::on_create(entry.kind, entry.amount);
        match delta.field {
            AggregateField::TotalBalance => balance += i128::from(delta.amount.minor()),
            AggregateField::TotalBudget => budget += i128::from(delta.amount.minor()),
        }
    }

    let narrow = |total: i128, field: &str| {
        i64::try_from(total).map(Money::from_minor).map_err(|_| {
            EngineError::Validation(format!(
                "{field} of {user_id} derived from the ledger overflows"
            ))
        })
    };
    Ok((
        Totals {
            total_balance: narrow(balance, "total_balance")?,
            total_budget: narrow(budget, "total_budget")?,
        },
        count,
    ))
}

impl Engine {
    /// Creates the aggregate row of a user with both totals at zero.
    pub async fn open_account(&self, user_id: &str) -> ResultEngine<UserAggregate> {
        require_user_id(user_id)?;
        let model = with_tx!(self, |db_tx| {
            let existing = aggregates::Entity::find_by_id(user_id.to_string())
                .one(&db_tx)
                .await?;
            if existing.is_some() {
                return Err(EngineError::ExistingKey(format!("aggregate of {user_id}")));
            }
            aggregates::ActiveModel::opened(user_id, Utc::now())
                .insert(&db_tx)
                .await
                .map_err(EngineError::from)
        })?;

        tracing::info!(user_id, "account opened");
        Ok(UserAggregate::from(model))
    }

    /// Returns the running totals of a user.
    pub async fn aggregate(&self, user_id: &str) -> ResultEngine<UserAggregate> {
        let model = aggregates::find(&self.database, user_id).await?;
        Ok(UserAggregate::from(model))
    }

    /// Compares the stored totals with the ones derived from the ledger.
    /// Read-only.
    pub async fn verify_aggregate(&self, user_id: &str) -> ResultEngine<AggregateReport> {
        with_tx!(self, |db_tx| {
            let stored = UserAggregate::from(aggregates::find(&db_tx, user_id).await?).totals();
            let (derived, entries) = derive_totals(&db_tx, user_id).await?;
            Ok::<_, EngineError>(AggregateReport {
                user_id: user_id.to_string(),
                stored,
                derived,
                entries,
            })
        })
    }

    /// Recomputes the totals of a user from the ledger and stores them.
    ///
    /// Reads and overwrite happen in one transaction, so no concurrent ledger
    /// mutation of the same user can land in between. Returns the report as
    /// it was before the correction.
    pub async fn recompute_aggregate(&self, user_id: &str) -> ResultEngine<AggregateReport> {
        let report = with_tx!(self, |db_tx| {
            let stored = UserAggregate::from(aggregates::find(&db_tx, user_id).await?).totals();
            let (derived, entries) = derive_totals(&db_tx, user_id).await?;
            let report = AggregateReport {
                user_id: user_id.to_string(),
                stored,
                derived,
                entries,
            };

            if !report.is_consistent() {
                let corrected = aggregates::ActiveModel {
                    user_id: ActiveValue::Unchanged(user_id.to_string()),
                    total_balance: ActiveValue::Set(derived.total_balance.minor()),
                    total_budget: ActiveValue::Set(derived.total_budget.minor()),
                    updated_at: ActiveValue::Set(Utc::now()),
                    ..Default::default()
                };
                corrected.update(&db_tx).await?;
            }
            Ok::<_, EngineError>(report)
        })?;

        if report.is_consistent() {
            tracing::info!(user_id, entries = report.entries, "aggregate already consistent");
        } else {
            let drift = report.drift();
            tracing::warn!(
                user_id,
                balance_drift = %drift.total_balance,
                budget_drift = %drift.total_budget,
                "aggregate reconciled from ledger"
            );
        }
        Ok(report)
    }
}

//! Lifecycle hooks keeping `user_aggregates` in step with the ledger.
//!
//! Each hook runs inside the database transaction of the ledger write it
//! belongs to. If a hook fails, the caller rolls the whole transaction back,
//! so an entry is never committed without its aggregate adjustment.

use sea_orm::DatabaseTransaction;

use crate::{Delta, LedgerEntry, Money, ResultEngine, aggregates};

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Synchronizer;

impl Synchronizer {
    async fn apply(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        delta: Delta,
    ) -> ResultEngine<()> {
        tracing::debug!(
            user_id,
            field = ?delta.field,
            delta = %delta.amount,
            "adjusting aggregate"
        );
        aggregates::increment(db_tx, user_id, delta.field, delta.amount).await
    }

    pub(crate) async fn on_create(
        &self,
        db_tx: &DatabaseTransaction,
        entry: &LedgerEntry,
    ) -> ResultEngine<()> {
        let delta = Delta::on_create(entry.kind, entry.amount);
        self.apply(db_tx, &entry.user_id, delta).await
    }

    /// `before` must be the row as read inside `db_tx`, prior to the update.
    pub(crate) async fn on_update(
        &self,
        db_tx: &DatabaseTransaction,
        before: &LedgerEntry,
        proposed_amount: Option<Money>,
    ) -> ResultEngine<()> {
        let Some(new_amount) = proposed_amount else {
            return Ok(());
        };
        match Delta::on_update(before.kind, before.amount, new_amount) {
            Some(delta) => self.apply(db_tx, &before.user_id, delta).await,
            None => Ok(()),
        }
    }

    /// `before` must be the row as read inside `db_tx`, prior to the delete.
    pub(crate) async fn on_delete(
        &self,
        db_tx: &DatabaseTransaction,
        before: &LedgerEntry,
    ) -> ResultEngine<()> {
        let delta = Delta::on_delete(before.kind, before.amount);
        self.apply(db_tx, &before.user_id, delta).await
    }
}

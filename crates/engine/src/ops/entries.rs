use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    CreateEntryCmd, EngineError, EntryKind, LedgerEntry, ResultEngine, UpdateEntryCmd, aggregates,
    entries,
    util::{
        DESCRIPTION_MAX_CHARS, IDEMPOTENCY_KEY_MAX_CHARS, TITLE_MAX_CHARS,
        normalize_optional_text, normalize_required_text, require_user_id,
    },
};

use super::{Engine, with_tx};

const DEFAULT_PAGE_LIMIT: u64 = 10;
const MAX_PAGE_LIMIT: u64 = 100;

/// Filters for listing entries.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both applied to
/// `occurred_at`. `page` is 1-based.
#[derive(Clone, Debug, Default)]
pub struct EntryListFilter {
    /// If present, acts as an allow-list of kinds to return.
    pub kinds: Option<Vec<EntryKind>>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryPage {
    pub entries: Vec<LedgerEntry>,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

fn validate_list_filter(filter: &EntryListFilter) -> ResultEngine<(u64, u64)> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::Validation(
            "invalid range: from must be < to".to_string(),
        ));
    }
    if filter.kinds.as_ref().is_some_and(|k| k.is_empty()) {
        return Err(EngineError::Validation(
            "kinds must not be empty".to_string(),
        ));
    }
    let page = filter.page.unwrap_or(1);
    if page == 0 {
        return Err(EngineError::Validation("page starts at 1".to_string()));
    }
    let limit = filter.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(EngineError::Validation(format!(
            "limit must be between 1 and {MAX_PAGE_LIMIT}"
        )));
    }
    Ok((page, limit))
}

/// Patch values after trimming and validation.
struct NormalizedPatch {
    amount: Option<crate::Money>,
    title: Option<String>,
    category: Option<Option<String>>,
    description: Option<Option<String>>,
    occurred_at: Option<DateTime<Utc>>,
}

impl NormalizedPatch {
    fn from_cmd(cmd: &UpdateEntryCmd) -> ResultEngine<Self> {
        let patch = &cmd.patch;
        if patch.is_empty() {
            return Err(EngineError::Validation("nothing to update".to_string()));
        }
        Ok(Self {
            amount: patch.amount.map(crate::Money::require_positive).transpose()?,
            title: patch
                .title
                .as_deref()
                .map(|t| normalize_required_text(t, "title", TITLE_MAX_CHARS))
                .transpose()?,
            category: patch
                .category
                .as_deref()
                .map(|c| normalize_optional_text(Some(c), "category", TITLE_MAX_CHARS))
                .transpose()?,
            description: patch
                .description
                .as_deref()
                .map(|d| normalize_optional_text(Some(d), "description", DESCRIPTION_MAX_CHARS))
                .transpose()?,
            occurred_at: patch.occurred_at,
        })
    }

    fn apply(&self, before: &LedgerEntry, now: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            amount: self.amount.unwrap_or(before.amount),
            title: self.title.clone().unwrap_or_else(|| before.title.clone()),
            category: self
                .category
                .clone()
                .unwrap_or_else(|| before.category.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| before.description.clone()),
            occurred_at: self.occurred_at.unwrap_or(before.occurred_at),
            version: before.version + 1,
            updated_at: now,
            ..before.clone()
        }
    }
}

async fn find_by_idempotency_key(
    db_tx: &DatabaseTransaction,
    user_id: &str,
    key: &str,
) -> ResultEngine<Option<LedgerEntry>> {
    entries::Entity::find()
        .filter(entries::Column::UserId.eq(user_id))
        .filter(entries::Column::IdempotencyKey.eq(key))
        .one(db_tx)
        .await?
        .map(LedgerEntry::try_from)
        .transpose()
}

impl Engine {
    /// Records a new entry and applies its effect to the owner's totals.
    ///
    /// The insert and the aggregate increment commit together. A create that
    /// repeats an `idempotency_key` returns the existing entry unchanged.
    pub async fn create_transaction(&self, cmd: CreateEntryCmd) -> ResultEngine<LedgerEntry> {
        require_user_id(&cmd.user_id)?;
        let amount = cmd.amount.require_positive()?;
        let title = normalize_required_text(&cmd.title, "title", TITLE_MAX_CHARS)?;
        let category = normalize_optional_text(cmd.category.as_deref(), "category", TITLE_MAX_CHARS)?;
        let description = normalize_optional_text(
            cmd.description.as_deref(),
            "description",
            DESCRIPTION_MAX_CHARS,
        )?;
        let idempotency_key = normalize_optional_text(
            cmd.idempotency_key.as_deref(),
            "idempotency key",
            IDEMPOTENCY_KEY_MAX_CHARS,
        )?;

        let now = Utc::now();
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            user_id: cmd.user_id,
            kind: cmd.kind,
            amount,
            title,
            category,
            description,
            occurred_at: cmd.occurred_at,
            idempotency_key,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        let mut attempt = 0;
        let stored = loop {
            let db_tx = self.database.begin().await?;
            let outcome = self.insert_entry(&db_tx, &entry).await;
            match self.settle(db_tx, outcome, &entry.user_id, entry.id).await {
                Err(err) if self.should_retry(&err, attempt, false) => {
                    attempt += 1;
                    tracing::warn!(
                        user_id = %entry.user_id,
                        entry_id = %entry.id,
                        attempt,
                        "retrying create: {err}"
                    );
                }
                outcome => break outcome?,
            }
        };

        if stored.id == entry.id {
            tracing::info!(
                user_id = %stored.user_id,
                entry_id = %stored.id,
                kind = stored.kind.as_str(),
                amount = %stored.amount,
                "entry created"
            );
        } else {
            tracing::info!(
                user_id = %stored.user_id,
                entry_id = %stored.id,
                "idempotent replay of create"
            );
        }
        Ok(stored)
    }

    async fn insert_entry(
        &self,
        db_tx: &DatabaseTransaction,
        entry: &LedgerEntry,
    ) -> ResultEngine<LedgerEntry> {
        // A retried attempt whose first commit went through.
        if let Some(existing) = entries::Entity::find_by_id(entry.id).one(db_tx).await? {
            return LedgerEntry::try_from(existing);
        }
        if let Some(key) = entry.idempotency_key.as_deref()
            && let Some(existing) = find_by_idempotency_key(db_tx, &entry.user_id, key).await?
        {
            return Ok(existing);
        }
        // Surface a missing owner as not-found rather than as a foreign key error.
        aggregates::find(db_tx, &entry.user_id).await?;

        if let Err(err) = entries::ActiveModel::from(entry).insert(db_tx).await {
            // A concurrent create with the same key may have won the unique index.
            if let Some(key) = entry.idempotency_key.as_deref()
                && let Some(existing) = find_by_idempotency_key(db_tx, &entry.user_id, key).await?
            {
                return Ok(existing);
            }
            return Err(err.into());
        }

        self.sync.on_create(db_tx, entry).await?;
        Ok(entry.clone())
    }

    /// Returns one entry of `user_id`.
    pub async fn transaction(&self, user_id: &str, entry_id: Uuid) -> ResultEngine<LedgerEntry> {
        let model = entries::find_owned(&self.database, user_id, entry_id).await?;
        LedgerEntry::try_from(model)
    }

    /// Applies a patch to an entry and adjusts the owner's totals by the
    /// amount difference.
    ///
    /// The write is conditional on the version read in the same transaction.
    /// When another writer got there first the update is retried from a fresh
    /// read, unless the caller pinned `expected_version`.
    pub async fn update_transaction(&self, cmd: UpdateEntryCmd) -> ResultEngine<LedgerEntry> {
        require_user_id(&cmd.user_id)?;
        let patch = NormalizedPatch::from_cmd(&cmd)?;

        let mut attempt = 0;
        loop {
            let db_tx = self.database.begin().await?;
            let outcome = self.update_entry(&db_tx, &cmd, &patch).await;
            match self.settle(db_tx, outcome, &cmd.user_id, cmd.entry_id).await {
                Err(err) if self.should_retry(&err, attempt, cmd.expected_version.is_some()) => {
                    attempt += 1;
                    tracing::warn!(
                        user_id = %cmd.user_id,
                        entry_id = %cmd.entry_id,
                        attempt,
                        "retrying update: {err}"
                    );
                }
                Ok(updated) => {
                    tracing::info!(
                        user_id = %updated.user_id,
                        entry_id = %updated.id,
                        version = updated.version,
                        amount = %updated.amount,
                        "entry updated"
                    );
                    return Ok(updated);
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn update_entry(
        &self,
        db_tx: &DatabaseTransaction,
        cmd: &UpdateEntryCmd,
        patch: &NormalizedPatch,
    ) -> ResultEngine<LedgerEntry> {
        let before =
            LedgerEntry::try_from(entries::find_owned(db_tx, &cmd.user_id, cmd.entry_id).await?)?;
        if let Some(expected) = cmd.expected_version
            && expected != before.version
        {
            return Err(EngineError::Conflict(format!(
                "transaction {} is at version {}, expected {expected}",
                before.id, before.version
            )));
        }

        let after = patch.apply(&before, Utc::now());
        let changes = entries::ActiveModel {
            amount_minor: ActiveValue::Set(after.amount.minor()),
            title: ActiveValue::Set(after.title.clone()),
            category: ActiveValue::Set(after.category.clone()),
            description: ActiveValue::Set(after.description.clone()),
            occurred_at: ActiveValue::Set(after.occurred_at),
            version: ActiveValue::Set(after.version),
            updated_at: ActiveValue::Set(after.updated_at),
            ..Default::default()
        };
        let result = entries::Entity::update_many()
            .set(changes)
            .filter(entries::Column::Id.eq(before.id))
            .filter(entries::Column::Version.eq(before.version))
            .exec(db_tx)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::Conflict(format!(
                "transaction {} changed concurrently",
                before.id
            )));
        }

        self.sync.on_update(db_tx, &before, patch.amount).await?;
        Ok(after)
    }

    /// Deletes an entry and reverts its effect on the owner's totals.
    ///
    /// Returns the deleted entry. Deleting the same id again fails with
    /// `KeyNotFound` and leaves the totals alone.
    pub async fn delete_transaction(
        &self,
        user_id: &str,
        entry_id: Uuid,
    ) -> ResultEngine<LedgerEntry> {
        require_user_id(user_id)?;

        let mut attempt = 0;
        loop {
            let db_tx = self.database.begin().await?;
            let outcome = self.delete_entry(&db_tx, user_id, entry_id).await;
            match self.settle(db_tx, outcome, user_id, entry_id).await {
                Err(err) if self.should_retry(&err, attempt, false) => {
                    attempt += 1;
                    tracing::warn!(user_id, %entry_id, attempt, "retrying delete: {err}");
                }
                Ok(deleted) => {
                    tracing::info!(
                        user_id,
                        %entry_id,
                        kind = deleted.kind.as_str(),
                        amount = %deleted.amount,
                        "entry deleted"
                    );
                    return Ok(deleted);
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn delete_entry(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        entry_id: Uuid,
    ) -> ResultEngine<LedgerEntry> {
        let before = LedgerEntry::try_from(entries::find_owned(db_tx, user_id, entry_id).await?)?;

        let result = entries::Entity::delete_many()
            .filter(entries::Column::Id.eq(before.id))
            .filter(entries::Column::Version.eq(before.version))
            .exec(db_tx)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::Conflict(format!(
                "transaction {} changed concurrently",
                before.id
            )));
        }

        self.sync.on_delete(db_tx, &before).await?;
        Ok(before)
    }

    /// Lists entries of `user_id`, newest first.
    pub async fn list_transactions(
        &self,
        user_id: &str,
        filter: &EntryListFilter,
    ) -> ResultEngine<EntryPage> {
        require_user_id(user_id)?;
        let (page, limit) = validate_list_filter(filter)?;

        with_tx!(self, |db_tx| {
            let mut query = entries::Entity::find().filter(entries::Column::UserId.eq(user_id));
            if let Some(kinds) = &filter.kinds {
                let kinds: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
                query = query.filter(entries::Column::Kind.is_in(kinds));
            }
            if let Some(from) = filter.from {
                query = query.filter(entries::Column::OccurredAt.gte(from));
            }
            if let Some(to) = filter.to {
                query = query.filter(entries::Column::OccurredAt.lt(to));
            }

            let paginator = query
                .order_by_desc(entries::Column::OccurredAt)
                .order_by_asc(entries::Column::Id)
                .paginate(&db_tx, limit);
            let counts = paginator.num_items_and_pages().await?;
            let models = paginator.fetch_page(page - 1).await?;

            let mut out = Vec::with_capacity(models.len());
            for model in models {
                out.push(LedgerEntry::try_from(model)?);
            }

            Ok::<_, EngineError>(EntryPage {
                entries: out,
                page,
                limit,
                total: counts.number_of_items,
                total_pages: counts.number_of_pages,
            })
        })
    }
}

//! Command structs for engine write operations.
//!
//! These types group the parameters of create/update calls, keeping call
//! sites readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{EntryKind, Money};

/// Create a ledger entry.
#[derive(Clone, Debug)]
pub struct CreateEntryCmd {
    pub user_id: String,
    pub kind: EntryKind,
    pub amount: Money,
    pub title: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    /// Replaying a create with the same key returns the first entry and
    /// leaves the aggregate untouched.
    pub idempotency_key: Option<String>,
}

impl CreateEntryCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        kind: EntryKind,
        amount: Money,
        title: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
            amount,
            title: title.into(),
            category: None,
            description: None,
            occurred_at,
            idempotency_key: None,
        }
    }

    #[must_use]
    pub fn income(user_id: impl Into<String>, amount: Money, title: impl Into<String>) -> Self {
        Self::new(user_id, EntryKind::Income, amount, title, Utc::now())
    }

    #[must_use]
    pub fn expense(user_id: impl Into<String>, amount: Money, title: impl Into<String>) -> Self {
        Self::new(user_id, EntryKind::Expense, amount, title, Utc::now())
    }

    #[must_use]
    pub fn budget(user_id: impl Into<String>, amount: Money, title: impl Into<String>) -> Self {
        Self::new(user_id, EntryKind::Budget, amount, title, Utc::now())
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Fields that may change on an existing entry.
///
/// `kind` and the owner are not patchable; delete and create again instead.
#[derive(Clone, Debug, Default)]
pub struct EntryPatch {
    pub amount: Option<Money>,
    pub title: Option<String>,
    /// `Some("")` clears the category.
    pub category: Option<String>,
    /// `Some("")` clears the description.
    pub description: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.title.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.occurred_at.is_none()
    }
}

/// Update the amount and/or metadata of an entry.
#[derive(Clone, Debug)]
pub struct UpdateEntryCmd {
    pub user_id: String,
    pub entry_id: Uuid,
    pub patch: EntryPatch,
    /// When set, the update only applies to this version of the entry and
    /// fails with `Conflict` otherwise (no automatic retry).
    pub expected_version: Option<i64>,
}

impl UpdateEntryCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, entry_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            entry_id,
            patch: EntryPatch::default(),
            expected_version: None,
        }
    }

    #[must_use]
    pub fn amount(mut self, amount: Money) -> Self {
        self.patch.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.patch.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.patch.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.patch.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.patch.occurred_at = Some(occurred_at);
        self
    }

    #[must_use]
    pub fn patch(mut self, patch: EntryPatch) -> Self {
        self.patch = patch;
        self
    }

    #[must_use]
    pub fn expected_version(mut self, version: i64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

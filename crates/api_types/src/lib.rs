use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header carrying the owner id resolved by the upstream auth layer.
pub const USER_ID_HEADER: &str = "x-user-id";

pub mod account {
    use super::*;

    /// Running totals of a user. Amounts are decimal strings (`"12.50"`).
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AggregateView {
        pub user_id: String,
        pub total_balance: String,
        pub total_budget: String,
        pub updated_at: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TotalsView {
        pub total_balance: String,
        pub total_budget: String,
    }

    /// Stored totals next to the ones derived from the ledger.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AggregateReportView {
        pub user_id: String,
        pub stored: TotalsView,
        pub derived: TotalsView,
        /// Number of ledger entries replayed.
        pub entries: u64,
        pub consistent: bool,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Income,
        Expense,
        Budget,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub kind: TransactionKind,
        /// Positive decimal amount, e.g. `"12.50"` or `"12,5"`.
        pub amount: String,
        pub title: String,
        pub category: Option<String>,
        pub description: Option<String>,
        /// RFC3339 timestamp; the server uses now() when absent.
        pub occurred_at: Option<DateTime<FixedOffset>>,
        /// Optional idempotency key for safely retrying the same create request.
        pub idempotency_key: Option<String>,
    }

    /// Partial update. Absent fields are left alone; an empty `category` or
    /// `description` clears it.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub amount: Option<String>,
        pub title: Option<String>,
        pub category: Option<String>,
        pub description: Option<String>,
        pub occurred_at: Option<DateTime<FixedOffset>>,
        /// Apply only on this version, else `409`.
        pub expected_version: Option<i64>,
    }

    /// Query string of `GET /transactions`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionList {
        /// Comma separated kinds, e.g. `income,expense`.
        pub kinds: Option<String>,
        /// Inclusive lower bound on `occurred_at`.
        pub from: Option<DateTime<FixedOffset>>,
        /// Exclusive upper bound on `occurred_at`.
        pub to: Option<DateTime<FixedOffset>>,
        pub page: Option<u64>,
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub kind: TransactionKind,
        pub amount: String,
        pub title: String,
        pub category: Option<String>,
        pub description: Option<String>,
        pub occurred_at: DateTime<FixedOffset>,
        pub version: i64,
        pub created_at: DateTime<FixedOffset>,
        pub updated_at: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
        pub page: u64,
        pub limit: u64,
        pub total: u64,
        pub total_pages: u64,
    }
}
